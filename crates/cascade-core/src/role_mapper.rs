//! RoleMapper (C4): two-stage filter-then-rank model selection.

use serde::{Deserialize, Serialize};

use crate::capability::{ModelCapabilities, RoleRequirements, SystemConstraints, ThermalState, ValidationReport};
use crate::registry::ModelRegistry;

const SMALL_MODEL_PARAM_CEILING: u64 = 7_000_000_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionCriteria {
    pub prefer_local: bool,
    pub prefer_smaller: bool,
    pub prefer_faster: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub model_name: String,
    pub score: f32,
}

pub struct RoleMapper<'a> {
    registry: &'a ModelRegistry,
}

impl<'a> RoleMapper<'a> {
    pub fn new(registry: &'a ModelRegistry) -> Self {
        Self { registry }
    }

    fn candidates(&self, role: &str, constraints: &SystemConstraints) -> Vec<ModelCapabilities> {
        self.registry
            .filter_by_role(role)
            .into_iter()
            .filter_map(|info| info.capabilities)
            .filter(|caps| self.passes_filter(caps, constraints))
            .collect()
    }

    fn passes_filter(&self, caps: &ModelCapabilities, constraints: &SystemConstraints) -> bool {
        if caps.recommended_memory_gb > constraints.max_memory_gb {
            return false;
        }
        let thermal_escape = matches!(
            constraints.thermal_state,
            ThermalState::Normal | ThermalState::Moderate
        );
        if caps.thermal_sensitivity > constraints.max_thermal_sensitivity && !thermal_escape {
            return false;
        }
        if constraints.local_only && !caps.is_local() {
            return false;
        }
        true
    }

    fn rank_score(
        &self,
        caps: &ModelCapabilities,
        requirements: &RoleRequirements,
        criteria: &SelectionCriteria,
    ) -> f32 {
        let mut score = requirements.validate(caps).score;
        if criteria.prefer_local && caps.is_local() {
            score += 0.10;
        }
        if criteria.prefer_smaller && caps.parameters < SMALL_MODEL_PARAM_CEILING {
            score += 0.10;
        }
        if criteria.prefer_faster && caps.thermal_sensitivity < 0.5 {
            score += 0.05;
        }
        score.clamp(0.0, 1.0)
    }

    fn ranked_survivors(
        &self,
        role: &str,
        requirements: &RoleRequirements,
        constraints: &SystemConstraints,
        criteria: &SelectionCriteria,
    ) -> Vec<(ModelCapabilities, f32)> {
        let mut survivors: Vec<(ModelCapabilities, f32)> = self
            .candidates(role, constraints)
            .into_iter()
            .filter(|caps| requirements.validate(caps).valid)
            .map(|caps| {
                let score = self.rank_score(&caps, requirements, criteria);
                (caps, score)
            })
            .collect();

        survivors.sort_by(|(a_caps, a_score), (b_caps, b_score)| {
            b_score
                .partial_cmp(a_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b_caps.parameters.cmp(&a_caps.parameters))
        });
        survivors
    }

    pub fn select(
        &self,
        role: &str,
        requirements: &RoleRequirements,
        constraints: &SystemConstraints,
        criteria: Option<&SelectionCriteria>,
    ) -> Option<Selection> {
        let default_criteria = SelectionCriteria::default();
        let criteria = criteria.unwrap_or(&default_criteria);
        self.ranked_survivors(role, requirements, constraints, criteria)
            .into_iter()
            .next()
            .map(|(caps, score)| Selection { model_name: caps.name, score })
    }

    pub fn recommendations(
        &self,
        role: &str,
        requirements: &RoleRequirements,
        constraints: &SystemConstraints,
        criteria: Option<&SelectionCriteria>,
        k: usize,
    ) -> Vec<Selection> {
        let default_criteria = SelectionCriteria::default();
        let criteria = criteria.unwrap_or(&default_criteria);
        self.ranked_survivors(role, requirements, constraints, criteria)
            .into_iter()
            .take(k)
            .map(|(caps, score)| Selection { model_name: caps.name, score })
            .collect()
    }

    pub fn validate(&self, name: &str, requirements: &RoleRequirements) -> Option<ValidationReport> {
        let info = self.registry.lookup(name)?;
        let caps = info.capabilities?;
        Some(requirements.validate(&caps))
    }

    pub fn fallback_chain(
        &self,
        role: &str,
        requirements: &RoleRequirements,
        constraints: &SystemConstraints,
    ) -> Vec<String> {
        self.ranked_survivors(role, requirements, constraints, &SelectionCriteria::default())
            .into_iter()
            .map(|(caps, _)| caps.name)
            .collect()
    }

    /// Models at least 20% larger in parameter count, or with reasoning
    /// `>= current + 0.1`, than the currently selected model.
    pub fn suggest_upgrades(&self, current_name: &str, role: &str) -> Vec<Selection> {
        let Some(current) = self
            .registry
            .lookup(current_name)
            .and_then(|info| info.capabilities)
        else {
            return Vec::new();
        };

        let constraints = self.registry.system_settings();
        let requirements = RoleRequirements::new(role);
        self.candidates(role, &constraints)
            .into_iter()
            .filter(|caps| caps.name != current_name)
            .filter(|caps| {
                caps.parameters as f64 >= current.parameters as f64 * 1.2
                    || caps.reasoning >= current.reasoning + 0.1
            })
            .map(|caps| {
                let score = self.rank_score(&caps, &requirements, &SelectionCriteria::default());
                Selection { model_name: caps.name, score }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{ModelSource, Quantization};

    fn constraints() -> SystemConstraints {
        SystemConstraints {
            max_memory_gb: 32.0,
            available_memory_gb: 20.0,
            max_thermal_sensitivity: 0.8,
            thermal_state: ThermalState::Normal,
            local_only: false,
            cloud_fallbacks_enabled: false,
        }
    }

    fn model(name: &str, params: u64, mem: f64, reasoning: f32) -> ModelCapabilities {
        ModelCapabilities::new(name, ModelSource::Local, 8192, Quantization::Q4_0, params, mem, mem, mem)
            .with_skills(reasoning, 0.6, 0.5, 0.5)
    }

    fn registry_with(models: Vec<ModelCapabilities>, role: &str) -> ModelRegistry {
        let registry = ModelRegistry::new(32.0, 0.8, false);
        let names: Vec<String> = models.iter().map(|m| m.name.clone()).collect();
        for m in models {
            registry.register_profile(m);
        }
        registry.set_role_preferences(role, names);
        registry
    }

    #[test]
    fn select_picks_highest_score() {
        let registry = registry_with(
            vec![model("small", 1_000_000_000, 4.0, 0.5), model("big", 10_000_000_000, 8.0, 0.9)],
            "planner",
        );
        let mapper = RoleMapper::new(&registry);
        let req = RoleRequirements::new("planner");
        let selection = mapper.select("planner", &req, &constraints(), None).unwrap();
        assert_eq!(selection.model_name, "big");
    }

    #[test]
    fn prefer_smaller_overlay_changes_ranking_for_close_scores() {
        let registry = registry_with(
            vec![model("small", 1_000_000_000, 4.0, 0.6), model("big", 10_000_000_000, 8.0, 0.6)],
            "planner",
        );
        let mapper = RoleMapper::new(&registry);
        let req = RoleRequirements::new("planner");
        let criteria = SelectionCriteria { prefer_smaller: true, ..Default::default() };
        let selection = mapper.select("planner", &req, &constraints(), Some(&criteria)).unwrap();
        assert_eq!(selection.model_name, "small");
    }

    #[test]
    fn filter_rejects_over_memory_budget() {
        let registry = registry_with(vec![model("huge", 1, 64.0, 0.9)], "planner");
        let mapper = RoleMapper::new(&registry);
        let req = RoleRequirements::new("planner");
        assert!(mapper.select("planner", &req, &constraints(), None).is_none());
    }

    #[test]
    fn recommendations_returns_top_k() {
        let registry = registry_with(
            vec![
                model("a", 1, 2.0, 0.9),
                model("b", 1, 2.0, 0.8),
                model("c", 1, 2.0, 0.7),
            ],
            "planner",
        );
        let mapper = RoleMapper::new(&registry);
        let req = RoleRequirements::new("planner");
        let recs = mapper.recommendations("planner", &req, &constraints(), None, 2);
        assert_eq!(recs.len(), 2);
    }

    #[test]
    fn score_bounds_always_in_unit_interval() {
        let registry = registry_with(vec![model("a", 1, 2.0, 1.0)], "planner");
        let mapper = RoleMapper::new(&registry);
        let req = RoleRequirements::new("planner");
        let criteria = SelectionCriteria { prefer_local: true, prefer_smaller: true, prefer_faster: true };
        let selection = mapper.select("planner", &req, &constraints(), Some(&criteria)).unwrap();
        assert!(selection.score <= 1.0);
    }

    #[test]
    fn suggest_upgrades_requires_20pct_larger_or_better_reasoning() {
        let registry = registry_with(
            vec![
                model("current", 1_000_000_000, 2.0, 0.5),
                model("bigger", 1_300_000_000, 2.0, 0.5),
                model("smarter", 1_000_000_000, 2.0, 0.65),
                model("same", 1_000_000_000, 2.0, 0.5),
            ],
            "planner",
        );
        let mapper = RoleMapper::new(&registry);
        let upgrades = mapper.suggest_upgrades("current", "planner");
        let names: Vec<_> = upgrades.iter().map(|s| s.model_name.clone()).collect();
        assert!(names.contains(&"bigger".to_string()));
        assert!(names.contains(&"smarter".to_string()));
        assert!(!names.contains(&"same".to_string()));
    }
}
