//! Model capability and role-requirement data types, plus the validation
//! they support (§3 `ModelCapabilities`/`RoleRequirements`/`SystemConstraints`/
//! `ValidationReport`, §4.3).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantization {
    F32,
    F16,
    Q8_0,
    Q4_0,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelSource {
    Local,
    ProviderA,
    ProviderB,
    Other(String),
}

/// Immutable description of one model. Owned by the Registry; other
/// components hold read-only views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCapabilities {
    pub name: String,
    pub display_name: Option<String>,
    pub source: ModelSource,
    pub requires_credential: bool,
    pub tags: HashSet<String>,

    pub context_length: u32,
    pub quantization: Quantization,
    pub parameters: u64,

    pub memory_estimate_gb: f64,
    pub min_memory_gb: f64,
    pub recommended_memory_gb: f64,

    pub reasoning: f32,
    pub coding: f32,
    pub creativity: f32,
    pub multilingual: f32,

    pub supports_function_calling: bool,
    pub supports_vision: bool,
    pub supports_tools: bool,

    pub thermal_sensitivity: f32,
}

impl ModelCapabilities {
    /// Builder-style constructor clamping skill axes into `[0,1]` per §3,
    /// and enforcing the memory invariant `min ≤ estimate ≤ recommended`
    /// (all > 0) by pushing each bound up to meet the one below it rather
    /// than rejecting the caller's numbers outright.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        source: ModelSource,
        context_length: u32,
        quantization: Quantization,
        parameters: u64,
        min_memory_gb: f64,
        memory_estimate_gb: f64,
        recommended_memory_gb: f64,
    ) -> Self {
        let min_memory_gb = min_memory_gb.max(f64::MIN_POSITIVE);
        let memory_estimate_gb = memory_estimate_gb.max(min_memory_gb);
        let recommended_memory_gb = recommended_memory_gb.max(memory_estimate_gb);
        Self {
            name: name.into(),
            display_name: None,
            source,
            requires_credential: false,
            tags: HashSet::new(),
            context_length,
            quantization,
            parameters,
            memory_estimate_gb,
            min_memory_gb,
            recommended_memory_gb,
            reasoning: 0.5,
            coding: 0.5,
            creativity: 0.5,
            multilingual: 0.5,
            supports_function_calling: false,
            supports_vision: false,
            supports_tools: false,
            thermal_sensitivity: 0.5,
        }
    }

    pub fn with_skills(
        mut self,
        reasoning: f32,
        coding: f32,
        creativity: f32,
        multilingual: f32,
    ) -> Self {
        self.reasoning = clamp01(reasoning);
        self.coding = clamp01(coding);
        self.creativity = clamp01(creativity);
        self.multilingual = clamp01(multilingual);
        self
    }

    pub fn with_features(mut self, function_calling: bool, vision: bool, tools: bool) -> Self {
        self.supports_function_calling = function_calling;
        self.supports_vision = vision;
        self.supports_tools = tools;
        self
    }

    pub fn with_thermal_sensitivity(mut self, sensitivity: f32) -> Self {
        self.thermal_sensitivity = clamp01(sensitivity);
        self
    }

    pub fn is_local(&self) -> bool {
        matches!(self.source, ModelSource::Local)
    }
}

/// Minimums and constraints for a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRequirements {
    pub role: String,
    pub min_reasoning: f32,
    pub min_coding: f32,
    pub min_creativity: f32,
    pub min_multilingual: f32,
    pub context_length_min: u32,
    pub memory_gb_max: f64,
    pub requires_function_calling: bool,
    pub requires_vision: bool,
    pub requires_tools: bool,
    pub max_thermal_sensitivity: f32,
    pub requires_local: bool,
}

impl RoleRequirements {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            min_reasoning: 0.0,
            min_coding: 0.0,
            min_creativity: 0.0,
            min_multilingual: 0.0,
            context_length_min: 0,
            memory_gb_max: f64::MAX,
            requires_function_calling: false,
            requires_vision: false,
            requires_tools: false,
            max_thermal_sensitivity: 1.0,
            requires_local: false,
        }
    }

    /// §3 invariant: all minima met, required features present,
    /// `recommendedMemoryGB ≤ memoryGBMax`, `thermalSensitivity ≤ maxThermalSensitivity`,
    /// `requiresLocal ⇒ source = local`.
    pub fn is_satisfied_by(&self, caps: &ModelCapabilities) -> bool {
        caps.reasoning >= self.min_reasoning
            && caps.coding >= self.min_coding
            && caps.creativity >= self.min_creativity
            && caps.multilingual >= self.min_multilingual
            && caps.context_length >= self.context_length_min
            && caps.recommended_memory_gb <= self.memory_gb_max
            && (!self.requires_function_calling || caps.supports_function_calling)
            && (!self.requires_vision || caps.supports_vision)
            && (!self.requires_tools || caps.supports_tools)
            && caps.thermal_sensitivity <= self.max_thermal_sensitivity
            && (!self.requires_local || caps.is_local())
    }

    /// Full validation producing a scored report rather than a bare bool.
    pub fn validate(&self, caps: &ModelCapabilities) -> ValidationReport {
        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        let skill_checks = [
            ("reasoning", caps.reasoning, self.min_reasoning),
            ("coding", caps.coding, self.min_coding),
            ("creativity", caps.creativity, self.min_creativity),
            ("multilingual", caps.multilingual, self.min_multilingual),
        ];
        let mut skill_score_sum = 0.0;
        for (name, have, min) in skill_checks {
            if have < min {
                issues.push(format!("{name} {have:.2} below minimum {min:.2}"));
            }
            skill_score_sum += if min > 0.0 { (have / min.max(0.01)).min(1.0) } else { 1.0 };
        }
        let skills_score = (skill_score_sum / 4.0).clamp(0.0, 1.0);

        if caps.context_length < self.context_length_min {
            issues.push(format!(
                "context length {} below minimum {}",
                caps.context_length, self.context_length_min
            ));
        }
        let context_score = if self.context_length_min == 0 {
            1.0
        } else {
            (caps.context_length as f32 / self.context_length_min as f32).min(1.0)
        };

        if caps.recommended_memory_gb > self.memory_gb_max {
            issues.push(format!(
                "recommended memory {:.1}GB exceeds budget {:.1}GB",
                caps.recommended_memory_gb, self.memory_gb_max
            ));
        }
        let memory_score = if self.memory_gb_max.is_finite() && self.memory_gb_max > 0.0 {
            (1.0 - (caps.recommended_memory_gb / self.memory_gb_max).min(1.0)).max(0.0) as f32
        } else {
            1.0
        };

        if self.requires_function_calling && !caps.supports_function_calling {
            issues.push("missing required function calling support".to_string());
        }
        if self.requires_vision && !caps.supports_vision {
            issues.push("missing required vision support".to_string());
        }
        if self.requires_tools && !caps.supports_tools {
            issues.push("missing required tool support".to_string());
        }
        if caps.thermal_sensitivity > self.max_thermal_sensitivity {
            warnings.push(format!(
                "thermal sensitivity {:.2} exceeds preferred max {:.2}",
                caps.thermal_sensitivity, self.max_thermal_sensitivity
            ));
        }
        if self.requires_local && !caps.is_local() {
            issues.push("role requires a local model".to_string());
        }

        let score = (0.6 * skills_score + 0.2 * context_score + 0.2 * memory_score).clamp(0.0, 1.0);

        ValidationReport {
            valid: issues.is_empty(),
            issues,
            warnings,
            score,
        }
    }
}

/// Live snapshot of system constraints consulted during filter/rank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ThermalState {
    Normal,
    Moderate,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConstraints {
    pub max_memory_gb: f64,
    pub available_memory_gb: f64,
    pub max_thermal_sensitivity: f32,
    pub thermal_state: ThermalState,
    pub local_only: bool,
    pub cloud_fallbacks_enabled: bool,
}

impl SystemConstraints {
    pub fn from_resource_snapshot(
        snapshot: &cascade_resource::ResourceSnapshot,
        max_thermal_sensitivity: f32,
        local_only: bool,
        cloud_fallbacks_enabled: bool,
    ) -> Self {
        let thermal_state = match snapshot.thermal_level {
            cascade_resource::ThermalLevel::Normal => ThermalState::Normal,
            cascade_resource::ThermalLevel::Moderate => ThermalState::Moderate,
            cascade_resource::ThermalLevel::High => ThermalState::High,
            cascade_resource::ThermalLevel::Critical => ThermalState::Critical,
        };
        Self {
            max_memory_gb: snapshot.total_memory_gb,
            available_memory_gb: snapshot.available_memory_gb,
            max_thermal_sensitivity,
            thermal_state,
            local_only,
            cloud_fallbacks_enabled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub score: f32,
}
