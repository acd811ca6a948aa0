//! Feasibility Validation (4.6.4): estimates required hours from a fixed
//! 3x3 table, checks time and skill feasibility independently, and
//! generates scored alternatives on failure.

use super::types::{Constraint, ConstraintKind, Feasibility, FeasibilityStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Minimal,
    Standard,
    Comprehensive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Mvp,
    Production,
    Polished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maintainability {
    QuickHack,
    Maintainable,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Expert,
}

fn base_hours(complexity: Complexity, scope: Scope) -> f64 {
    match (complexity, scope) {
        (Complexity::Simple, Scope::Minimal) => 2.0,
        (Complexity::Simple, Scope::Standard) => 4.0,
        (Complexity::Simple, Scope::Comprehensive) => 8.0,
        (Complexity::Moderate, Scope::Minimal) => 8.0,
        (Complexity::Moderate, Scope::Standard) => 16.0,
        (Complexity::Moderate, Scope::Comprehensive) => 32.0,
        (Complexity::Complex, Scope::Minimal) => 16.0,
        (Complexity::Complex, Scope::Standard) => 40.0,
        (Complexity::Complex, Scope::Comprehensive) => 80.0,
    }
}

fn quality_multiplier(quality: Quality) -> f64 {
    match quality {
        Quality::Mvp => 0.5,
        Quality::Production => 1.0,
        Quality::Polished => 1.5,
    }
}

fn maintainability_multiplier(maintainability: Maintainability) -> f64 {
    match maintainability {
        Maintainability::QuickHack => 0.3,
        Maintainability::Maintainable => 1.0,
        Maintainability::Enterprise => 1.5,
    }
}

pub fn estimate_hours(complexity: Complexity, scope: Scope, quality: Quality, maintainability: Maintainability) -> f64 {
    base_hours(complexity, scope) * quality_multiplier(quality) * maintainability_multiplier(maintainability)
}

fn admissible_complexities(skill: SkillLevel) -> &'static [Complexity] {
    match skill {
        SkillLevel::Beginner => &[Complexity::Simple],
        SkillLevel::Intermediate => &[Complexity::Simple, Complexity::Moderate],
        SkillLevel::Expert => &[Complexity::Simple, Complexity::Moderate, Complexity::Complex],
    }
}

fn skill_feasible(skill: SkillLevel, complexity: Complexity) -> bool {
    admissible_complexities(skill).contains(&complexity)
}

fn time_feasible(time_value: Option<&str>, estimate: f64) -> bool {
    match time_value {
        None => true,
        Some("urgent") => estimate <= 4.0,
        Some("thorough") => true,
        Some(numeric) => numeric.parse::<f64>().map(|hours| hours >= estimate).unwrap_or(true),
    }
}

fn value_of(constraints: &[Constraint], kind: ConstraintKind) -> Option<&str> {
    constraints.iter().find(|c| c.kind == kind).map(|c| c.value.as_str())
}

fn complexity_of(value: Option<&str>) -> Complexity {
    match value {
        Some("complex") => Complexity::Complex,
        Some("moderate") => Complexity::Moderate,
        _ => Complexity::Simple,
    }
}

fn scope_of(value: Option<&str>) -> Scope {
    match value {
        Some("comprehensive") => Scope::Comprehensive,
        Some("minimal") => Scope::Minimal,
        _ => Scope::Standard,
    }
}

fn quality_of(value: Option<&str>) -> Quality {
    match value {
        Some("polished") => Quality::Polished,
        Some("mvp") => Quality::Mvp,
        _ => Quality::Production,
    }
}

fn maintainability_of(value: Option<&str>) -> Maintainability {
    match value {
        Some("enterprise") => Maintainability::Enterprise,
        Some("quick_hack") => Maintainability::QuickHack,
        _ => Maintainability::Maintainable,
    }
}

/// Unspecified skill defaults to `beginner` — the conservative assumption
/// when competence has not been stated.
fn skill_of(value: Option<&str>) -> SkillLevel {
    match value {
        Some("expert") => SkillLevel::Expert,
        Some("intermediate") => SkillLevel::Intermediate,
        _ => SkillLevel::Beginner,
    }
}

pub fn assess(constraints: &[Constraint]) -> Feasibility {
    let complexity = complexity_of(value_of(constraints, ConstraintKind::Complexity));
    let scope = scope_of(value_of(constraints, ConstraintKind::Scope));
    let quality = quality_of(value_of(constraints, ConstraintKind::Quality));
    let maintainability = maintainability_of(value_of(constraints, ConstraintKind::Maintainability));
    let skill = skill_of(value_of(constraints, ConstraintKind::Skill));

    let estimated_hours = estimate_hours(complexity, scope, quality, maintainability);
    let time_ok = time_feasible(value_of(constraints, ConstraintKind::Time), estimated_hours);
    let skill_ok = skill_feasible(skill, complexity);

    let mut reasons = Vec::new();
    let mut blockers = Vec::new();
    if !time_ok {
        blockers.push(format!("estimated {estimated_hours:.1}h exceeds stated time budget"));
    } else {
        reasons.push("time budget accommodates the estimate".to_string());
    }
    if !skill_ok {
        blockers.push("stated skill level insufficient for this complexity".to_string());
    } else {
        reasons.push("skill level sufficient for this complexity".to_string());
    }

    let (status, confidence) = match (time_ok, skill_ok) {
        (true, true) => (FeasibilityStatus::Feasible, 0.8),
        (true, false) | (false, true) => (FeasibilityStatus::Marginal, 0.6),
        (false, false) => (FeasibilityStatus::Infeasible, 0.7),
    };

    let mut alternatives = Vec::new();
    let mut suggestions = Vec::new();
    if status != FeasibilityStatus::Feasible {
        if scope != Scope::Minimal {
            let alt_hours = estimate_hours(complexity, Scope::Minimal, quality, maintainability);
            alternatives.push(format!("reduce scope to minimal ({alt_hours:.1}h)"));
        }
        if quality != Quality::Mvp {
            let alt_hours = estimate_hours(complexity, scope, Quality::Mvp, maintainability);
            alternatives.push(format!("reduce quality to mvp ({alt_hours:.1}h)"));
        }
        if complexity != Complexity::Simple {
            let reduced = if complexity == Complexity::Complex { Complexity::Moderate } else { Complexity::Simple };
            let alt_hours = estimate_hours(reduced, scope, quality, maintainability);
            alternatives.push(format!("reduce complexity ({alt_hours:.1}h)"));
        }
        suggestions.push("consider an incremental delivery plan".to_string());
    }

    Feasibility { status, confidence, reasons, blockers, alternatives, suggestions, estimated_hours }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::types::ConstraintOrigin;

    fn constraint(kind: ConstraintKind, value: &str) -> Constraint {
        Constraint { kind, value: value.to_string(), confidence: 0.8, origin: ConstraintOrigin::Explicit, description: String::new() }
    }

    #[test]
    fn scenario_s4_infeasible_with_alternatives() {
        let constraints = vec![
            constraint(ConstraintKind::Time, "urgent"),
            constraint(ConstraintKind::Complexity, "complex"),
            constraint(ConstraintKind::Scope, "standard"),
            constraint(ConstraintKind::Quality, "production"),
        ];
        let feasibility = assess(&constraints);
        assert_eq!(feasibility.estimated_hours, 40.0);
        assert_eq!(feasibility.status, FeasibilityStatus::Infeasible);
        // reduce scope to minimal: complex/minimal (16h) at production quality.
        assert!(feasibility.alternatives.iter().any(|a| a.contains("scope") && a.contains("16.0")));
        // reduce quality to mvp: complex/standard (40h) halved by the mvp multiplier.
        assert!(feasibility.alternatives.iter().any(|a| a.contains("quality") && a.contains("20.0")));
        // reduce complexity to moderate: moderate/standard (16h) at production quality.
        assert!(feasibility.alternatives.iter().any(|a| a.contains("complexity") && a.contains("16.0")));
    }

    #[test]
    fn feasible_when_both_checks_pass() {
        let constraints = vec![
            constraint(ConstraintKind::Time, "100"),
            constraint(ConstraintKind::Complexity, "simple"),
            constraint(ConstraintKind::Skill, "expert"),
        ];
        let feasibility = assess(&constraints);
        assert_eq!(feasibility.status, FeasibilityStatus::Feasible);
    }

    #[test]
    fn monotonicity_scope_reduction_never_worsens() {
        let complex_standard = estimate_hours(Complexity::Complex, Scope::Standard, Quality::Production, Maintainability::Maintainable);
        let complex_minimal = estimate_hours(Complexity::Complex, Scope::Minimal, Quality::Production, Maintainability::Maintainable);
        assert!(complex_minimal <= complex_standard);
    }

    #[test]
    fn monotonicity_quality_reduction_never_worsens() {
        let polished = estimate_hours(Complexity::Moderate, Scope::Standard, Quality::Polished, Maintainability::Maintainable);
        let mvp = estimate_hours(Complexity::Moderate, Scope::Standard, Quality::Mvp, Maintainability::Maintainable);
        assert!(mvp <= polished);
    }
}
