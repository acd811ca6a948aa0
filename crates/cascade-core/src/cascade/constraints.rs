//! Constraint Extraction (4.6.3): regex-based extraction across seven
//! constraint families, plus contradiction/warning validation.

use lazy_static::lazy_static;
use regex::Regex;

use super::types::{Constraint, ConstraintKind, ConstraintOrigin};

lazy_static! {
    static ref TIME_HOURS_RE: Regex = Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(hour|hr|h)\b").unwrap();
    static ref TIME_DAYS_RE: Regex = Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(day|d)\b").unwrap();
    static ref TIME_URGENT_RE: Regex = Regex::new(r"(?i)\b(urgent|asap|immediately)\b").unwrap();
    static ref TIME_THOROUGH_RE: Regex = Regex::new(r"(?i)\b(thorough|no rush|take your time)\b").unwrap();

    static ref SKILL_BEGINNER_RE: Regex = Regex::new(r"(?i)\b(beginner|new to|learning)\b").unwrap();
    static ref SKILL_INTERMEDIATE_RE: Regex = Regex::new(r"(?i)\b(intermediate)\b").unwrap();
    static ref SKILL_EXPERT_RE: Regex = Regex::new(r"(?i)\b(expert|advanced|senior)\b").unwrap();

    static ref COMPLEXITY_SIMPLE_RE: Regex = Regex::new(r"(?i)\b(simple|basic|trivial)\b").unwrap();
    static ref COMPLEXITY_MODERATE_RE: Regex = Regex::new(r"(?i)\b(moderate|medium)\b").unwrap();
    static ref COMPLEXITY_COMPLEX_RE: Regex = Regex::new(r"(?i)\b(complex|complicated|advanced)\b").unwrap();

    static ref SCOPE_MINIMAL_RE: Regex = Regex::new(r"(?i)\b(minimal|bare minimum|just the basics)\b").unwrap();
    static ref SCOPE_STANDARD_RE: Regex = Regex::new(r"(?i)\b(standard|normal)\b").unwrap();
    static ref SCOPE_COMPREHENSIVE_RE: Regex = Regex::new(r"(?i)\b(comprehensive|everything|full featured)\b").unwrap();

    static ref QUALITY_MVP_RE: Regex = Regex::new(r"(?i)\b(mvp|prototype|quick and dirty)\b").unwrap();
    static ref QUALITY_PRODUCTION_RE: Regex = Regex::new(r"(?i)\b(production[- ]ready|production)\b").unwrap();
    static ref QUALITY_POLISHED_RE: Regex = Regex::new(r"(?i)\b(polished|pristine|flawless)\b").unwrap();

    static ref MAINTAIN_HACK_RE: Regex = Regex::new(r"(?i)\b(quick hack|throwaway|one[- ]off)\b").unwrap();
    static ref MAINTAIN_MAINTAINABLE_RE: Regex = Regex::new(r"(?i)\b(maintainable|readable)\b").unwrap();
    static ref MAINTAIN_ENTERPRISE_RE: Regex = Regex::new(r"(?i)\b(enterprise[- ]grade|enterprise)\b").unwrap();

    static ref BUDGET_RE: Regex = Regex::new(r"(?i)\$\s?(\d+(?:,\d{3})*(?:\.\d+)?)").unwrap();
}

fn explicit(kind: ConstraintKind, value: impl Into<String>, description: impl Into<String>, confidence: f32) -> Constraint {
    Constraint { kind, value: value.into(), confidence, origin: ConstraintOrigin::Explicit, description: description.into() }
}

/// Extract all matching constraints across the seven families. Numeric
/// time units are normalized to hours; qualitative values are retained as
/// enums/strings.
pub fn extract(input: &str) -> Vec<Constraint> {
    let mut constraints = Vec::new();

    if let Some(caps) = TIME_HOURS_RE.captures(input) {
        let hours: f64 = caps[1].parse().unwrap_or(0.0);
        constraints.push(explicit(ConstraintKind::Time, format!("{hours}"), "explicit hour budget", 0.85));
    } else if let Some(caps) = TIME_DAYS_RE.captures(input) {
        let days: f64 = caps[1].parse().unwrap_or(0.0);
        constraints.push(explicit(ConstraintKind::Time, format!("{}", days * 8.0), "explicit day budget normalized to hours", 0.8));
    } else if TIME_URGENT_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Time, "urgent", "urgent qualitative time constraint", 0.75));
    } else if TIME_THOROUGH_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Time, "thorough", "no strict time limit", 0.7));
    }

    if let Some(caps) = BUDGET_RE.captures(input) {
        let amount = caps[1].replace(',', "");
        constraints.push(explicit(ConstraintKind::Budget, amount, "explicit dollar budget", 0.8));
    }

    if SKILL_EXPERT_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Skill, "expert", "stated expert skill level", 0.8));
    } else if SKILL_INTERMEDIATE_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Skill, "intermediate", "stated intermediate skill level", 0.75));
    } else if SKILL_BEGINNER_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Skill, "beginner", "stated beginner skill level", 0.75));
    }

    if COMPLEXITY_COMPLEX_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Complexity, "complex", "stated complexity", 0.75));
    } else if COMPLEXITY_MODERATE_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Complexity, "moderate", "stated complexity", 0.7));
    } else if COMPLEXITY_SIMPLE_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Complexity, "simple", "stated complexity", 0.7));
    }

    if SCOPE_COMPREHENSIVE_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Scope, "comprehensive", "stated scope", 0.75));
    } else if SCOPE_MINIMAL_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Scope, "minimal", "stated scope", 0.75));
    } else if SCOPE_STANDARD_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Scope, "standard", "stated scope", 0.7));
    }

    if QUALITY_POLISHED_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Quality, "polished", "stated quality bar", 0.8));
    } else if QUALITY_PRODUCTION_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Quality, "production", "stated quality bar", 0.8));
    } else if QUALITY_MVP_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Quality, "mvp", "stated quality bar", 0.75));
    }

    if MAINTAIN_ENTERPRISE_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Maintainability, "enterprise", "stated maintainability bar", 0.8));
    } else if MAINTAIN_MAINTAINABLE_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Maintainability, "maintainable", "stated maintainability bar", 0.75));
    } else if MAINTAIN_HACK_RE.is_match(input) {
        constraints.push(explicit(ConstraintKind::Maintainability, "quick_hack", "stated maintainability bar", 0.7));
    }

    // Context-derived inference: prototype-ish phrasing implies an mvp quality bar
    // unless quality was already stated explicitly.
    if !constraints.iter().any(|c| c.kind == ConstraintKind::Quality) && input.to_lowercase().contains("prototype") {
        constraints.push(Constraint {
            kind: ConstraintKind::Quality,
            value: "mvp".to_string(),
            confidence: 0.6,
            origin: ConstraintOrigin::Inferred,
            description: "prototype project type implies MVP quality".to_string(),
        });
    }

    constraints
}

#[derive(Debug, Clone)]
pub struct ConflictReport {
    pub conflicts: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

fn value_of<'a>(constraints: &'a [Constraint], kind: ConstraintKind) -> Option<&'a str> {
    constraints.iter().find(|c| c.kind == kind).map(|c| c.value.as_str())
}

/// Fixed conflict table plus informational warnings. Missing constraints
/// of types {time, quality, scope} produce suggestions, not errors.
pub fn validate(constraints: &[Constraint]) -> ConflictReport {
    let mut conflicts = Vec::new();
    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();

    let time = value_of(constraints, ConstraintKind::Time);
    let complexity = value_of(constraints, ConstraintKind::Complexity);
    let quality = value_of(constraints, ConstraintKind::Quality);
    let maintainability = value_of(constraints, ConstraintKind::Maintainability);
    let scope = value_of(constraints, ConstraintKind::Scope);
    let skill = value_of(constraints, ConstraintKind::Skill);

    if time == Some("urgent") && complexity == Some("complex") {
        conflicts.push("time=urgent conflicts with complexity=complex".to_string());
    }
    if quality == Some("mvp") && maintainability == Some("enterprise") {
        conflicts.push("quality=mvp conflicts with maintainability=enterprise".to_string());
    }
    if scope == Some("minimal") && quality == Some("polished") {
        conflicts.push("scope=minimal conflicts with quality=polished".to_string());
    }

    if skill == Some("beginner") && complexity == Some("complex") {
        warnings.push("beginner skill level with complex task".to_string());
    }
    if let Some(time_value) = time {
        if let Ok(hours) = time_value.parse::<f64>() {
            if hours < 4.0 {
                warnings.push("time budget under 4 hours is tight".to_string());
            }
        }
    }

    if time.is_none() {
        suggestions.push("consider stating a time constraint".to_string());
    }
    if quality.is_none() {
        suggestions.push("consider stating a quality bar".to_string());
    }
    if scope.is_none() {
        suggestions.push("consider stating a scope".to_string());
    }

    ConflictReport { conflicts, warnings, suggestions }
}
