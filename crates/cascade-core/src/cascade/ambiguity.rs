//! Ambiguity Detection (4.6.1): six disjoint pattern-driven detector
//! families, each with a fixed base confidence.

use lazy_static::lazy_static;
use regex::Regex;

use super::types::{Ambiguity, AmbiguityKind};

struct FamilySpec {
    kind: AmbiguityKind,
    base_confidence: f32,
    patterns: Vec<Regex>,
}

lazy_static! {
    static ref FAMILIES: Vec<FamilySpec> = vec![
        FamilySpec {
            kind: AmbiguityKind::VagueQuantifier,
            base_confidence: 0.70,
            patterns: vec![
                Regex::new(r"(?i)\b(some|several|many|few|a lot of|lots of)\b").unwrap(),
            ],
        },
        FamilySpec {
            kind: AmbiguityKind::UndefinedTerm,
            base_confidence: 0.80,
            patterns: vec![
                Regex::new(r"(?i)\b(better|faster|nicer|cleaner|improved?|optimized?)\b").unwrap(),
            ],
        },
        FamilySpec {
            kind: AmbiguityKind::MissingContext,
            base_confidence: 0.90,
            patterns: vec![
                Regex::new(r"(?i)\b(it|this|that|the thing|the system)\b").unwrap(),
            ],
        },
        FamilySpec {
            kind: AmbiguityKind::AmbiguousReference,
            base_confidence: 0.85,
            patterns: vec![
                Regex::new(r"(?i)\b(they|them|those|these)\b").unwrap(),
            ],
        },
        FamilySpec {
            kind: AmbiguityKind::UnclearScope,
            base_confidence: 0.75,
            patterns: vec![
                Regex::new(r"(?i)\b(everything|all of it|the whole thing|entire)\b").unwrap(),
            ],
        },
        FamilySpec {
            kind: AmbiguityKind::SubjectiveCriteria,
            base_confidence: 0.65,
            patterns: vec![
                Regex::new(r"(?i)\b(good|nice|pretty|elegant|intuitive|user[- ]friendly)\b").unwrap(),
            ],
        },
    ];
}

fn interpretations_for(kind: AmbiguityKind, matched_text: &str) -> (Vec<String>, Vec<String>) {
    let lowered = matched_text.to_lowercase();
    match kind {
        AmbiguityKind::UndefinedTerm if lowered.contains("better") || lowered.contains("improve") => (
            vec![
                "improve performance".to_string(),
                "improve quality".to_string(),
                "improve UX".to_string(),
                "improve features".to_string(),
            ],
            vec!["specify which dimension to improve".to_string()],
        ),
        AmbiguityKind::UndefinedTerm if lowered.contains("faster") => (
            vec!["improve performance".to_string(), "reduce latency".to_string()],
            vec!["specify a target speed-up".to_string()],
        ),
        AmbiguityKind::VagueQuantifier => (
            vec!["a small number".to_string(), "a specific number".to_string()],
            vec!["specify a number".to_string()],
        ),
        _ => (
            vec!["clarify the referent".to_string()],
            vec!["provide more context".to_string()],
        ),
    }
}

/// Runs all six families over `input`, merges results, sorts by confidence
/// descending.
pub fn detect(input: &str) -> Vec<Ambiguity> {
    let mut found = Vec::new();
    for family in FAMILIES.iter() {
        for pattern in &family.patterns {
            for m in pattern.find_iter(input) {
                let (interpretations, suggestions) = interpretations_for(family.kind, m.as_str());
                found.push(Ambiguity {
                    kind: family.kind,
                    span: (m.start(), m.end()),
                    confidence: family.base_confidence,
                    interpretations,
                    suggestions,
                    matched_text: m.as_str().to_string(),
                });
            }
        }
    }
    found.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_undefined_term_and_vague_quantifier() {
        let ambiguities = detect("Make it faster and better");
        assert!(ambiguities.len() >= 2);
        assert!(ambiguities.iter().any(|a| a.kind == AmbiguityKind::UndefinedTerm));
    }

    #[test]
    fn results_sorted_by_confidence_descending() {
        let ambiguities = detect("Make it faster and better and fix some things");
        for window in ambiguities.windows(2) {
            assert!(window[0].confidence >= window[1].confidence);
        }
    }

    #[test]
    fn missing_context_detects_pronoun() {
        let ambiguities = detect("Fix this");
        assert!(ambiguities.iter().any(|a| a.kind == AmbiguityKind::MissingContext));
    }

    #[test]
    fn no_ambiguity_on_specific_request() {
        let ambiguities = detect("Write a Python function to reverse a string");
        assert!(ambiguities.is_empty());
    }
}
