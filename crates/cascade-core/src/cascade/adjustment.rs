//! Prompt Adjustment (4.6.8): maps an obstacle to a set of candidate
//! adjustment strategies, scores them, and surfaces the best one.

use super::types::{AdjustmentKind, ObstacleKind, PromptAdjustment};

fn strategies_for(kind: ObstacleKind) -> &'static [AdjustmentKind] {
    match kind {
        ObstacleKind::Timeout => &[AdjustmentKind::Simplify, AdjustmentKind::BreakDown, AdjustmentKind::ChangeModel],
        ObstacleKind::ResourceLimit => &[AdjustmentKind::ChangeModel, AdjustmentKind::ReduceScope, AdjustmentKind::Simplify],
        ObstacleKind::DependencyFailure => &[AdjustmentKind::Restructure, AdjustmentKind::AddContext],
        ObstacleKind::QualityIssue => &[AdjustmentKind::AddContext, AdjustmentKind::Refine, AdjustmentKind::Expand],
        ObstacleKind::PerformanceIssue => &[AdjustmentKind::ChangeModel, AdjustmentKind::Simplify],
        ObstacleKind::Error => &[AdjustmentKind::Refine, AdjustmentKind::AddContext, AdjustmentKind::Restructure],
        ObstacleKind::Unknown => &[AdjustmentKind::Refine],
    }
}

/// Strategy-specific prompt transformations; each returns the adjusted
/// prompt text for a given strategy.
fn apply_strategy(kind: AdjustmentKind, prompt: &str) -> String {
    match kind {
        AdjustmentKind::Simplify => {
            let trimmed: Vec<&str> = prompt
                .lines()
                .filter(|l| !l.trim_start().starts_with("//") && !l.trim().is_empty())
                .collect();
            trimmed.join("\n")
        }
        AdjustmentKind::BreakDown => {
            format!("{prompt}\n\n1. First, outline the approach.\n2. Then implement step by step.\n3. Finally, verify the result.")
        }
        AdjustmentKind::ChangeModel => format!("{prompt}\n\n(prefer concise, direct answers; avoid verbose explanation)"),
        AdjustmentKind::ReduceScope => format!("{prompt}\n\nFocus only on the minimal viable part of this task."),
        AdjustmentKind::Restructure => format!("Context and dependencies:\n{prompt}"),
        AdjustmentKind::AddContext => format!("{prompt}\n\nAdditional context: none provided, infer conservatively."),
        AdjustmentKind::Refine => format!("{prompt}\n\nBe precise and double-check edge cases."),
        AdjustmentKind::Expand => format!("{prompt}\n\nProvide a more complete and detailed response."),
    }
}

/// Baseline confidence is 0.7; the textbook-fit strategy for a given
/// obstacle kind (the first entry in its strategy list) is raised to
/// reflect the stronger prior.
fn confidence_for(kind: AdjustmentKind, obstacle_kind: ObstacleKind) -> f32 {
    let strategies = strategies_for(obstacle_kind);
    match strategies.first() {
        Some(first) if *first == kind => {
            if obstacle_kind == ObstacleKind::Timeout && kind == AdjustmentKind::Simplify {
                0.9
            } else {
                0.85
            }
        }
        _ => 0.7,
    }
}

fn expected_improvement(kind: AdjustmentKind, obstacle_kind: ObstacleKind) -> f32 {
    if strategies_for(obstacle_kind).first() == Some(&kind) {
        0.5
    } else {
        0.3
    }
}

/// Generates all candidate adjustments for an obstacle kind, given the
/// prompt that produced it.
pub fn candidates(obstacle_kind: ObstacleKind, prompt: &str) -> Vec<PromptAdjustment> {
    strategies_for(obstacle_kind)
        .iter()
        .map(|&kind| {
            let adjusted = apply_strategy(kind, prompt);
            PromptAdjustment {
                kind,
                original: prompt.to_string(),
                adjusted,
                reason: format!("{obstacle_kind:?} obstacle suggests {kind:?}"),
                expected_improvement: expected_improvement(kind, obstacle_kind),
                confidence: confidence_for(kind, obstacle_kind),
            }
        })
        .collect()
}

/// Picks the adjustment with the highest confidence from a candidate set.
pub fn best(candidates: &[PromptAdjustment]) -> Option<&PromptAdjustment> {
    candidates.iter().max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
}
