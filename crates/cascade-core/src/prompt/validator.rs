//! Plan-shape validator: structural checks on `Plan`, independent of
//! whether its content is sensible — only whether an Orchestrator can
//! safely consume it.

use crate::plan::Plan;

/// `(valid, risk_score)`. `(true, 0.1)` for well-formed plans,
/// `(false, >=0.8)` otherwise.
pub fn validate_plan_shape(plan: &Plan) -> (bool, f32) {
    if plan.plan_summary.trim().is_empty() {
        return (false, 0.9);
    }
    if plan.steps.is_empty() {
        return (false, 0.9);
    }
    if !plan.structurally_valid() {
        return (false, 0.85);
    }
    for step in &plan.steps {
        if step.description.trim().is_empty() || step.estimated_time.trim().is_empty() {
            return (false, 0.8);
        }
    }
    (true, 0.1)
}
