//! The Cascade pipeline (4.6): eight independent stages over a single
//! user request — ambiguity detection, clarification, constraint
//! extraction, feasibility validation, path generation, execution
//! planning, progress monitoring, and prompt adjustment. Each stage is a
//! free function operating on the shared entity types in `types`; nothing
//! here owns process-wide state, so the orchestrator decides when and in
//! what order stages run.

pub mod adjustment;
pub mod ambiguity;
pub mod clarification;
pub mod constraints;
pub mod feasibility;
pub mod paths;
pub mod planning;
pub mod progress;
pub mod types;

pub use types::{
    Ambiguity, AmbiguityKind, Constraint, ConstraintKind, ConstraintOrigin, ExecutionPath,
    ExecutionPlan, Feasibility, FeasibilityStatus, Obstacle, ObstacleKind, ObstacleSeverity,
    PathKind, Priority, PromptAdjustment, Subtask, SubtaskStatus, WorkflowKind,
};

/// Runs ambiguity detection, constraint extraction, and feasibility
/// assessment over a (possibly already-clarified) request in one shot —
/// the synchronous, non-interactive slice of the pipeline a caller can
/// invoke without driving a `ClarificationSession`.
pub struct AnalyzedRequest {
    pub ambiguities: Vec<Ambiguity>,
    pub constraints: Vec<Constraint>,
    pub conflicts: constraints::ConflictReport,
    pub feasibility: Feasibility,
}

pub fn analyze(input: &str) -> AnalyzedRequest {
    let detected_ambiguities = ambiguity::detect(input);
    let extracted_constraints = constraints::extract(input);
    let conflicts = constraints::validate(&extracted_constraints);
    let feasibility = feasibility::assess(&extracted_constraints);
    AnalyzedRequest {
        ambiguities: detected_ambiguities,
        constraints: extracted_constraints,
        conflicts,
        feasibility,
    }
}
