//! Shared Cascade entity types (§3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmbiguityKind {
    VagueQuantifier,
    UndefinedTerm,
    MissingContext,
    AmbiguousReference,
    UnclearScope,
    SubjectiveCriteria,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ambiguity {
    pub kind: AmbiguityKind,
    pub span: (usize, usize),
    pub confidence: f32,
    pub interpretations: Vec<String>,
    pub suggestions: Vec<String>,
    pub matched_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    Time,
    Budget,
    Skill,
    Complexity,
    Scope,
    Quality,
    Maintainability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintOrigin {
    Explicit,
    Inferred,
    Implicit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub value: String,
    pub confidence: f32,
    pub origin: ConstraintOrigin,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeasibilityStatus {
    Feasible,
    Marginal,
    Infeasible,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feasibility {
    pub status: FeasibilityStatus,
    pub confidence: f32,
    pub reasons: Vec<String>,
    pub blockers: Vec<String>,
    pub alternatives: Vec<String>,
    pub suggestions: Vec<String>,
    pub estimated_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathKind {
    Optimal,
    Fast,
    Thorough,
    Minimal,
    Alternative,
    Workaround,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPath {
    pub kind: PathKind,
    pub steps: Vec<String>,
    pub estimated_hours: f64,
    pub estimated_cost: f64,
    pub required_skills: Vec<String>,
    pub required_resources: Vec<String>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubtaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: u32,
    pub description: String,
    pub status: SubtaskStatus,
    pub priority: Priority,
    pub dependencies: Vec<u32>,
    pub estimated_hours: f64,
    pub required_model: String,
    pub prompt: String,
    pub output_format: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowKind {
    Sequential,
    Parallel,
    Hierarchical,
    Iterative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub id: String,
    pub description: String,
    pub subtasks: Vec<Subtask>,
    pub total_estimated_hours: f64,
    pub workflow_kind: WorkflowKind,
    pub parallelizable: bool,
    pub checkpoint_interval: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Timeout,
    Error,
    ResourceLimit,
    DependencyFailure,
    QualityIssue,
    PerformanceIssue,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObstacleSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub subtask_id: u32,
    pub severity: ObstacleSeverity,
    pub suggested_actions: Vec<String>,
    pub context: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentKind {
    Simplify,
    Expand,
    Refine,
    Restructure,
    AddContext,
    ReduceScope,
    ChangeModel,
    BreakDown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptAdjustment {
    pub kind: AdjustmentKind,
    pub original: String,
    pub adjusted: String,
    pub reason: String,
    pub expected_improvement: f32,
    pub confidence: f32,
}
