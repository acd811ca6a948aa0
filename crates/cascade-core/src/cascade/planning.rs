//! Execution Planning (4.6.6): turns a chosen path into an `ExecutionPlan`
//! of model-assigned, dependency-linked subtasks.

use super::paths::TaskKind;
use super::types::{Constraint, ConstraintKind, ExecutionPlan, Priority, Subtask, SubtaskStatus, WorkflowKind};

fn coding_steps(scope_comprehensive: bool) -> Vec<&'static str> {
    let mut steps = vec!["analyze requirements", "implement solution", "error handling", "tests"];
    if scope_comprehensive {
        steps.push("refactor");
        steps.push("document");
    }
    steps
}

fn steps_for(kind: TaskKind, scope_comprehensive: bool) -> Vec<&'static str> {
    match kind {
        TaskKind::Coding => coding_steps(scope_comprehensive),
        TaskKind::Writing => vec!["outline", "draft", "revise"],
        TaskKind::Analysis => vec!["gather data", "explore", "validate"],
        TaskKind::Research => vec!["define question", "gather evidence", "synthesize"],
    }
}

/// (task kind, complexity) -> assigned model, per a fixed lookup table.
/// Complexity is read loosely from the `complexity` constraint string to
/// avoid depending on `feasibility`'s private enum.
fn model_for(kind: TaskKind, complexity: &str) -> &'static str {
    match (kind, complexity) {
        (TaskKind::Coding, "complex") => "qwen2.5-coder-32b",
        (TaskKind::Coding, "moderate") => "qwen2.5-coder-14b",
        (TaskKind::Coding, _) => "qwen2.5-coder-7b",
        (TaskKind::Writing, "complex") => "llama-3.1-70b",
        (TaskKind::Writing, _) => "llama-3.1-8b",
        (TaskKind::Analysis, "complex") => "llama-3.1-70b",
        (TaskKind::Analysis, _) => "mistral-7b",
        (TaskKind::Research, _) => "llama-3.1-70b",
    }
}

fn checkpoint_interval(quality: &str, subtask_count: u32) -> u32 {
    match quality {
        "polished" => 1,
        "mvp" => (subtask_count / 2).max(2),
        _ => 1,
    }
}

/// Numeric `Time` constraint value in hours, if the constraint is present
/// and parses as a number (qualitative values like `urgent`/`thorough`
/// don't participate in workflow-kind selection).
fn numeric_time_constraint(constraints: &[Constraint]) -> Option<f64> {
    constraints
        .iter()
        .find(|c| c.kind == ConstraintKind::Time)
        .and_then(|c| c.value.parse::<f64>().ok())
}

/// A plan with no inter-subtask dependencies is always parallelizable.
/// Otherwise it's parallelizable only when the user gave an explicit
/// numeric time budget under ten hours, tight enough that the sequencing
/// overhead of a dependency chain isn't affordable.
fn determine_workflow_kind(has_dependencies: bool, constraints: &[Constraint]) -> WorkflowKind {
    if !has_dependencies {
        return WorkflowKind::Parallel;
    }
    match numeric_time_constraint(constraints) {
        Some(hours) if hours < 10.0 => WorkflowKind::Parallel,
        _ => WorkflowKind::Sequential,
    }
}

/// Builds a plan whose subtasks are linked in a linear dependency chain,
/// one per step; `workflow_kind` (and therefore `parallelizable`) is
/// derived from whether that chain exists and the user's stated time
/// constraint, not from the plan's own estimated hours.
pub fn plan(
    task_kind: TaskKind,
    complexity: &str,
    quality: &str,
    scope_comprehensive: bool,
    total_estimated_hours: f64,
    description: impl Into<String>,
    constraints: &[Constraint],
) -> ExecutionPlan {
    let description = description.into();
    let steps = steps_for(task_kind, scope_comprehensive);
    let model = model_for(task_kind, complexity);
    let per_step_hours = total_estimated_hours / steps.len().max(1) as f64;

    let subtasks: Vec<Subtask> = steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let id = i as u32 + 1;
            Subtask {
                id,
                description: step.to_string(),
                status: SubtaskStatus::Pending,
                priority: if i == 0 { Priority::High } else { Priority::Medium },
                dependencies: if i == 0 { vec![] } else { vec![id - 1] },
                estimated_hours: per_step_hours,
                required_model: model.to_string(),
                prompt: format!("{step} — part of: {description}"),
                output_format: None,
                context: None,
            }
        })
        .collect();

    let has_dependencies = subtasks.iter().any(|s| !s.dependencies.is_empty());
    let workflow_kind = determine_workflow_kind(has_dependencies, constraints);
    let parallelizable = workflow_kind == WorkflowKind::Parallel;
    let checkpoint_interval = checkpoint_interval(quality, subtasks.len() as u32);

    ExecutionPlan {
        id: format!("plan-{}", uuid::Uuid::new_v4()),
        description,
        subtasks,
        total_estimated_hours,
        workflow_kind,
        parallelizable,
        checkpoint_interval,
    }
}
