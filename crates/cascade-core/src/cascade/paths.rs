//! Path Generation (4.6.5): from task kind and feasibility status, produce
//! 2-3 candidate `ExecutionPath`s from a fixed template table.

use super::types::{Constraint, ConstraintKind, ExecutionPath, FeasibilityStatus, PathKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Coding,
    Writing,
    Analysis,
    Research,
}

/// Detects task kind by keyword, defaulting to coding.
pub fn detect_task_kind(input: &str) -> TaskKind {
    let lowered = input.to_lowercase();
    if lowered.contains("write") || lowered.contains("essay") || lowered.contains("article") {
        TaskKind::Writing
    } else if lowered.contains("analy") {
        TaskKind::Analysis
    } else if lowered.contains("research") || lowered.contains("investigate") {
        TaskKind::Research
    } else {
        TaskKind::Coding
    }
}

fn base_steps(kind: TaskKind) -> Vec<&'static str> {
    match kind {
        TaskKind::Coding => vec!["analyze requirements", "implement solution", "error handling", "tests", "refactoring", "document"],
        TaskKind::Writing => vec!["outline", "draft", "revise", "proofread", "polish", "publish"],
        TaskKind::Analysis => vec!["gather data", "clean data", "explore", "model", "validate", "report"],
        TaskKind::Research => vec!["define question", "literature review", "gather evidence", "synthesize", "verify", "write up"],
    }
}

fn build_steps(kind: PathKind, base: &[&'static str]) -> Vec<String> {
    match kind {
        PathKind::Optimal => base.iter().map(|s| s.to_string()).collect(),
        PathKind::Minimal => {
            let first = base.first().copied().unwrap_or_default();
            let middle = base.get(base.len() / 2).copied().unwrap_or_default();
            let last = base.last().copied().unwrap_or_default();
            vec![first.to_string(), middle.to_string(), last.to_string()]
        }
        PathKind::Fast => base
            .iter()
            .filter(|s| !matches!(**s, "error handling" | "refactoring"))
            .map(|s| s.to_string())
            .collect(),
        PathKind::Thorough => {
            let mut steps: Vec<String> = base.iter().map(|s| s.to_string()).collect();
            steps.push("tests".to_string());
            steps.push("performance review".to_string());
            steps.push("security review".to_string());
            steps
        }
        PathKind::Alternative => {
            let mut steps: Vec<String> = base.iter().map(|s| s.to_string()).collect();
            if steps.len() > 2 {
                let last = steps.len() - 1;
                steps[1..last].reverse();
            }
            steps
        }
        PathKind::Workaround => {
            let mut steps = Vec::new();
            if let Some(first) = base.first() {
                steps.push(first.to_string());
            }
            if base.len() > 2 {
                steps.push(base[1..base.len() - 1].join(" + "));
            }
            if base.len() > 1 {
                steps.push(base.last().unwrap().to_string());
            }
            steps
        }
    }
}

fn kinds_for_status(status: FeasibilityStatus) -> Vec<PathKind> {
    match status {
        FeasibilityStatus::Feasible => vec![PathKind::Optimal, PathKind::Fast, PathKind::Thorough],
        FeasibilityStatus::Marginal => vec![PathKind::Fast, PathKind::Minimal, PathKind::Alternative],
        FeasibilityStatus::Infeasible => vec![PathKind::Minimal, PathKind::Workaround],
        FeasibilityStatus::Unknown => vec![PathKind::Optimal, PathKind::Alternative],
    }
}

fn value_of(constraints: &[Constraint], kind: ConstraintKind) -> Option<&str> {
    constraints.iter().find(|c| c.kind == kind).map(|c| c.value.as_str())
}

/// Score a path's fit against time/budget/skill constraints: 1.0 baseline,
/// penalized for exceeding an explicit numeric time budget.
fn score_fit(path_hours: f64, constraints: &[Constraint]) -> f32 {
    if let Some(time_value) = value_of(constraints, ConstraintKind::Time) {
        if let Ok(budget) = time_value.parse::<f64>() {
            if path_hours > budget {
                return 0.4;
            }
        } else if time_value == "urgent" && path_hours > 4.0 {
            return 0.4;
        }
    }
    0.9
}

pub fn generate(task_kind: TaskKind, status: FeasibilityStatus, base_hours: f64, constraints: &[Constraint]) -> Vec<ExecutionPath> {
    let base = base_steps(task_kind);
    kinds_for_status(status)
        .into_iter()
        .map(|kind| {
            let steps = build_steps(kind, &base);
            let scale = steps.len() as f64 / base.len().max(1) as f64;
            let estimated_hours = (base_hours * scale).max(0.5);
            let confidence = score_fit(estimated_hours, constraints);
            ExecutionPath {
                kind,
                steps,
                estimated_hours,
                estimated_cost: estimated_hours * 50.0,
                required_skills: vec![format!("{task_kind:?}").to_lowercase()],
                required_resources: vec!["compute".to_string()],
                pros: vec![format!("{kind:?} path")],
                cons: vec![],
                confidence,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_coding_by_default() {
        assert_eq!(detect_task_kind("fix the bug"), TaskKind::Coding);
    }

    #[test]
    fn detects_writing_keyword() {
        assert_eq!(detect_task_kind("write an essay about rust"), TaskKind::Writing);
    }

    #[test]
    fn feasible_status_yields_three_paths() {
        let paths = generate(TaskKind::Coding, FeasibilityStatus::Feasible, 10.0, &[]);
        assert_eq!(paths.len(), 3);
    }

    #[test]
    fn fast_path_drops_error_handling_and_refactoring() {
        let paths = generate(TaskKind::Coding, FeasibilityStatus::Feasible, 10.0, &[]);
        let fast = paths.iter().find(|p| p.kind == PathKind::Fast).unwrap();
        assert!(!fast.steps.iter().any(|s| s == "error handling" || s == "refactoring"));
    }

    #[test]
    fn minimal_path_keeps_first_middle_last() {
        let paths = generate(TaskKind::Coding, FeasibilityStatus::Marginal, 10.0, &[]);
        let minimal = paths.iter().find(|p| p.kind == PathKind::Minimal).unwrap();
        assert_eq!(minimal.steps.len(), 3);
    }

    #[test]
    fn infeasible_status_yields_two_paths() {
        let paths = generate(TaskKind::Coding, FeasibilityStatus::Infeasible, 40.0, &[]);
        assert_eq!(paths.len(), 2);
    }
}
