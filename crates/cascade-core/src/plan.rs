//! Plan/Critique wire types observed from LLM output (§6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub step_number: u32,
    pub description: String,
    pub dependencies: Vec<u32>,
    pub tools_needed: Vec<String>,
    pub estimated_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub plan_summary: String,
    pub steps: Vec<PlanStep>,
    pub total_steps: u32,
    pub complexity: Complexity,
}

impl Plan {
    /// §3 invariant: `total_steps = |steps|`, step numbers form `1..total_steps`,
    /// every dependency references an earlier step.
    pub fn structurally_valid(&self) -> bool {
        if self.total_steps as usize != self.steps.len() {
            return false;
        }
        for (idx, step) in self.steps.iter().enumerate() {
            if step.step_number != (idx as u32 + 1) {
                return false;
            }
            if step.dependencies.iter().any(|d| *d >= step.step_number) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Logic,
    Dependency,
    Resource,
    Completeness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub step_number: u32,
    pub issue_type: IssueType,
    pub description: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Critique {
    pub is_valid: bool,
    pub risk_score: f32,
    pub issues_found: Vec<Issue>,
    pub suggestions: Vec<String>,
    pub overall_assessment: String,
}

impl Critique {
    pub fn accepted(&self, risk_threshold: f32) -> bool {
        self.is_valid && self.risk_score < risk_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(n: u32, deps: Vec<u32>) -> PlanStep {
        PlanStep {
            step_number: n,
            description: format!("step {n}"),
            dependencies: deps,
            tools_needed: vec![],
            estimated_time: "1h".to_string(),
        }
    }

    #[test]
    fn well_formed_plan_is_structurally_valid() {
        let plan = Plan {
            plan_summary: "s".into(),
            steps: vec![step(1, vec![]), step(2, vec![1])],
            total_steps: 2,
            complexity: Complexity::Simple,
        };
        assert!(plan.structurally_valid());
    }

    #[test]
    fn forward_reference_is_invalid() {
        let plan = Plan {
            plan_summary: "s".into(),
            steps: vec![step(1, vec![]), step(2, vec![5])],
            total_steps: 2,
            complexity: Complexity::Simple,
        };
        assert!(!plan.structurally_valid());
    }

    #[test]
    fn mismatched_total_steps_is_invalid() {
        let plan = Plan {
            plan_summary: "s".into(),
            steps: vec![step(1, vec![])],
            total_steps: 2,
            complexity: Complexity::Simple,
        };
        assert!(!plan.structurally_valid());
    }

    #[test]
    fn critique_accept_threshold() {
        let critique = Critique {
            is_valid: true,
            risk_score: 0.15,
            issues_found: vec![],
            suggestions: vec![],
            overall_assessment: "ok".into(),
        };
        assert!(critique.accepted(0.3));
    }
}
