//! Orchestrator (C8): the three-phase Planner/Critic/Executor workflow.
//! Sequential within one request; a single top-level lock enforces the
//! one-caller-at-a-time invariant across requests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cascade_resource::ResourceMonitor;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::cache::ResponseCache;
use crate::capability::{RoleRequirements, SystemConstraints};
use crate::cascade;
use crate::error::{CascadeError, CascadeResult};
use crate::factory::ModelFactory;
use crate::plan::{Critique, Plan};
use crate::profiler::Profiler;
use crate::prompt::{self, Intent, PromptCatalog, Role};
use crate::registry::ModelRegistry;
use crate::role_mapper::RoleMapper;

const MAX_CRITIQUE_ITERATIONS: u32 = 3;
const ACCEPT_RISK_THRESHOLD: f32 = 0.3;
const REFINEMENT_BACKOFF: Duration = Duration::from_secs(1);
const DEFAULT_INVOCATION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HealthStatus {
    pub ollama_down: bool,
    pub no_models: bool,
    pub thermal_throttle: bool,
    pub memory_pressure: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        !(self.ollama_down || self.no_models || self.thermal_throttle || self.memory_pressure)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub success: bool,
    pub plan: Option<Plan>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub memory_used_gb: f64,
    pub iterations: u32,
}

impl WorkflowResult {
    fn failure(error: impl Into<String>, memory_used_gb: f64, iterations: u32) -> Self {
        Self { success: false, plan: None, output: None, error: Some(error.into()), memory_used_gb, iterations }
    }
}

fn cascade_constraint_value<'a>(constraints: &'a [cascade::Constraint], kind: cascade::ConstraintKind) -> Option<&'a str> {
    constraints.iter().find(|c| c.kind == kind).map(|c| c.value.as_str())
}

/// Runs the non-interactive Cascade slice (4.6) over the raw request —
/// ambiguity detection, constraint extraction, feasibility, path
/// generation, execution planning — and renders it into a plain-text
/// brief the planner prompt quotes verbatim. Ambiguities are surfaced as
/// text rather than driving an interactive `ClarificationSession`:
/// `process()` takes one request and returns one result, with no channel
/// for a follow-up answer.
fn cascade_brief(user_input: &str) -> String {
    let analyzed = cascade::analyze(user_input);
    let task_kind = cascade::paths::detect_task_kind(user_input);

    let complexity = cascade_constraint_value(&analyzed.constraints, cascade::ConstraintKind::Complexity).unwrap_or("moderate");
    let quality = cascade_constraint_value(&analyzed.constraints, cascade::ConstraintKind::Quality).unwrap_or("production");
    let scope_comprehensive =
        cascade_constraint_value(&analyzed.constraints, cascade::ConstraintKind::Scope) == Some("comprehensive");

    let candidate_paths = cascade::paths::generate(
        task_kind,
        analyzed.feasibility.status,
        analyzed.feasibility.estimated_hours,
        &analyzed.constraints,
    );
    let best_path = candidate_paths
        .iter()
        .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal));

    let execution_plan = cascade::planning::plan(
        task_kind,
        complexity,
        quality,
        scope_comprehensive,
        analyzed.feasibility.estimated_hours,
        user_input,
        &analyzed.constraints,
    );

    let mut lines = vec![format!("task kind: {task_kind:?}")];
    if !analyzed.ambiguities.is_empty() {
        let flagged: Vec<String> =
            analyzed.ambiguities.iter().map(|a| format!("{:?} ({})", a.kind, a.matched_text)).collect();
        lines.push(format!("ambiguities flagged: {}", flagged.join("; ")));
    }
    lines.push(format!(
        "feasibility: {:?} ({:.1}h estimated)",
        analyzed.feasibility.status, analyzed.feasibility.estimated_hours
    ));
    if !analyzed.feasibility.blockers.is_empty() {
        lines.push(format!("blockers: {}", analyzed.feasibility.blockers.join("; ")));
    }
    if !analyzed.feasibility.alternatives.is_empty() {
        lines.push(format!("alternatives: {}", analyzed.feasibility.alternatives.join("; ")));
    }
    if let Some(path) = best_path {
        lines.push(format!(
            "recommended path: {:?} ({} steps, {:.1}h, confidence {:.2})",
            path.kind,
            path.steps.len(),
            path.estimated_hours,
            path.confidence
        ));
    }
    lines.push(format!(
        "execution plan: {} subtasks, {:?}, checkpoint every {} subtask(s)",
        execution_plan.subtasks.len(),
        execution_plan.workflow_kind,
        execution_plan.checkpoint_interval
    ));
    lines.join("\n")
}

pub struct Orchestrator {
    registry: Arc<ModelRegistry>,
    factory: Arc<ModelFactory>,
    monitor: Arc<ResourceMonitor>,
    cache: Arc<ResponseCache>,
    profiler: Arc<Profiler>,
    catalog: PromptCatalog,
    max_thermal_sensitivity: f32,
    call_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ModelRegistry>,
        factory: Arc<ModelFactory>,
        monitor: Arc<ResourceMonitor>,
        cache: Arc<ResponseCache>,
        profiler: Arc<Profiler>,
    ) -> Self {
        Self {
            registry,
            factory,
            monitor,
            cache,
            profiler,
            catalog: PromptCatalog::standard(),
            max_thermal_sensitivity: 0.8,
            call_lock: Mutex::new(()),
        }
    }

    /// §7: health checks surface system-wide states and block `process()`
    /// from entering Phase P when unhealthy.
    pub fn health_check(&self) -> HealthStatus {
        let snapshot = self.monitor.latest();
        let no_models = self.registry.filter_by_source(&crate::capability::ModelSource::Local).is_empty()
            && self.registry.filter_by_role("planner").is_empty();
        HealthStatus {
            ollama_down: false,
            no_models,
            thermal_throttle: snapshot.thermal_level == cascade_resource::ThermalLevel::Critical,
            memory_pressure: snapshot.memory_pressure() == cascade_resource::MemoryPressure::Critical,
        }
    }

    fn constraints(&self) -> SystemConstraints {
        SystemConstraints::from_resource_snapshot(&self.monitor.latest(), self.max_thermal_sensitivity, false, true)
    }

    async fn select_and_load(&self, role: &str) -> CascadeResult<String> {
        let requirements = RoleRequirements::new(role);
        let constraints = self.constraints();
        let selection = {
            let mapper = RoleMapper::new(&self.registry);
            mapper.select(role, &requirements, &constraints, None)
        }
        .ok_or_else(|| CascadeError::NotAvailable(format!("no validated model satisfies role {role}")))?;

        let info = self
            .registry
            .lookup(&selection.model_name)
            .and_then(|info| info.capabilities)
            .ok_or_else(|| CascadeError::Internal("selected model missing capabilities".into()))?;

        if !self.factory.validate_memory_budget(info.recommended_memory_gb) {
            self.factory.cleanup_idle(0).await;
        }
        self.factory.load(&selection.model_name, info.recommended_memory_gb).await?;
        Ok(selection.model_name)
    }

    /// Invokes a model, consulting the response cache first and
    /// populating it on miss.
    async fn cached_invoke(&self, model_name: &str, prompt: &str, context: &str) -> CascadeResult<String> {
        if let Some(cached) = self.cache.get(prompt, model_name, context) {
            return Ok(cached);
        }
        let _span = self.profiler.start(format!("invoke:{model_name}"));
        let response = self
            .factory
            .invoke(model_name, prompt, 0.3, 1024, DEFAULT_INVOCATION_TIMEOUT)
            .await?;
        self.cache.set(prompt, model_name, context, response.clone());
        Ok(response)
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    async fn run_phase_p(&self, user_input: &str, context: &str) -> CascadeResult<Plan> {
        let model_name = self.select_and_load("planner").await?;
        let outcome = async {
            let config = self
                .catalog
                .get(Role::Planner, None)
                .ok_or_else(|| CascadeError::Internal("no planner prompt configured".into()))?;
            let cascade_brief = cascade_brief(user_input);
            let vars = Self::vars(&[("request", user_input), ("context", context), ("cascade", &cascade_brief)]);
            let rendered = prompt::format(&config.user_template, &vars)?;
            let raw = self.cached_invoke(&model_name, &rendered, context).await?;
            let plan: Plan = serde_json::from_str(&raw)
                .map_err(|e| CascadeError::Shape(format!("planner output not valid Plan JSON: {e}")))?;
            let (valid, _risk) = prompt::validate_plan_shape(&plan);
            if !valid || !plan.structurally_valid() {
                return Err(CascadeError::Shape("planner produced a structurally invalid plan".into()));
            }
            Ok(plan)
        }
        .await;
        let _ = self.factory.unload(&model_name).await;
        outcome
    }

    async fn run_phase_c(&self, mut plan: Plan, context: &str) -> CascadeResult<(Plan, u32)> {
        let model_name = self.select_and_load("critic").await?;
        let mut iterations = 0;
        let outcome: CascadeResult<Plan> = async {
            for iteration in 1..=MAX_CRITIQUE_ITERATIONS {
                iterations = iteration;
                let config = self
                    .catalog
                    .get(Role::Critic, None)
                    .ok_or_else(|| CascadeError::Internal("no critic prompt configured".into()))?;
                let plan_json = serde_json::to_string(&plan)
                    .map_err(|e| CascadeError::Internal(format!("plan serialization failed: {e}")))?;
                let vars = Self::vars(&[("plan", &plan_json)]);
                let rendered = prompt::format(&config.user_template, &vars)?;
                let raw = self.cached_invoke(&model_name, &rendered, context).await?;
                let critique: Critique = serde_json::from_str(&raw)
                    .map_err(|e| CascadeError::Shape(format!("critic output not valid Critique JSON: {e}")))?;

                if critique.accepted(ACCEPT_RISK_THRESHOLD) {
                    return Ok(plan);
                }

                let refinement_config = self
                    .catalog
                    .get(Role::Refinement, None)
                    .ok_or_else(|| CascadeError::Internal("no refinement prompt configured".into()))?;
                let critique_json = serde_json::to_string(&critique)
                    .map_err(|e| CascadeError::Internal(format!("critique serialization failed: {e}")))?;
                let refinement_vars = Self::vars(&[("plan", &plan_json), ("critique", &critique_json)]);
                let rendered_refinement = prompt::format(&refinement_config.user_template, &refinement_vars)?;
                let raw_refined = self.cached_invoke(&model_name, &rendered_refinement, context).await?;
                if let Ok(candidate) = serde_json::from_str::<Plan>(&raw_refined) {
                    if candidate.structurally_valid() {
                        plan = candidate;
                    }
                }

                tokio::time::sleep(REFINEMENT_BACKOFF).await;
            }
            tracing::warn!("critique loop exhausted without acceptance; returning last plan");
            Ok(plan)
        }
        .await;
        let _ = self.factory.unload(&model_name).await;
        outcome.map(|plan| (plan, iterations))
    }

    async fn run_phase_e(&self, plan: &Plan, context: &str, additional_context: &str) -> CascadeResult<String> {
        let model_name = self.select_and_load("executor").await?;
        let outcome = async {
            let config = self
                .catalog
                .get(Role::Executor, None)
                .ok_or_else(|| CascadeError::Internal("no executor prompt configured".into()))?;
            let plan_json = serde_json::to_string(plan)
                .map_err(|e| CascadeError::Internal(format!("plan serialization failed: {e}")))?;
            let vars = Self::vars(&[("plan", &plan_json), ("additional_context", additional_context)]);
            let rendered = prompt::format(&config.user_template, &vars)?;
            self.cached_invoke(&model_name, &rendered, context).await
        }
        .await;
        let _ = self.factory.unload(&model_name).await;
        outcome
    }

    /// The three-phase workflow. Only one `process()` call runs at a time.
    pub async fn process(&self, user_input: &str, context: &str, additional_context: &str) -> WorkflowResult {
        let _guard = self.call_lock.lock().await;
        let initial_used_gb = self.monitor.latest().used_memory_gb;

        let health = self.health_check();
        if !health.is_healthy() {
            return WorkflowResult::failure(format!("unhealthy: {health:?}"), 0.0, 0);
        }

        let plan = match self.run_phase_p(user_input, context).await {
            Ok(plan) => plan,
            Err(e) => return WorkflowResult::failure(e.to_string(), 0.0, 0),
        };

        let (accepted_plan, iterations) = match self.run_phase_c(plan, context).await {
            Ok(result) => result,
            Err(e) => return WorkflowResult::failure(e.to_string(), 0.0, 0),
        };

        let output = match self.run_phase_e(&accepted_plan, context, additional_context).await {
            Ok(output) => output,
            Err(e) => return WorkflowResult::failure(e.to_string(), 0.0, iterations),
        };

        let final_used_gb = self.monitor.latest().used_memory_gb;
        WorkflowResult {
            success: true,
            plan: Some(accepted_plan),
            output: Some(output),
            error: None,
            memory_used_gb: final_used_gb - initial_used_gb,
            iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{ModelCapabilities, ModelSource, Quantization};
    use crate::invoker::Invoker;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct ScriptedInvoker {
        responses: Vec<String>,
        call_count: AtomicU32,
    }

    #[async_trait]
    impl Invoker for ScriptedInvoker {
        async fn invoke(&self, _model: &str, _prompt: &str, _t: f32, _m: u32, _to: Duration) -> CascadeResult<String> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst) as usize;
            Ok(self.responses.get(idx).cloned().unwrap_or_else(|| self.responses.last().unwrap().clone()))
        }
    }

    fn model(name: &str) -> ModelCapabilities {
        ModelCapabilities::new(name, ModelSource::Local, 8192, Quantization::Q4_0, 1_000_000_000, 1.0, 2.0, 2.0)
            .with_skills(0.8, 0.8, 0.8, 0.8)
    }

    fn registry_with_roles() -> Arc<ModelRegistry> {
        let registry = ModelRegistry::new(64.0, 0.9, false);
        registry.register_profile(model("planner-model"));
        registry.register_profile(model("critic-model"));
        registry.register_profile(model("executor-model"));
        registry.set_role_preferences("planner", vec!["planner-model".to_string()]);
        registry.set_role_preferences("critic", vec!["critic-model".to_string()]);
        registry.set_role_preferences("executor", vec!["executor-model".to_string()]);
        Arc::new(registry)
    }

    fn orchestrator_with(responses: Vec<&str>) -> Orchestrator {
        let invoker = Arc::new(ScriptedInvoker {
            responses: responses.into_iter().map(|s| s.to_string()).collect(),
            call_count: AtomicU32::new(0),
        });
        Orchestrator::new(
            registry_with_roles(),
            Arc::new(ModelFactory::new(64.0, invoker)),
            Arc::new(ResourceMonitor::new()),
            Arc::new(ResponseCache::with_defaults()),
            Arc::new(Profiler::new()),
        )
    }

    fn well_formed_plan_json() -> &'static str {
        r#"{"plan_summary":"s","steps":[{"step_number":1,"description":"a","dependencies":[],"tools_needed":[],"estimated_time":"1h"},{"step_number":2,"description":"b","dependencies":[1],"tools_needed":[],"estimated_time":"1h"},{"step_number":3,"description":"c","dependencies":[2],"tools_needed":[],"estimated_time":"1h"}],"total_steps":3,"complexity":"simple"}"#
    }

    #[tokio::test]
    async fn scenario_s1_accepted_on_first_critique() {
        let orchestrator = orchestrator_with(vec![
            well_formed_plan_json(),
            r#"{"is_valid":true,"risk_score":0.15,"issues_found":[],"suggestions":[],"overall_assessment":"ok"}"#,
            "final output",
        ]);
        let result = orchestrator.process("Write a Python function to reverse a string", "", "").await;
        assert!(result.success);
        assert_eq!(result.plan.unwrap().total_steps, 3);
        assert_eq!(result.iterations, 1);
    }

    #[tokio::test]
    async fn unhealthy_system_blocks_processing() {
        // No role preferences registered on this registry -> no_models.
        let empty_registry = Arc::new(ModelRegistry::new(64.0, 0.9, false));
        let invoker = Arc::new(ScriptedInvoker { responses: vec!["x".to_string()], call_count: AtomicU32::new(0) });
        let orchestrator = Orchestrator::new(
            empty_registry,
            Arc::new(ModelFactory::new(64.0, invoker)),
            Arc::new(ResourceMonitor::new()),
            Arc::new(ResponseCache::with_defaults()),
            Arc::new(Profiler::new()),
        );
        let result = orchestrator.process("anything", "", "").await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn cache_hit_on_identical_second_call() {
        let orchestrator = orchestrator_with(vec![
            well_formed_plan_json(),
            r#"{"is_valid":true,"risk_score":0.1,"issues_found":[],"suggestions":[],"overall_assessment":"ok"}"#,
            "final output",
        ]);
        let first = orchestrator.process("hello", "ctx", "").await;
        assert!(first.success);
        let second = orchestrator.process("hello", "ctx", "").await;
        assert!(second.success);
        assert!(orchestrator.cache.stats().hits >= 1);
    }

    #[test]
    fn cascade_brief_surfaces_feasibility_and_plan_shape() {
        let brief = cascade_brief("write an urgent, complex essay");
        assert!(brief.contains("feasibility:"));
        assert!(brief.contains("execution plan:"));
        assert!(brief.contains("recommended path:"));
    }

    struct RecordingInvoker {
        prompts: parking_lot::Mutex<Vec<String>>,
        responses: Vec<String>,
        call_count: AtomicU32,
    }

    #[async_trait]
    impl Invoker for RecordingInvoker {
        async fn invoke(&self, _model: &str, prompt: &str, _t: f32, _m: u32, _to: Duration) -> CascadeResult<String> {
            self.prompts.lock().push(prompt.to_string());
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst) as usize;
            Ok(self.responses.get(idx).cloned().unwrap_or_else(|| self.responses.last().unwrap().clone()))
        }
    }

    #[tokio::test]
    async fn planner_prompt_includes_rendered_cascade_brief() {
        let invoker = Arc::new(RecordingInvoker {
            prompts: parking_lot::Mutex::new(Vec::new()),
            responses: vec![
                well_formed_plan_json().to_string(),
                r#"{"is_valid":true,"risk_score":0.1,"issues_found":[],"suggestions":[],"overall_assessment":"ok"}"#
                    .to_string(),
                "final output".to_string(),
            ],
            call_count: AtomicU32::new(0),
        });
        let orchestrator = Orchestrator::new(
            registry_with_roles(),
            Arc::new(ModelFactory::new(64.0, invoker.clone())),
            Arc::new(ResourceMonitor::new()),
            Arc::new(ResponseCache::with_defaults()),
            Arc::new(Profiler::new()),
        );
        let result = orchestrator.process("Write a Python function to reverse a string", "", "").await;
        assert!(result.success);
        let planner_prompt = invoker.prompts.lock().first().cloned().unwrap();
        assert!(planner_prompt.contains("Cascade analysis:"));
        assert!(planner_prompt.contains("feasibility:"));
    }
}
