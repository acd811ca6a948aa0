//! # cascade-core
//!
//! Model orchestration for local-first multi-model pipelines: a registry
//! merging static, remote, and daemon-advertised models; a two-stage
//! filter-then-rank role mapper; a memory-budgeted model factory; a
//! planner/critic/executor orchestrator with response caching and
//! profiling; and the Cascade request-analysis pipeline (ambiguity,
//! constraints, feasibility, paths, planning, progress, adjustment).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cascade_core::{ModelFactory, ModelRegistry, Orchestrator};
//! use cascade_core::invoker::LocalDaemonInvoker;
//! use cascade_resource::ResourceMonitor;
//!
//! # async fn run() {
//! let registry = Arc::new(ModelRegistry::new(32.0, 0.8, false));
//! let factory = Arc::new(ModelFactory::new(32.0, Arc::new(LocalDaemonInvoker::new("ollama"))));
//! let monitor = Arc::new(ResourceMonitor::new());
//! let cache = Arc::new(cascade_core::cache::ResponseCache::with_defaults());
//! let profiler = Arc::new(cascade_core::profiler::Profiler::new());
//! let orchestrator = Orchestrator::new(registry, factory, monitor, cache, profiler);
//! let result = orchestrator.process("Write a Python function to reverse a string", "", "").await;
//! println!("success={}", result.success);
//! # }
//! ```

pub mod alerts;
pub mod cache;
pub mod capability;
pub mod cascade;
pub mod error;
pub mod factory;
pub mod invoker;
pub mod orchestrator;
pub mod plan;
pub mod prompt;
pub mod profiler;
pub mod registry;
pub mod role_mapper;

pub use alerts::{ActiveAlert, AlertRule, AlertTracker};
pub use cache::ResponseCache;
pub use capability::{ModelCapabilities, ModelSource, Quantization, RoleRequirements, SystemConstraints, ValidationReport};
pub use cascade::{analyze, AnalyzedRequest};
pub use error::{CascadeError, CascadeResult};
pub use factory::{InstanceState, ModelFactory, ModelInstance};
pub use invoker::{Invoker, LocalDaemonInvoker, RemoteHttpInvoker};
pub use orchestrator::{HealthStatus, Orchestrator, WorkflowResult};
pub use plan::{Complexity, Critique, Issue, IssueType, Plan, PlanStep, Severity as PlanSeverity};
pub use profiler::{ActiveSpan, Profiler, Span, Summary as ProfileSummary};
pub use prompt::{validate_plan_shape, Intent, PromptCatalog, PromptConfig, Role};
pub use registry::{KeyStore, LocalDaemonDirectory, ModelInfo, ModelRegistry};
pub use role_mapper::{RoleMapper, Selection, SelectionCriteria};
