//! ModelFactory (C5): exclusive load/unload of model instances under a
//! memory budget, with the at-most-one-large-model-resident `switch`
//! primitive.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::error::{CascadeError, CascadeResult};
use crate::invoker::Invoker;

const LOAD_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceState {
    Unloaded,
    Loading,
    Loaded,
    Error,
    Switching,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInstance {
    pub name: String,
    pub state: InstanceState,
    pub loaded_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub memory_usage_gb: f64,
    pub error_count: u32,
    pub last_error: Option<String>,
}

impl ModelInstance {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: InstanceState::Unloaded,
            loaded_at: None,
            last_used_at: None,
            memory_usage_gb: 0.0,
            error_count: 0,
            last_error: None,
        }
    }
}

struct InFlightLoad {
    notify: Arc<Notify>,
}

pub struct ModelFactory {
    instances: RwLock<HashMap<String, ModelInstance>>,
    in_flight: RwLock<HashMap<String, Arc<InFlightLoad>>>,
    total_usage_gb: RwLock<f64>,
    max_memory_gb: f64,
    invoker: Arc<dyn Invoker>,
}

impl ModelFactory {
    pub fn new(max_memory_gb: f64, invoker: Arc<dyn Invoker>) -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
            in_flight: RwLock::new(HashMap::new()),
            total_usage_gb: RwLock::new(0.0),
            max_memory_gb,
            invoker,
        }
    }

    pub fn validate_memory_budget(&self, extra_gb: f64) -> bool {
        *self.total_usage_gb.read() + extra_gb <= self.max_memory_gb
    }

    pub fn total_usage_gb(&self) -> f64 {
        *self.total_usage_gb.read()
    }

    pub fn instance(&self, name: &str) -> Option<ModelInstance> {
        self.instances.read().get(name).cloned()
    }

    pub fn list_loaded(&self) -> Vec<String> {
        self.instances
            .read()
            .values()
            .filter(|i| i.state == InstanceState::Loaded)
            .map(|i| i.name.clone())
            .collect()
    }

    /// Load a model, declaring `recommended_memory_gb` for accounting.
    /// Concurrent loads on the same instance join the in-flight operation.
    /// Already-`loaded` instances are a no-op: re-accounting the memory
    /// here would double-count the same resident model against the budget.
    pub async fn load(&self, name: &str, recommended_memory_gb: f64) -> CascadeResult<()> {
        if self.instance(name).map(|i| i.state) == Some(InstanceState::Loaded) {
            return Ok(());
        }

        // Join an in-flight load if present.
        let maybe_waiter = self.in_flight.read().get(name).cloned();
        if let Some(waiter) = maybe_waiter {
            let _ = tokio::time::timeout(LOAD_DEADLINE, waiter.notify.notified()).await;
            return match self.instance(name).map(|i| i.state) {
                Some(InstanceState::Loaded) => Ok(()),
                _ => Err(CascadeError::BackendFailure(format!(
                    "joined load for {name} did not complete successfully"
                ))),
            };
        }

        if !self.validate_memory_budget(recommended_memory_gb) {
            return Err(CascadeError::ResourceExhausted(format!(
                "loading {name} ({recommended_memory_gb:.1}GB) would exceed budget"
            )));
        }

        let notify = Arc::new(Notify::new());
        self.in_flight
            .write()
            .insert(name.to_string(), Arc::new(InFlightLoad { notify: Arc::clone(&notify) }));

        {
            let mut instances = self.instances.write();
            let instance = instances
                .entry(name.to_string())
                .or_insert_with(|| ModelInstance::new(name));
            instance.state = InstanceState::Loading;
        }

        let result = tokio::time::timeout(LOAD_DEADLINE, self.do_load(name)).await;

        let mut instances = self.instances.write();
        let instance = instances.get_mut(name).expect("instance present after loading");

        let outcome = match result {
            Ok(Ok(())) => {
                instance.state = InstanceState::Loaded;
                instance.loaded_at = Some(Utc::now());
                instance.memory_usage_gb = recommended_memory_gb;
                instance.error_count = 0;
                instance.last_error = None;
                *self.total_usage_gb.write() += recommended_memory_gb;
                Ok(())
            }
            Ok(Err(e)) => {
                instance.state = InstanceState::Error;
                instance.error_count += 1;
                instance.last_error = Some(e.to_string());
                Err(e)
            }
            Err(_) => {
                instance.state = InstanceState::Error;
                instance.error_count += 1;
                instance.last_error = Some("loading timeout".to_string());
                Err(CascadeError::BackendFailure(format!("{name}: loading timeout")))
            }
        };

        drop(instances);
        self.in_flight.write().remove(name);
        notify.notify_waiters();
        outcome
    }

    async fn do_load(&self, _name: &str) -> CascadeResult<()> {
        // Loading is a no-op handshake from the factory's perspective: the
        // actual model weights are managed by the daemon behind `Invoker`.
        // A real deployment would ping a readiness endpoint here.
        Ok(())
    }

    pub async fn unload(&self, name: &str) -> CascadeResult<()> {
        let mut instances = self.instances.write();
        let Some(instance) = instances.get_mut(name) else {
            return Ok(());
        };
        if instance.state == InstanceState::Loaded {
            *self.total_usage_gb.write() -= instance.memory_usage_gb;
        }
        instance.state = InstanceState::Unloaded;
        instance.memory_usage_gb = 0.0;
        Ok(())
    }

    /// Guarantees at-most-one resident large model: old unloaded first, new
    /// loaded second. If the second fails, the slot is left empty.
    pub async fn switch(&self, old: &str, new: &str, new_recommended_memory_gb: f64) -> CascadeResult<()> {
        if let Some(mut instance) = self.instances.write().get_mut(old).cloned() {
            instance.state = InstanceState::Switching;
            self.instances.write().insert(old.to_string(), instance);
        }
        self.unload(old).await?;
        self.load(new, new_recommended_memory_gb).await
    }

    pub async fn invoke(
        &self,
        name: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> CascadeResult<String> {
        let result = self.invoker.invoke(name, prompt, temperature, max_tokens, timeout).await;
        if result.is_ok() {
            if let Some(instance) = self.instances.write().get_mut(name) {
                instance.last_used_at = Some(Utc::now());
            }
        }
        result
    }

    /// Unload instances idle longer than `max_idle_seconds`. Returns count unloaded.
    pub async fn cleanup_idle(&self, max_idle_seconds: i64) -> usize {
        let stale: Vec<String> = {
            let instances = self.instances.read();
            let now = Utc::now();
            instances
                .values()
                .filter(|i| i.state == InstanceState::Loaded)
                .filter(|i| {
                    i.last_used_at
                        .map(|t| (now - t).num_seconds() > max_idle_seconds)
                        .unwrap_or(false)
                })
                .map(|i| i.name.clone())
                .collect()
        };
        for name in &stale {
            let _ = self.unload(name).await;
        }
        stale.len()
    }
}
