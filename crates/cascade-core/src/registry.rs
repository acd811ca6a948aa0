//! ModelRegistry (C2): merges configured profiles, configured remote
//! catalogs, and the local daemon's advertised model list; validates
//! reachability; exposes lookup/filter operations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::capability::{ModelCapabilities, ModelSource, SystemConstraints};
use crate::error::{CascadeError, CascadeResult};

const REDISCOVERY_MIN_INTERVAL: Duration = Duration::from_secs(60);
const DESCRIBE_TIMEOUT: Duration = Duration::from_secs(5);

/// External opaque credential store; the core never writes to it.
pub trait KeyStore: Send + Sync {
    fn get(&self, provider: &str) -> Option<String>;
    fn has(&self, provider: &str) -> bool {
        self.get(provider).is_some()
    }
}

/// Local inference daemon's model listing contract (§6).
#[async_trait::async_trait]
pub trait LocalDaemonDirectory: Send + Sync {
    async fn list_models(&self) -> CascadeResult<Vec<String>>;
    async fn describe(&self, name: &str) -> CascadeResult<bool>;
}

#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub source: ModelSource,
    pub capabilities: Option<ModelCapabilities>,
    pub validated: bool,
    pub last_validation: Option<Instant>,
}

pub struct ModelRegistry {
    models: DashMap<String, ModelInfo>,
    role_preferences: RwLock<HashMap<String, Vec<String>>>,
    daemon: Option<Arc<dyn LocalDaemonDirectory>>,
    key_store: Option<Arc<dyn KeyStore>>,
    last_refresh: RwLock<Option<Instant>>,
    max_memory_gb: f64,
    max_thermal_sensitivity: f32,
    cloud_fallbacks_enabled: bool,
}

impl ModelRegistry {
    pub fn new(max_memory_gb: f64, max_thermal_sensitivity: f32, cloud_fallbacks_enabled: bool) -> Self {
        Self {
            models: DashMap::new(),
            role_preferences: RwLock::new(HashMap::new()),
            daemon: None,
            key_store: None,
            last_refresh: RwLock::new(None),
            max_memory_gb,
            max_thermal_sensitivity,
            cloud_fallbacks_enabled,
        }
    }

    pub fn with_daemon(mut self, daemon: Arc<dyn LocalDaemonDirectory>) -> Self {
        self.daemon = Some(daemon);
        self
    }

    pub fn with_key_store(mut self, key_store: Arc<dyn KeyStore>) -> Self {
        self.key_store = Some(key_store);
        self
    }

    /// Register a static or remote-provider capability profile (sources 1 & 2).
    pub fn register_profile(&self, caps: ModelCapabilities) {
        let validated = !caps.requires_credential
            || self
                .key_store
                .as_ref()
                .map(|ks| ks.has(&profile_provider_key(&caps)))
                .unwrap_or(false);
        self.models.insert(
            caps.name.clone(),
            ModelInfo {
                source: caps.source.clone(),
                capabilities: Some(caps),
                validated,
                last_validation: Some(Instant::now()),
            },
        );
    }

    pub fn set_role_preferences(&self, role: impl Into<String>, models: Vec<String>) {
        self.role_preferences.write().insert(role.into(), models);
    }

    /// Merge the local daemon's advertised list (source 3). Each single-model
    /// validation failure is isolated — the model is marked unvalidated but
    /// still listed.
    pub async fn refresh(&self, force: bool) -> CascadeResult<()> {
        {
            let last = self.last_refresh.read();
            if !force {
                if let Some(last) = *last {
                    if last.elapsed() < REDISCOVERY_MIN_INTERVAL {
                        return Ok(());
                    }
                }
            }
        }

        if let Some(daemon) = &self.daemon {
            let names = daemon.list_models().await.unwrap_or_default();
            for name in names {
                let validated = tokio::time::timeout(DESCRIBE_TIMEOUT, daemon.describe(&name))
                    .await
                    .map(|r| r.unwrap_or(false))
                    .unwrap_or_else(|_| {
                        tracing::warn!(model = %name, "describe timed out");
                        false
                    });
                self.models
                    .entry(name.clone())
                    .and_modify(|info| {
                        info.validated = validated;
                        info.last_validation = Some(Instant::now());
                    })
                    .or_insert(ModelInfo {
                        source: ModelSource::Local,
                        capabilities: None,
                        validated,
                        last_validation: Some(Instant::now()),
                    });
            }
        }

        *self.last_refresh.write() = Some(Instant::now());
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<ModelInfo> {
        self.models.get(name).map(|r| r.clone())
    }

    pub fn filter_by_source(&self, source: &ModelSource) -> Vec<ModelInfo> {
        self.models
            .iter()
            .filter(|entry| &entry.value().source == source)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Preferred models for a role, plus cloud fallback appended when enabled.
    pub fn filter_by_role(&self, role: &str) -> Vec<ModelInfo> {
        let preferences = self.role_preferences.read();
        let preferred = preferences.get(role).cloned().unwrap_or_default();
        let mut result: Vec<ModelInfo> = preferred
            .iter()
            .filter_map(|name| self.lookup(name))
            .collect();
        if self.cloud_fallbacks_enabled {
            for entry in self.models.iter() {
                if !matches!(entry.value().source, ModelSource::Local)
                    && !preferred.contains(entry.key())
                {
                    result.push(entry.value().clone());
                }
            }
        }
        result
    }

    pub fn system_settings(&self) -> SystemConstraints {
        SystemConstraints {
            max_memory_gb: self.max_memory_gb,
            available_memory_gb: self.max_memory_gb,
            max_thermal_sensitivity: self.max_thermal_sensitivity,
            thermal_state: crate::capability::ThermalState::Normal,
            local_only: false,
            cloud_fallbacks_enabled: self.cloud_fallbacks_enabled,
        }
    }

    pub fn validate_config(&self, system_total_memory_gb: f64) -> CascadeResult<()> {
        if self.max_memory_gb > system_total_memory_gb {
            return Err(CascadeError::Config(format!(
                "declared max memory {:.1}GB exceeds system memory {:.1}GB",
                self.max_memory_gb, system_total_memory_gb
            )));
        }
        Ok(())
    }
}

fn profile_provider_key(caps: &ModelCapabilities) -> String {
    match &caps.source {
        ModelSource::ProviderA => "providerA".to_string(),
        ModelSource::ProviderB => "providerB".to_string(),
        ModelSource::Other(name) => name.clone(),
        ModelSource::Local => "local".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Quantization;

    struct AlwaysGranted;
    impl KeyStore for AlwaysGranted {
        fn get(&self, _provider: &str) -> Option<String> {
            Some("secret".to_string())
        }
    }

    fn caps(name: &str, source: ModelSource) -> ModelCapabilities {
        ModelCapabilities::new(name, source, 4096, Quantization::Q4_0, 1_000_000, 1.0, 2.0, 2.0)
    }

    #[test]
    fn register_and_lookup() {
        let registry = ModelRegistry::new(32.0, 0.8, true);
        registry.register_profile(caps("m1", ModelSource::Local));
        assert!(registry.lookup("m1").is_some());
        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    fn remote_model_validated_by_credential_presence() {
        let registry = ModelRegistry::new(32.0, 0.8, true)
            .with_key_store(Arc::new(AlwaysGranted));
        let mut remote = caps("remote-1", ModelSource::ProviderA);
        remote.requires_credential = true;
        registry.register_profile(remote);
        assert!(registry.lookup("remote-1").unwrap().validated);
    }

    #[test]
    fn role_preferences_filter() {
        let registry = ModelRegistry::new(32.0, 0.8, false);
        registry.register_profile(caps("planner-model", ModelSource::Local));
        registry.set_role_preferences("planner", vec!["planner-model".to_string()]);
        let found = registry.filter_by_role("planner");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn single_model_failure_does_not_remove_it() {
        let registry = ModelRegistry::new(32.0, 0.8, false);
        let mut m = caps("broken", ModelSource::Local);
        m.requires_credential = true;
        registry.register_profile(m);
        let info = registry.lookup("broken").unwrap();
        assert!(!info.validated);
    }

    #[test]
    fn config_validation_rejects_oversized_declared_memory() {
        let registry = ModelRegistry::new(64.0, 0.8, false);
        assert!(registry.validate_config(32.0).is_err());
        assert!(registry.validate_config(128.0).is_ok());
    }
}
