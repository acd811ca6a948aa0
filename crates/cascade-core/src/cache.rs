//! ResponseCache (C9): sha256-fingerprinted, TTL-bounded LRU cache over
//! inference responses, with optional single-file disk mirroring.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const DEFAULT_CAPACITY: usize = 1000;
const DEFAULT_TTL_SECS: u64 = 3600;
const EVICTION_FRACTION: f64 = 0.10;

/// `sha256(query || "|" || modelName || "|" || context)`, hex-encoded.
pub fn fingerprint(query: &str, model_name: &str, context: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hasher.update(b"|");
    hasher.update(model_name.as_bytes());
    hasher.update(b"|");
    hasher.update(context.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub query: String,
    pub context: String,
    pub response: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    pub ttl_secs: u64,
    pub hit_count: u64,
    pub last_accessed: DateTime<Utc>,
    pub metadata: HashMap<String, String>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        (now - self.timestamp).num_seconds() >= self.ttl_secs as i64
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedCache {
    entries: Vec<CacheEntry>,
    stats: CacheStats,
}

struct Inner {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
}

/// Thread-safe under one lock; contention is expected to be low (the
/// caller holds the orchestrator's single-caller lock for the duration of
/// a request anyway).
pub struct ResponseCache {
    inner: RwLock<Inner>,
    capacity: usize,
    default_ttl: Duration,
    persistence_path: Option<PathBuf>,
}

impl ResponseCache {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner { entries: HashMap::new(), stats: CacheStats::default() }),
            capacity,
            default_ttl,
            persistence_path: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CAPACITY, Duration::from_secs(DEFAULT_TTL_SECS))
    }

    /// Enables disk mirroring at `path`, loading and dropping any already-
    /// expired entries immediately.
    pub fn with_persistence(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Ok(bytes) = std::fs::read(&path) {
            if let Ok(persisted) = serde_json::from_slice::<PersistedCache>(&bytes) {
                let now = Utc::now();
                let mut inner = self.inner.write();
                for entry in persisted.entries {
                    if !entry.is_expired(now) {
                        let key = fingerprint(&entry.query, &entry.model, &entry.context);
                        inner.entries.insert(key, entry);
                    }
                }
                inner.stats = persisted.stats;
            }
        }
        self.persistence_path = Some(path);
        self
    }

    fn persist_best_effort(&self) {
        let Some(path) = &self.persistence_path else { return };
        let inner = self.inner.read();
        let persisted = PersistedCache {
            entries: inner.entries.values().cloned().collect(),
            stats: inner.stats.clone(),
        };
        if let Ok(bytes) = serde_json::to_vec(&persisted) {
            if let Err(e) = std::fs::write(path, bytes) {
                tracing::warn!(error = %e, "cache disk mirror write failed");
            }
        }
    }

    /// Returns the cached response if present and unexpired, bumping
    /// `hit_count`/`last_accessed`. Never touches disk.
    pub fn get(&self, query: &str, model_name: &str, context: &str) -> Option<String> {
        let key = fingerprint(query, model_name, context);
        let now = Utc::now();
        let mut inner = self.inner.write();
        if let Some(entry) = inner.entries.get_mut(&key) {
            if !entry.is_expired(now) {
                entry.hit_count += 1;
                entry.last_accessed = now;
                inner.stats.hits += 1;
                tracing::debug!(%key, "cache hit");
                return Some(entry.response.clone());
            }
            inner.entries.remove(&key);
        }
        inner.stats.misses += 1;
        tracing::debug!(%key, "cache miss");
        None
    }

    /// Inserts or overwrites an entry, evicting the 10% LRU tail if the
    /// capacity is exceeded.
    pub fn set(&self, query: &str, model_name: &str, context: &str, response: impl Into<String>) {
        let key = fingerprint(query, model_name, context);
        let now = Utc::now();
        {
            let mut inner = self.inner.write();
            inner.entries.insert(
                key,
                CacheEntry {
                    query: query.to_string(),
                    context: context.to_string(),
                    response: response.into(),
                    model: model_name.to_string(),
                    timestamp: now,
                    ttl_secs: self.default_ttl.as_secs(),
                    hit_count: 0,
                    last_accessed: now,
                    metadata: HashMap::new(),
                },
            );
            if inner.entries.len() > self.capacity {
                let evict_count = ((inner.entries.len() as f64) * EVICTION_FRACTION).ceil() as usize;
                let mut by_access: Vec<(String, DateTime<Utc>)> =
                    inner.entries.iter().map(|(k, v)| (k.clone(), v.last_accessed)).collect();
                by_access.sort_by_key(|(_, t)| *t);
                for (k, _) in by_access.into_iter().take(evict_count) {
                    inner.entries.remove(&k);
                    inner.stats.evictions += 1;
                }
            }
        }
        self.persist_best_effort();
    }

    pub fn invalidate(&self, query: &str, model_name: &str, context: &str) {
        let key = fingerprint(query, model_name, context);
        self.inner.write().entries.remove(&key);
        self.persist_best_effort();
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.read().stats.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = fingerprint("q", "m", "c");
        let b = fingerprint("q", "m", "c");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_on_any_input_change() {
        assert_ne!(fingerprint("q", "m", "c"), fingerprint("q2", "m", "c"));
        assert_ne!(fingerprint("q", "m", "c"), fingerprint("q", "m2", "c"));
    }

    #[test]
    fn round_trip_set_get_invalidate() {
        let cache = ResponseCache::with_defaults();
        cache.set("q", "m", "c", "r");
        assert_eq!(cache.get("q", "m", "c"), Some("r".to_string()));
        cache.invalidate("q", "m", "c");
        assert_eq!(cache.get("q", "m", "c"), None);
    }

    #[test]
    fn miss_then_hit_updates_stats() {
        let cache = ResponseCache::with_defaults();
        assert!(cache.get("q", "m", "c").is_none());
        cache.set("q", "m", "c", "r");
        assert!(cache.get("q", "m", "c").is_some());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn eviction_triggers_past_capacity() {
        let cache = ResponseCache::new(10, Duration::from_secs(3600));
        for i in 0..15 {
            cache.set(&format!("q{i}"), "m", "c", "r");
        }
        assert!(cache.len() <= 10);
        assert!(cache.stats().evictions > 0);
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let cache = ResponseCache::new(10, Duration::from_secs(0));
        cache.set("q", "m", "c", "r");
        assert!(cache.get("q", "m", "c").is_none());
    }
}
