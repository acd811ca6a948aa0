//! Unified memory and thermal pressure monitoring.
//!
//! Samples a fixed set of OS metrics on demand and on a timer, keeps a
//! rolling history, derives a pressure level, and emits structured alerts
//! when metrics cross configured thresholds. No sampling call is allowed
//! to be fatal: a failed poll falls back to a synthetic best-guess snapshot.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sysinfo::System;

/// Best-effort thermal state. When OS thermal telemetry is unavailable this
/// is estimated from CPU utilization bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThermalLevel {
    Normal,
    Moderate,
    High,
    Critical,
}

impl ThermalLevel {
    /// Estimate a thermal level from CPU utilization when no OS thermal
    /// sensor is reachable.
    fn from_cpu_usage(pct: f32) -> Self {
        if pct > 90.0 {
            ThermalLevel::Critical
        } else if pct > 75.0 {
            ThermalLevel::High
        } else if pct > 50.0 {
            ThermalLevel::Moderate
        } else {
            ThermalLevel::Normal
        }
    }
}

/// Derived unified-memory pressure. Escalates monotonically: swap and
/// compressed-memory pressure can raise the level the percent-used figure
/// already implies, but never lower it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemoryPressure {
    Normal,
    Warning,
    Critical,
}

/// Short-window direction of memory usage, derived from recent history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

/// A single point-in-time reading of system resource state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub total_memory_gb: f64,
    pub used_memory_gb: f64,
    pub available_memory_gb: f64,
    pub swap_used_gb: f64,
    /// Estimated compressed-memory footprint. Platforms without a native
    /// concept of memory compression report 0.0 here.
    pub compressed_gb: f64,
    /// Estimated wired (unswappable) pages.
    pub wired_gb: f64,
    /// Resident memory of this process.
    pub app_resident_gb: f64,
    pub cpu_usage_pct: f32,
    pub thermal_level: ThermalLevel,
    /// True when this snapshot is a synthetic fallback produced after a
    /// failed OS poll, rather than an actual sample.
    pub synthetic: bool,
}

impl ResourceSnapshot {
    pub fn used_pct(&self) -> f64 {
        if self.total_memory_gb <= 0.0 {
            return 0.0;
        }
        (self.used_memory_gb / self.total_memory_gb) * 100.0
    }

    /// Derive unified-memory pressure from this snapshot alone (§4.1).
    pub fn memory_pressure(&self) -> MemoryPressure {
        let used_pct = self.used_pct();
        let mut level = if used_pct >= 90.0 {
            MemoryPressure::Critical
        } else if used_pct >= 75.0 {
            MemoryPressure::Warning
        } else {
            MemoryPressure::Normal
        };

        if self.swap_used_gb > 2.0 {
            level = level.max(MemoryPressure::Critical);
        } else if self.swap_used_gb > 0.5 {
            level = level.max(MemoryPressure::Warning);
        }

        if self.compressed_gb > 3.0 {
            level = level.max(MemoryPressure::Warning);
        }

        level
    }

    /// A reasonable synthetic snapshot used when sampling fails. Assumes a
    /// moderately healthy, idle machine so callers do not spuriously reject
    /// work because the monitor itself had a bad poll.
    fn fallback(total_memory_gb: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            total_memory_gb,
            used_memory_gb: total_memory_gb * 0.4,
            available_memory_gb: total_memory_gb * 0.6,
            swap_used_gb: 0.0,
            compressed_gb: 0.0,
            wired_gb: 0.0,
            app_resident_gb: 0.0,
            cpu_usage_pct: 20.0,
            thermal_level: ThermalLevel::Normal,
            synthetic: true,
        }
    }
}

/// Result of `canLoad` — whether a model estimated at `estimate_gb` can be
/// loaded right now, and if not, why.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadDecision {
    pub ok: bool,
    pub reason: Option<String>,
}

impl LoadDecision {
    fn allow() -> Self {
        Self { ok: true, reason: None }
    }

    fn reject(reason: impl Into<String>) -> Self {
        Self { ok: false, reason: Some(reason.into()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceAlert {
    pub severity: AlertSeverity,
    pub metric: String,
    pub current: f64,
    pub threshold: f64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// A data-driven rule evaluated against each fresh snapshot.
#[derive(Clone)]
struct AlertRule {
    metric: &'static str,
    severity: AlertSeverity,
    threshold: f64,
    extract: fn(&ResourceSnapshot) -> f64,
    /// true => fire when current >= threshold; false => fire when current <= threshold
    above: bool,
    message: &'static str,
}

fn default_rules() -> Vec<AlertRule> {
    vec![
        AlertRule {
            metric: "used_pct",
            severity: AlertSeverity::Critical,
            threshold: 90.0,
            extract: |s| s.used_pct(),
            above: true,
            message: "memory usage critical",
        },
        AlertRule {
            metric: "used_pct",
            severity: AlertSeverity::Warning,
            threshold: 75.0,
            extract: |s| s.used_pct(),
            above: true,
            message: "memory usage elevated",
        },
        AlertRule {
            metric: "swap_used_gb",
            severity: AlertSeverity::Critical,
            threshold: 2.0,
            extract: |s| s.swap_used_gb,
            above: true,
            message: "swap usage critical",
        },
        AlertRule {
            metric: "swap_used_gb",
            severity: AlertSeverity::Warning,
            threshold: 0.5,
            extract: |s| s.swap_used_gb,
            above: true,
            message: "swap usage elevated",
        },
        AlertRule {
            metric: "compressed_gb",
            severity: AlertSeverity::Warning,
            threshold: 3.0,
            extract: |s| s.compressed_gb,
            above: true,
            message: "compressed memory elevated",
        },
    ]
}

const MAX_HISTORY: usize = 100;
const MAX_ALERTS: usize = 50;
/// Additional headroom required beyond the raw arithmetic `used + estimate <= total`.
const SAFETY_BUFFER_GB: f64 = 1.0;
const THERMAL_THRESHOLD_PCT: f64 = 95.0;

pub type AlertHandler = Arc<dyn Fn(&ResourceAlert) + Send + Sync>;

/// Polls system memory/thermal state and maintains a rolling history and
/// alert log. All mutable state is guarded by a lock; readers receive
/// copies (§5 "copy-on-read for snapshots").
pub struct ResourceMonitor {
    history: RwLock<VecDeque<ResourceSnapshot>>,
    alerts: RwLock<VecDeque<ResourceAlert>>,
    rules: Vec<AlertRule>,
    handlers: RwLock<Vec<AlertHandler>>,
    sys: RwLock<System>,
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceMonitor {
    pub fn new() -> Self {
        Self {
            history: RwLock::new(VecDeque::with_capacity(MAX_HISTORY)),
            alerts: RwLock::new(VecDeque::with_capacity(MAX_ALERTS)),
            rules: default_rules(),
            handlers: RwLock::new(Vec::new()),
            sys: RwLock::new(System::new_all()),
        }
    }

    pub fn add_alert_handler(&self, handler: AlertHandler) {
        self.handlers.write().push(handler);
    }

    /// Sample current system state. Never fails: a poll error yields a
    /// synthetic snapshot built from the last known total memory (or a
    /// generic default if no history exists yet).
    pub fn sample(&self) -> ResourceSnapshot {
        let snapshot = self.try_sample().unwrap_or_else(|| {
            let fallback_total = self
                .history
                .read()
                .back()
                .map(|s| s.total_memory_gb)
                .unwrap_or(16.0);
            tracing::warn!("resource sampling failed, using synthetic snapshot");
            ResourceSnapshot::fallback(fallback_total)
        });

        self.record(snapshot.clone());
        snapshot
    }

    fn try_sample(&self) -> Option<ResourceSnapshot> {
        let mut sys = self.sys.write();
        sys.refresh_memory();
        sys.refresh_cpu_usage();

        const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
        let total_memory_gb = sys.total_memory() as f64 / BYTES_PER_GB;
        if total_memory_gb <= 0.0 {
            return None;
        }
        let used_memory_gb = sys.used_memory() as f64 / BYTES_PER_GB;
        let available_memory_gb = (sys.total_memory().saturating_sub(sys.used_memory())) as f64
            / BYTES_PER_GB;
        let swap_used_gb = sys.used_swap() as f64 / BYTES_PER_GB;
        let cpu_usage_pct = sys.global_cpu_usage();

        let app_resident_gb = sysinfo::get_current_pid()
            .ok()
            .and_then(|pid| sys.process(pid).map(|p| p.memory()))
            .unwrap_or(0) as f64
            / BYTES_PER_GB;

        Some(ResourceSnapshot {
            timestamp: Utc::now(),
            total_memory_gb,
            used_memory_gb,
            available_memory_gb,
            swap_used_gb,
            // This platform-agnostic sampler has no notion of compressed or
            // wired pages; OS-specific implementations can populate these.
            compressed_gb: 0.0,
            wired_gb: 0.0,
            app_resident_gb,
            cpu_usage_pct,
            thermal_level: ThermalLevel::from_cpu_usage(cpu_usage_pct),
            synthetic: false,
        })
    }

    fn record(&self, snapshot: ResourceSnapshot) {
        self.evaluate_alerts(&snapshot);
        let mut history = self.history.write();
        if history.len() >= MAX_HISTORY {
            history.pop_front();
        }
        history.push_back(snapshot);
    }

    fn evaluate_alerts(&self, snapshot: &ResourceSnapshot) {
        for rule in &self.rules {
            let current = (rule.extract)(snapshot);
            let fired = if rule.above {
                current >= rule.threshold
            } else {
                current <= rule.threshold
            };
            if !fired {
                continue;
            }
            let alert = ResourceAlert {
                severity: rule.severity,
                metric: rule.metric.to_string(),
                current,
                threshold: rule.threshold,
                message: rule.message.to_string(),
                timestamp: snapshot.timestamp,
            };
            self.push_alert(alert);
        }
    }

    fn push_alert(&self, alert: ResourceAlert) {
        for handler in self.handlers.read().iter() {
            handler(&alert);
        }
        let mut alerts = self.alerts.write();
        if alerts.len() >= MAX_ALERTS {
            alerts.pop_front();
        }
        alerts.push_back(alert);
    }

    /// Copy of the rolling history, oldest first.
    pub fn history(&self) -> Vec<ResourceSnapshot> {
        self.history.read().iter().cloned().collect()
    }

    /// Copy of the most recent alerts, oldest first.
    pub fn alerts(&self) -> Vec<ResourceAlert> {
        self.alerts.read().iter().cloned().collect()
    }

    pub fn latest(&self) -> ResourceSnapshot {
        self.history
            .read()
            .back()
            .cloned()
            .unwrap_or_else(|| self.sample())
    }

    /// Memory-usage trend over the last 5 snapshots in history, purely
    /// derived from already-recorded samples — no new sampling.
    pub fn trend(&self) -> Trend {
        let history = self.history.read();
        let recent: Vec<f64> = history.iter().rev().take(5).map(|s| s.used_pct()).collect();
        if recent.len() < 2 {
            return Trend::Stable;
        }
        let newest = recent.first().copied().unwrap_or(0.0);
        let oldest = recent.last().copied().unwrap_or(0.0);
        let delta = newest - oldest;
        if delta > 2.0 {
            Trend::Increasing
        } else if delta < -2.0 {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }

    /// §4.1 `canLoad(estimateGB)`.
    pub fn can_load(&self, estimate_gb: f64) -> LoadDecision {
        let snapshot = self.latest();
        if snapshot.used_memory_gb + estimate_gb + SAFETY_BUFFER_GB > snapshot.total_memory_gb {
            return LoadDecision::reject(format!(
                "loading {estimate_gb:.1} GB would exceed total memory ({:.1}/{:.1} GB used)",
                snapshot.used_memory_gb, snapshot.total_memory_gb
            ));
        }
        if snapshot.swap_used_gb > 1.0 {
            return LoadDecision::reject(format!(
                "swap usage too high ({:.1} GB)",
                snapshot.swap_used_gb
            ));
        }
        if snapshot.used_pct() > THERMAL_THRESHOLD_PCT {
            return LoadDecision::reject(format!(
                "memory usage above thermal threshold ({:.1}%)",
                snapshot.used_pct()
            ));
        }
        LoadDecision::allow()
    }

    /// Spawn a background timer that samples on the given interval until
    /// the returned handle is dropped or aborted.
    pub fn spawn_polling(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                monitor.sample();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(used_pct: f64, swap: f64, compressed: f64) -> ResourceSnapshot {
        ResourceSnapshot {
            timestamp: Utc::now(),
            total_memory_gb: 100.0,
            used_memory_gb: used_pct,
            available_memory_gb: 100.0 - used_pct,
            swap_used_gb: swap,
            compressed_gb: compressed,
            wired_gb: 0.0,
            app_resident_gb: 0.0,
            cpu_usage_pct: 10.0,
            thermal_level: ThermalLevel::Normal,
            synthetic: false,
        }
    }

    #[test]
    fn pressure_normal_below_thresholds() {
        assert_eq!(snap(50.0, 0.0, 0.0).memory_pressure(), MemoryPressure::Normal);
    }

    #[test]
    fn pressure_warning_on_used_pct() {
        assert_eq!(snap(80.0, 0.0, 0.0).memory_pressure(), MemoryPressure::Warning);
    }

    #[test]
    fn pressure_critical_on_used_pct() {
        assert_eq!(snap(95.0, 0.0, 0.0).memory_pressure(), MemoryPressure::Critical);
    }

    #[test]
    fn swap_escalates_but_never_deescalates() {
        // Low used_pct but high swap still escalates to critical.
        assert_eq!(snap(10.0, 2.5, 0.0).memory_pressure(), MemoryPressure::Critical);
        // High used_pct (already critical) stays critical regardless of swap.
        assert_eq!(snap(95.0, 0.0, 0.0).memory_pressure(), MemoryPressure::Critical);
    }

    #[test]
    fn compressed_memory_raises_to_warning_only() {
        assert_eq!(snap(10.0, 0.0, 4.0).memory_pressure(), MemoryPressure::Warning);
    }

    #[test]
    fn thermal_bands_from_cpu() {
        assert_eq!(ThermalLevel::from_cpu_usage(10.0), ThermalLevel::Normal);
        assert_eq!(ThermalLevel::from_cpu_usage(60.0), ThermalLevel::Moderate);
        assert_eq!(ThermalLevel::from_cpu_usage(80.0), ThermalLevel::High);
        assert_eq!(ThermalLevel::from_cpu_usage(95.0), ThermalLevel::Critical);
    }

    #[test]
    fn can_load_rejects_when_over_total() {
        let monitor = ResourceMonitor::new();
        monitor.record(snap(90.0, 0.0, 0.0));
        let decision = monitor.can_load(20.0);
        assert!(!decision.ok);
    }

    #[test]
    fn can_load_allows_with_headroom() {
        let monitor = ResourceMonitor::new();
        monitor.record(snap(20.0, 0.0, 0.0));
        let decision = monitor.can_load(10.0);
        assert!(decision.ok);
    }

    #[test]
    fn can_load_rejects_on_high_swap() {
        let monitor = ResourceMonitor::new();
        monitor.record(snap(10.0, 1.5, 0.0));
        let decision = monitor.can_load(1.0);
        assert!(!decision.ok);
    }

    #[test]
    fn trend_detects_increasing_usage() {
        let monitor = ResourceMonitor::new();
        for pct in [10.0, 15.0, 20.0, 25.0, 30.0] {
            monitor.record(snap(pct, 0.0, 0.0));
        }
        assert_eq!(monitor.trend(), Trend::Increasing);
    }

    #[test]
    fn trend_stable_with_single_sample() {
        let monitor = ResourceMonitor::new();
        monitor.record(snap(50.0, 0.0, 0.0));
        assert_eq!(monitor.trend(), Trend::Stable);
    }

    #[test]
    fn history_is_bounded() {
        let monitor = ResourceMonitor::new();
        for _ in 0..(MAX_HISTORY + 10) {
            monitor.record(snap(10.0, 0.0, 0.0));
        }
        assert_eq!(monitor.history().len(), MAX_HISTORY);
    }

    #[test]
    fn alerts_fire_on_critical_usage() {
        let monitor = ResourceMonitor::new();
        monitor.record(snap(95.0, 0.0, 0.0));
        let alerts = monitor.alerts();
        assert!(alerts.iter().any(|a| a.severity == AlertSeverity::Critical));
    }

    #[test]
    fn alerts_are_bounded() {
        let monitor = ResourceMonitor::new();
        for _ in 0..(MAX_ALERTS + 20) {
            monitor.record(snap(95.0, 0.0, 0.0));
        }
        assert_eq!(monitor.alerts().len(), MAX_ALERTS);
    }

    #[test]
    fn handlers_are_invoked_on_fire() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let monitor = ResourceMonitor::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::clone(&count);
        monitor.add_alert_handler(Arc::new(move |_alert| {
            count2.fetch_add(1, Ordering::SeqCst);
        }));
        monitor.record(snap(95.0, 0.0, 0.0));
        assert!(count.load(Ordering::SeqCst) > 0);
    }
}
