//! Alerts (C10, part 2): rule-driven comparator over current metric
//! values, distinct from `cascade_resource::monitor`'s resource-only
//! alerts — this one also watches orchestrator counters (response time,
//! cache hit rate).

use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    AtLeast,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone)]
pub struct AlertRule {
    pub metric: String,
    pub comparator: Comparator,
    pub warning_threshold: f64,
    pub critical_threshold: f64,
}

fn fires(rule: &AlertRule, value: f64, threshold: f64) -> bool {
    match rule.comparator {
        Comparator::AtLeast => value >= threshold,
        Comparator::Below => value < threshold,
    }
}

pub fn default_rules() -> Vec<AlertRule> {
    vec![
        AlertRule { metric: "cpu_pct".into(), comparator: Comparator::AtLeast, warning_threshold: 85.0, critical_threshold: 95.0 },
        AlertRule { metric: "memory_pct".into(), comparator: Comparator::AtLeast, warning_threshold: 80.0, critical_threshold: 90.0 },
        AlertRule { metric: "available_gb".into(), comparator: Comparator::Below, warning_threshold: 2.0, critical_threshold: 1.0 },
        AlertRule { metric: "response_time_secs".into(), comparator: Comparator::AtLeast, warning_threshold: 5.0, critical_threshold: 10.0 },
        AlertRule { metric: "cache_hit_rate".into(), comparator: Comparator::Below, warning_threshold: 0.5, critical_threshold: 0.0 },
    ]
}

#[derive(Debug, Clone)]
pub struct ActiveAlert {
    pub metric: String,
    pub severity: Severity,
    pub value: f64,
}

/// Tracks at most one active alert per `(rule metric)`; a later check
/// with a value that no longer fires explicitly resolves it.
pub struct AlertTracker {
    rules: Vec<AlertRule>,
    active: RwLock<HashMap<String, ActiveAlert>>,
}

impl AlertTracker {
    pub fn new(rules: Vec<AlertRule>) -> Self {
        Self { rules, active: RwLock::new(HashMap::new()) }
    }

    pub fn with_defaults() -> Self {
        Self::new(default_rules())
    }

    /// Evaluate `metrics` against every rule; returns the alerts newly
    /// triggered or resolved (resolved alerts are not included, but their
    /// entries are cleared from the active set).
    pub fn check(&self, metrics: &HashMap<String, f64>) -> Vec<ActiveAlert> {
        let mut newly_active = Vec::new();
        let mut active = self.active.write();
        for rule in &self.rules {
            let Some(&value) = metrics.get(&rule.metric) else { continue };
            let critical = fires(rule, value, rule.critical_threshold);
            let warning = fires(rule, value, rule.warning_threshold);

            if critical || warning {
                let severity = if critical { Severity::Critical } else { Severity::Warning };
                let alert = ActiveAlert { metric: rule.metric.clone(), severity, value };
                active.insert(rule.metric.clone(), alert.clone());
                newly_active.push(alert);
            } else {
                active.remove(&rule.metric);
            }
        }
        newly_active
    }

    pub fn active_alerts(&self) -> Vec<ActiveAlert> {
        self.active.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_above_critical_threshold_fires_critical() {
        let tracker = AlertTracker::with_defaults();
        let mut metrics = HashMap::new();
        metrics.insert("cpu_pct".to_string(), 97.0);
        let fired = tracker.check(&metrics);
        assert!(fired.iter().any(|a| a.metric == "cpu_pct" && a.severity == Severity::Critical));
    }

    #[test]
    fn low_cache_hit_rate_fires_warning() {
        let tracker = AlertTracker::with_defaults();
        let mut metrics = HashMap::new();
        metrics.insert("cache_hit_rate".to_string(), 0.2);
        let fired = tracker.check(&metrics);
        assert!(fired.iter().any(|a| a.metric == "cache_hit_rate"));
    }

    #[test]
    fn recovery_clears_active_alert() {
        let tracker = AlertTracker::with_defaults();
        let mut metrics = HashMap::new();
        metrics.insert("cpu_pct".to_string(), 97.0);
        tracker.check(&metrics);
        assert!(!tracker.active_alerts().is_empty());

        metrics.insert("cpu_pct".to_string(), 10.0);
        tracker.check(&metrics);
        assert!(tracker.active_alerts().is_empty());
    }

    #[test]
    fn at_most_one_active_alert_per_metric() {
        let tracker = AlertTracker::with_defaults();
        let mut metrics = HashMap::new();
        metrics.insert("cpu_pct".to_string(), 97.0);
        tracker.check(&metrics);
        tracker.check(&metrics);
        let matching: Vec<_> = tracker.active_alerts().into_iter().filter(|a| a.metric == "cpu_pct").collect();
        assert_eq!(matching.len(), 1);
    }
}
