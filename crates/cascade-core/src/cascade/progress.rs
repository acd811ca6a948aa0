//! Progress Monitoring (4.6.7): tracks subtask timing, classifies
//! obstacles, and decides whether execution should stop.

use chrono::{DateTime, Utc};

use super::types::{Obstacle, ObstacleKind, ObstacleSeverity, Subtask, SubtaskStatus};

const MAX_NON_PERFORMANCE_ERRORS: usize = 3;
const DEFAULT_PERFORMANCE_THRESHOLD: f64 = 2.0;
const TEST_MODE_PERFORMANCE_THRESHOLD: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct TimingRecord {
    pub subtask_id: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub expected_hours: f64,
}

impl TimingRecord {
    pub fn actual_hours(&self, now: DateTime<Utc>) -> f64 {
        let end = self.finished_at.unwrap_or(now);
        (end - self.started_at).num_seconds() as f64 / 3600.0
    }
}

fn classify(error_text: &str) -> ObstacleKind {
    let lowered = error_text.to_lowercase();
    if lowered.contains("timeout") || lowered.contains("timed out") {
        ObstacleKind::Timeout
    } else if lowered.contains("memory") || lowered.contains("resource") || lowered.contains("out of") {
        ObstacleKind::ResourceLimit
    } else if lowered.contains("dependency") || lowered.contains("upstream") {
        ObstacleKind::DependencyFailure
    } else {
        ObstacleKind::Error
    }
}

fn severity_for(kind: ObstacleKind) -> ObstacleSeverity {
    match kind {
        ObstacleKind::Timeout => ObstacleSeverity::Error,
        ObstacleKind::ResourceLimit => ObstacleSeverity::Critical,
        ObstacleKind::DependencyFailure => ObstacleSeverity::Error,
        ObstacleKind::QualityIssue => ObstacleSeverity::Warning,
        ObstacleKind::PerformanceIssue => ObstacleSeverity::Warning,
        ObstacleKind::Error => ObstacleSeverity::Error,
        ObstacleKind::Unknown => ObstacleSeverity::Info,
    }
}

fn suggested_actions(kind: ObstacleKind) -> Vec<String> {
    match kind {
        ObstacleKind::Timeout => vec!["simplify the prompt".to_string(), "split into smaller subtasks".to_string()],
        ObstacleKind::ResourceLimit => vec!["switch to a smaller model".to_string(), "unload idle models".to_string()],
        ObstacleKind::DependencyFailure => vec!["retry the upstream dependency".to_string(), "skip and flag for manual follow-up".to_string()],
        ObstacleKind::PerformanceIssue => vec!["switch to a faster model".to_string()],
        ObstacleKind::QualityIssue => vec!["add more context to the prompt".to_string()],
        ObstacleKind::Error => vec!["retry with a refined prompt".to_string()],
        ObstacleKind::Unknown => vec!["investigate manually".to_string()],
    }
}

/// Classifies a failure message into an `Obstacle` with severity and
/// suggested actions attached.
pub fn classify_obstacle(subtask_id: u32, error_text: &str, now: DateTime<Utc>) -> Obstacle {
    let kind = classify(error_text);
    Obstacle {
        kind,
        subtask_id,
        severity: severity_for(kind),
        suggested_actions: suggested_actions(kind),
        context: Some(error_text.to_string()),
        timestamp: now,
    }
}

/// A subtask is a performance obstacle if its actual duration exceeds the
/// expected duration by more than `threshold` (2.0 normally, 1.5 in test
/// mode).
pub fn performance_obstacle(record: &TimingRecord, now: DateTime<Utc>, test_mode: bool) -> Option<Obstacle> {
    let threshold = if test_mode { TEST_MODE_PERFORMANCE_THRESHOLD } else { DEFAULT_PERFORMANCE_THRESHOLD };
    let actual = record.actual_hours(now);
    if record.expected_hours > 0.0 && actual > record.expected_hours * threshold {
        Some(Obstacle {
            kind: ObstacleKind::PerformanceIssue,
            subtask_id: record.subtask_id,
            severity: ObstacleSeverity::Warning,
            suggested_actions: suggested_actions(ObstacleKind::PerformanceIssue),
            context: Some(format!("expected {:.1}h, actual {:.1}h", record.expected_hours, actual)),
            timestamp: now,
        })
    } else {
        None
    }
}

/// Execution must stop if any critical obstacle exists, or three or more
/// non-performance errors have accumulated.
pub fn should_stop_execution(obstacles: &[Obstacle]) -> bool {
    if obstacles.iter().any(|o| o.severity == ObstacleSeverity::Critical) {
        return true;
    }
    let non_performance_errors = obstacles
        .iter()
        .filter(|o| o.severity >= ObstacleSeverity::Error && o.kind != ObstacleKind::PerformanceIssue)
        .count();
    non_performance_errors >= MAX_NON_PERFORMANCE_ERRORS
}

#[derive(Debug, Clone)]
pub struct ProgressReport {
    pub progress_pct: f32,
    pub current_subtask: Option<u32>,
    pub obstacle_count: usize,
    pub elapsed_hours: f64,
    pub estimated_remaining_hours: f64,
}

/// Builds a status report: percent complete, the in-flight subtask, and a
/// remaining-time estimate adjusted by the empirical performance ratio
/// observed so far (actual / expected across finished subtasks).
pub fn generate_report(subtasks: &[Subtask], records: &[TimingRecord], obstacles: &[Obstacle], now: DateTime<Utc>) -> ProgressReport {
    let total = subtasks.len().max(1) as f32;
    let completed = subtasks.iter().filter(|s| s.status == SubtaskStatus::Completed).count() as f32;
    let progress_pct = (completed / total) * 100.0;

    let current_subtask = subtasks.iter().find(|s| s.status == SubtaskStatus::InProgress).map(|s| s.id);

    let elapsed_hours: f64 = records.iter().map(|r| r.actual_hours(now)).sum();

    let finished: Vec<&TimingRecord> = records.iter().filter(|r| r.finished_at.is_some()).collect();
    let performance_ratio = if finished.is_empty() {
        1.0
    } else {
        let ratios: Vec<f64> = finished
            .iter()
            .filter(|r| r.expected_hours > 0.0)
            .map(|r| r.actual_hours(now) / r.expected_hours)
            .collect();
        if ratios.is_empty() { 1.0 } else { ratios.iter().sum::<f64>() / ratios.len() as f64 }
    };

    let remaining_expected: f64 = subtasks
        .iter()
        .filter(|s| s.status != SubtaskStatus::Completed)
        .map(|s| s.estimated_hours)
        .sum();
    let estimated_remaining_hours = remaining_expected * performance_ratio;

    ProgressReport {
        progress_pct,
        current_subtask,
        obstacle_count: obstacles.len(),
        elapsed_hours,
        estimated_remaining_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn classifies_timeout_text() {
        let o = classify_obstacle(1, "operation timed out after 30s", Utc::now());
        assert_eq!(o.kind, ObstacleKind::Timeout);
    }

    #[test]
    fn classifies_memory_text_as_resource_limit_critical() {
        let o = classify_obstacle(1, "out of memory", Utc::now());
        assert_eq!(o.kind, ObstacleKind::ResourceLimit);
        assert_eq!(o.severity, ObstacleSeverity::Critical);
    }

    #[test]
    fn three_errors_trigger_stop() {
        let now = Utc::now();
        let obstacles = vec![
            classify_obstacle(1, "some error", now),
            classify_obstacle(2, "some error", now),
            classify_obstacle(3, "some error", now),
        ];
        assert!(should_stop_execution(&obstacles));
    }

    #[test]
    fn single_critical_triggers_stop() {
        let obstacles = vec![classify_obstacle(1, "out of memory", Utc::now())];
        assert!(should_stop_execution(&obstacles));
    }

    #[test]
    fn performance_obstacle_detected_past_threshold() {
        let started = Utc::now() - Duration::hours(5);
        let record = TimingRecord { subtask_id: 1, started_at: started, finished_at: None, expected_hours: 2.0 };
        let obstacle = performance_obstacle(&record, Utc::now(), false);
        assert!(obstacle.is_some());
    }

    #[test]
    fn no_performance_obstacle_within_threshold() {
        let started = Utc::now() - Duration::hours(3);
        let record = TimingRecord { subtask_id: 1, started_at: started, finished_at: None, expected_hours: 2.0 };
        let obstacle = performance_obstacle(&record, Utc::now(), false);
        assert!(obstacle.is_none());
    }
}
