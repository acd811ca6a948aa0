//! Profiler (C10, part 1): scoped spans over a bounded rolling window,
//! summarized per name.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

const MAX_SPANS: usize = 1000;

#[derive(Debug, Clone)]
pub struct Span {
    pub name: String,
    pub duration: Duration,
    pub cpu_time: Option<Duration>,
    pub memory_delta_mb: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub calls: u64,
    pub total: Duration,
    pub avg: Duration,
    pub min: Duration,
    pub max: Duration,
    pub avg_cpu: Option<Duration>,
    pub avg_mem_delta: Option<f64>,
}

pub struct Profiler {
    spans: RwLock<VecDeque<Span>>,
}

/// RAII guard returned by `Profiler::start`; records a span when dropped.
pub struct ActiveSpan<'a> {
    profiler: &'a Profiler,
    name: String,
    started_at: Instant,
    memory_delta_mb: Option<f64>,
}

impl<'a> ActiveSpan<'a> {
    pub fn with_memory_delta(mut self, mb: f64) -> Self {
        self.memory_delta_mb = Some(mb);
        self
    }
}

impl Drop for ActiveSpan<'_> {
    fn drop(&mut self) {
        let duration = self.started_at.elapsed();
        self.profiler.record(Span {
            name: std::mem::take(&mut self.name),
            duration,
            cpu_time: None,
            memory_delta_mb: self.memory_delta_mb,
        });
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Profiler {
    pub fn new() -> Self {
        Self { spans: RwLock::new(VecDeque::with_capacity(MAX_SPANS)) }
    }

    /// Begin a scoped span; the span is recorded when the returned guard
    /// is dropped.
    pub fn start(&self, name: impl Into<String>) -> ActiveSpan<'_> {
        ActiveSpan { profiler: self, name: name.into(), started_at: Instant::now(), memory_delta_mb: None }
    }

    fn record(&self, span: Span) {
        let mut spans = self.spans.write();
        if spans.len() >= MAX_SPANS {
            spans.pop_front();
        }
        spans.push_back(span);
    }

    pub fn summary(&self, name: &str) -> Summary {
        let spans = self.spans.read();
        let matching: Vec<&Span> = spans.iter().filter(|s| s.name == name).collect();
        if matching.is_empty() {
            return Summary::default();
        }
        let total: Duration = matching.iter().map(|s| s.duration).sum();
        let min = matching.iter().map(|s| s.duration).min().unwrap();
        let max = matching.iter().map(|s| s.duration).max().unwrap();
        let calls = matching.len() as u64;
        let avg = total / calls as u32;

        let cpu_samples: Vec<Duration> = matching.iter().filter_map(|s| s.cpu_time).collect();
        let avg_cpu = if cpu_samples.is_empty() {
            None
        } else {
            Some(cpu_samples.iter().sum::<Duration>() / cpu_samples.len() as u32)
        };

        let mem_samples: Vec<f64> = matching.iter().filter_map(|s| s.memory_delta_mb).collect();
        let avg_mem_delta = if mem_samples.is_empty() {
            None
        } else {
            Some(mem_samples.iter().sum::<f64>() / mem_samples.len() as f64)
        };

        Summary { calls, total, avg, min, max, avg_cpu, avg_mem_delta }
    }

    pub fn span_count(&self) -> usize {
        self.spans.read().len()
    }
}
