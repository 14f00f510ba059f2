use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Logger shared between the capture thread and analysis workers.
pub type SharedLogger = Arc<Mutex<dyn AnalysisLogger>>;

/// Cross-cutting sink for analysis diagnostics.
///
/// Decouples the analyzer from specific output mechanisms so callers can
/// observe throttling, drops and failures without changing orchestration.
pub trait AnalysisLogger: Send {
    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. in-flight tasks, candidate count).
    fn metric(&mut self, name: &str, value: f64);

    /// Increment a named event counter.
    fn count(&mut self, name: &str);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullAnalysisLogger;

impl AnalysisLogger for NullAnalysisLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn count(&mut self, _name: &str) {}
    fn info(&mut self, _message: &str) {}
}

/// Accumulates per-stage timings, metrics and counters and renders a
/// summary report.
pub struct StatsAnalysisLogger {
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    counters: HashMap<String, u64>,
    start_time: Instant,
}

impl StatsAnalysisLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            metrics: HashMap::new(),
            counters: HashMap::new(),
            start_time: Instant::now(),
        }
    }

    /// Wraps a new logger for sharing across threads.
    pub fn shared() -> Arc<Mutex<StatsAnalysisLogger>> {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() && self.counters.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Analysis summary ({:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut names: Vec<_> = self.counters.keys().collect();
        names.sort();
        for name in names {
            lines.push(format!("  {name}: {}", self.counters[name]));
        }

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = if durations.is_empty() {
                0.0
            } else {
                total_ms / durations.len() as f64
            };
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({} runs)",
                durations.len()
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let values = &self.metrics[name];
            let avg = if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            };
            lines.push(format!("  {name}: avg {avg:.1}"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }
}

impl Default for StatsAnalysisLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisLogger for StatsAnalysisLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn count(&mut self, name: &str) {
        *self.counters.entry(name.to_string()).or_default() += 1;
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

/// Applies `f` to the shared logger, skipping it if the lock is poisoned.
pub fn with_logger(logger: &SharedLogger, f: impl FnOnce(&mut dyn AnalysisLogger)) {
    if let Ok(mut guard) = logger.lock() {
        f(&mut *guard);
    }
}
