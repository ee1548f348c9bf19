use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting logger for capture session events.
///
/// Keeps the consumer loop free of output concerns; the binary reports
/// through `log`, tests discard everything.
pub trait SessionLogger {
    /// Count one frame handed to the display.
    fn frame_rendered(&mut self);

    /// Record how long a named stage took for one tick.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. region count).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullSessionLogger;

impl SessionLogger for NullSessionLogger {
    fn frame_rendered(&mut self) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running total of the values recorded under one key.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStat {
    pub count: usize,
    pub total: f64,
}

impl RunningStat {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
    }

    pub fn mean(&self) -> f64 {
        self.total / self.count.max(1) as f64
    }
}

/// Logger that aggregates per-stage timings and metrics and reports a
/// summary through `log::info!` when the session ends.
///
/// Memory stays constant however long the camera runs.
pub struct LogSessionLogger {
    timings: HashMap<String, RunningStat>,
    metrics: HashMap<String, RunningStat>,
    start_time: Instant,
    frames: usize,
}

impl LogSessionLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
        }
    }

    /// Returns the formatted summary string, or `None` if nothing was rendered.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 && self.timings.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames;
        let mut lines = vec![format!(
            "Session summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stat = &self.timings[stage];
            lines.push(format!(
                "  {stage:8}: avg {:6.1}ms  total {:7.0}ms",
                stat.mean(),
                stat.total
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            lines.push(format!("  {name}: avg {:.1}", self.metrics[name].mean()));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<RunningStat> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<RunningStat> {
        self.metrics.get(name).copied()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl Default for LogSessionLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLogger for LogSessionLogger {
    fn frame_rendered(&mut self) {
        self.frames += 1;
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullSessionLogger;
        logger.frame_rendered();
        logger.timing("detect", 5.0);
        logger.metric("regions", 1.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = LogSessionLogger::new();
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("render", 5.0);

        let detect = logger.timings_for("detect").unwrap();
        assert_eq!(detect.count, 2);
        assert_relative_eq!(detect.total, 50.0);
        assert_relative_eq!(detect.mean(), 25.0);
        assert_eq!(logger.timings_for("render").unwrap().count, 1);
        assert!(logger.timings_for("blur").is_none());
    }

    #[test]
    fn test_metric_average_in_summary() {
        let mut logger = LogSessionLogger::new();
        logger.frame_rendered();
        logger.metric("regions", 1.0);
        logger.metric("regions", 2.0);

        assert_relative_eq!(logger.metrics_for("regions").unwrap().mean(), 1.5);
        assert!(logger.summary_string().unwrap().contains("regions: avg 1.5"));
    }

    #[test]
    fn test_summary_reports_frames_stages_and_fps() {
        let mut logger = LogSessionLogger::new();
        for _ in 0..10 {
            logger.frame_rendered();
            logger.timing("detect", 10.0);
            logger.timing("render", 2.0);
        }

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Session summary (10 frames"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("render"));
        assert!(summary.contains("fps"));
        assert_eq!(logger.frames(), 10);
    }

    #[test]
    fn test_long_session_keeps_one_entry_per_key() {
        let mut logger = LogSessionLogger::new();
        for i in 0..100_000 {
            logger.timing("detect", 1.0);
            logger.metric("regions", (i % 2) as f64);
        }

        assert_eq!(logger.timings.len(), 1);
        assert_eq!(logger.metrics.len(), 1);
        let regions = logger.metrics_for("regions").unwrap();
        assert_eq!(regions.count, 100_000);
        assert_relative_eq!(regions.mean(), 0.5);
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(LogSessionLogger::default().summary_string().is_none());
    }
}
