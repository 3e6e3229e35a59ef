use std::collections::BTreeMap;
use std::time::Instant;

/// Cross-cutting logger for pipeline orchestration events.
///
/// Decouples use cases from specific output mechanisms (log crate,
/// terminal progress bar) so each caller can observe pipeline behavior
/// without changing the orchestration code.
pub trait PipelineLogger: Send {
    /// Report item-level progress.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named pipeline stage took for one item.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Report a problem immediately, without buffering, so it is visible
    /// during a long run.
    fn warn(&mut self, message: &str);

    /// Emit an end-of-pipeline summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn info(&mut self, _message: &str) {}
    fn warn(&mut self, _message: &str) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageStats {
    pub count: usize,
    pub total_ms: f64,
    pub max_ms: f64,
}

impl StageStats {
    fn record(&mut self, duration_ms: f64) {
        self.count += 1;
        self.total_ms += duration_ms;
        self.max_ms = self.max_ms.max(duration_ms);
    }

    pub fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }
}

/// Logger backed by the `log` facade, with per-stage timing aggregation.
///
/// Progress output is throttled to every `throttle` items.
pub struct LogPipelineLogger {
    throttle: usize,
    stages: BTreeMap<String, StageStats>,
    start_time: Instant,
    items: usize,
}

impl LogPipelineLogger {
    pub fn new(throttle: usize) -> Self {
        Self {
            throttle: throttle.max(1),
            stages: BTreeMap::new(),
            start_time: Instant::now(),
            items: 0,
        }
    }

    pub fn stage(&self, name: &str) -> Option<&StageStats> {
        self.stages.get(name)
    }

    /// Returns the formatted summary, or `None` if nothing was timed.
    pub fn summary_string(&self) -> Option<String> {
        if self.stages.is_empty() {
            return None;
        }
        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Pipeline summary ({} items, {elapsed_s:.1}s total):",
            self.items
        )];
        for (name, stats) in &self.stages {
            lines.push(format!(
                "  {name:12}: avg {:6.1}ms  max {:7.1}ms  total {:8.0}ms",
                stats.avg_ms(),
                stats.max_ms,
                stats.total_ms
            ));
        }
        if self.items > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} items/s",
                self.items as f64 / elapsed_s
            ));
        }
        Some(lines.join("\n"))
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.items = current;
        let at_boundary = current % self.throttle == 0 || current == total;
        if at_boundary && total > 0 {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Progress: {current}/{total} ({pct:.1}%)");
        } else if at_boundary {
            log::info!("Progress: {current}");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.stages
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn warn(&mut self, message: &str) {
        log::warn!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing("load", 5.0);
        logger.info("hello");
        logger.warn("bad frame");
        logger.summary();
    }

    #[test]
    fn test_timing_aggregates_per_stage() {
        let mut logger = LogPipelineLogger::new(10);
        logger.timing("load", 20.0);
        logger.timing("load", 40.0);
        logger.timing("encode", 5.0);

        let load = logger.stage("load").unwrap();
        assert_eq!(load.count, 2);
        assert_relative_eq!(load.avg_ms(), 30.0);
        assert_relative_eq!(load.max_ms, 40.0);
        assert_eq!(logger.stage("encode").unwrap().count, 1);
        assert!(logger.stage("infer").is_none());
    }

    #[test]
    fn test_summary_lists_stages_in_order() {
        let mut logger = LogPipelineLogger::new(10);
        logger.progress(10, 10);
        logger.timing("load", 1.0);
        logger.timing("encode", 2.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.starts_with("Pipeline summary (10 items"));
        let encode = summary.find("encode").unwrap();
        let load = summary.find("load").unwrap();
        assert!(encode < load);
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(LogPipelineLogger::default().summary_string().is_none());
    }

    #[test]
    fn test_stage_stats_avg_of_empty_is_zero() {
        assert_relative_eq!(StageStats::default().avg_ms(), 0.0);
    }

    #[test]
    fn test_throttle_floor_is_one() {
        let logger = LogPipelineLogger::new(0);
        assert_eq!(logger.throttle, 1);
    }
}
