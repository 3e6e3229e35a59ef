use std::io::{self, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use vt_core::pipeline::pipeline_logger::{LogPipelineLogger, PipelineLogger};

/// Terminal logger for the validation sweep.
///
/// Drives an `indicatif` bar when enabled and prints messages above it so
/// they are never overwritten. Messages are written and flushed one by one
/// even when the bar is hidden, as it is whenever stderr is not a terminal.
/// Without a visible bar, progress goes to the `log` facade.
pub struct ConsoleLogger {
    bar: Option<ProgressBar>,
    out: Box<dyn Write + Send>,
    stats: LogPipelineLogger,
}

impl ConsoleLogger {
    pub fn new(total: usize, show_bar: bool) -> Self {
        let bar = show_bar.then(|| {
            let pb = ProgressBar::new(total as u64);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} Testing frames [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, {eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░ ");
            pb.set_style(style);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        Self::with_output(bar, Box::new(io::stdout()))
    }

    fn with_output(bar: Option<ProgressBar>, out: Box<dyn Write + Send>) -> Self {
        Self {
            bar,
            out,
            stats: LogPipelineLogger::new(1000),
        }
    }

    fn emit(&mut self, message: &str) {
        let out = &mut self.out;
        let mut write = || {
            if let Err(e) = writeln!(out, "{message}").and_then(|()| out.flush()) {
                log::warn!("Could not write to stdout: {e}");
            }
        };
        match &self.bar {
            Some(pb) => pb.suspend(write),
            None => write(),
        }
    }

    fn visible_bar(&self) -> Option<&ProgressBar> {
        self.bar.as_ref().filter(|pb| !pb.is_hidden())
    }
}

impl PipelineLogger for ConsoleLogger {
    fn progress(&mut self, current: usize, total: usize) {
        match self.visible_bar() {
            Some(pb) => pb.set_position(current as u64),
            None => self.stats.progress(current, total),
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.stats.timing(stage, duration_ms);
    }

    fn info(&mut self, message: &str) {
        self.emit(message);
    }

    fn warn(&mut self, message: &str) {
        self.emit(message);
    }

    fn summary(&self) {
        if let Some(pb) = &self.bar {
            pb.finish_and_clear();
        }
        self.stats.summary();
    }
}
