use std::time::Instant;

use crate::dataset::domain::frame_dataset::FrameDataset;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::validation_report::{FailureRecord, ValidationReport};

/// Loads every frame of a dataset once, in index order, and records the
/// ones that fail.
///
/// A failing frame never stops the sweep and is never retried. Successful
/// loads produce no output; each failure is reported through the logger the
/// moment it happens.
pub struct ValidateFramesUseCase {
    dataset: Box<dyn FrameDataset>,
    logger: Box<dyn PipelineLogger>,
}

impl ValidateFramesUseCase {
    pub fn new(dataset: Box<dyn FrameDataset>, logger: Box<dyn PipelineLogger>) -> Self {
        Self { dataset, logger }
    }

    pub fn execute(&mut self) -> ValidationReport {
        let total = self.dataset.len();
        self.logger
            .info(&format!("Testing all {total} frames (this may take a while)..."));

        let mut failures = Vec::new();
        for index in 0..total {
            let started = Instant::now();
            let result = self.dataset.get(index);
            self.logger
                .timing("load", started.elapsed().as_secs_f64() * 1000.0);

            if let Err(error) = result {
                let record = FailureRecord::new(index, &error, self.dataset.raw(index));
                self.logger.warn(&record.notice());
                failures.push(record);
            }
            self.logger.progress(index + 1, total);
        }

        self.logger.summary();
        ValidationReport { total, failures }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::domain::dataset_error::DatasetError;
    use crate::dataset::domain::frame_dataset::{RawRecord, Sample};
    use crate::pipeline::validation_report::Diagnostic;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubDataset {
        len: usize,
        failing: HashSet<usize>,
        raw_failing: HashSet<usize>,
        calls: Arc<Mutex<Vec<usize>>>,
    }

    impl StubDataset {
        fn new(len: usize, failing: &[usize]) -> Self {
            Self {
                len,
                failing: failing.iter().copied().collect(),
                raw_failing: HashSet::new(),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn with_raw_failing(mut self, indices: &[usize]) -> Self {
            self.raw_failing = indices.iter().copied().collect();
            self
        }
    }

    impl FrameDataset for StubDataset {
        fn len(&self) -> usize {
            self.len
        }

        fn get(&mut self, index: usize) -> Result<Sample, DatasetError> {
            self.calls.lock().unwrap().push(index);
            if self.failing.contains(&index) {
                return Err(DatasetError::Decode {
                    path: "ep.mp4".into(),
                    message: format!("corrupt packet near frame {index}"),
                });
            }
            Ok(Sample {
                index,
                record: self.raw(index)?,
                images: Vec::new(),
            })
        }

        fn raw(&self, index: usize) -> Result<RawRecord, DatasetError> {
            if self.raw_failing.contains(&index) {
                return Err(DatasetError::Metadata("row unreadable".into()));
            }
            Ok(RawRecord {
                episode_index: (index / 4) as u64,
                timestamp: (index % 4) as f64 / 10.0,
            })
        }
    }

    #[derive(Default)]
    struct RecordingLogger {
        warnings: Arc<Mutex<Vec<String>>>,
        progress: Arc<Mutex<Vec<(usize, usize)>>>,
    }

    impl PipelineLogger for RecordingLogger {
        fn progress(&mut self, current: usize, total: usize) {
            self.progress.lock().unwrap().push((current, total));
        }
        fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
        fn info(&mut self, _message: &str) {}
        fn warn(&mut self, message: &str) {
            self.warnings.lock().unwrap().push(message.to_string());
        }
    }

    fn run(dataset: StubDataset) -> (ValidationReport, Vec<String>, Vec<(usize, usize)>) {
        let logger = RecordingLogger::default();
        let warnings = logger.warnings.clone();
        let progress = logger.progress.clone();
        let mut use_case = ValidateFramesUseCase::new(Box::new(dataset), Box::new(logger));
        let report = use_case.execute();
        let warnings = warnings.lock().unwrap().clone();
        let progress = progress.lock().unwrap().clone();
        (report, warnings, progress)
    }

    #[test]
    fn test_clean_dataset_has_no_failures() {
        let (report, warnings, _) = run(StubDataset::new(6, &[]));
        assert_eq!(report.total, 6);
        assert!(report.is_clean());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_failures_do_not_stop_the_sweep() {
        let dataset = StubDataset::new(8, &[2, 5]);
        let calls = dataset.calls.clone();
        let (report, _, _) = run(dataset);

        assert_eq!(report.total, 8);
        assert_eq!(report.failed(), 2);
        let indices: Vec<_> = report.failures.iter().map(|f| f.frame_index).collect();
        assert_eq!(indices, vec![2, 5]);
        // Every index visited exactly once, in order, with no retries
        assert_eq!(*calls.lock().unwrap(), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_failure_count_matches_failing_indices() {
        let failing = [0, 1, 7, 9];
        let (report, warnings, _) = run(StubDataset::new(10, &failing));
        assert_eq!(report.failed(), failing.len());
        assert_eq!(warnings.len(), failing.len());
    }

    #[test]
    fn test_failure_records_diagnostics() {
        let (report, _, _) = run(StubDataset::new(8, &[5]));
        let f = &report.failures[0];
        assert_eq!(f.episode, Diagnostic::Known(1));
        assert_eq!(f.timestamp, Diagnostic::Known(0.1));
        assert_eq!(f.error_type, "DecodeError");
        assert!(f.error_message.contains("corrupt packet near frame 5"));
    }

    #[test]
    fn test_failed_diagnostic_lookup_uses_unknown() {
        let dataset = StubDataset::new(4, &[3]).with_raw_failing(&[3]);
        let (report, warnings, _) = run(dataset);
        let f = &report.failures[0];
        assert_eq!(f.episode, Diagnostic::Unknown);
        assert_eq!(f.timestamp, Diagnostic::Unknown);
        assert!(warnings[0].contains("(episode unknown, timestamp unknown)"));
    }

    #[test]
    fn test_failure_is_reported_before_next_frame() {
        let (_, warnings, progress) = run(StubDataset::new(3, &[1]));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("✗ FAILED: Frame 1 "));
        assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_empty_dataset() {
        let (report, _, progress) = run(StubDataset::new(0, &[]));
        assert_eq!(report.total, 0);
        assert!(report.is_clean());
        assert!(progress.is_empty());
    }
}
