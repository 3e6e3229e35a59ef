use std::path::Path;
use std::time::Duration;

use crate::pipeline::segment_video_use_case::{FileSummary, SegmentVideoUseCase};

/// Totals over a batch of re-encoded videos.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchSummary {
    pub files: Vec<FileSummary>,
}

impl BatchSummary {
    pub fn total_frames(&self) -> usize {
        self.files.iter().map(|f| f.frames).sum()
    }

    pub fn total_elapsed(&self) -> Duration {
        self.files.iter().map(|f| f.elapsed).sum()
    }
}

/// Formats a duration as `m:ss`, truncating fractional seconds.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Re-encodes a list of videos from one directory into another, one after
/// the other. Stops at the first failing file.
pub struct SegmentBatchUseCase {
    single: SegmentVideoUseCase,
}

impl SegmentBatchUseCase {
    pub fn new(single: SegmentVideoUseCase) -> Self {
        Self { single }
    }

    /// `on_file` is called after each file completes, before the next starts.
    pub fn execute(
        &mut self,
        files: &[String],
        input_dir: &Path,
        output_dir: &Path,
        mut on_file: impl FnMut(usize, &FileSummary),
    ) -> Result<BatchSummary, Box<dyn std::error::Error>> {
        let mut batch = BatchSummary::default();
        for (i, name) in files.iter().enumerate() {
            let input = input_dir.join(name);
            log::info!("[{}/{}] {}", i + 1, files.len(), input.display());

            let summary = self
                .single
                .execute(&input, output_dir)
                .map_err(|e| format!("{}: {e}", input.display()))?;
            log::info!(
                "{}: {} frames in {}",
                name,
                summary.frames,
                format_elapsed(summary.elapsed)
            );
            on_file(i, &summary);
            batch.files.push(summary);
        }
        log::info!(
            "Batch complete: {} files, {} frames in {}",
            batch.files.len(),
            batch.total_frames(),
            format_elapsed(batch.total_elapsed())
        );
        Ok(batch)
    }
}
