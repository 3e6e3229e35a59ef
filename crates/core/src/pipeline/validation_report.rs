use std::fmt;

use crate::dataset::domain::dataset_error::DatasetError;
use crate::dataset::domain::frame_dataset::RawRecord;
use crate::shared::constants::UNKNOWN;

const RULE_WIDTH: usize = 80;

/// A best-effort diagnostic value: either read successfully or unknown.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Diagnostic<T> {
    Known(T),
    Unknown,
}

impl<T: fmt::Display> fmt::Display for Diagnostic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Known(v) => fmt::Display::fmt(v, f),
            Diagnostic::Unknown => f.write_str(UNKNOWN),
        }
    }
}

/// One frame that failed to load.
#[derive(Clone, Debug, PartialEq)]
pub struct FailureRecord {
    pub frame_index: usize,
    pub episode: Diagnostic<u64>,
    pub timestamp: Diagnostic<f64>,
    pub error_type: String,
    pub error_message: String,
}

impl FailureRecord {
    /// Builds a record from the load error and the result of the raw
    /// lookup. A failed lookup leaves both fields unknown and never
    /// replaces the original error.
    pub fn new(
        frame_index: usize,
        error: &DatasetError,
        raw: Result<RawRecord, DatasetError>,
    ) -> Self {
        let (episode, timestamp) = match raw {
            Ok(rec) => (
                Diagnostic::Known(rec.episode_index),
                Diagnostic::Known(rec.timestamp),
            ),
            Err(lookup_err) => {
                log::debug!("Diagnostic lookup for frame {frame_index} failed: {lookup_err}");
                (Diagnostic::Unknown, Diagnostic::Unknown)
            }
        };
        Self {
            frame_index,
            episode,
            timestamp,
            error_type: error.kind().to_string(),
            error_message: error.to_string(),
        }
    }

    /// Two-line notice printed the moment the failure is seen.
    pub fn notice(&self) -> String {
        format!(
            "✗ FAILED: Frame {} (episode {}, timestamp {})\n  Error: {}: {}",
            self.frame_index, self.episode, self.timestamp, self.error_type, self.error_message
        )
    }
}

/// Outcome of a full validation sweep.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationReport {
    pub total: usize,
    pub failures: Vec<FailureRecord>,
}

impl ValidationReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Plain-text report for standard output.
    pub fn render(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let mut out = Vec::new();
        out.push(String::new());
        out.push(rule.clone());
        out.push("TEST RESULTS".to_string());
        out.push(rule.clone());
        out.push(format!("Total frames tested: {}", thousands(self.total)));
        out.push(format!("Failed frames: {}", self.failed()));

        if self.is_clean() {
            out.push(String::new());
            out.push("✓ SUCCESS: All frames loaded successfully!".to_string());
            out.push(String::new());
            out.push("Conclusion: Your dataset is NOT corrupted.".to_string());
            out.push("A training-time load error is likely due to:".to_string());
            out.push("  1. Shuffling causing a different frame order in training".to_string());
            out.push(
                "  2. Environment differences (CUDA vs CPU, different libraries)".to_string(),
            );
            out.push("  3. A race condition between multiple decode workers".to_string());
            out.push(String::new());
            out.push("Recommended solutions:".to_string());
            out.push("  • Try a different video decoding backend".to_string());
            out.push("  • Try running with a single data-loading worker".to_string());
        } else {
            out.push(String::new());
            out.push("✗ FAILURE: Some frames could not be loaded".to_string());
            out.push(String::new());
            out.push("Failed frames details:".to_string());
            for f in &self.failures {
                out.push(String::new());
                out.push(format!("  Frame {}:", f.frame_index));
                out.push(format!("    Episode: {}", f.episode));
                out.push(format!("    Timestamp: {}", f.timestamp));
                out.push(format!("    Error: {}: {}", f.error_type, f.error_message));
            }
            out.push(String::new());
            out.push("Recommended action:".to_string());
            out.push("  • Re-record the episodes with corrupted frames".to_string());
            out.push("  • Or exclude these episodes from training".to_string());
        }
        out.push(rule);
        out.join("\n")
    }
}

/// Formats an integer with `,` thousands separators.
fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
