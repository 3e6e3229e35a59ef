use crate::inference::domain::prediction::Prediction;
use crate::shared::frame::Frame;

/// Runs a segmentation workflow on a single frame.
///
/// Implementations may be remote (HTTP) or local; the pipeline only sees
/// named output fields.
pub trait SegmentationModel: Send {
    fn infer(&mut self, frame: &Frame) -> Result<Prediction, Box<dyn std::error::Error>>;
}
