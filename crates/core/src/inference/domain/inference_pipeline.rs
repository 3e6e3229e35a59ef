use std::path::Path;

use crate::inference::domain::prediction::Prediction;
use crate::shared::frame::Frame;

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Per-frame callback invoked by an [`InferencePipeline`].
///
/// Called serially, once per processed input frame, with the model output
/// and the source frame it was computed from.
pub trait PredictionSink: Send {
    fn on_prediction(&mut self, prediction: &Prediction, frame: &Frame) -> Result<(), SinkError>;
}

/// Video inference driver.
///
/// The sink is moved into the pipeline on [`start`](InferencePipeline::start)
/// and handed back by [`join`](InferencePipeline::join) once the source is
/// exhausted, so the caller can finalize whatever state it accumulated.
pub trait InferencePipeline<S: PredictionSink> {
    fn start(&mut self, source: &Path, sink: S) -> Result<(), Box<dyn std::error::Error>>;

    /// Blocks until every frame has been delivered to the sink.
    fn join(&mut self) -> Result<S, Box<dyn std::error::Error>>;
}
