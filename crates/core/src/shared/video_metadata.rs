use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Presentation time in seconds of the frame at `index`, assuming a
    /// constant frame rate. `None` when the stream reports no rate.
    pub fn timestamp_of(&self, index: usize) -> Option<f64> {
        (self.fps > 0.0).then(|| index as f64 / self.fps)
    }
}
