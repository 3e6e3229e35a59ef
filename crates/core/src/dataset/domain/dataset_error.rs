use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while materializing a dataset frame or its metadata.
///
/// Each variant has a stable [`kind`](DatasetError::kind) name which the
/// validation report prints as the error type.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("index {index} out of range for dataset of {len} frames")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("video file not found: {0}")]
    MissingVideo(PathBuf),
    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error(
        "query timestamp {requested:.4}s violates tolerance: closest decoded frame is at {decoded:.4}s in {path}"
    )]
    TimestampTolerance {
        path: PathBuf,
        requested: f64,
        decoded: f64,
    },
    #[error("no frame at {timestamp:.4}s in {path} (stream ended)")]
    FrameNotFound { path: PathBuf, timestamp: f64 },
    #[error("invalid dataset metadata: {0}")]
    Metadata(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DatasetError {
    /// Short type name used to classify failures in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            DatasetError::IndexOutOfRange { .. } => "IndexOutOfRange",
            DatasetError::MissingVideo(_) => "MissingVideo",
            DatasetError::Decode { .. } => "DecodeError",
            DatasetError::TimestampTolerance { .. } => "TimestampTolerance",
            DatasetError::FrameNotFound { .. } => "FrameNotFound",
            DatasetError::Metadata(_) => "Metadata",
            DatasetError::Io(_) => "Io",
        }
    }
}
