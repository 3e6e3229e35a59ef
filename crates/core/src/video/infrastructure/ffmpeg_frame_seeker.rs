use std::path::{Path, PathBuf};

use crate::dataset::domain::dataset_error::DatasetError;
use crate::shared::frame::Frame;
use crate::video::infrastructure::stream_decoder::StreamDecoder;

/// Decodes frames from one video file by presentation timestamp.
///
/// Keeps the decoder positioned after the last returned frame, so
/// ascending queries decode forward without seeking. A query earlier than
/// the cursor seeks back to the nearest keyframe and decodes forward again.
pub struct FfmpegFrameSeeker {
    path: PathBuf,
    decoder: StreamDecoder,
    /// A decoded frame that overshot the previous query, re-examined first.
    pending: Option<(f64, Frame)>,
    last_timestamp: Option<f64>,
}

impl FfmpegFrameSeeker {
    pub fn open(path: &Path) -> Result<Self, DatasetError> {
        if !path.exists() {
            return Err(DatasetError::MissingVideo(path.to_path_buf()));
        }
        let decoder = StreamDecoder::open(path).map_err(decode_error(path))?;
        Ok(Self {
            path: path.to_path_buf(),
            decoder,
            pending: None,
            last_timestamp: None,
        })
    }

    /// Returns the frame whose timestamp is within `tolerance` seconds of
    /// `timestamp`.
    pub fn frame_at(&mut self, timestamp: f64, tolerance: f64) -> Result<Frame, DatasetError> {
        if matches!(self.last_timestamp, Some(last) if timestamp < last - tolerance) {
            self.rewind(timestamp)?;
        }

        let mut previous: Option<f64> = None;
        loop {
            let Some((ts, frame)) = self.next_frame()? else {
                return Err(DatasetError::FrameNotFound {
                    path: self.path.clone(),
                    timestamp,
                });
            };

            if ts + tolerance < timestamp {
                previous = Some(ts);
                continue;
            }

            if (ts - timestamp).abs() <= tolerance {
                self.last_timestamp = Some(ts);
                return Ok(frame);
            }

            // Overshot: the target falls between two decoded frames.
            let closest = match previous {
                Some(p) if (p - timestamp).abs() < (ts - timestamp).abs() => p,
                _ => ts,
            };
            self.pending = Some((ts, frame));
            return Err(DatasetError::TimestampTolerance {
                path: self.path.clone(),
                requested: timestamp,
                decoded: closest,
            });
        }
    }

    fn rewind(&mut self, timestamp: f64) -> Result<(), DatasetError> {
        log::debug!("Seeking {} back to {timestamp:.4}s", self.path.display());
        self.decoder
            .seek(timestamp)
            .map_err(decode_error(&self.path))?;
        self.pending = None;
        self.last_timestamp = None;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<(f64, Frame)>, DatasetError> {
        if let Some(pending) = self.pending.take() {
            return Ok(Some(pending));
        }
        self.decoder.next_frame().map_err(decode_error(&self.path))
    }
}

fn decode_error(path: &Path) -> impl Fn(ffmpeg_next::Error) -> DatasetError + '_ {
    move |e| DatasetError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}
