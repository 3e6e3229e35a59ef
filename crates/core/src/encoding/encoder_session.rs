use std::path::{Path, PathBuf};

use crate::shared::encoding_profile::EncodingProfile;
use crate::shared::frame::Frame;
use crate::video::domain::video_writer::VideoWriter;

/// Lifecycle of an [`EncoderSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No frame seen yet; no output file exists.
    Uninitialized,
    /// Output open, accepting frames of the given size.
    Streaming { width: u32, height: u32 },
    /// Flushed and closed, or finished without ever opening.
    Finished,
}

/// What a finished session produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    /// `None` when no frame arrived and nothing was written.
    pub output: Option<PathBuf>,
    pub frames: usize,
    pub packets: usize,
}

/// Lazily opened encoder bound to one output file.
///
/// The output is created on the first pushed frame, sized from that frame.
/// [`finish`](EncoderSession::finish) drains the encoder and closes the
/// container exactly once, and only if it was ever opened.
pub struct EncoderSession {
    writer: Box<dyn VideoWriter>,
    output: PathBuf,
    profile: EncodingProfile,
    state: SessionState,
    frames: usize,
    packets: usize,
}

impl EncoderSession {
    pub fn new(writer: Box<dyn VideoWriter>, output: &Path, profile: EncodingProfile) -> Self {
        Self {
            writer,
            output: output.to_path_buf(),
            profile,
            state: SessionState::Uninitialized,
            frames: 0,
            packets: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Encodes one frame, opening the output first if this is the first one.
    /// BGR frames are converted to RGB before encoding.
    pub fn push(&mut self, frame: Frame) -> Result<(), Box<dyn std::error::Error>> {
        let (width, height) = frame.dimensions();
        match self.state {
            SessionState::Finished => {
                return Err(format!(
                    "encoder session for {} is already finished",
                    self.output.display()
                )
                .into())
            }
            SessionState::Uninitialized => {
                self.writer
                    .open(&self.output, width, height, &self.profile)?;
                log::info!(
                    "Initialized encoder: {width}x{height} using {} codec ({})",
                    self.profile.codec,
                    self.profile.describe_options()
                );
                self.state = SessionState::Streaming { width, height };
            }
            SessionState::Streaming {
                width: w,
                height: h,
            } => {
                if (w, h) != (width, height) {
                    return Err(format!(
                        "frame {} is {width}x{height}, stream is {w}x{h}",
                        frame.index()
                    )
                    .into());
                }
            }
        }

        self.packets += self.writer.encode(&frame.into_rgb())?;
        self.frames += 1;
        Ok(())
    }

    /// Drains buffered packets and closes the output. Safe to call again;
    /// later calls touch nothing and return the same summary.
    pub fn finish(&mut self) -> Result<SessionSummary, Box<dyn std::error::Error>> {
        match self.state {
            SessionState::Streaming { .. } => {
                self.packets += self.writer.flush()?;
                self.writer.close()?;
                self.state = SessionState::Finished;
                log::debug!(
                    "Closed {} after {} frames, {} packets",
                    self.output.display(),
                    self.frames,
                    self.packets
                );
            }
            SessionState::Uninitialized => {
                log::warn!(
                    "No frames received; {} was not created",
                    self.output.display()
                );
                self.state = SessionState::Finished;
            }
            SessionState::Finished => {}
        }
        Ok(self.summary())
    }

    fn summary(&self) -> SessionSummary {
        SessionSummary {
            output: (self.frames > 0).then(|| self.output.clone()),
            frames: self.frames,
            packets: self.packets,
        }
    }
}
