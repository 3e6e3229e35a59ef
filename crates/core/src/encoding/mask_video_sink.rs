use std::path::{Path, PathBuf};

use crate::encoding::encoder_session::{EncoderSession, SessionSummary};
use crate::inference::domain::inference_pipeline::{PredictionSink, SinkError};
use crate::inference::domain::prediction::Prediction;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

const PROGRESS_EVERY: usize = 100;

struct Preview {
    writer: Box<dyn ImageWriter>,
    path: PathBuf,
    every: usize,
}

/// Streams one image field of each prediction into an encoder session.
///
/// Predictions without the field are skipped. When a preview is attached,
/// the latest mask image is rewritten to a file every few frames so a run
/// can be watched from outside.
pub struct MaskVideoSink {
    session: EncoderSession,
    field: String,
    preview: Option<Preview>,
    skipped: usize,
}

impl MaskVideoSink {
    pub fn new(session: EncoderSession, field: &str) -> Self {
        Self {
            session,
            field: field.to_string(),
            preview: None,
            skipped: 0,
        }
    }

    pub fn with_preview(mut self, writer: Box<dyn ImageWriter>, path: &Path, every: usize) -> Self {
        self.preview = Some(Preview {
            writer,
            path: path.to_path_buf(),
            every: every.max(1),
        });
        self
    }

    /// Mask frames encoded so far.
    pub fn frames(&self) -> usize {
        self.session.frames()
    }

    /// Predictions that carried no mask.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn session(&self) -> &EncoderSession {
        &self.session
    }

    /// Flushes and closes the output if anything was encoded.
    pub fn finish(&mut self) -> Result<SessionSummary, Box<dyn std::error::Error>> {
        if self.skipped > 0 {
            log::info!("{} predictions had no '{}' output", self.skipped, self.field);
        }
        self.session.finish()
    }
}

impl PredictionSink for MaskVideoSink {
    fn on_prediction(&mut self, prediction: &Prediction, frame: &Frame) -> Result<(), SinkError> {
        let Some(mask) = prediction.image(&self.field) else {
            log::debug!(
                "Frame {}: no '{}' image in prediction (fields: {})",
                frame.index(),
                self.field,
                prediction.field_names().collect::<Vec<_>>().join(", ")
            );
            self.skipped += 1;
            return Ok(());
        };

        self.session
            .push(mask.clone())
            .map_err(|e| -> SinkError { e.to_string().into() })?;

        let count = self.session.frames();
        if count % PROGRESS_EVERY == 0 {
            log::info!("Encoded {count} frames");
        }

        if let Some(preview) = &self.preview {
            if (count - 1) % preview.every == 0 {
                preview
                    .writer
                    .write(&preview.path, mask)
                    .map_err(|e| -> SinkError { format!("preview: {e}").into() })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::encoder_session::tests::{RecordingWriter, WriterLog};
    use crate::encoding::encoder_session::SessionState;
    use crate::shared::encoding_profile::EncodingProfile;
    use crate::shared::frame::PixelFormat;
    use std::sync::{Arc, Mutex};

    struct StubImageWriter {
        writes: Arc<Mutex<Vec<usize>>>,
    }

    impl ImageWriter for StubImageWriter {
        fn write(&self, _path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.writes.lock().unwrap().push(frame.index());
            Ok(())
        }
    }

    fn sink() -> (MaskVideoSink, Arc<Mutex<WriterLog>>) {
        let (writer, log) = RecordingWriter::new();
        let session = EncoderSession::new(
            Box::new(writer),
            Path::new("out.mp4"),
            EncodingProfile::default(),
        );
        (MaskVideoSink::new(session, "mask_visualization"), log)
    }

    fn source(index: usize) -> Frame {
        Frame::rgb(vec![0; 4 * 4 * 3], 4, 4, index)
    }

    fn with_mask(index: usize) -> Prediction {
        Prediction::new().with_image(
            "mask_visualization",
            Frame::bgr([0u8, 0, 255].repeat(16), 4, 4, index),
        )
    }

    #[test]
    fn test_k_masks_encode_k_frames_and_close_once() {
        let (mut sink, log) = sink();
        for i in 0..7 {
            sink.on_prediction(&with_mask(i), &source(i)).unwrap();
        }
        let summary = sink.finish().unwrap();
        assert_eq!(summary.frames, 7);
        assert_eq!(summary.packets, 7);

        let log = log.lock().unwrap();
        assert_eq!(log.opened.len(), 1);
        assert_eq!(log.encoded.len(), 7);
        assert_eq!(log.flushes, 1);
        assert_eq!(log.closes, 1);
        // BGR mask pixels arrive at the encoder as RGB
        assert!(log
            .encoded
            .iter()
            .all(|&(_, fmt, first)| fmt == PixelFormat::Rgb24 && first == 255));
    }

    #[test]
    fn test_missing_field_is_skipped() {
        let (mut sink, log) = sink();
        sink.on_prediction(&with_mask(0), &source(0)).unwrap();
        sink.on_prediction(&Prediction::new(), &source(1)).unwrap();
        sink.on_prediction(
            &Prediction::new().with_json("mask_visualization", serde_json::Value::Null),
            &source(2),
        )
        .unwrap();
        sink.on_prediction(&with_mask(3), &source(3)).unwrap();

        assert_eq!(sink.frames(), 2);
        assert_eq!(sink.skipped(), 2);
        let indices: Vec<_> = log.lock().unwrap().encoded.iter().map(|e| e.0).collect();
        assert_eq!(indices, vec![0, 3]);
    }

    #[test]
    fn test_zero_masks_never_open_output() {
        let (mut sink, log) = sink();
        for i in 0..3 {
            sink.on_prediction(&Prediction::new(), &source(i)).unwrap();
        }
        let summary = sink.finish().unwrap();
        assert_eq!(summary.output, None);
        assert_eq!(sink.session().state(), SessionState::Finished);
        assert_eq!(*log.lock().unwrap(), WriterLog::default());
    }

    #[test]
    fn test_preview_written_every_n_frames() {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let (sink, _) = sink();
        let mut sink = sink.with_preview(
            Box::new(StubImageWriter {
                writes: writes.clone(),
            }),
            Path::new("preview.png"),
            3,
        );
        for i in 0..7 {
            sink.on_prediction(&with_mask(i), &source(i)).unwrap();
        }
        // Frames 1, 4 and 7 of the output (indices 0, 3, 6)
        assert_eq!(*writes.lock().unwrap(), vec![0, 3, 6]);
    }
}
