use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::encoding::encoder_session::EncoderSession;
use crate::encoding::mask_video_sink::MaskVideoSink;
use crate::inference::domain::inference_pipeline::InferencePipeline;
use crate::shared::constants::{OUTPUT_EXTENSION, OUTPUT_SUFFIX};
use crate::shared::encoding_profile::EncodingProfile;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_writer::VideoWriter;

pub type VideoWriterFactory = Box<dyn Fn() -> Box<dyn VideoWriter>>;
pub type ImageWriterFactory = Box<dyn Fn() -> Box<dyn ImageWriter>>;

/// Live preview of the mask stream: a PNG next to the output, rewritten
/// every `every` encoded frames.
pub struct PreviewConfig {
    pub make_writer: ImageWriterFactory,
    pub every: usize,
}

/// Result of re-encoding one input video.
#[derive(Clone, Debug, PartialEq)]
pub struct FileSummary {
    pub input: PathBuf,
    /// `None` when no mask frame was produced and no file was written.
    pub output: Option<PathBuf>,
    pub frames: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

/// `<output_dir>/<stem>_with_mask.mp4`
pub fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("{stem}{OUTPUT_SUFFIX}.{OUTPUT_EXTENSION}"))
}

fn preview_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("{stem}{OUTPUT_SUFFIX}_preview.png"))
}

/// Runs segmentation over one video and streams the mask overlay into a
/// new video file.
///
/// Each call builds a fresh encoder session, so no state carries over from
/// a previous file. Any pipeline, sink or encoder error aborts the call;
/// whatever was already muxed stays on disk.
pub struct SegmentVideoUseCase {
    pipeline: Box<dyn InferencePipeline<MaskVideoSink>>,
    make_writer: VideoWriterFactory,
    profile: EncodingProfile,
    field: String,
    preview: Option<PreviewConfig>,
}

impl SegmentVideoUseCase {
    pub fn new(
        pipeline: Box<dyn InferencePipeline<MaskVideoSink>>,
        make_writer: VideoWriterFactory,
        profile: EncodingProfile,
        field: &str,
    ) -> Self {
        Self {
            pipeline,
            make_writer,
            profile,
            field: field.to_string(),
            preview: None,
        }
    }

    pub fn with_preview(mut self, preview: PreviewConfig) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn execute(
        &mut self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<FileSummary, Box<dyn std::error::Error>> {
        let started = Instant::now();
        std::fs::create_dir_all(output_dir)?;
        let output = output_path_for(input, output_dir);

        let session = EncoderSession::new((self.make_writer)(), &output, self.profile.clone());
        let mut sink = MaskVideoSink::new(session, &self.field);
        if let Some(preview) = &self.preview {
            sink = sink.with_preview(
                (preview.make_writer)(),
                &preview_path_for(input, output_dir),
                preview.every,
            );
        }

        log::info!("Starting video processing: {}", input.display());
        self.pipeline.start(input, sink)?;
        let mut sink = self.pipeline.join()?;
        let summary = sink.finish()?;

        Ok(FileSummary {
            input: input.to_path_buf(),
            output: summary.output,
            frames: summary.frames,
            skipped: sink.skipped(),
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::encoding::encoder_session::tests::{RecordingWriter, WriterLog};
    use crate::inference::domain::inference_pipeline::PredictionSink;
    use crate::inference::domain::prediction::Prediction;
    use crate::shared::frame::Frame;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Pipeline stub: on join, feeds the sink one prediction per entry of
    /// the script registered for the source file name. `true` entries carry
    /// a mask.
    pub(crate) struct ScriptedPipeline {
        scripts: HashMap<String, Vec<bool>>,
        pending: Option<(PathBuf, MaskVideoSink)>,
    }

    impl ScriptedPipeline {
        pub(crate) fn new(scripts: &[(&str, Vec<bool>)]) -> Self {
            Self {
                scripts: scripts
                    .iter()
                    .map(|(name, s)| (name.to_string(), s.clone()))
                    .collect(),
                pending: None,
            }
        }
    }

    impl InferencePipeline<MaskVideoSink> for ScriptedPipeline {
        fn start(
            &mut self,
            source: &Path,
            sink: MaskVideoSink,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.pending = Some((source.to_path_buf(), sink));
            Ok(())
        }

        fn join(&mut self) -> Result<MaskVideoSink, Box<dyn std::error::Error>> {
            let (source, mut sink) = self.pending.take().ok_or("not started")?;
            let name = source.file_name().unwrap().to_string_lossy().into_owned();
            let script = self.scripts.get(&name).ok_or("unknown source")?;
            for (i, &has_mask) in script.iter().enumerate() {
                let frame = Frame::rgb(vec![0; 4 * 4 * 3], 4, 4, i);
                let prediction = if has_mask {
                    Prediction::new().with_image("mask_visualization", frame.clone())
                } else {
                    Prediction::new()
                };
                sink.on_prediction(&prediction, &frame)
                    .map_err(|e| e.to_string())?;
            }
            Ok(sink)
        }
    }

    pub(crate) fn recording_factory() -> (VideoWriterFactory, Arc<Mutex<Vec<Arc<Mutex<WriterLog>>>>>) {
        let logs = Arc::new(Mutex::new(Vec::new()));
        let captured = logs.clone();
        let factory: VideoWriterFactory = Box::new(move || {
            let (writer, log) = RecordingWriter::new();
            captured.lock().unwrap().push(log);
            Box::new(writer)
        });
        (factory, logs)
    }

    #[test]
    fn test_output_path_naming() {
        assert_eq!(
            output_path_for(Path::new("/in/video1.mp4"), Path::new("/out")),
            PathBuf::from("/out/video1_with_mask.mp4")
        );
        assert_eq!(
            output_path_for(Path::new("clip.mov"), Path::new("out")),
            PathBuf::from("out/clip_with_mask.mp4")
        );
    }

    #[test]
    fn test_execute_encodes_masks_and_closes_once() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("nested/out");
        let (factory, logs) = recording_factory();
        let pipeline = ScriptedPipeline::new(&[("video1.mp4", vec![true, true, false, true])]);
        let mut use_case = SegmentVideoUseCase::new(
            Box::new(pipeline),
            factory,
            EncodingProfile::default(),
            "mask_visualization",
        );

        let summary = use_case
            .execute(Path::new("/in/video1.mp4"), &out_dir)
            .unwrap();

        assert!(out_dir.is_dir());
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.output, Some(out_dir.join("video1_with_mask.mp4")));

        let logs = logs.lock().unwrap();
        let log = logs[0].lock().unwrap();
        assert_eq!(log.encoded.len(), 3);
        assert_eq!(log.flushes, 1);
        assert_eq!(log.closes, 1);
    }

    #[test]
    fn test_no_masks_produces_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let (factory, logs) = recording_factory();
        let pipeline = ScriptedPipeline::new(&[("empty.mp4", vec![false, false])]);
        let mut use_case = SegmentVideoUseCase::new(
            Box::new(pipeline),
            factory,
            EncodingProfile::default(),
            "mask_visualization",
        );

        let summary = use_case
            .execute(Path::new("empty.mp4"), dir.path())
            .unwrap();
        assert_eq!(summary.output, None);
        assert_eq!(summary.frames, 0);
        assert!(logs.lock().unwrap()[0].lock().unwrap().opened.is_empty());
    }

    #[test]
    fn test_pipeline_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let (factory, _) = recording_factory();
        let pipeline = ScriptedPipeline::new(&[]);
        let mut use_case = SegmentVideoUseCase::new(
            Box::new(pipeline),
            factory,
            EncodingProfile::default(),
            "mask_visualization",
        );
        assert!(use_case
            .execute(Path::new("video1.mp4"), dir.path())
            .is_err());
    }
}
