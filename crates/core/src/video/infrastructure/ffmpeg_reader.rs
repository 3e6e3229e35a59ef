use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::infrastructure::stream_decoder::StreamDecoder;

type FrameResult = Result<Frame, Box<dyn std::error::Error>>;

/// Sequential video reader over ffmpeg-next.
///
/// Frames are decoded lazily, one per iterator step, and handed out as RGB
/// stamped with their presentation time. A decode error ends the iteration
/// after being yielded once.
pub struct FfmpegReader {
    decoder: Option<StreamDecoder>,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self { decoder: None }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let decoder = StreamDecoder::open(path)
            .map_err(|e| format!("Cannot open {}: {e}", path.display()))?;
        let (codec, total_frames) = decoder.stream_info();

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps: decoder.fps(),
            total_frames,
            codec,
            source_path: Some(path.to_path_buf()),
        };
        self.decoder = Some(decoder);
        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Box::new(std::iter::once(Err("FfmpegReader: not opened".into())));
        };

        let mut failed = false;
        Box::new(std::iter::from_fn(move || {
            if failed {
                return None;
            }
            match decoder.next_frame() {
                Ok(next) => next.map(|(_, frame)| Ok(frame)),
                Err(e) => {
                    failed = true;
                    Some(Err(format!("Decode failed: {e}").into()))
                }
            }
        }))
    }

    fn close(&mut self) {
        self.decoder = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::infrastructure::test_video::create_test_video;

    #[test]
    fn test_open_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mp4");
        create_test_video(&path, 5, 160, 120, 30);

        let mut reader = FfmpegReader::new();
        let meta = reader.open(&path).unwrap();
        assert_eq!((meta.width, meta.height), (160, 120));
        assert!((meta.fps - 30.0).abs() < 0.5);
        assert_eq!(meta.codec, "mpeg4");
        assert_eq!(meta.source_path, Some(path));
    }

    #[test]
    fn test_open_nonexistent_names_path() {
        let mut reader = FfmpegReader::new();
        let err = reader.open(Path::new("/nonexistent/test.mp4")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/test.mp4"));
    }

    #[test]
    fn test_frames_are_indexed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mp4");
        create_test_video(&path, 5, 160, 120, 30);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        let indices: Vec<_> = reader.frames().map(|f| f.unwrap().index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_frames_carry_presentation_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mp4");
        create_test_video(&path, 3, 64, 48, 10);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        let times: Vec<_> = reader
            .frames()
            .map(|f| f.unwrap().timestamp().unwrap())
            .collect();
        assert_eq!(times.len(), 3);
        for (i, ts) in times.iter().enumerate() {
            assert!((ts - i as f64 / 10.0).abs() < 1e-6, "frame {i} at {ts}");
        }
    }

    #[test]
    fn test_frames_before_open_is_single_error() {
        let mut reader = FfmpegReader::new();
        let results: Vec<_> = reader.frames().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_reopen_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mp4");
        create_test_video(&path, 2, 64, 48, 30);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        assert_eq!(reader.frames().count(), 2);
        reader.close();
        reader.close();
        reader.open(&path).unwrap();
        assert_eq!(reader.frames().count(), 2);
    }
}
