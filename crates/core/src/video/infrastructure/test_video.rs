//! Fixtures shared by the ffmpeg adapter tests.

use std::path::Path;

use crate::shared::encoding_profile::EncodingProfile;
use crate::shared::frame::Frame;
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;

/// MPEG-4 Part 2 ships with every ffmpeg build, unlike SVT-AV1.
pub fn test_profile() -> EncodingProfile {
    EncodingProfile::bare("mpeg4", 30)
}

pub fn solid_frame(index: usize, w: u32, h: u32, value: u8) -> Frame {
    Frame::rgb(vec![value; (w * h * 3) as usize], w, h, index)
}

/// Writes `num_frames` gray frames whose brightness steps by 40 per frame.
pub fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32, fps: u32) {
    let mut writer = FfmpegWriter::new();
    writer
        .open(path, width, height, &EncodingProfile::bare("mpeg4", fps))
        .unwrap();
    for i in 0..num_frames {
        let value = ((i * 40) % 256) as u8;
        writer.encode(&solid_frame(i, width, height, value)).unwrap();
    }
    writer.flush().unwrap();
    writer.close().unwrap();
}
