pub mod ffmpeg_frame_seeker;
pub mod ffmpeg_reader;
pub mod ffmpeg_writer;
pub mod image_file_writer;
mod stream_decoder;
#[cfg(test)]
pub(crate) mod test_video;
