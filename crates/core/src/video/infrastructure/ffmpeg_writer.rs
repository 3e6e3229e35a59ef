use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use ffmpeg_next::{Packet, Rational};

use crate::shared::encoding_profile::EncodingProfile;
use crate::shared::frame::{Frame, PixelFormat};
use crate::video::domain::video_writer::VideoWriter;

/// State that only exists between `open` and `close`.
struct OpenStream {
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: scaling::Context,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    stream_index: usize,
}

/// Encodes RGB frames with an ffmpeg encoder chosen by name and muxes
/// each packet into the output container as soon as it is produced.
pub struct FfmpegWriter {
    stream: Option<OpenStream>,
    width: u32,
    height: u32,
    frame_count: usize,
    packets_written: usize,
    flushed: bool,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            stream: None,
            width: 0,
            height: 0,
            frame_count: 0,
            packets_written: 0,
            flushed: false,
        }
    }

    /// Frames handed to the encoder so far.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Packets muxed so far, including those drained by `flush`.
    pub fn packets_written(&self) -> usize {
        self.packets_written
    }

    fn drain(stream: &mut OpenStream) -> Result<usize, ffmpeg_next::Error> {
        let mut written = 0;
        let mut encoded = Packet::empty();
        while stream.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(stream.stream_index);
            encoded.rescale_ts(stream.encoder_time_base, stream.stream_time_base);
            encoded.write_interleaved(&mut stream.octx)?;
            written += 1;
        }
        Ok(written)
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        width: u32,
        height: u32,
        profile: &EncodingProfile,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.stream.is_some() {
            return Err("FfmpegWriter: already open".into());
        }
        ffmpeg_next::init()?;

        let mut octx = ffmpeg_next::format::output(path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find_by_name(&profile.codec)
            .ok_or_else(|| format!("Encoder '{}' not available in this ffmpeg build", profile.codec))?;

        let mut ost = octx.add_stream(Some(codec))?;
        let stream_index = ost.index();

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        let fps = profile.fps.max(1) as i32;
        let encoder_time_base = Rational(1, fps);
        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(Pixel::YUV420P);
        encoder_ctx.set_time_base(encoder_time_base);
        encoder_ctx.set_frame_rate(Some(Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let mut options = ffmpeg_next::Dictionary::new();
        for (key, value) in profile.options() {
            options.set(key, &value);
        }
        let encoder = encoder_ctx.open_with(options)?;
        ost.set_parameters(&encoder);
        ost.set_time_base(encoder_time_base);

        octx.write_header()?;
        let stream_time_base = octx
            .stream(stream_index)
            .ok_or("FfmpegWriter: output stream missing after header")?
            .time_base();

        let scaler = scaling::Context::get(
            Pixel::RGB24,
            width,
            height,
            Pixel::YUV420P,
            width,
            height,
            scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Opened {} for {width}x{height} {} @ {fps} fps ({})",
            path.display(),
            profile.codec,
            profile.describe_options()
        );

        self.stream = Some(OpenStream {
            octx,
            encoder,
            scaler,
            encoder_time_base,
            stream_time_base,
            stream_index,
        });
        self.width = width;
        self.height = height;
        self.frame_count = 0;
        self.packets_written = 0;
        self.flushed = false;
        Ok(())
    }

    fn encode(&mut self, frame: &Frame) -> Result<usize, Box<dyn std::error::Error>> {
        let stream = self.stream.as_mut().ok_or("FfmpegWriter: not opened")?;
        if self.flushed {
            return Err("FfmpegWriter: encode after flush".into());
        }
        if frame.format() != PixelFormat::Rgb24 {
            return Err("FfmpegWriter: expected an RGB frame".into());
        }
        if frame.dimensions() != (self.width, self.height) {
            return Err(format!(
                "Frame is {}x{}, stream was opened at {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )
            .into());
        }

        let mut rgb_frame = VideoFrame::new(Pixel::RGB24, self.width, self.height);
        let stride = rgb_frame.stride(0);
        let row_bytes = self.width as usize * 3;
        let dst = rgb_frame.data_mut(0);
        for (row, src_row) in frame.data().chunks_exact(row_bytes).enumerate() {
            let start = row * stride;
            dst[start..start + row_bytes].copy_from_slice(src_row);
        }

        let mut yuv_frame = VideoFrame::empty();
        stream.scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));

        stream.encoder.send_frame(&yuv_frame)?;
        let written = Self::drain(stream)?;

        self.frame_count += 1;
        self.packets_written += written;
        Ok(written)
    }

    fn flush(&mut self) -> Result<usize, Box<dyn std::error::Error>> {
        let stream = self.stream.as_mut().ok_or("FfmpegWriter: not opened")?;
        if self.flushed {
            return Ok(0);
        }
        stream.encoder.send_eof()?;
        let written = Self::drain(stream)?;
        self.flushed = true;
        self.packets_written += written;
        Ok(written)
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.stream.is_none() {
            return Ok(());
        }
        if !self.flushed {
            log::warn!("FfmpegWriter closed without flush; draining encoder first");
            self.flush()?;
        }
        if let Some(mut stream) = self.stream.take() {
            stream.octx.write_trailer()?;
        }
        Ok(())
    }
}
