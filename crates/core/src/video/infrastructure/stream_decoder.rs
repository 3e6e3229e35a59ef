use std::path::Path;

use ffmpeg_next::format::context::Input;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video as VideoFrame;

use crate::shared::frame::Frame;

/// Packet-to-RGB decode loop over the best video stream of one input.
///
/// Shared by the sequential reader and the timestamp seeker. Each decoded
/// picture comes out as a packed RGB [`Frame`] with its presentation time
/// in seconds.
pub(crate) struct StreamDecoder {
    ictx: Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    stream_index: usize,
    time_base: f64,
    fps: f64,
    width: u32,
    height: u32,
    frames_decoded: usize,
    /// Seek target awaiting the first post-seek frame, which re-derives
    /// `frames_decoded`.
    resync: Option<f64>,
    eof_sent: bool,
}

impl StreamDecoder {
    pub(crate) fn open(path: &Path) -> Result<Self, ffmpeg_next::Error> {
        ffmpeg_next::init()?;
        let ictx = ffmpeg_next::format::input(path)?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or(ffmpeg_next::Error::StreamNotFound)?;

        let stream_index = stream.index();
        let time_base = f64::from(stream.time_base());
        let fps = stream_fps(&stream);
        let frames_hint = stream.frames().max(0) as usize;
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;
        let scaler = scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg_next::format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            scaling::Flags::BILINEAR,
        )?;
        let (width, height) = (decoder.width(), decoder.height());
        log::debug!(
            "Decoding {} ({width}x{height}, {fps:.2} fps, ~{frames_hint} frames)",
            path.display()
        );

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base,
            fps,
            width,
            height,
            frames_decoded: 0,
            resync: None,
            eof_sent: false,
        })
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn fps(&self) -> f64 {
        self.fps
    }

    /// Codec name and container frame count hint of the decoded stream.
    pub(crate) fn stream_info(&self) -> (String, usize) {
        let codec = self
            .decoder
            .codec()
            .map(|c| c.name().to_string())
            .unwrap_or_default();
        let frames = self
            .ictx
            .stream(self.stream_index)
            .map(|s| s.frames().max(0) as usize)
            .unwrap_or(0);
        (codec, frames)
    }

    /// Next picture in presentation order, or `None` once the stream and
    /// the decoder's internal queue are both exhausted.
    ///
    /// The returned time is also stamped on the frame when it is known;
    /// an unknown time is reported as 0.
    pub(crate) fn next_frame(&mut self) -> Result<Option<(f64, Frame)>, ffmpeg_next::Error> {
        loop {
            if let Some(decoded) = self.receive()? {
                return Ok(Some(decoded));
            }
            if self.eof_sent {
                return Ok(None);
            }

            match self.ictx.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() == self.stream_index {
                        self.decoder.send_packet(&packet)?;
                    }
                }
                None => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
            }
        }
    }

    /// Repositions at the keyframe at or before `timestamp` seconds and
    /// drops everything the decoder was holding.
    pub(crate) fn seek(&mut self, timestamp: f64) -> Result<(), ffmpeg_next::Error> {
        let target = (timestamp.max(0.0) * f64::from(ffmpeg_next::ffi::AV_TIME_BASE)) as i64;
        self.ictx.seek(target, ..target)?;
        self.decoder.flush();
        self.resync = Some(timestamp.max(0.0));
        self.eof_sent = false;
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<(f64, Frame)>, ffmpeg_next::Error> {
        let mut decoded = VideoFrame::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let pts_seconds = decoded
            .timestamp()
            .or_else(|| decoded.pts())
            .map(|pts| pts as f64 * self.time_base);
        if let Some(target) = self.resync.take() {
            self.frames_decoded = self.index_at(pts_seconds.unwrap_or(target));
        }
        let seconds = pts_seconds
            .or_else(|| (self.fps > 0.0).then(|| self.frames_decoded as f64 / self.fps));

        let mut rgb = VideoFrame::empty();
        self.scaler.run(&decoded, &mut rgb)?;
        let mut frame = Frame::rgb(
            packed_rgb(&rgb, self.width, self.height),
            self.width,
            self.height,
            self.frames_decoded,
        );
        if let Some(seconds) = seconds {
            frame = frame.with_timestamp(seconds);
        }
        self.frames_decoded += 1;
        Ok(Some((seconds.unwrap_or(0.0), frame)))
    }

    fn index_at(&self, seconds: f64) -> usize {
        if self.fps > 0.0 {
            (seconds * self.fps).round().max(0.0) as usize
        } else {
            0
        }
    }
}

/// Average frame rate, falling back to the stream's base rate.
fn stream_fps(stream: &ffmpeg_next::format::stream::Stream) -> f64 {
    [stream.avg_frame_rate(), stream.rate()]
        .into_iter()
        .find(|r| r.numerator() != 0 && r.denominator() != 0)
        .map(f64::from)
        .unwrap_or(0.0)
}

/// Strips per-row stride padding from an RGB24 picture.
fn packed_rgb(rgb: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb.stride(0);
    let plane = rgb.data(0);
    let row_bytes = width as usize * 3;
    (0..height as usize)
        .flat_map(|row| &plane[row * stride..row * stride + row_bytes])
        .copied()
        .collect()
}
