use std::path::Path;

use crate::shared::frame::{Frame, PixelFormat};
use crate::video::domain::image_writer::ImageWriter;

/// Writes a single frame to an image file using the `image` crate.
///
/// The format follows the file extension. The file is replaced in place, so
/// repeated writes to one path always show the latest frame.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = match frame.format() {
            PixelFormat::Rgb24 => frame.data().to_vec(),
            PixelFormat::Bgr24 => frame.clone().into_rgb().data().to_vec(),
        };
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), data)
            .ok_or("Failed to create image from frame data")?;

        img.save(path)?;
        Ok(())
    }
}
