use ndarray::{ArrayView3, ArrayViewMut3, Axis};

/// Byte order of the color channels in a [`Frame`].
///
/// Decoders in this crate produce RGB. Producers that follow the OpenCV
/// convention hand over BGR, and the encoder converts at the boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
}

/// A single decoded image: contiguous 3-channel bytes in row-major order.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    index: usize,
    /// Presentation time in seconds, when the source knows it.
    timestamp: Option<f64>,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * 3,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            format,
            index,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, seconds: f64) -> Self {
        self.timestamp = Some(seconds);
        self
    }

    pub fn rgb(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        Self::new(data, width, height, PixelFormat::Rgb24, index)
    }

    pub fn bgr(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        Self::new(data, width, height, PixelFormat::Bgr24, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        3
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Consumes the frame and returns it with RGB channel order,
    /// swapping red and blue in place when the source is BGR.
    pub fn into_rgb(mut self) -> Frame {
        if self.format == PixelFormat::Bgr24 {
            for mut pixel in self.as_ndarray_mut().lanes_mut(Axis(2)) {
                pixel.swap(0, 2);
            }
            self.format = PixelFormat::Rgb24;
        }
        self
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        let shape = self.shape();
        ArrayViewMut3::from_shape(shape, &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, 3)
    }
}
