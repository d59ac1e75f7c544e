//! Frame and tensor value types.
//!
//! - `RasterFrame`: one decoded frame at a capture timestamp. Frames are
//!   moved into preprocessing and dropped once the paired flow computation
//!   completes; the estimator keeps at most two frames' worth of data alive.
//! - `Tensor`: channel-major numeric buffer fed to the flow model.

/// Pixel layout of a raster frame buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// Capture dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// Derive the capture size from the source's native aspect ratio and a
    /// target width. Height is rounded and never drops below 1.
    pub fn for_target_width(native_width: u32, native_height: u32, target_width: u32) -> Self {
        let ratio = native_height as f64 / native_width.max(1) as f64;
        let width = target_width.max(1);
        let height = ((width as f64 * ratio).round() as u32).max(1);
        Self { width, height }
    }
}

/// One decoded frame, owned by the step that captured it.
#[derive(Clone, Debug)]
pub struct RasterFrame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Media timestamp of the capture, in seconds.
    pub timestamp: f64,
}

impl RasterFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat, timestamp: f64) -> Self {
        // Sources always rasterize at the configured fixed size; a mismatch
        // here is a programming error, not a runtime failure.
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * format.bytes_per_pixel()
        );
        Self {
            data,
            width,
            height,
            format,
            timestamp,
        }
    }

    /// Interleaved pixel bytes in the declared format.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }
}

/// Channel-major `f32` buffer with shape `(channels, height, width)`,
/// values normalized to [0,1].
#[derive(Clone, Debug)]
pub struct Tensor {
    channels: usize,
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl Tensor {
    pub(crate) fn from_parts(channels: usize, height: usize, width: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), channels * height * width);
        Self {
            channels,
            height,
            width,
            data,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.channels, self.height, self.width)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}
