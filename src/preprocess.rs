//! Pixel-to-tensor preprocessing.
//!
//! Deterministic, pure functions: normalize each channel to [0,1] and repack
//! from pixel-interleaved layout to channel-major layout. Input dimensions
//! are always produced by a `VideoSource` at the configured fixed size, so
//! shape mismatches are treated as programming errors.

use crate::frame::{RasterFrame, Tensor};

/// Repack an interleaved frame into a 3-channel, channel-major tensor with
/// values in [0,1]. Alpha, when present, is dropped.
pub fn to_tensor(frame: &RasterFrame) -> Tensor {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let bpp = frame.format.bytes_per_pixel();
    let pixels = frame.pixels();
    debug_assert_eq!(pixels.len(), width * height * bpp);

    let plane = width * height;
    let mut data = vec![0.0f32; 3 * plane];
    for i in 0..plane {
        let src = i * bpp;
        for c in 0..3 {
            data[c * plane + i] = pixels[src + c] as f32 / 255.0;
        }
    }
    Tensor::from_parts(3, height, width, data)
}

/// Concatenate two tensors along the channel axis.
///
/// Used only when the flow model declares a single stacked input instead of
/// two named inputs.
pub fn stack_pair(a: &Tensor, b: &Tensor) -> Tensor {
    debug_assert_eq!(a.shape(), b.shape());
    let mut data = Vec::with_capacity(a.data().len() + b.data().len());
    data.extend_from_slice(a.data());
    data.extend_from_slice(b.data());
    Tensor::from_parts(a.channels() + b.channels(), a.height(), a.width(), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;

    #[test]
    fn repacks_interleaved_rgba_to_channel_major() {
        // 2x1 frame: red pixel then blue pixel.
        let data = vec![255, 0, 0, 255, 0, 0, 255, 255];
        let frame = RasterFrame::new(data, 2, 1, PixelFormat::Rgba, 0.0);
        let tensor = to_tensor(&frame);

        assert_eq!(tensor.shape(), (3, 1, 2));
        // R plane, G plane, B plane.
        assert_eq!(tensor.data(), &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn normalizes_rgb_to_unit_range() {
        let frame = RasterFrame::new(vec![0, 51, 255], 1, 1, PixelFormat::Rgb, 0.0);
        let tensor = to_tensor(&frame);
        assert_eq!(tensor.data()[0], 0.0);
        assert!((tensor.data()[1] - 0.2).abs() < 1e-6);
        assert_eq!(tensor.data()[2], 1.0);
    }

    #[test]
    fn stack_pair_concatenates_channels() {
        let a = RasterFrame::new(vec![10, 20, 30], 1, 1, PixelFormat::Rgb, 0.0);
        let b = RasterFrame::new(vec![40, 50, 60], 1, 1, PixelFormat::Rgb, 0.1);
        let stacked = stack_pair(&to_tensor(&a), &to_tensor(&b));

        assert_eq!(stacked.shape(), (6, 1, 1));
        assert!((stacked.data()[0] - 10.0 / 255.0).abs() < 1e-6);
        assert!((stacked.data()[3] - 40.0 / 255.0).abs() < 1e-6);
    }
}
