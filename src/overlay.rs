//! Flow-field overlay rendering.
//!
//! Purely presentational: draws sampled displacement vectors as directed
//! segments scaled into a sink's pixel space. Skipped entirely when the
//! caller supplies no sink; never affects the numeric result.

use crate::model::FlowField;

/// Minimum magnitude (model units) worth drawing.
const DRAW_EPSILON: f32 = 0.01;
/// Magnitude above which a vector uses the fast color.
const FAST_THRESHOLD: f32 = 1.5;
/// Bound on overlay grid columns; denser than the statistics grid for
/// visual coverage.
const OVERLAY_GRID: usize = 28;

/// RGBA color.
pub type Color = [u8; 4];

pub const NORMAL_COLOR: Color = [34, 197, 94, 255];
pub const FAST_COLOR: Color = [239, 68, 68, 255];

/// A raster surface that can receive overlay vectors. Sized independently
/// from the video.
pub trait OverlaySink {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Draw a directed segment in sink pixel coordinates.
    fn draw_vector(&mut self, from: (f32, f32), to: (f32, f32), color: Color);
}

/// Draw the displacement field onto a sink, one segment per sampled grid
/// point with a visible magnitude.
pub fn draw_flow(field: &FlowField, sink: &mut dyn OverlaySink) {
    if field.width == 0 || field.height == 0 {
        return;
    }
    let stride = (field.width / OVERLAY_GRID).max(1);
    let scale_x = sink.width() as f32 / field.width as f32;
    let scale_y = sink.height() as f32 / field.height as f32;

    let mut y = 0;
    while y < field.height {
        let mut x = 0;
        while x < field.width {
            let (dx, dy) = field.vector_at(x, y);
            let magnitude = (dx * dx + dy * dy).sqrt();
            if magnitude >= DRAW_EPSILON {
                let color = if magnitude > FAST_THRESHOLD {
                    FAST_COLOR
                } else {
                    NORMAL_COLOR
                };
                let from = (x as f32 * scale_x, y as f32 * scale_y);
                let to = ((x as f32 + dx) * scale_x, (y as f32 + dy) * scale_y);
                sink.draw_vector(from, to, color);
            }
            x += stride;
        }
        y += stride;
    }
}

/// RGBA framebuffer sink with simple line rasterization.
pub struct BufferSink {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl BufferSink {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; width as usize * height as usize * 4],
        }
    }

    /// Interleaved RGBA bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn put(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[idx..idx + 4].copy_from_slice(&color);
    }
}

impl OverlaySink for BufferSink {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn draw_vector(&mut self, from: (f32, f32), to: (f32, f32), color: Color) {
        // Bresenham between rounded endpoints.
        let (mut x0, mut y0) = (from.0.round() as i64, from.1.round() as i64);
        let (x1, y1) = (to.0.round() as i64, to.1.round() as i64);

        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.put(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingSink {
        width: u32,
        height: u32,
        segments: Vec<((f32, f32), (f32, f32), Color)>,
    }

    impl RecordingSink {
        fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                segments: Vec::new(),
            }
        }
    }

    impl OverlaySink for RecordingSink {
        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn draw_vector(&mut self, from: (f32, f32), to: (f32, f32), color: Color) {
            self.segments.push((from, to, color));
        }
    }

    #[test]
    fn still_field_draws_nothing() {
        let field = FlowField::new(28, 28, vec![0.0; 28 * 28], vec![0.005; 28 * 28]);
        let mut sink = RecordingSink::new(100, 100);
        draw_flow(&field, &mut sink);
        assert!(sink.segments.is_empty());
    }

    #[test]
    fn color_follows_magnitude_threshold() {
        let slow = FlowField::new(1, 1, vec![1.0], vec![0.0]);
        let fast = FlowField::new(1, 1, vec![2.0], vec![0.0]);
        let mut sink = RecordingSink::new(10, 10);

        draw_flow(&slow, &mut sink);
        draw_flow(&fast, &mut sink);

        assert_eq!(sink.segments[0].2, NORMAL_COLOR);
        assert_eq!(sink.segments[1].2, FAST_COLOR);
    }

    #[test]
    fn segments_scale_to_sink_dimensions() {
        // One 2x1 field pixel mapped onto a 200x100 sink.
        let field = FlowField::new(2, 1, vec![1.0, 0.0], vec![0.0, 0.0]);
        let mut sink = RecordingSink::new(200, 100);
        draw_flow(&field, &mut sink);

        let (from, to, _) = sink.segments[0];
        assert_eq!(from, (0.0, 0.0));
        assert_eq!(to, (100.0, 0.0));
    }

    #[test]
    fn buffer_sink_rasterizes_segments() {
        let mut sink = BufferSink::new(8, 8);
        sink.draw_vector((0.0, 0.0), (7.0, 0.0), FAST_COLOR);

        // First row painted, second row untouched.
        assert_eq!(&sink.pixels()[0..4], &FAST_COLOR);
        assert_eq!(&sink.pixels()[7 * 4..8 * 4], &FAST_COLOR);
        assert_eq!(&sink.pixels()[8 * 4..9 * 4], &[0, 0, 0, 0]);
    }
}
