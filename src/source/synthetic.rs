//! Synthetic video source for tests and dry runs (`stub://` URIs).
//!
//! Frames are a pure function of the quantized timestamp, so repeated runs
//! over the same configuration produce identical pixels. An artificial seek
//! latency can be configured to exercise the seek-timeout path without real
//! waits.

use std::time::Duration;

use crate::error::PipelineError;
use crate::frame::{FrameSize, PixelFormat, RasterFrame};
use crate::source::{PlaybackState, VideoMetadata, VideoSource, SEEK_TIMEOUT};

/// Configuration for a synthetic source.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    /// Reported duration in seconds.
    pub duration: f64,
    /// Frame rate used to quantize timestamps into frame indices.
    pub fps: f64,
    pub native_width: u32,
    pub native_height: u32,
    /// Simulated decoder settle time per seek. Values above `SEEK_TIMEOUT`
    /// make every capture fail with `SeekTimeout`.
    pub seek_latency: Duration,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            duration: 5.0,
            fps: 24.0,
            native_width: 640,
            native_height: 480,
            seek_latency: Duration::ZERO,
        }
    }
}

/// Deterministic procedural video source.
pub struct SyntheticSource {
    config: SyntheticConfig,
    position: f64,
    paused: bool,
    frames_served: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        log::debug!(
            "SyntheticSource: {}s at {} fps, native {}x{}",
            config.duration,
            config.fps,
            config.native_width,
            config.native_height
        );
        Self {
            config,
            position: 0.0,
            paused: false,
            frames_served: 0,
        }
    }

    /// Number of frames rasterized so far. Used by tests to check capture
    /// accounting.
    pub fn frames_served(&self) -> u64 {
        self.frames_served
    }

    /// Drifting horizontal gradient; pure function of the frame index.
    fn render(&self, frame_index: u64, target: FrameSize) -> Vec<u8> {
        let width = target.width as usize;
        let height = target.height as usize;
        let shift = (frame_index * 3) % 256;
        let mut pixels = vec![0u8; width * height * 4];
        for y in 0..height {
            for x in 0..width {
                let base = ((x as u64 + shift) % 256) as u8;
                let idx = (y * width + x) * 4;
                pixels[idx] = base;
                pixels[idx + 1] = ((y as u64 * 7 + shift) % 256) as u8;
                pixels[idx + 2] = base.wrapping_add(64);
                pixels[idx + 3] = 255;
            }
        }
        pixels
    }
}

impl VideoSource for SyntheticSource {
    fn metadata(&mut self) -> Result<VideoMetadata, PipelineError> {
        Ok(VideoMetadata {
            duration: self.config.duration,
            native_width: self.config.native_width,
            native_height: self.config.native_height,
        })
    }

    fn playback_state(&self) -> PlaybackState {
        PlaybackState {
            position: self.position,
            paused: self.paused,
        }
    }

    fn set_playback_state(&mut self, state: &PlaybackState) -> Result<(), PipelineError> {
        self.position = state.position;
        self.paused = state.paused;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PipelineError> {
        self.paused = true;
        Ok(())
    }

    fn await_frame_ready(
        &mut self,
        timestamp: f64,
        target: FrameSize,
    ) -> Result<RasterFrame, PipelineError> {
        if self.config.seek_latency > SEEK_TIMEOUT {
            return Err(PipelineError::SeekTimeout {
                timestamp,
                timeout_ms: SEEK_TIMEOUT.as_millis() as u64,
            });
        }

        let t = timestamp.clamp(0.0, self.config.duration);
        self.position = t;
        let frame_index = (t * self.config.fps).floor() as u64;
        self.frames_served += 1;

        Ok(RasterFrame::new(
            self.render(frame_index, target),
            target.width,
            target.height,
            PixelFormat::Rgba,
            t,
        ))
    }
}
