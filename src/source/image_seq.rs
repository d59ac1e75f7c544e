//! Frame-sequence source: a directory of numbered JPEG/PNG frames
//! interpreted at a fixed frame rate.
//!
//! Seeking maps a timestamp to a frame index; each capture decodes one file
//! and resizes it to the requested target size. Decoding is local-only; the
//! source never fetches remote URLs.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;

use crate::error::PipelineError;
use crate::frame::{FrameSize, PixelFormat, RasterFrame};
use crate::source::{PlaybackState, VideoMetadata, VideoSource, SEEK_TIMEOUT};

/// Local frame-sequence source.
pub struct ImageSequenceSource {
    frames: Vec<PathBuf>,
    fps: f64,
    native_width: u32,
    native_height: u32,
    position: f64,
    paused: bool,
}

impl ImageSequenceSource {
    /// List and sort the frame files, probing dimensions from the first one.
    pub fn new(dir: &Path, fps: f64) -> Result<Self> {
        if fps <= 0.0 {
            return Err(anyhow!("frame-sequence fps must be positive"));
        }
        let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read frame directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("jpg") | Some("jpeg") | Some("png")
                )
            })
            .collect();
        frames.sort();
        if frames.is_empty() {
            return Err(anyhow!("no jpg/png frames found in {}", dir.display()));
        }

        let (native_width, native_height) = image::image_dimensions(&frames[0])
            .with_context(|| format!("failed to probe {}", frames[0].display()))?;

        log::info!(
            "ImageSequenceSource: {} frames at {} fps from {}",
            frames.len(),
            fps,
            dir.display()
        );

        Ok(Self {
            frames,
            fps,
            native_width,
            native_height,
            position: 0.0,
            paused: false,
        })
    }

    fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.fps
    }
}

impl VideoSource for ImageSequenceSource {
    fn metadata(&mut self) -> Result<VideoMetadata, PipelineError> {
        Ok(VideoMetadata {
            duration: self.duration(),
            native_width: self.native_width,
            native_height: self.native_height,
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
        let started = Instant::now();
        let t = timestamp.clamp(0.0, self.duration());
        self.position = t;

        let index = ((t * self.fps).floor() as usize).min(self.frames.len() - 1);
        let path = &self.frames[index];
        let decoded = image::open(path)
            .with_context(|| format!("failed to decode {}", path.display()))?
            .to_rgba8();
        let resized = image::imageops::resize(
            &decoded,
            target.width,
            target.height,
            FilterType::Triangle,
        );

        if started.elapsed() > SEEK_TIMEOUT {
            return Err(PipelineError::SeekTimeout {
                timestamp,
                timeout_ms: SEEK_TIMEOUT.as_millis() as u64,
            });
        }

        Ok(RasterFrame::new(
            resized.into_raw(),
            target.width,
            target.height,
            PixelFormat::Rgba,
            t,
        ))
    }
}
