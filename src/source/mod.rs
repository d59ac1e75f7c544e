//! Video sources.
//!
//! This module provides seekable sources of raster frames:
//! - Synthetic frames (`stub://` URIs) for tests and dry runs
//! - Numbered frame sequences on disk (feature: image-io)
//!
//! A source is responsible for:
//! - Reporting duration and native dimensions
//! - Accepting a seek request and blocking until the decoder settles
//! - Rasterizing the settled frame at the requested capture size
//!
//! The seek/decode timeout policy lives entirely inside implementations of
//! `await_frame_ready`; the orchestration layer never retries a seek.
//!
//! Sources carry playback state (position, paused). Callers that sweep a
//! source snapshot that state first and restore it afterward, so no two
//! analysis runs may share one source concurrently.

use std::time::Duration;

use crate::config::SourceSettings;
use crate::error::PipelineError;
use crate::frame::{FrameSize, RasterFrame};

pub mod synthetic;

#[cfg(feature = "image-io")]
pub mod image_seq;

pub use synthetic::{SyntheticConfig, SyntheticSource};

#[cfg(feature = "image-io")]
pub use image_seq::ImageSequenceSource;

/// Upper bound on a single seek-and-decode settle.
pub const SEEK_TIMEOUT: Duration = Duration::from_secs(4);

/// Source metadata, available once the decoder has reported it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoMetadata {
    /// Duration in seconds. Always > 0 once `metadata()` returns.
    pub duration: f64,
    pub native_width: u32,
    pub native_height: u32,
}

/// Playback position and paused flag, snapshotted before an analysis sweep
/// and restored afterward on every exit path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackState {
    pub position: f64,
    pub paused: bool,
}

/// A seekable video stream.
pub trait VideoSource {
    /// Report duration and native dimensions, blocking until the duration is
    /// known. Metadata is expected to be locally available; there is no
    /// timeout on this wait.
    fn metadata(&mut self) -> Result<VideoMetadata, PipelineError>;

    fn playback_state(&self) -> PlaybackState;

    fn set_playback_state(&mut self, state: &PlaybackState) -> Result<(), PipelineError>;

    /// Pause playback for the duration of a capture sweep so captures do not
    /// race the decoder.
    fn pause(&mut self) -> Result<(), PipelineError>;

    /// Seek to `timestamp` (clamped to `[0, duration]`), block until the
    /// decoder settles, and rasterize the settled frame at `target`.
    ///
    /// Implementations enforce `SEEK_TIMEOUT` and fail with
    /// `PipelineError::SeekTimeout` when the decoder does not settle in time.
    fn await_frame_ready(
        &mut self,
        timestamp: f64,
        target: FrameSize,
    ) -> Result<RasterFrame, PipelineError>;
}

/// Open a source for a configured URI.
///
/// `stub://` URIs map to the synthetic source; a plain local path is read as
/// a numbered frame sequence when the crate is built with `image-io`.
pub fn open(settings: &SourceSettings) -> Result<Box<dyn VideoSource>, PipelineError> {
    if settings.uri.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(SyntheticConfig {
            duration: settings.duration_secs,
            fps: settings.fps,
            native_width: settings.width,
            native_height: settings.height,
            seek_latency: Duration::ZERO,
        })));
    }

    if !settings.uri.contains("://") {
        #[cfg(feature = "image-io")]
        {
            let source =
                ImageSequenceSource::new(std::path::Path::new(&settings.uri), settings.fps)?;
            return Ok(Box::new(source));
        }
        #[cfg(not(feature = "image-io"))]
        {
            return Err(PipelineError::invalid(
                "frame-sequence sources require the image-io build",
            ));
        }
    }

    Err(PipelineError::invalid(format!(
        "unsupported source uri: {}",
        settings.uri
    )))
}
