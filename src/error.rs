//! Failure taxonomy for the analysis pipeline.
//!
//! Every fatal condition aborts the run with one of these variants; the
//! pipeline never panics the process over a runtime failure. Playback-state
//! restoration happens before the error is surfaced. Logging of failures is
//! a caller concern.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The video decoder did not settle within the seek timeout.
    /// Fatal for the run; never retried internally.
    #[error("seek to t={timestamp:.3}s did not settle within {timeout_ms}ms")]
    SeekTimeout { timestamp: f64, timeout_ms: u64 },

    /// The flow model session could not be established or used.
    /// The message is human-actionable (missing artifact, blocked fetch).
    #[error("flow model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    /// Rejected before the run enters `Preparing`.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// Decoder or readback failure inside the video source boundary.
    #[error("video source failure: {0}")]
    Source(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub fn model_unavailable(reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            reason: reason.into(),
        }
    }
}
