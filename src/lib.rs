//! flowgauge
//!
//! Video-to-velocity estimation pipeline for flood monitoring dashboards:
//! sample frame pairs from a seekable video source, run them through an
//! optical-flow model, convert the displacement field into a physically
//! calibrated velocity, and aggregate a bounded sequence of estimates into
//! one representative value for downstream classification.
//!
//! # Architecture
//!
//! Data flows one direction:
//!
//! ```text
//! VideoSource -> Preprocessor -> FlowBackend -> FlowSampler
//!             -> VelocityEstimator -> { OverlayRenderer, caller }
//! ```
//!
//! - `source`: seekable frame sources (synthetic stub, frame sequences)
//! - `preprocess`: pixel-interleaved frames to channel-major tensors
//! - `model`: flow backend trait, stub/tract implementations, shared session
//! - `sampler`: grid magnitude sampling, nearest-rank percentiles
//! - `estimator`: orchestration state machine and aggregation
//! - `overlay`: presentational vector rendering of the flow field
//! - `classify`: threshold classification of the representative velocity
//!
//! The flow model itself is an external collaborator: the crate only shapes
//! tensors into its declared inputs and reads the displacement field back.
//! Persistence, authentication, and notification dispatch live outside this
//! crate.

pub mod classify;
pub mod config;
pub mod error;
pub mod estimator;
pub mod frame;
pub mod model;
pub mod overlay;
pub mod preprocess;
pub mod sampler;
pub mod source;

pub use classify::{classify, Classification, RiskLevel};
pub use config::{GaugeConfig, ModelSettings, SourceSettings, ThresholdSettings};
pub use error::PipelineError;
pub use estimator::{AnalysisRequest, AnalysisResult, DtStats, VelocityEstimator};
pub use frame::{FrameSize, PixelFormat, RasterFrame, Tensor};
#[cfg(feature = "backend-tract")]
pub use model::TractFlowBackend;
pub use model::{
    invalidate_session, shared_session, FlowBackend, FlowField, InputArity, SharedFlowModel,
    StubFlowBackend,
};
pub use overlay::{BufferSink, OverlaySink};
pub use sampler::{percentile, sample_magnitude, MagnitudeStats};
#[cfg(feature = "image-io")]
pub use source::ImageSequenceSource;
pub use source::{
    PlaybackState, SyntheticConfig, SyntheticSource, VideoMetadata, VideoSource, SEEK_TIMEOUT,
};
