//! Velocity estimation orchestrator.
//!
//! Drives FrameSource → Preprocessor → FlowModel → FlowSampler across a
//! bounded sequence of frame pairs, converts grid-magnitude percentiles into
//! physical velocity, and aggregates the per-pair sequence into a single
//! result. One logical thread of control per run: capture, infer, sample,
//! next capture, strictly in sequence. No operation is retried internally; a
//! failed run must be re-invoked from scratch.

use std::time::Instant;

use serde::Serialize;

use crate::error::PipelineError;
use crate::frame::{FrameSize, Tensor};
use crate::model::SharedFlowModel;
use crate::overlay::{self, OverlaySink};
use crate::preprocess;
use crate::sampler;
use crate::source::{VideoMetadata, VideoSource};

/// Caller-supplied parameters for one analysis run. Immutable for the
/// duration of the run.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct AnalysisRequest {
    /// Calibration factor converting pixel displacement to meters.
    pub meters_per_pixel: f64,
    /// Nominal source frame rate; floors every recorded dt at `1/fps_hint`.
    pub fps_hint: f64,
    /// Requested spacing between sampled frames, in milliseconds.
    pub sample_interval_ms: f64,
    /// Maximum number of frame pairs per run.
    pub max_pairs: u32,
    /// Capture width; height derives from the source's native aspect ratio.
    pub target_width: u32,
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        Self {
            meters_per_pixel: 0.01,
            fps_hint: 24.0,
            sample_interval_ms: 120.0,
            max_pairs: 24,
            target_width: 384,
        }
    }
}

impl AnalysisRequest {
    /// Reject invalid parameters before the run enters `Preparing`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.meters_per_pixel.is_finite() && self.meters_per_pixel > 0.0) {
            return Err(PipelineError::invalid("meters_per_pixel must be positive"));
        }
        if !(self.fps_hint.is_finite() && self.fps_hint > 0.0) {
            return Err(PipelineError::invalid("fps_hint must be positive"));
        }
        if !(self.sample_interval_ms.is_finite() && self.sample_interval_ms > 0.0) {
            return Err(PipelineError::invalid("sample_interval_ms must be positive"));
        }
        if self.max_pairs < 1 {
            return Err(PipelineError::invalid("max_pairs must be at least 1"));
        }
        if self.target_width < 1 {
            return Err(PipelineError::invalid("target_width must be at least 1"));
        }
        Ok(())
    }

    /// Media-time spacing of sample points.
    fn step_seconds(&self) -> f64 {
        (self.sample_interval_ms / 1000.0).max(1.0 / self.fps_hint)
    }

    /// Floor for every recorded inter-frame delta.
    fn min_dt(&self) -> f64 {
        1.0 / self.fps_hint
    }
}

/// Timing statistics over the recorded inter-frame deltas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DtStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Result of one analysis run. Immutable after construction.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisResult {
    /// Per-pair velocities in m/s, in capture order.
    pub velocities: Vec<f64>,
    /// Arithmetic mean of the sequence; 0 when empty.
    pub average: f64,
    /// Nearest-rank 95th percentile of the sequence; the representative
    /// value for downstream classification.
    pub p95: f64,
    pub max: f64,
    /// Number of frame pairs that produced a velocity sample.
    pub frames_used: u32,
    pub dt_stats: DtStats,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    Idle,
    Preparing,
    Sampling(u32),
    Aggregating,
    Done,
    Failed,
}

fn transition(state: &mut RunState, next: RunState) {
    log::debug!("estimator: {:?} -> {:?}", state, next);
    *state = next;
}

/// Orchestrates one analysis run over a video source.
pub struct VelocityEstimator {
    model: SharedFlowModel,
}

impl VelocityEstimator {
    pub fn new(model: SharedFlowModel) -> Self {
        Self { model }
    }

    /// Run one analysis sweep.
    ///
    /// Playback position and paused state are snapshotted before the sweep
    /// and restored on every exit path, success or failure. The caller must
    /// not share the source or sink with a concurrent run.
    pub fn analyze(
        &self,
        request: &AnalysisRequest,
        source: &mut dyn VideoSource,
        overlay: Option<&mut dyn OverlaySink>,
    ) -> Result<AnalysisResult, PipelineError> {
        let mut state = RunState::Idle;
        request.validate()?;
        transition(&mut state, RunState::Preparing);

        let metadata = source.metadata()?;
        let saved = source.playback_state();

        let outcome = self.sweep(request, &metadata, source, overlay, &mut state);

        if let Err(err) = source.set_playback_state(&saved) {
            log::warn!("failed to restore playback state: {err}");
        }

        match &outcome {
            Ok(result) => {
                transition(&mut state, RunState::Done);
                log::info!(
                    "analysis done: {} pairs, p95={:.3} m/s, max={:.3} m/s",
                    result.frames_used,
                    result.p95,
                    result.max
                );
            }
            Err(err) => {
                transition(&mut state, RunState::Failed);
                log::warn!("analysis failed: {err}");
            }
        }
        outcome
    }

    fn sweep(
        &self,
        request: &AnalysisRequest,
        metadata: &VideoMetadata,
        source: &mut dyn VideoSource,
        mut overlay: Option<&mut dyn OverlaySink>,
        state: &mut RunState,
    ) -> Result<AnalysisResult, PipelineError> {
        source.pause()?;

        let target = FrameSize::for_target_width(
            metadata.native_width,
            metadata.native_height,
            request.target_width,
        );
        let step = request.step_seconds();

        let mut velocities: Vec<f64> = Vec::with_capacity(request.max_pairs as usize);
        let mut deltas: Vec<f64> = Vec::with_capacity(request.max_pairs as usize);
        // Two-slot frame window: previous is replaced each iteration, never
        // accumulated.
        let mut previous: Option<(Tensor, Instant)> = None;

        for i in 0..=request.max_pairs {
            transition(state, RunState::Sampling(i));
            let t = (i as f64 * step).min(metadata.duration);
            let frame = source.await_frame_ready(t, target)?;
            let captured_at = Instant::now();
            let tensor = preprocess::to_tensor(&frame);
            drop(frame);

            if let Some((prev_tensor, prev_captured_at)) = previous.take() {
                let elapsed = captured_at.duration_since(prev_captured_at).as_secs_f64();
                let dt = elapsed.max(request.min_dt());

                let field = {
                    let mut backend = self.model.lock().map_err(|_| {
                        PipelineError::model_unavailable("flow backend lock poisoned")
                    })?;
                    backend
                        .infer(&prev_tensor, &tensor)
                        .map_err(|err| PipelineError::ModelUnavailable {
                            reason: format!("inference failed: {err:#}"),
                        })?
                };

                let stats = sampler::sample_magnitude(&field);
                let velocity = stats.p90 as f64 * request.meters_per_pixel / dt;
                log::debug!(
                    "pair {}: t={:.3}s dt={:.4}s p90={:.3} -> {:.3} m/s",
                    i,
                    t,
                    dt,
                    stats.p90,
                    velocity
                );
                velocities.push(velocity);
                deltas.push(dt);

                if let Some(sink) = overlay.as_mut() {
                    overlay::draw_flow(&field, &mut **sink);
                }
            }

            previous = Some((tensor, captured_at));
        }

        transition(state, RunState::Aggregating);
        Ok(aggregate(velocities, &deltas))
    }
}

fn aggregate(velocities: Vec<f64>, deltas: &[f64]) -> AnalysisResult {
    let frames_used = velocities.len() as u32;

    let average = if velocities.is_empty() {
        0.0
    } else {
        velocities.iter().sum::<f64>() / velocities.len() as f64
    };

    let mut sorted = velocities.clone();
    sorted.sort_by(f64::total_cmp);
    let p95 = sampler::percentile(&sorted, 0.95);
    let max = sorted.last().copied().unwrap_or(0.0);

    let dt_stats = if deltas.is_empty() {
        DtStats::default()
    } else {
        DtStats {
            mean: deltas.iter().sum::<f64>() / deltas.len() as f64,
            min: deltas.iter().copied().fold(f64::INFINITY, f64::min),
            max: deltas.iter().copied().fold(0.0, f64::max),
        }
    };

    AnalysisResult {
        velocities,
        average,
        p95,
        max,
        frames_used,
        dt_stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_conversion_matches_calibration() {
        // p90 = 10 model units, 0.01 m/px, dt = 0.5 s -> 0.2 m/s.
        let velocity = 10.0f32 as f64 * 0.01 / 0.5;
        assert!((velocity - 0.2).abs() < 1e-12);
    }

    #[test]
    fn aggregate_of_empty_sequence_is_all_zero() {
        let result = aggregate(Vec::new(), &[]);
        assert_eq!(result.frames_used, 0);
        assert_eq!(result.average, 0.0);
        assert_eq!(result.p95, 0.0);
        assert_eq!(result.max, 0.0);
        assert_eq!(result.dt_stats, DtStats::default());
    }

    #[test]
    fn aggregate_orders_p95_below_max() {
        let result = aggregate(vec![0.4, 0.1, 0.9, 0.3], &[0.2, 0.2, 0.2]);
        assert_eq!(result.frames_used, 4);
        assert!(result.p95 <= result.max);
        assert_eq!(result.max, 0.9);
        // Nearest rank: floor(0.95 * 3) = 2 over [0.1, 0.3, 0.4, 0.9].
        assert_eq!(result.p95, 0.4);
        assert!((result.average - 0.425).abs() < 1e-12);
    }

    #[test]
    fn step_seconds_never_undercuts_frame_interval() {
        let request = AnalysisRequest {
            fps_hint: 5.0,
            sample_interval_ms: 50.0,
            ..AnalysisRequest::default()
        };
        assert!((request.step_seconds() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_parameters() {
        let bad = AnalysisRequest {
            meters_per_pixel: 0.0,
            ..AnalysisRequest::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(PipelineError::InvalidConfiguration { .. })
        ));

        let bad = AnalysisRequest {
            max_pairs: 0,
            ..AnalysisRequest::default()
        };
        assert!(bad.validate().is_err());

        let bad = AnalysisRequest {
            sample_interval_ms: f64::NAN,
            ..AnalysisRequest::default()
        };
        assert!(bad.validate().is_err());
    }
}
