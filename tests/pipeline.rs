use std::sync::{Arc, Mutex};
use std::time::Duration;

use flowgauge::{
    AnalysisRequest, FlowBackend, FlowField, InputArity, PipelineError, PlaybackState,
    SharedFlowModel, StubFlowBackend, SyntheticConfig, SyntheticSource, Tensor, VelocityEstimator,
    VideoSource,
};

fn stub_model(magnitude: f32) -> SharedFlowModel {
    Arc::new(Mutex::new(
        Box::new(StubFlowBackend::new(magnitude)) as Box<dyn FlowBackend>
    ))
}

fn five_second_source() -> SyntheticSource {
    SyntheticSource::new(SyntheticConfig {
        duration: 5.0,
        fps: 5.0,
        native_width: 640,
        native_height: 480,
        seek_latency: Duration::ZERO,
    })
}

fn one_second_request() -> AnalysisRequest {
    AnalysisRequest {
        meters_per_pixel: 0.02,
        fps_hint: 5.0,
        sample_interval_ms: 1000.0,
        max_pairs: 4,
        target_width: 64,
    }
}

#[test]
fn uniform_flow_end_to_end() {
    // 5 s synthetic video, 1 s sampling steps, uniform flow of magnitude 5:
    // every pair converts to (5 * 0.02) / 0.2 = 0.5 m/s.
    let mut source = five_second_source();
    let estimator = VelocityEstimator::new(stub_model(5.0));

    let result = estimator
        .analyze(&one_second_request(), &mut source, None)
        .expect("analysis");

    assert_eq!(result.frames_used, 4);
    assert_eq!(result.velocities.len(), 4);
    for velocity in &result.velocities {
        assert!((velocity - 0.5).abs() < 1e-9, "velocity {velocity}");
    }
    assert!((result.average - 0.5).abs() < 1e-9);
    assert!((result.p95 - 0.5).abs() < 1e-9);
    assert!((result.max - 0.5).abs() < 1e-9);
    assert!(result.p95 <= result.max);
}

#[test]
fn dt_is_floored_at_the_frame_interval() {
    let mut source = five_second_source();
    let estimator = VelocityEstimator::new(stub_model(1.0));

    let result = estimator
        .analyze(&one_second_request(), &mut source, None)
        .expect("analysis");

    // Captures settle far faster than 1/fps_hint, so every recorded dt is
    // exactly the floor.
    assert!((result.dt_stats.min - 0.2).abs() < 1e-9);
    assert!((result.dt_stats.max - 0.2).abs() < 1e-9);
    assert!((result.dt_stats.mean - 0.2).abs() < 1e-9);
}

#[test]
fn frames_used_never_exceeds_max_pairs() {
    // A 1 s video cannot fill a 10-pair sweep without clamped timestamps;
    // the pair count is still bounded and capture accounting holds.
    let mut source = SyntheticSource::new(SyntheticConfig {
        duration: 1.0,
        fps: 5.0,
        ..SyntheticConfig::default()
    });
    let request = AnalysisRequest {
        fps_hint: 5.0,
        sample_interval_ms: 1000.0,
        max_pairs: 10,
        target_width: 64,
        ..AnalysisRequest::default()
    };
    let estimator = VelocityEstimator::new(stub_model(1.0));

    let result = estimator
        .analyze(&request, &mut source, None)
        .expect("analysis");

    assert_eq!(result.frames_used, 10);
    assert_eq!(source.frames_served(), 11);
    assert_eq!(result.frames_used as u64, source.frames_served() - 1);
}

#[test]
fn identical_runs_yield_identical_results() {
    let estimator = VelocityEstimator::new(stub_model(5.0));
    let request = one_second_request();

    let mut first_source = five_second_source();
    let first = estimator
        .analyze(&request, &mut first_source, None)
        .expect("first run");

    let mut second_source = five_second_source();
    let second = estimator
        .analyze(&request, &mut second_source, None)
        .expect("second run");

    assert_eq!(first.velocities, second.velocities);
    assert_eq!(first.average, second.average);
    assert_eq!(first.p95, second.p95);
    assert_eq!(first.max, second.max);
    assert_eq!(first.frames_used, second.frames_used);
    assert_eq!(first.dt_stats, second.dt_stats);
}

#[test]
fn playback_state_is_restored_after_success() {
    let mut source = five_second_source();
    let before = PlaybackState {
        position: 3.25,
        paused: false,
    };
    source.set_playback_state(&before).unwrap();

    let estimator = VelocityEstimator::new(stub_model(1.0));
    estimator
        .analyze(&one_second_request(), &mut source, None)
        .expect("analysis");

    assert_eq!(source.playback_state(), before);
}

#[test]
fn playback_state_is_restored_after_seek_timeout() {
    let mut source = SyntheticSource::new(SyntheticConfig {
        duration: 5.0,
        fps: 5.0,
        seek_latency: Duration::from_secs(10),
        ..SyntheticConfig::default()
    });
    let before = PlaybackState {
        position: 1.5,
        paused: false,
    };
    source.set_playback_state(&before).unwrap();

    let estimator = VelocityEstimator::new(stub_model(1.0));
    let err = estimator
        .analyze(&one_second_request(), &mut source, None)
        .unwrap_err();

    assert!(matches!(err, PipelineError::SeekTimeout { .. }));
    assert_eq!(source.playback_state(), before);
}

/// Backend whose inference always fails, simulating a model session that
/// drops out mid-run.
struct FailingFlowBackend;

impl FlowBackend for FailingFlowBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn input_arity(&self) -> InputArity {
        InputArity::Paired
    }

    fn infer(&mut self, _prev: &Tensor, _curr: &Tensor) -> anyhow::Result<FlowField> {
        anyhow::bail!("session dropped")
    }
}

#[test]
fn playback_state_is_restored_after_inference_failure() {
    let mut source = five_second_source();
    let before = PlaybackState {
        position: 2.75,
        paused: false,
    };
    source.set_playback_state(&before).unwrap();

    let model: SharedFlowModel =
        Arc::new(Mutex::new(Box::new(FailingFlowBackend) as Box<dyn FlowBackend>));
    let estimator = VelocityEstimator::new(model);
    let err = estimator
        .analyze(&one_second_request(), &mut source, None)
        .unwrap_err();

    assert!(matches!(err, PipelineError::ModelUnavailable { .. }));
    assert_eq!(source.playback_state(), before);
}

#[test]
fn invalid_configuration_is_rejected_before_any_capture() {
    let mut source = five_second_source();
    let estimator = VelocityEstimator::new(stub_model(1.0));
    let request = AnalysisRequest {
        meters_per_pixel: -1.0,
        ..AnalysisRequest::default()
    };

    let err = estimator.analyze(&request, &mut source, None).unwrap_err();

    assert!(matches!(err, PipelineError::InvalidConfiguration { .. }));
    assert_eq!(source.frames_served(), 0);
}

#[test]
fn overlay_sink_receives_vectors_without_changing_numbers() {
    use flowgauge::{BufferSink, OverlaySink};

    let estimator = VelocityEstimator::new(stub_model(5.0));
    let request = one_second_request();

    let mut plain_source = five_second_source();
    let plain = estimator
        .analyze(&request, &mut plain_source, None)
        .expect("plain run");

    let mut sink = BufferSink::new(320, 240);
    let mut overlay_source = five_second_source();
    let with_overlay = estimator
        .analyze(
            &request,
            &mut overlay_source,
            Some(&mut sink as &mut dyn OverlaySink),
        )
        .expect("overlay run");

    assert_eq!(plain.velocities, with_overlay.velocities);
    // Magnitude 5 exceeds the draw epsilon, so something was painted.
    assert!(sink.pixels().iter().any(|byte| *byte != 0));
}
