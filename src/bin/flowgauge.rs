//! flowgauge - run one velocity analysis sweep over a video source and print
//! a JSON report (velocity summary plus risk classification).

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use flowgauge::config::GaugeConfig;
use flowgauge::{
    classify, shared_session, source, AnalysisResult, BufferSink, Classification, FlowBackend,
    OverlaySink, SharedFlowModel, StubFlowBackend, VelocityEstimator,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video source URI (stub://name or a frame-sequence directory).
    #[arg(long)]
    source: Option<String>,
    /// ONNX flow model path (requires a backend-tract build).
    #[arg(long)]
    model: Option<PathBuf>,
    /// Run with the deterministic stub backend at this uniform magnitude.
    #[arg(long)]
    stub_flow: Option<f32>,
    /// Write the rendered flow overlay to this PNG path (requires image-io).
    #[arg(long)]
    overlay: Option<PathBuf>,
    /// Calibration override (meters per pixel).
    #[arg(long)]
    meters_per_pixel: Option<f64>,
    /// Maximum frame pairs override.
    #[arg(long)]
    max_pairs: Option<u32>,
}

#[derive(Serialize)]
struct Report {
    analysis: AnalysisResult,
    /// The p95 of per-pair velocities, as consumed by classification.
    representative_velocity: f64,
    classification: Classification,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = GaugeConfig::load()?;
    if let Some(uri) = &args.source {
        config.source.uri = uri.clone();
    }
    if let Some(mpp) = args.meters_per_pixel {
        config.analysis.meters_per_pixel = mpp;
    }
    if let Some(max_pairs) = args.max_pairs {
        config.analysis.max_pairs = max_pairs;
    }
    if let Some(path) = &args.model {
        config.model.path = Some(path.clone());
    }
    if let Some(magnitude) = args.stub_flow {
        config.model.path = None;
        config.model.stub_magnitude = magnitude;
    }
    config.analysis.validate()?;

    let session = establish_session(&config)?;
    let mut video = source::open(&config.source)?;
    let mut overlay_sink = args
        .overlay
        .is_some()
        .then(|| BufferSink::new(config.source.width, config.source.height));

    let estimator = VelocityEstimator::new(session);
    let analysis = estimator.analyze(
        &config.analysis,
        video.as_mut(),
        overlay_sink.as_mut().map(|sink| sink as &mut dyn OverlaySink),
    )?;

    if let (Some(path), Some(sink)) = (&args.overlay, &overlay_sink) {
        write_overlay(path, sink)?;
    }

    let classification = classify(
        analysis.p95,
        config.thresholds.warn,
        config.thresholds.danger,
    );
    let report = Report {
        representative_velocity: analysis.p95,
        analysis,
        classification,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn establish_session(config: &GaugeConfig) -> Result<SharedFlowModel> {
    match &config.model.path {
        Some(path) => {
            #[cfg(feature = "backend-tract")]
            {
                let target = flowgauge::FrameSize::for_target_width(
                    config.source.width,
                    config.source.height,
                    config.analysis.target_width,
                );
                let path = path.clone();
                let session = shared_session(move || {
                    let backend =
                        flowgauge::TractFlowBackend::new(&path, target.width, target.height)?;
                    Ok(Box::new(backend) as Box<dyn FlowBackend>)
                })?;
                Ok(session)
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                anyhow::bail!(
                    "model path {} is configured but this build lacks the backend-tract feature",
                    path.display()
                )
            }
        }
        None => {
            let magnitude = config.model.stub_magnitude;
            log::warn!(
                "no flow model configured; using the stub backend (magnitude {})",
                magnitude
            );
            let session = shared_session(move || {
                Ok(Box::new(StubFlowBackend::new(magnitude)) as Box<dyn FlowBackend>)
            })?;
            Ok(session)
        }
    }
}

#[cfg(feature = "image-io")]
fn write_overlay(path: &std::path::Path, sink: &BufferSink) -> Result<()> {
    use anyhow::{anyhow, Context};

    let image = image::RgbaImage::from_raw(sink.width(), sink.height(), sink.pixels().to_vec())
        .ok_or_else(|| anyhow!("overlay buffer did not match its dimensions"))?;
    image
        .save(path)
        .with_context(|| format!("failed to write overlay to {}", path.display()))?;
    log::info!("overlay written to {}", path.display());
    Ok(())
}

#[cfg(not(feature = "image-io"))]
fn write_overlay(_path: &std::path::Path, _sink: &BufferSink) -> Result<()> {
    anyhow::bail!("overlay export requires the image-io build")
}
