//! Runtime configuration.
//!
//! Configuration layers, lowest priority first: built-in defaults, an
//! optional TOML file pointed to by `FLOWGAUGE_CONFIG`, then `FLOWGAUGE_*`
//! environment overrides. The merged configuration is validated before use.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::estimator::AnalysisRequest;

const DEFAULT_SOURCE_URI: &str = "stub://flume";
const DEFAULT_SOURCE_FPS: f64 = 24.0;
const DEFAULT_SOURCE_DURATION_SECS: f64 = 5.0;
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_STUB_MAGNITUDE: f32 = 1.0;
const DEFAULT_WARN_THRESHOLD: f64 = 1.0;
const DEFAULT_DANGER_THRESHOLD: f64 = 2.0;

#[derive(Debug, Deserialize, Default)]
struct GaugeConfigFile {
    source: Option<SourceConfigFile>,
    analysis: Option<AnalysisConfigFile>,
    model: Option<ModelConfigFile>,
    thresholds: Option<ThresholdConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    uri: Option<String>,
    fps: Option<f64>,
    duration_secs: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct AnalysisConfigFile {
    meters_per_pixel: Option<f64>,
    fps_hint: Option<f64>,
    sample_interval_ms: Option<f64>,
    max_pairs: Option<u32>,
    target_width: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    stub_magnitude: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ThresholdConfigFile {
    warn: Option<f64>,
    danger: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct GaugeConfig {
    pub source: SourceSettings,
    pub analysis: AnalysisRequest,
    pub model: ModelSettings,
    pub thresholds: ThresholdSettings,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// `stub://name` or a local frame-sequence directory.
    pub uri: String,
    pub fps: f64,
    /// Reported duration for synthetic sources.
    pub duration_secs: f64,
    /// Native dimensions for synthetic sources.
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// ONNX artifact path; absent means the stub backend.
    pub path: Option<PathBuf>,
    /// Uniform magnitude for stub dry runs.
    pub stub_magnitude: f32,
}

#[derive(Debug, Clone)]
pub struct ThresholdSettings {
    pub warn: f64,
    pub danger: f64,
}

impl GaugeConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FLOWGAUGE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: GaugeConfigFile) -> Self {
        let defaults = AnalysisRequest::default();
        let source = file.source.unwrap_or_default();
        let analysis = file.analysis.unwrap_or_default();
        let model = file.model.unwrap_or_default();
        let thresholds = file.thresholds.unwrap_or_default();

        Self {
            source: SourceSettings {
                uri: source.uri.unwrap_or_else(|| DEFAULT_SOURCE_URI.to_string()),
                fps: source.fps.unwrap_or(DEFAULT_SOURCE_FPS),
                duration_secs: source.duration_secs.unwrap_or(DEFAULT_SOURCE_DURATION_SECS),
                width: source.width.unwrap_or(DEFAULT_SOURCE_WIDTH),
                height: source.height.unwrap_or(DEFAULT_SOURCE_HEIGHT),
            },
            analysis: AnalysisRequest {
                meters_per_pixel: analysis
                    .meters_per_pixel
                    .unwrap_or(defaults.meters_per_pixel),
                fps_hint: analysis.fps_hint.unwrap_or(defaults.fps_hint),
                sample_interval_ms: analysis
                    .sample_interval_ms
                    .unwrap_or(defaults.sample_interval_ms),
                max_pairs: analysis.max_pairs.unwrap_or(defaults.max_pairs),
                target_width: analysis.target_width.unwrap_or(defaults.target_width),
            },
            model: ModelSettings {
                path: model.path,
                stub_magnitude: model.stub_magnitude.unwrap_or(DEFAULT_STUB_MAGNITUDE),
            },
            thresholds: ThresholdSettings {
                warn: thresholds.warn.unwrap_or(DEFAULT_WARN_THRESHOLD),
                danger: thresholds.danger.unwrap_or(DEFAULT_DANGER_THRESHOLD),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(uri) = std::env::var("FLOWGAUGE_SOURCE_URI") {
            if !uri.trim().is_empty() {
                self.source.uri = uri;
            }
        }
        if let Ok(value) = std::env::var("FLOWGAUGE_SOURCE_FPS") {
            self.source.fps = parse_env("FLOWGAUGE_SOURCE_FPS", &value)?;
        }
        if let Ok(value) = std::env::var("FLOWGAUGE_METERS_PER_PIXEL") {
            self.analysis.meters_per_pixel = parse_env("FLOWGAUGE_METERS_PER_PIXEL", &value)?;
        }
        if let Ok(value) = std::env::var("FLOWGAUGE_FPS_HINT") {
            self.analysis.fps_hint = parse_env("FLOWGAUGE_FPS_HINT", &value)?;
        }
        if let Ok(value) = std::env::var("FLOWGAUGE_SAMPLE_INTERVAL_MS") {
            self.analysis.sample_interval_ms = parse_env("FLOWGAUGE_SAMPLE_INTERVAL_MS", &value)?;
        }
        if let Ok(value) = std::env::var("FLOWGAUGE_MAX_PAIRS") {
            self.analysis.max_pairs = parse_env("FLOWGAUGE_MAX_PAIRS", &value)?;
        }
        if let Ok(value) = std::env::var("FLOWGAUGE_TARGET_WIDTH") {
            self.analysis.target_width = parse_env("FLOWGAUGE_TARGET_WIDTH", &value)?;
        }
        if let Ok(path) = std::env::var("FLOWGAUGE_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.path = Some(PathBuf::from(path));
            }
        }
        if let Ok(value) = std::env::var("FLOWGAUGE_WARN_THRESHOLD") {
            self.thresholds.warn = parse_env("FLOWGAUGE_WARN_THRESHOLD", &value)?;
        }
        if let Ok(value) = std::env::var("FLOWGAUGE_DANGER_THRESHOLD") {
            self.thresholds.danger = parse_env("FLOWGAUGE_DANGER_THRESHOLD", &value)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.analysis
            .validate()
            .map_err(|err| anyhow!(err.to_string()))?;
        if self.source.fps <= 0.0 {
            return Err(anyhow!("source fps must be positive"));
        }
        if self.thresholds.warn <= 0.0 {
            return Err(anyhow!("warn threshold must be positive"));
        }
        if self.thresholds.danger < self.thresholds.warn {
            return Err(anyhow!(
                "danger threshold must not be below the warn threshold"
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("{} has an invalid value: {:?}", name, value))
}

fn read_config_file(path: &Path) -> Result<GaugeConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
