//! Threshold classification of a representative velocity.
//!
//! Consumes the pipeline's representative value (the p95 of per-pair
//! velocities) and a `(warn, danger)` threshold pair. Simple magnitude
//! comparison only; alert dispatch and persistence live elsewhere.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Normal,
    Warning,
    Danger,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Classification {
    pub level: RiskLevel,
    /// `clamp(velocity / danger, 0, 1)`.
    pub confidence: f64,
}

/// Classify a velocity against warn/danger thresholds.
pub fn classify(velocity: f64, warn: f64, danger: f64) -> Classification {
    let level = if velocity >= danger {
        RiskLevel::Danger
    } else if velocity >= warn {
        RiskLevel::Warning
    } else {
        RiskLevel::Normal
    };

    let confidence = if danger > 0.0 {
        (velocity / danger).clamp(0.0, 1.0)
    } else if velocity > 0.0 {
        1.0
    } else {
        0.0
    };

    Classification { level, confidence }
}
