use anyhow::{ensure, Result};

use crate::frame::Tensor;
use crate::model::backend::{FlowBackend, InputArity};
use crate::model::FlowField;

/// Stub backend producing a uniform flow field of fixed magnitude along the
/// x axis. Deterministic; used by tests and `--stub-flow` dry runs.
pub struct StubFlowBackend {
    magnitude: f32,
}

impl StubFlowBackend {
    pub fn new(magnitude: f32) -> Self {
        Self { magnitude }
    }
}

impl Default for StubFlowBackend {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl FlowBackend for StubFlowBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn input_arity(&self) -> InputArity {
        InputArity::Paired
    }

    fn infer(&mut self, prev: &Tensor, curr: &Tensor) -> Result<FlowField> {
        ensure!(
            prev.shape() == curr.shape(),
            "frame pair shape mismatch: {:?} vs {:?}",
            prev.shape(),
            curr.shape()
        );
        let (_, height, width) = prev.shape();
        Ok(FlowField::new(
            width,
            height,
            vec![self.magnitude; width * height],
            vec![0.0; width * height],
        ))
    }
}
