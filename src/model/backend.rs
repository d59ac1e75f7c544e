use anyhow::Result;

use crate::frame::Tensor;
use crate::model::FlowField;

/// Declared input shape of a flow model, queried once at session creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputArity {
    /// Two named 3-channel inputs (previous, current).
    Paired,
    /// One stacked 6-channel input.
    Stacked,
}

/// Flow inference backend trait.
///
/// Implementations are responsible only for shaping inputs to the model's
/// declared arity and returning the displacement field at the model's native
/// resolution. Inference calls read session state without mutating it, so
/// one backend instance may serve multiple runs behind the shared session.
pub trait FlowBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Declared input arity, fixed at construction.
    fn input_arity(&self) -> InputArity;

    /// Estimate per-pixel displacement between two preprocessed frames.
    fn infer(&mut self, prev: &Tensor, curr: &Tensor) -> Result<FlowField>;
}
