//! Optical-flow model boundary.
//!
//! The flow model is an external collaborator consumed through a narrow
//! request/response contract: two preprocessed tensors in, one dense
//! displacement field out. This module provides the backend trait, a
//! deterministic stub, an ONNX implementation (feature: backend-tract), and
//! the process-wide shared session handle.

mod backend;
mod backends;
mod session;

pub use backend::{FlowBackend, InputArity};
pub use backends::StubFlowBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractFlowBackend;
pub use session::{invalidate_session, shared_session, SharedFlowModel};

/// Dense displacement field: one (dx, dy) pair per output pixel, in model
/// units. Ephemeral; consumed by the sampler and overlay within one step.
#[derive(Clone, Debug)]
pub struct FlowField {
    pub width: usize,
    pub height: usize,
    dx: Vec<f32>,
    dy: Vec<f32>,
}

impl FlowField {
    pub fn new(width: usize, height: usize, dx: Vec<f32>, dy: Vec<f32>) -> Self {
        debug_assert_eq!(dx.len(), width * height);
        debug_assert_eq!(dy.len(), width * height);
        Self {
            width,
            height,
            dx,
            dy,
        }
    }

    pub fn vector_at(&self, x: usize, y: usize) -> (f32, f32) {
        let idx = y * self.width + x;
        (self.dx[idx], self.dy[idx])
    }

    pub fn magnitude_at(&self, x: usize, y: usize) -> f32 {
        let (dx, dy) = self.vector_at(x, y);
        (dx * dx + dy * dy).sqrt()
    }
}
