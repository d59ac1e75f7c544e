mod stub;
#[cfg(feature = "backend-tract")]
mod tract;

pub use stub::StubFlowBackend;
#[cfg(feature = "backend-tract")]
pub use tract::TractFlowBackend;
