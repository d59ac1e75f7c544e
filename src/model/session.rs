use std::sync::{Arc, Mutex, OnceLock};

use anyhow::Result;

use crate::error::PipelineError;
use crate::model::backend::FlowBackend;

/// Process-wide shared handle to the established flow model.
///
/// Inference takes `&mut self` on the backend, so the handle wraps a mutex;
/// runs against different video sources may share it safely.
pub type SharedFlowModel = Arc<Mutex<Box<dyn FlowBackend>>>;

static SESSION: OnceLock<Mutex<Option<SharedFlowModel>>> = OnceLock::new();

fn slot() -> &'static Mutex<Option<SharedFlowModel>> {
    SESSION.get_or_init(|| Mutex::new(None))
}

/// Return the shared model session, establishing it on first use.
///
/// The slot lock is held across initialization, so concurrent first callers
/// coalesce into one factory invocation. A factory failure maps to
/// `ModelUnavailable` and leaves the slot empty for a later attempt.
pub fn shared_session<F>(factory: F) -> Result<SharedFlowModel, PipelineError>
where
    F: FnOnce() -> Result<Box<dyn FlowBackend>>,
{
    let mut guard = slot()
        .lock()
        .map_err(|_| PipelineError::model_unavailable("model session lock poisoned"))?;

    if let Some(session) = guard.as_ref() {
        return Ok(session.clone());
    }

    let backend = factory().map_err(|err| PipelineError::ModelUnavailable {
        reason: format!("{err:#}"),
    })?;
    log::info!(
        "flow model session established ({}, {:?} input)",
        backend.name(),
        backend.input_arity()
    );

    let session: SharedFlowModel = Arc::new(Mutex::new(backend));
    *guard = Some(session.clone());
    Ok(session)
}

/// Drop the process-wide handle. The next `shared_session` call
/// reinitializes; existing clones keep working until released.
pub fn invalidate_session() {
    if let Ok(mut guard) = slot().lock() {
        *guard = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InputArity, StubFlowBackend};

    // Tests share the process-wide slot; serialize them.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn first_use_establishes_then_shares() {
        let _guard = TEST_LOCK.lock().unwrap();
        invalidate_session();

        let a = shared_session(|| Ok(Box::new(StubFlowBackend::new(1.0)))).unwrap();
        assert_eq!(a.lock().unwrap().input_arity(), InputArity::Paired);
        // Second caller must reuse the handle, not run its factory.
        let b = shared_session(|| panic!("factory must not rerun")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        invalidate_session();
        let c = shared_session(|| Ok(Box::new(StubFlowBackend::new(2.0)))).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));

        invalidate_session();
    }

    #[test]
    fn factory_failure_is_model_unavailable() {
        let _guard = TEST_LOCK.lock().unwrap();
        invalidate_session();

        let err = match shared_session(|| Err(anyhow::anyhow!("artifact missing"))) {
            Ok(_) => panic!("a failing factory must not establish a session"),
            Err(err) => err,
        };
        assert!(matches!(err, PipelineError::ModelUnavailable { .. }));
        assert!(err.to_string().contains("artifact missing"));

        invalidate_session();
    }
}
