use std::sync::Arc;

/// Error returned by a system body.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("System failed: {0}")]
    Failed(String),
}

/// The executable body of a system.
///
/// Bodies are opaque to the scheduler: it only guarantees that a body never
/// starts before every system it depends on has finished.
pub type SystemFn = Arc<dyn Fn() -> Result<(), SystemError> + Send + Sync>;

/// A one-shot unit of work handed to a worker pool.
pub type Job = Box<dyn FnOnce() -> Result<(), SystemError> + Send + 'static>;

/// Box a closure as a [`Job`].
pub fn job<F>(f: F) -> Job
where
    F: FnOnce() -> Result<(), SystemError> + Send + 'static,
{
    Box::new(f)
}
