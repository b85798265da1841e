use std::time::Duration;

use ordo_core::CoreError;
use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::linearize::CycleError;

/// Errors from planning and running a system set.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Declarations cannot be ordered. Raised before anything is dispatched.
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// The pool rejected a submission. Earlier jobs may still be running.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("plan does not match the registered systems")]
    PlanMismatch,

    #[error("failed to build worker pool: {0}")]
    PoolBuild(String),

    #[error("run did not finish within {0:?}")]
    Timeout(Duration),

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),
}
