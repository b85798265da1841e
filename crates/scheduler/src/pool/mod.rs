//! Worker pool capability consumed by the dispatcher.
//!
//! The dispatcher only needs three things from a pool: submit a job gated on
//! an optional handle, join several handles into one, and wait. Gated jobs
//! are handed to the pool only once their gate finishes, so no worker thread
//! ever blocks waiting on another job.

mod handle;
mod inline;
mod rayon_pool;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

pub use handle::{JobHandle, JobOutcome};
pub use inline::InlinePool;
pub use rayon_pool::RayonPool;

use crate::task::Job;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("worker pool is shut down")]
    ShutDown,
    #[error("worker pool rejected job: {0}")]
    Rejected(String),
}

pub trait WorkerPool: Send + Sync {
    /// Submit `job`. If `gate` is given the job starts only after the gate
    /// finishes; if the gate did not succeed the job is skipped.
    ///
    /// Never blocks on the gate.
    fn submit(&self, label: &str, job: Job, gate: Option<&JobHandle>)
        -> Result<JobHandle, PoolError>;

    /// A single handle that finishes when all of `handles` have.
    fn combine(&self, label: &str, handles: &[JobHandle]) -> JobHandle {
        JobHandle::join(label, handles)
    }

    /// Block until every handle has finished.
    fn wait_all(&self, handles: &[JobHandle]) -> Vec<JobOutcome> {
        crate::dispatch::wait_all(handles)
    }

    /// Number of jobs that may run at the same time.
    fn worker_count(&self) -> usize;
}

/// A submitted job paired with the handle it will finish.
pub(crate) struct GatedTask {
    handle: JobHandle,
    job: Job,
}

impl GatedTask {
    pub(crate) fn new(handle: JobHandle, job: Job) -> Self {
        Self { handle, job }
    }

    /// Run the job unless `gate` (label, outcome) reports an upstream failure,
    /// then finish the handle. Panics are caught and reported as failures.
    pub(crate) fn run(self, gate: Option<(&str, &JobOutcome)>) {
        if let Some((gate_label, outcome)) = gate {
            if !outcome.is_success() {
                debug!(job = self.handle.label(), gate = gate_label, "skipping gated job");
                self.handle
                    .finish(JobOutcome::Skipped(format!("'{gate_label}' {outcome}")));
                return;
            }
        }

        let outcome = match panic::catch_unwind(AssertUnwindSafe(self.job)) {
            Ok(Ok(())) => JobOutcome::Succeeded,
            Ok(Err(e)) => JobOutcome::Failed(e.to_string()),
            Err(payload) => JobOutcome::Failed(format!("panicked: {}", panic_message(payload.as_ref()))),
        };
        self.handle.finish(outcome);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
