use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use super::{GatedTask, JobHandle, PoolError, WorkerPool};
use crate::task::Job;

/// Synchronous pool that runs every job on the calling thread.
///
/// An ungated job runs inside `submit`; a gated job runs on whichever thread
/// finishes its gate. Submitting in linear order therefore executes systems
/// one at a time in exactly that order, which makes this the harness for
/// deterministic scheduling tests.
#[derive(Default)]
pub struct InlinePool {
    executed: Arc<Mutex<Vec<String>>>,
    submitted: AtomicUsize,
    limit: Option<usize>,
    closed: AtomicBool,
}

impl InlinePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `limit` submissions, then reject the rest.
    pub fn rejecting_after(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Labels of jobs whose bodies ran, in execution order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of accepted submissions.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::Acquire)
    }
}

impl WorkerPool for InlinePool {
    fn submit(
        &self,
        label: &str,
        job: Job,
        gate: Option<&JobHandle>,
    ) -> Result<JobHandle, PoolError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::ShutDown);
        }
        if let Some(limit) = self.limit {
            if self.submitted() >= limit {
                warn!(job = label, limit, "inline pool submission limit reached");
                return Err(PoolError::Rejected(format!(
                    "submission limit of {limit} reached"
                )));
            }
        }
        self.submitted.fetch_add(1, Ordering::AcqRel);

        let executed = Arc::clone(&self.executed);
        let name = label.to_string();
        let recorded: Job = Box::new(move || {
            executed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(name);
            job()
        });

        let handle = JobHandle::new(label);
        let task = GatedTask::new(handle.clone(), recorded);
        match gate {
            None => task.run(None),
            Some(gate) => {
                let gate_label = gate.label().to_string();
                gate.on_complete(move |outcome| task.run(Some((gate_label.as_str(), outcome))));
            }
        }
        Ok(handle)
    }

    fn worker_count(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::JobOutcome;
    use crate::task::{job, SystemError};

    #[test]
    fn runs_immediately_in_submission_order() {
        let pool = InlinePool::new();
        let a = pool.submit("a", job(|| Ok(())), None).unwrap();
        assert!(a.is_finished());
        let b = pool.submit("b", job(|| Ok(())), Some(&a)).unwrap();
        assert_eq!(b.outcome(), Some(JobOutcome::Succeeded));
        assert_eq!(pool.executed(), vec!["a", "b"]);
        assert_eq!(pool.worker_count(), 1);
    }

    #[test]
    fn pending_gate_defers_job() {
        let pool = InlinePool::new();
        let gate = JobHandle::new("external");
        let job_handle = pool.submit("late", job(|| Ok(())), Some(&gate)).unwrap();
        assert!(!job_handle.is_finished());
        assert!(pool.executed().is_empty());

        gate.finish(JobOutcome::Succeeded);
        assert_eq!(job_handle.outcome(), Some(JobOutcome::Succeeded));
        assert_eq!(pool.executed(), vec!["late"]);
    }

    #[test]
    fn failure_skips_without_running() {
        let pool = InlinePool::new();
        let a = pool
            .submit("a", job(|| Err(SystemError::Failed("nope".into()))), None)
            .unwrap();
        let b = pool.submit("b", job(|| Ok(())), Some(&a)).unwrap();
        assert!(matches!(b.outcome(), Some(JobOutcome::Skipped(_))));
        assert_eq!(pool.executed(), vec!["a"]);
    }

    #[test]
    fn rejects_after_limit() {
        let pool = InlinePool::rejecting_after(1);
        pool.submit("a", job(|| Ok(())), None).unwrap();
        let err = pool.submit("b", job(|| Ok(())), None).unwrap_err();
        assert!(matches!(err, PoolError::Rejected(_)));
        assert_eq!(pool.submitted(), 1);
    }

    #[test]
    fn closed_pool_rejects() {
        let pool = InlinePool::new();
        pool.close();
        assert_eq!(
            pool.submit("a", job(|| Ok(())), None).unwrap_err(),
            PoolError::ShutDown
        );
    }
}
