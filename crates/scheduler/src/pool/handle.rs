use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

/// How a submitted job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    /// The job ran and returned an error or panicked.
    Failed(String),
    /// The job never ran because something it was gated on did not succeed.
    Skipped(String),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Succeeded => write!(f, "succeeded"),
            JobOutcome::Failed(reason) => write!(f, "failed: {reason}"),
            JobOutcome::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

type Continuation = Box<dyn FnOnce(&JobOutcome) + Send>;

enum JobState {
    Pending(Vec<Continuation>),
    Finished(JobOutcome),
}

struct JobInner {
    label: String,
    state: Mutex<JobState>,
    done: Condvar,
}

/// Shareable completion token for a submitted job.
///
/// Clones refer to the same job. A handle finishes exactly once; waiters are
/// woken and registered continuations run on the finishing thread, outside
/// the lock.
#[derive(Clone)]
pub struct JobHandle {
    inner: Arc<JobInner>,
}

impl JobHandle {
    pub(crate) fn new(label: &str) -> Self {
        Self {
            inner: Arc::new(JobInner {
                label: label.to_string(),
                state: Mutex::new(JobState::Pending(Vec::new())),
                done: Condvar::new(),
            }),
        }
    }

    /// A handle that finishes once every handle in `handles` has finished.
    ///
    /// Succeeds only if all members succeeded; otherwise fails naming the
    /// first member observed not to succeed. An empty join is finished
    /// immediately.
    pub fn join(label: &str, handles: &[JobHandle]) -> JobHandle {
        let joined = JobHandle::new(label);
        if handles.is_empty() {
            joined.finish(JobOutcome::Succeeded);
            return joined;
        }

        let remaining = Arc::new(AtomicUsize::new(handles.len()));
        let first_failure: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        for member in handles {
            let joined = joined.clone();
            let remaining = Arc::clone(&remaining);
            let first_failure = Arc::clone(&first_failure);
            let member_label = member.label().to_string();
            member.on_complete(move |outcome| {
                if !outcome.is_success() {
                    let mut slot = first_failure.lock().unwrap_or_else(PoisonError::into_inner);
                    slot.get_or_insert_with(|| format!("'{member_label}' {outcome}"));
                }
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    let failure = first_failure
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .take();
                    joined.finish(match failure {
                        Some(reason) => JobOutcome::Failed(reason),
                        None => JobOutcome::Succeeded,
                    });
                }
            });
        }
        joined
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Outcome if finished, without blocking.
    pub fn outcome(&self) -> Option<JobOutcome> {
        match &*self.lock() {
            JobState::Finished(outcome) => Some(outcome.clone()),
            JobState::Pending(_) => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome().is_some()
    }

    /// Block until the job finishes.
    pub fn wait(&self) -> JobOutcome {
        let mut state = self.lock();
        loop {
            if let JobState::Finished(outcome) = &*state {
                return outcome.clone();
            }
            state = self
                .inner
                .done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block for at most `timeout`. `None` means the job is still running;
    /// giving up on the wait does not cancel it.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<JobOutcome> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let JobState::Finished(outcome) = &*state {
                return Some(outcome.clone());
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            state = self
                .inner
                .done
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Run `f` with the outcome once the job finishes.
    ///
    /// If the job already finished, `f` runs immediately on the caller.
    pub fn on_complete<F>(&self, f: F)
    where
        F: FnOnce(&JobOutcome) + Send + 'static,
    {
        let outcome = {
            let mut state = self.lock();
            match &mut *state {
                JobState::Pending(continuations) => {
                    continuations.push(Box::new(f));
                    return;
                }
                JobState::Finished(outcome) => outcome.clone(),
            }
        };
        f(&outcome);
    }

    /// Record the outcome, wake waiters, then run continuations.
    /// A second call is ignored.
    pub(crate) fn finish(&self, outcome: JobOutcome) {
        let continuations = {
            let mut state = self.lock();
            let previous = std::mem::replace(&mut *state, JobState::Finished(outcome.clone()));
            match previous {
                JobState::Pending(continuations) => continuations,
                JobState::Finished(first) => {
                    *state = JobState::Finished(first);
                    return;
                }
            }
        };
        self.inner.done.notify_all();
        for continuation in continuations {
            continuation(&outcome);
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("label", &self.inner.label)
            .field("outcome", &self.outcome())
            .finish()
    }
}
