use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use super::{GatedTask, JobHandle, PoolError, WorkerPool};
use crate::task::Job;

/// Fixed-size pool backed by a `rayon` thread pool.
pub struct RayonPool {
    pool: Arc<rayon::ThreadPool>,
    accepting: AtomicBool,
    threads: usize,
}

impl RayonPool {
    /// Build a pool with `threads` named workers (`{prefix}-{index}`).
    pub fn new(threads: usize, prefix: &str) -> Result<Self, rayon::ThreadPoolBuildError> {
        let prefix = prefix.to_string();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()?;
        let threads = pool.current_num_threads();
        info!(threads, "worker pool started");
        Ok(Self {
            pool: Arc::new(pool),
            accepting: AtomicBool::new(true),
            threads,
        })
    }

    /// Stop accepting submissions. Jobs already accepted, including gated
    /// ones still waiting, run to completion.
    pub fn shutdown(&self) {
        info!("worker pool shutdown requested");
        self.accepting.store(false, Ordering::Release);
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }
}

impl WorkerPool for RayonPool {
    fn submit(
        &self,
        label: &str,
        job: Job,
        gate: Option<&JobHandle>,
    ) -> Result<JobHandle, PoolError> {
        if !self.is_accepting() {
            warn!(job = label, "submission after shutdown");
            return Err(PoolError::ShutDown);
        }

        let handle = JobHandle::new(label);
        let task = GatedTask::new(handle.clone(), job);
        match gate {
            None => self.pool.spawn(move || task.run(None)),
            Some(gate) => {
                let pool = Arc::clone(&self.pool);
                let gate_label = gate.label().to_string();
                gate.on_complete(move |outcome| {
                    let outcome = outcome.clone();
                    pool.spawn(move || task.run(Some((gate_label.as_str(), &outcome))));
                });
            }
        }
        Ok(handle)
    }

    fn worker_count(&self) -> usize {
        self.threads
    }
}
