use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dispatch::{schedule_all, wait_all_timeout};
use crate::error::SchedulerError;
use crate::metrics::SchedulerMetrics;
use crate::plan::ExecutionPlan;
use crate::pool::{JobHandle, JobOutcome, WorkerPool};
use crate::task::Job;
use crate::types::{RunReport, SystemOutcome};

use super::Scheduler;

/// Counts a system as active for as long as it is alive, including when the
/// body panics. The count only changes under the metrics lock.
struct ActiveGuard {
    metrics: Arc<RwLock<SchedulerMetrics>>,
}

impl ActiveGuard {
    fn enter(metrics: Arc<RwLock<SchedulerMetrics>>) -> Self {
        metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .enter_system();
        Self { metrics }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .exit_system();
    }
}

impl Scheduler {
    /// Build the dependency graph and linearize it.
    ///
    /// Fails with [`SchedulerError::Cycle`] when the declarations cannot be
    /// ordered; nothing has been dispatched at that point.
    pub fn plan(&self) -> Result<ExecutionPlan, SchedulerError> {
        let plan = ExecutionPlan::new(&self.systems)?;
        debug!(
            systems = plan.len(),
            edges = plan.graph().edges().len(),
            order = ?plan.ordered_names(),
            "planned systems"
        );
        Ok(plan)
    }

    /// Submit every system in `plan` to `pool` without waiting.
    ///
    /// Returns one handle per system in linear order.
    pub fn dispatch(
        &self,
        plan: &ExecutionPlan,
        pool: &dyn WorkerPool,
    ) -> Result<Vec<JobHandle>, SchedulerError> {
        self.dispatch_run(plan, pool, Uuid::new_v4())
    }

    /// Dispatch `plan` and block until every system has finished.
    ///
    /// With `wait_timeout_secs` configured, an overlong run returns
    /// [`SchedulerError::Timeout`]; its jobs keep running in the pool.
    pub fn execute(
        &self,
        plan: &ExecutionPlan,
        pool: &dyn WorkerPool,
    ) -> Result<RunReport, SchedulerError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(
            %run_id,
            systems = plan.len(),
            stages = plan.stages().len(),
            workers = pool.worker_count(),
            "starting run"
        );

        let handles = self.dispatch_run(plan, pool, run_id)?;
        let outcomes = match self.config.wait_timeout() {
            Some(timeout) => match wait_all_timeout(&handles, timeout) {
                Some(outcomes) => outcomes,
                None => {
                    warn!(%run_id, ?timeout, "run still in progress at deadline; abandoning wait");
                    return Err(SchedulerError::Timeout(timeout));
                }
            },
            None => pool.wait_all(&handles),
        };
        let elapsed = started.elapsed();

        let outcomes: Vec<SystemOutcome> = handles
            .iter()
            .zip(outcomes)
            .map(|(handle, outcome)| SystemOutcome {
                system: handle.label().to_string(),
                outcome,
            })
            .collect();

        if let Ok(mut m) = self.metrics.write() {
            for o in &outcomes {
                match &o.outcome {
                    JobOutcome::Succeeded => {}
                    JobOutcome::Failed(_) => m.record_failure(&o.system),
                    JobOutcome::Skipped(_) => m.record_skip(&o.system),
                }
            }
            m.record_run(elapsed);
        }

        let report = RunReport {
            run_id,
            elapsed,
            outcomes,
        };
        for o in report.skipped() {
            warn!(%run_id, system = %o.system, outcome = %o.outcome, "system skipped");
        }
        info!(
            %run_id,
            elapsed_ms = elapsed.as_millis() as u64,
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            skipped = report.skipped().count(),
            "run finished"
        );
        Ok(report)
    }

    /// Plan, dispatch and wait: one full scheduling run.
    pub fn run(&self, pool: &dyn WorkerPool) -> Result<RunReport, SchedulerError> {
        let plan = self.plan()?;
        self.execute(&plan, pool)
    }

    fn dispatch_run(
        &self,
        plan: &ExecutionPlan,
        pool: &dyn WorkerPool,
        run_id: Uuid,
    ) -> Result<Vec<JobHandle>, SchedulerError> {
        let declared = self.systems.systems();
        let matches = plan.graph().len() == declared.len()
            && plan
                .graph()
                .names()
                .iter()
                .zip(declared)
                .all(|(planned, spec)| planned == spec.name());
        if !matches {
            return Err(SchedulerError::PlanMismatch);
        }

        let handles = schedule_all(plan, pool, |node| {
            self.instrumented_job(node, run_id)
        })?;
        debug!(%run_id, submitted = handles.len(), "dispatched systems");
        Ok(handles)
    }

    /// Wrap system `node`'s body with timing, metrics and logging.
    fn instrumented_job(&self, node: usize, run_id: Uuid) -> Job {
        let body = Arc::clone(&self.bodies[node]);
        let name = self.systems.systems()[node].name().to_string();
        let metrics = Arc::clone(&self.metrics);

        Box::new(move || {
            let _active = ActiveGuard::enter(Arc::clone(&metrics));
            debug!(%run_id, system = %name, "system started");
            let start = Instant::now();
            let result = body();
            let duration = start.elapsed();

            match &result {
                Ok(()) => {
                    debug!(%run_id, system = %name, ?duration, "system finished");
                    if let Ok(mut m) = metrics.write() {
                        m.record_execution(&name, duration);
                    }
                }
                Err(e) => warn!(%run_id, system = %name, error = %e, "system failed"),
            }
            result
        })
    }
}
