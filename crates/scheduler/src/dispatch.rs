//! Turning a linear order into gated pool submissions.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::plan::ExecutionPlan;
use crate::pool::{JobHandle, JobOutcome, PoolError, WorkerPool};
use crate::task::Job;

/// The pool refused a submission part-way through dispatch.
///
/// Jobs submitted before the failure are not rolled back; `submitted` holds
/// their handles so the caller can still drain them with [`wait_all`].
#[derive(Debug, Error)]
#[error("failed to submit system '{system}' ({} already submitted): {source}", .submitted.len())]
pub struct DispatchError {
    pub system: String,
    pub source: PoolError,
    pub submitted: Vec<JobHandle>,
}

/// Submit every system of `plan` to `pool` in linear order.
///
/// Each node is gated on the handles of its predecessors: none means it is
/// submitted ungated, one is used as the gate directly, several are joined
/// with [`WorkerPool::combine`]. `make_job` is called once per node, in
/// order. Returns handles in linear order.
///
/// A plan's order always covers exactly its own graph, so every predecessor
/// has a handle before its dependents are submitted.
pub fn schedule_all<F>(
    plan: &ExecutionPlan,
    pool: &dyn WorkerPool,
    mut make_job: F,
) -> Result<Vec<JobHandle>, DispatchError>
where
    F: FnMut(usize) -> Job,
{
    let graph = plan.graph();
    let mut by_node: Vec<Option<JobHandle>> = vec![None; graph.len()];
    let mut submitted = Vec::with_capacity(plan.len());

    for node in plan.order().iter() {
        let name = graph.name(node);
        let preds = graph.predecessors(node);
        let gates: Option<Vec<JobHandle>> = preds.iter().map(|&p| by_node[p].clone()).collect();
        let Some(mut gates) = gates else {
            warn!(system = name, "predecessor not yet submitted");
            return Err(DispatchError {
                system: name.to_string(),
                source: PoolError::Rejected(format!(
                    "a predecessor of '{name}' has not been submitted"
                )),
                submitted,
            });
        };

        let gate = match gates.len() {
            0 => None,
            1 => gates.pop(),
            _ => Some(pool.combine(&format!("{name}.deps"), &gates)),
        };
        debug!(system = name, predecessors = preds.len(), "submitting system");

        match pool.submit(name, make_job(node), gate.as_ref()) {
            Ok(handle) => {
                by_node[node] = Some(handle.clone());
                submitted.push(handle);
            }
            Err(source) => {
                warn!(
                    system = name,
                    submitted = submitted.len(),
                    error = %source,
                    "submission rejected"
                );
                return Err(DispatchError {
                    system: name.to_string(),
                    source,
                    submitted,
                });
            }
        }
    }

    Ok(submitted)
}

/// Block until every handle has finished. Never returns on partial completion.
pub fn wait_all(handles: &[JobHandle]) -> Vec<JobOutcome> {
    handles.iter().map(JobHandle::wait).collect()
}

/// Like [`wait_all`] but gives up after `timeout`.
///
/// `None` means at least one job was still running at the deadline. The jobs
/// are not cancelled and keep running to completion.
pub fn wait_all_timeout(handles: &[JobHandle], timeout: Duration) -> Option<Vec<JobOutcome>> {
    let deadline = Instant::now() + timeout;
    handles
        .iter()
        .map(|h| h.wait_timeout(deadline.saturating_duration_since(Instant::now())))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use ordo_core::SystemSet;

    use super::*;
    use crate::pool::InlinePool;
    use crate::task::{job, SystemError};

    const NONE: [&str; 0] = [];

    fn scenario_a() -> SystemSet {
        let mut set = SystemSet::new();
        set.declare("Poison", ["PoisonCounter"], ["Health"]).unwrap();
        set.declare("GameOver", ["Health"], ["GameState"]).unwrap();
        set.declare("HealthBar", ["Health"], ["GUI"]).unwrap();
        set.declare("Movement", ["Input"], ["Position"]).unwrap();
        set
    }

    #[test]
    fn schedules_in_linear_order() {
        let plan = ExecutionPlan::new(&scenario_a()).unwrap();
        let pool = InlinePool::new();

        let handles = schedule_all(&plan, &pool, |_| job(|| Ok(()))).unwrap();
        let labels: Vec<&str> = handles.iter().map(JobHandle::label).collect();
        assert_eq!(labels, vec!["Poison", "Movement", "GameOver", "HealthBar"]);
        assert!(wait_all(&handles).iter().all(JobOutcome::is_success));
        assert_eq!(pool.executed(), labels);
    }

    #[test]
    fn multiple_predecessors_are_joined() {
        let mut set = SystemSet::new();
        set.declare("A", NONE, ["X"]).unwrap();
        set.declare("B", NONE, ["Y"]).unwrap();
        set.declare("C", ["X", "Y"], NONE).unwrap();
        let plan = ExecutionPlan::new(&set).unwrap();
        let pool = InlinePool::new();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let handles = schedule_all(&plan, &pool, |node| {
            let seen = Arc::clone(&seen);
            job(move || {
                seen.lock().unwrap().push(node);
                Ok(())
            })
        })
        .unwrap();
        wait_all(&handles);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn failure_in_one_predecessor_skips_joined_dependent() {
        let mut set = SystemSet::new();
        set.declare("A", NONE, ["X"]).unwrap();
        set.declare("B", NONE, ["Y"]).unwrap();
        set.declare("C", ["X", "Y"], NONE).unwrap();
        set.declare("D", NONE, ["W"]).unwrap();
        let plan = ExecutionPlan::new(&set).unwrap();
        let pool = InlinePool::new();

        let handles = schedule_all(&plan, &pool, |node| {
            if node == 1 {
                job(|| Err(SystemError::Failed("B broke".into())))
            } else {
                job(|| Ok(()))
            }
        })
        .unwrap();
        let outcomes = wait_all(&handles);
        assert!(outcomes[0].is_success());
        assert!(matches!(outcomes[1], JobOutcome::Failed(_)));
        assert!(outcomes[2].is_success(), "D is independent of B");
        match &outcomes[3] {
            JobOutcome::Skipped(reason) => assert!(reason.contains("'B'"), "got: {reason}"),
            other => panic!("expected C to be skipped, got {other:?}"),
        }
        assert_eq!(pool.executed(), vec!["A", "B", "D"]);
    }

    #[test]
    fn rejection_keeps_submitted_handles() {
        let plan = ExecutionPlan::new(&scenario_a()).unwrap();
        let pool = InlinePool::rejecting_after(2);

        let err = schedule_all(&plan, &pool, |_| job(|| Ok(()))).unwrap_err();
        assert_eq!(err.system, "GameOver");
        assert_eq!(err.submitted.len(), 2);
        assert!(matches!(err.source, PoolError::Rejected(_)));
        assert!(wait_all(&err.submitted).iter().all(JobOutcome::is_success));
        assert!(err.to_string().contains("GameOver"));
    }

    #[test]
    fn reader_declared_first_is_gated_on_writer() {
        let mut set = SystemSet::new();
        set.declare("Reader", ["X"], NONE).unwrap();
        set.declare("Writer", NONE, ["X"]).unwrap();
        let plan = ExecutionPlan::new(&set).unwrap();
        let pool = InlinePool::new();

        let handles = schedule_all(&plan, &pool, |node| {
            if node == 1 {
                job(|| Err(SystemError::Failed("no X".into())))
            } else {
                job(|| Ok(()))
            }
        })
        .unwrap();

        let labels: Vec<&str> = handles.iter().map(JobHandle::label).collect();
        assert_eq!(labels, vec!["Writer", "Reader"]);
        // Skipped rather than run proves the reader was gated on the writer.
        assert!(matches!(handles[1].wait(), JobOutcome::Skipped(_)));
        assert_eq!(pool.executed(), vec!["Writer"]);
    }

    #[test]
    fn empty_order_submits_nothing() {
        let plan = ExecutionPlan::new(&SystemSet::new()).unwrap();
        let pool = InlinePool::new();
        let handles = schedule_all(&plan, &pool, |_| job(|| Ok(()))).unwrap();
        assert!(handles.is_empty());
        assert!(wait_all(&handles).is_empty());
        assert_eq!(pool.submitted(), 0);
    }

    #[test]
    fn wait_all_timeout_reports_unfinished() {
        let pending = JobHandle::new("pending");
        let done = JobHandle::new("done");
        done.finish(JobOutcome::Succeeded);
        assert_eq!(
            wait_all_timeout(&[done.clone()], Duration::from_millis(5)),
            Some(vec![JobOutcome::Succeeded])
        );
        assert_eq!(
            wait_all_timeout(&[done, pending], Duration::from_millis(5)),
            None
        );
    }
}
