use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Scheduler operational metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Successful executions by system name.
    pub executions: HashMap<String, u64>,
    /// Failed executions (error or panic) by system name.
    pub failures: HashMap<String, u64>,
    /// Times a system was skipped because an upstream system did not succeed.
    pub skips: HashMap<String, u64>,
    /// Average successful execution time by system name.
    pub avg_duration: HashMap<String, Duration>,
    /// Last successful execution time by system name.
    pub last_run: HashMap<String, DateTime<Utc>>,
    /// Runs waited to completion.
    pub runs_completed: u64,
    /// Wall time of the most recent completed run.
    pub last_run_elapsed: Option<Duration>,
    /// Systems executing right now.
    pub active_systems: usize,
    /// Highest number of systems observed executing at once.
    pub peak_concurrency: usize,
}

impl SchedulerMetrics {
    /// Record a successful system execution.
    pub fn record_execution(&mut self, system: &str, duration: Duration) {
        *self.executions.entry(system.to_string()).or_default() += 1;
        self.last_run.insert(system.to_string(), Utc::now());

        let count = self.executions[system];
        let prev_avg = self
            .avg_duration
            .get(system)
            .copied()
            .unwrap_or_default();

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        let new_avg = if count == 1 {
            duration
        } else {
            let prev_nanos = prev_avg.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / count as f64;
            Duration::from_nanos(avg_nanos as u64)
        };

        self.avg_duration.insert(system.to_string(), new_avg);
    }

    pub fn record_failure(&mut self, system: &str) {
        *self.failures.entry(system.to_string()).or_default() += 1;
    }

    pub fn record_skip(&mut self, system: &str) {
        *self.skips.entry(system.to_string()).or_default() += 1;
    }

    pub fn record_run(&mut self, elapsed: Duration) {
        self.runs_completed += 1;
        self.last_run_elapsed = Some(elapsed);
    }

    /// A system started executing.
    pub fn enter_system(&mut self) {
        self.active_systems += 1;
        self.peak_concurrency = self.peak_concurrency.max(self.active_systems);
    }

    /// A system stopped executing.
    pub fn exit_system(&mut self) {
        self.active_systems = self.active_systems.saturating_sub(1);
    }
}
