use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pool::JobOutcome;

/// Scheduler configuration, typically parsed from the `[scheduler]` table of
/// a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker threads. 0 = available parallelism.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Worker thread name prefix.
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
    /// Give up waiting on a run after this many seconds. Unset = wait forever.
    #[serde(default)]
    pub wait_timeout_secs: Option<u64>,
}

fn default_worker_threads() -> usize { 0 }
fn default_thread_name_prefix() -> String { "ordo-worker".into() }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            thread_name_prefix: default_thread_name_prefix(),
            wait_timeout_secs: None,
        }
    }
}

impl SchedulerConfig {
    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.worker_threads
        }
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_secs.map(Duration::from_secs)
    }
}

/// Final state of one system in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemOutcome {
    pub system: String,
    pub outcome: JobOutcome,
}

/// Result of a completed scheduling run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Wall time from dispatch to the last job finishing.
    pub elapsed: Duration,
    /// One entry per system, in linear order.
    pub outcomes: Vec<SystemOutcome>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.outcome.is_success())
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.is_success())
            .map(|o| o.system.as_str())
    }

    pub fn failed(&self) -> impl Iterator<Item = &SystemOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, JobOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SystemOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, JobOutcome::Skipped(_)))
    }

    pub fn outcome_of(&self, system: &str) -> Option<&JobOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.system == system)
            .map(|o| &o.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_config_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.worker_threads, 0);
        assert_eq!(config.thread_name_prefix, "ordo-worker");
        assert_eq!(config.wait_timeout(), None);
    }

    #[test]
    fn resolved_worker_threads() {
        let mut config = SchedulerConfig::default();
        // 0 means auto-detect
        assert!(config.resolved_worker_threads() > 0);

        config.worker_threads = 8;
        assert_eq!(config.resolved_worker_threads(), 8);
    }

    #[test]
    fn wait_timeout_from_secs() {
        let config = SchedulerConfig {
            wait_timeout_secs: Some(3),
            ..SchedulerConfig::default()
        };
        assert_eq!(config.wait_timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn report_partitions_outcomes() {
        let report = RunReport {
            run_id: Uuid::new_v4(),
            elapsed: Duration::from_millis(5),
            outcomes: vec![
                SystemOutcome { system: "a".into(), outcome: JobOutcome::Succeeded },
                SystemOutcome { system: "b".into(), outcome: JobOutcome::Failed("x".into()) },
                SystemOutcome { system: "c".into(), outcome: JobOutcome::Skipped("y".into()) },
            ],
        };
        assert!(!report.is_success());
        assert_eq!(report.succeeded().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.skipped().count(), 1);
        assert_eq!(report.outcome_of("b"), Some(&JobOutcome::Failed("x".into())));
        assert_eq!(report.outcome_of("zzz"), None);
    }
}
