use std::path::Path;

use ordo_core::config::{env_opt, parse_override};
use ordo_core::SystemSet;
use tracing::debug;

use super::types::Manifest;
use crate::error::SchedulerError;

impl Manifest {
    /// Parse a manifest from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, SchedulerError> {
        let mut manifest: Self = toml::from_str(toml_str)?;
        manifest.apply_env_overrides();
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load a manifest from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loaded manifest");
        Self::from_toml(&content)
    }

    /// Declare every system, in manifest order.
    pub fn system_set(&self) -> Result<SystemSet, SchedulerError> {
        let mut set = SystemSet::new();
        for decl in &self.systems {
            set.declare(&decl.name, &decl.reads, &decl.writes)?;
        }
        Ok(set)
    }

    // ── Environment variable overrides ──────────────────────────────

    /// Apply environment variable overrides.
    ///
    /// - `ORDO_WORKER_THREADS` -> `scheduler.worker_threads`
    /// - `ORDO_THREAD_NAME_PREFIX` -> `scheduler.thread_name_prefix`
    /// - `ORDO_WAIT_TIMEOUT_SECS` -> `scheduler.wait_timeout_secs`
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_overrides(env_opt);
    }

    /// Apply overrides read through `lookup`. Empty and unparseable values
    /// are ignored.
    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        const THREADS: &str = "ORDO_WORKER_THREADS";
        const PREFIX: &str = "ORDO_THREAD_NAME_PREFIX";
        const TIMEOUT: &str = "ORDO_WAIT_TIMEOUT_SECS";

        if let Some(n) = lookup(THREADS).and_then(|v| parse_override(THREADS, &v)) {
            self.scheduler.worker_threads = n;
        }
        if let Some(v) = lookup(PREFIX).filter(|v| !v.is_empty()) {
            self.scheduler.thread_name_prefix = v;
        }
        if let Some(secs) = lookup(TIMEOUT).and_then(|v| parse_override(TIMEOUT, &v)) {
            self.scheduler.wait_timeout_secs = Some(secs);
        }
    }
}
