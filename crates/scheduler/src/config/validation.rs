use std::collections::HashSet;

use super::types::Manifest;
use crate::error::SchedulerError;

impl Manifest {
    /// Validate the manifest: names, resource names, thread naming.
    ///
    /// Ordering problems (cycles) are not checked here; they surface when
    /// the systems are planned.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        self.validate_system_names()?;
        self.validate_resource_names()?;
        self.validate_thread_prefix()?;
        Ok(())
    }

    /// Ensure system names are present and unique.
    fn validate_system_names(&self) -> Result<(), SchedulerError> {
        let mut seen = HashSet::new();
        for (i, decl) in self.systems.iter().enumerate() {
            if decl.name.trim().is_empty() {
                return Err(SchedulerError::Config(format!(
                    "system #{i} has an empty name"
                )));
            }
            if !seen.insert(decl.name.as_str()) {
                return Err(SchedulerError::Config(format!(
                    "system '{}' is declared more than once",
                    decl.name
                )));
            }
        }
        Ok(())
    }

    /// Ensure every listed resource has a name.
    fn validate_resource_names(&self) -> Result<(), SchedulerError> {
        for decl in &self.systems {
            let blank = decl
                .reads
                .iter()
                .chain(&decl.writes)
                .any(|r| r.trim().is_empty());
            if blank {
                return Err(SchedulerError::Config(format!(
                    "system '{}' lists an empty resource name",
                    decl.name
                )));
            }
        }
        Ok(())
    }

    fn validate_thread_prefix(&self) -> Result<(), SchedulerError> {
        if self.scheduler.thread_name_prefix.is_empty() {
            return Err(SchedulerError::Config(
                "scheduler.thread_name_prefix must not be empty".into(),
            ));
        }
        Ok(())
    }
}
