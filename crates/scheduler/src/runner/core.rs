use std::sync::{Arc, PoisonError, RwLock};

use ordo_core::{ResourceRegistry, SystemSet, SystemSpec};
use tracing::info;

use crate::error::SchedulerError;
use crate::metrics::SchedulerMetrics;
use crate::pool::RayonPool;
use crate::task::{SystemError, SystemFn};
use crate::types::SchedulerConfig;

/// The system scheduler. Holds the declared systems and their bodies, and
/// runs them on a [`WorkerPool`](crate::pool::WorkerPool) in an order derived
/// from their read/write sets.
pub struct Scheduler {
    pub(super) config: SchedulerConfig,
    /// Declarations, in registration order.
    pub(super) systems: SystemSet,
    /// Bodies, indexed like `systems`.
    pub(super) bodies: Vec<SystemFn>,
    pub(super) metrics: Arc<RwLock<SchedulerMetrics>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_registry(config, ResourceRegistry::new())
    }

    /// Create a scheduler that interns resource names into `registry`.
    pub fn with_registry(config: SchedulerConfig, registry: ResourceRegistry) -> Self {
        Self {
            config,
            systems: SystemSet::with_registry(registry),
            bodies: Vec::new(),
            metrics: Arc::new(RwLock::new(SchedulerMetrics::default())),
        }
    }

    /// Register a system by resource names. Returns its index.
    pub fn add_system<R, W, F>(
        &mut self,
        name: &str,
        reads: R,
        writes: W,
        body: F,
    ) -> Result<usize, SchedulerError>
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        W: IntoIterator,
        W::Item: AsRef<str>,
        F: Fn() -> Result<(), SystemError> + Send + Sync + 'static,
    {
        let index = self.systems.declare(name, reads, writes)?;
        self.bodies.push(Arc::new(body));
        info!(system = name, index, "registered system");
        Ok(index)
    }

    /// Register a pre-built spec. Its resource ids must come from
    /// [`Scheduler::resource`].
    pub fn add_spec<F>(&mut self, spec: SystemSpec, body: F) -> Result<usize, SchedulerError>
    where
        F: Fn() -> Result<(), SystemError> + Send + Sync + 'static,
    {
        let name = spec.name().to_string();
        let index = self.systems.push(spec)?;
        self.bodies.push(Arc::new(body));
        info!(system = %name, index, "registered system");
        Ok(index)
    }

    /// Intern a resource name for use with [`Scheduler::add_spec`].
    pub fn resource(&mut self, name: &str) -> ordo_core::ResourceId {
        self.systems.resource(name)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn systems(&self) -> &SystemSet {
        &self.systems
    }

    /// Get a snapshot of the current scheduler metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Build a [`RayonPool`] sized and named from the config.
    pub fn build_pool(&self) -> Result<RayonPool, SchedulerError> {
        RayonPool::new(
            self.config.resolved_worker_threads(),
            &self.config.thread_name_prefix,
        )
        .map_err(|e| SchedulerError::PoolBuild(e.to_string()))
    }
}
