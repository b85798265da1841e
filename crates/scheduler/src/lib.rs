//! Data-dependency scheduling for systems that declare which resources they
//! read and write.
//!
//! Systems are turned into a [`DependencyGraph`], linearized into an order
//! that respects every read/write hazard, and submitted to a
//! [`WorkerPool`] with each job gated on its predecessors.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod graph;
pub mod linearize;
pub mod metrics;
pub mod plan;
pub mod pool;
pub mod runner;
pub mod task;
pub mod types;

pub use config::{Manifest, SystemDecl};
pub use dispatch::{schedule_all, wait_all, wait_all_timeout, DispatchError};
pub use error::SchedulerError;
pub use graph::{Conflict, DependencyGraph, Edge, EdgeKind};
pub use linearize::{linearize, CycleEdge, CycleError, LinearOrder};
pub use metrics::SchedulerMetrics;
pub use plan::{ExecutionPlan, PlanEdge, PlanSummary};
pub use pool::{InlinePool, JobHandle, JobOutcome, PoolError, RayonPool, WorkerPool};
pub use runner::Scheduler;
pub use task::{job, Job, SystemError, SystemFn};
pub use types::{RunReport, SchedulerConfig, SystemOutcome};
