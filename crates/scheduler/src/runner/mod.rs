//! Scheduler runner: system registration, planning and dispatch.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructor, registration, and accessor methods
//! - `execution`: planning, gated dispatch, and waiting for a run

mod core;
mod execution;

pub use self::core::Scheduler;
