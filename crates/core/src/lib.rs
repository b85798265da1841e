pub mod config;
pub mod error;
pub mod resource;
pub mod system;

pub use error::*;
pub use resource::{ResourceId, ResourceRegistry};
pub use system::{SystemSet, SystemSpec};
