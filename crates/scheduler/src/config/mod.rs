//! Manifest configuration: scheduler settings plus system declarations,
//! parsed from TOML with environment variable overrides.

mod loading;
mod types;
mod validation;


pub use types::{Manifest, SystemDecl};
