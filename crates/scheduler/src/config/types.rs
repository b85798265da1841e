use serde::{Deserialize, Serialize};

use crate::types::SchedulerConfig;

// ── Top-level manifest ──────────────────────────────────────────────

/// A scheduling manifest.
///
/// Parsed from `ordo.toml`: a `[scheduler]` table and one `[[systems]]`
/// entry per system, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Declaration order is significant: it breaks ties in the linear order.
    #[serde(default)]
    pub systems: Vec<SystemDecl>,
}

// ── System entries ──────────────────────────────────────────────────

/// One `[[systems]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemDecl {
    pub name: String,

    #[serde(default)]
    pub reads: Vec<String>,

    #[serde(default)]
    pub writes: Vec<String>,

    /// Simulated work, in milliseconds, for manifest-driven runs.
    #[serde(default)]
    pub cost_ms: u64,

    /// Make the simulated body fail. Used to exercise skip propagation.
    #[serde(default)]
    pub fail: bool,
}

impl SystemDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reads: Vec::new(),
            writes: Vec::new(),
            cost_ms: 0,
            fail: false,
        }
    }
}
