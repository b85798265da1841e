//! Resource name interning.
//!
//! Systems declare the data they touch by name ("Health", "Position").
//! The registry maps each name to a dense [`ResourceId`] so conflict checks
//! compare integers instead of strings.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Stable identifier for a named resource within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(u32);

impl ResourceId {
    /// Position of this resource in interning order.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Append-only name -> id table.
///
/// Ids are handed out densely from zero and never reused, so a registry can
/// outlive a single scheduling run when the resource vocabulary is static.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    by_name: HashMap<String, ResourceId>,
    names: Vec<String>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, allocating one on first sight.
    pub fn intern(&mut self, name: &str) -> ResourceId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = ResourceId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        trace!(resource = name, %id, "interned resource");
        id
    }

    /// Look up an already interned name.
    pub fn get(&self, name: &str) -> Option<ResourceId> {
        self.by_name.get(name).copied()
    }

    /// Reverse lookup, used when rendering diagnostics.
    pub fn name(&self, id: ResourceId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        id.index() < self.names.len()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate `(id, name)` pairs in interning order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (ResourceId(i as u32), name.as_str()))
    }
}
