//! System declarations: who reads and who writes what.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::CoreError;
use crate::resource::{ResourceId, ResourceRegistry};

/// Immutable description of one unit of work.
///
/// `reads` and `writes` are always disjoint: declaring a resource as both
/// read and written records it as a write, since write access implies read
/// access for ordering purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSpec {
    name: String,
    reads: BTreeSet<ResourceId>,
    writes: BTreeSet<ResourceId>,
}

impl SystemSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reads: BTreeSet::new(),
            writes: BTreeSet::new(),
        }
    }

    /// Declare a read. Ignored if the resource is already written.
    pub fn reading(mut self, id: ResourceId) -> Self {
        if !self.writes.contains(&id) {
            self.reads.insert(id);
        }
        self
    }

    /// Declare a write. Upgrades an existing read of the same resource.
    pub fn writing(mut self, id: ResourceId) -> Self {
        self.reads.remove(&id);
        self.writes.insert(id);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reads(&self) -> &BTreeSet<ResourceId> {
        &self.reads
    }

    pub fn writes(&self) -> &BTreeSet<ResourceId> {
        &self.writes
    }

    pub fn reads_resource(&self, id: ResourceId) -> bool {
        self.reads.contains(&id)
    }

    pub fn writes_resource(&self, id: ResourceId) -> bool {
        self.writes.contains(&id)
    }

    /// True if the system declares no data access at all.
    pub fn is_unconstrained(&self) -> bool {
        self.reads.is_empty() && self.writes.is_empty()
    }

    /// Number of distinct resources touched.
    pub fn footprint(&self) -> usize {
        self.reads.len() + self.writes.len()
    }
}

/// Ordered set of system declarations plus the registry their resources
/// were interned in.
///
/// Declaration order is significant: it is the tie-break order the
/// linearizer uses among systems that become ready at the same time.
#[derive(Debug, Clone, Default)]
pub struct SystemSet {
    registry: ResourceRegistry,
    systems: Vec<SystemSpec>,
}

impl SystemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing registry, e.g. one shared across runs.
    pub fn with_registry(registry: ResourceRegistry) -> Self {
        Self {
            registry,
            systems: Vec::new(),
        }
    }

    /// Declare a system by resource names. Returns its index.
    pub fn declare<R, W>(&mut self, name: &str, reads: R, writes: W) -> Result<usize, CoreError>
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        W: IntoIterator,
        W::Item: AsRef<str>,
    {
        self.check_name(name)?;
        let reads: Vec<R::Item> = reads.into_iter().collect();
        let writes: Vec<W::Item> = writes.into_iter().collect();
        // Reject before interning so a failed declaration leaves the registry untouched.
        if reads.iter().any(|r| r.as_ref().is_empty())
            || writes.iter().any(|w| w.as_ref().is_empty())
        {
            return Err(CoreError::EmptyResourceName(name.to_string()));
        }

        let mut spec = SystemSpec::new(name);
        for r in &reads {
            spec = spec.reading(self.registry.intern(r.as_ref()));
        }
        for w in &writes {
            spec = spec.writing(self.registry.intern(w.as_ref()));
        }
        Ok(self.append(spec))
    }

    /// Append a pre-built spec whose ids came from this set's registry.
    pub fn push(&mut self, spec: SystemSpec) -> Result<usize, CoreError> {
        self.check_name(spec.name())?;
        if let Some(id) = spec
            .reads()
            .iter()
            .chain(spec.writes())
            .find(|id| !self.registry.contains(**id))
        {
            return Err(CoreError::UnknownResource {
                system: spec.name().to_string(),
                id: id.raw(),
            });
        }
        Ok(self.append(spec))
    }

    /// Intern a resource name in this set's registry.
    pub fn resource(&mut self, name: &str) -> ResourceId {
        self.registry.intern(name)
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn systems(&self) -> &[SystemSpec] {
        &self.systems
    }

    pub fn get(&self, index: usize) -> Option<&SystemSpec> {
        self.systems.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.systems.iter().position(|s| s.name() == name)
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Resolve a resource id back to its name, falling back to `#id`.
    pub fn resource_name(&self, id: ResourceId) -> String {
        self.registry
            .name(id)
            .map(str::to_string)
            .unwrap_or_else(|| id.to_string())
    }

    fn check_name(&self, name: &str) -> Result<(), CoreError> {
        if name.is_empty() {
            return Err(CoreError::EmptyName);
        }
        if self.index_of(name).is_some() {
            return Err(CoreError::DuplicateSystem(name.to_string()));
        }
        Ok(())
    }

    fn append(&mut self, spec: SystemSpec) -> usize {
        debug!(
            system = spec.name(),
            reads = spec.reads().len(),
            writes = spec.writes().len(),
            "declared system"
        );
        self.systems.push(spec);
        self.systems.len() - 1
    }
}
