//! Dependency graph inferred from read/write declarations.
//!
//! An edge `u -> v` means "u must finish before v may start". Edges are
//! derived once per unordered pair of systems:
//!
//! - both write `X`: `u -> v` and `v -> u` (a conflict, surfaces as a cycle)
//! - `u` writes `X`, `v` reads `X`: `u -> v`
//! - `u` reads `X`, `v` writes `X`: `v -> u`
//! - disjoint, or read-only overlap: no edge
//!
//! Building never fails. Conflicting declarations produce a valid graph value
//! that the linearizer later rejects.

use std::collections::BTreeSet;
use std::fmt;

use ordo_core::{ResourceId, ResourceRegistry, SystemSet};
use serde::Serialize;
use tracing::{debug, warn};

/// Why an edge exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Writer precedes reader.
    WriteRead,
    /// Two writers of the same resource. Always paired with the reverse edge.
    WriteWrite,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::WriteRead => write!(f, "write/read"),
            EdgeKind::WriteWrite => write!(f, "write/write"),
        }
    }
}

/// A directed ordering constraint between two systems (by node index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    /// First shared resource (in id order) that produced the edge.
    pub resource: ResourceId,
    pub kind: EdgeKind,
}

/// Two systems declaring write access to the same resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub first: usize,
    pub second: usize,
    pub first_name: String,
    pub second_name: String,
    pub resource: ResourceId,
    pub resource_name: String,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' and '{}' both write '{}'",
            self.first_name, self.second_name, self.resource_name
        )
    }
}

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    names: Vec<String>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
    edges: Vec<Edge>,
    conflicts: Vec<Conflict>,
    registry: ResourceRegistry,
}

impl DependencyGraph {
    /// Build the graph for `set`, one node per system in declaration order.
    pub fn build(set: &SystemSet) -> Self {
        let specs = set.systems();
        let n = specs.len();
        let mut graph = Self {
            names: specs.iter().map(|s| s.name().to_string()).collect(),
            successors: vec![Vec::new(); n],
            predecessors: vec![Vec::new(); n],
            edges: Vec::new(),
            conflicts: Vec::new(),
            registry: set.registry().clone(),
        };

        for a in 0..n {
            for b in (a + 1)..n {
                let (sa, sb) = (&specs[a], &specs[b]);

                let write_write: Vec<ResourceId> = shared(sa.writes(), sb.writes()).collect();
                if let Some(&first) = write_write.first() {
                    for &resource in &write_write {
                        let conflict = Conflict {
                            first: a,
                            second: b,
                            first_name: sa.name().to_string(),
                            second_name: sb.name().to_string(),
                            resource,
                            resource_name: set.resource_name(resource),
                        };
                        warn!(%conflict, "write/write conflict");
                        graph.conflicts.push(conflict);
                    }
                    graph.add_edge(a, b, first, EdgeKind::WriteWrite);
                    graph.add_edge(b, a, first, EdgeKind::WriteWrite);
                    continue;
                }

                if let Some(resource) = shared(sa.writes(), sb.reads()).next() {
                    graph.add_edge(a, b, resource, EdgeKind::WriteRead);
                }
                if let Some(resource) = shared(sb.writes(), sa.reads()).next() {
                    graph.add_edge(b, a, resource, EdgeKind::WriteRead);
                }
            }
        }

        debug!(
            systems = n,
            edges = graph.edges.len(),
            conflicts = graph.conflicts.len(),
            "built dependency graph"
        );
        graph
    }

    fn add_edge(&mut self, from: usize, to: usize, resource: ResourceId, kind: EdgeKind) {
        debug!(
            from = %self.names[from],
            to = %self.names[to],
            resource = %self.resource_name(resource),
            %kind,
            "dependency edge"
        );
        self.successors[from].push(to);
        self.predecessors[to].push(from);
        self.edges.push(Edge {
            from,
            to,
            resource,
            kind,
        });
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Display name of node `index`.
    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Nodes that must wait for `index`.
    pub fn successors(&self, index: usize) -> &[usize] {
        &self.successors[index]
    }

    /// Nodes `index` must wait for.
    pub fn predecessors(&self, index: usize) -> &[usize] {
        &self.predecessors[index]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn has_edge(&self, from: usize, to: usize) -> bool {
        self.successors[from].contains(&to)
    }

    /// Write/write conflicts found during the build.
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn resource_name(&self, id: ResourceId) -> String {
        self.registry
            .name(id)
            .map(str::to_string)
            .unwrap_or_else(|| id.to_string())
    }
}

/// Resources present in both sets, ascending.
///
/// Walks the smaller set and probes the larger, so the cost is bounded by the
/// smaller declaration.
fn shared<'a>(
    x: &'a BTreeSet<ResourceId>,
    y: &'a BTreeSet<ResourceId>,
) -> impl Iterator<Item = ResourceId> + 'a {
    let (small, large) = if x.len() <= y.len() { (x, y) } else { (y, x) };
    small.iter().copied().filter(move |id| large.contains(id))
}
