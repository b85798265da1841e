//! Kahn's algorithm over a [`DependencyGraph`].

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::graph::{Conflict, DependencyGraph, EdgeKind};

/// Node indices in an order consistent with every graph edge.
///
/// Only [`linearize`] produces one, so an order always matches the graph it
/// was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LinearOrder(Vec<usize>);

impl LinearOrder {
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of `node` in the order.
    pub fn position(&self, node: usize) -> Option<usize> {
        self.0.iter().position(|&n| n == node)
    }
}

/// A dependency edge between two systems caught in a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleEdge {
    pub from: String,
    pub to: String,
    pub resource: String,
    pub kind: EdgeKind,
}

impl fmt::Display for CycleEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({} on '{}')",
            self.from, self.to, self.kind, self.resource
        )
    }
}

/// The systems could not be ordered.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{}", describe_cycle(.systems, .conflicts, .edges))]
pub struct CycleError {
    /// Systems that sit on (or between) cycles, in declaration order.
    pub systems: Vec<String>,
    /// Systems that only wait on the cycle, in declaration order.
    pub blocked: Vec<String>,
    /// Write/write conflicts among `systems`.
    pub conflicts: Vec<Conflict>,
    /// Edges among `systems`, with the resource behind each.
    pub edges: Vec<CycleEdge>,
    /// Every stuck system with its count of incoming edges still unsatisfied
    /// when the algorithm stopped, in declaration order.
    pub remaining: Vec<(String, usize)>,
}

fn describe_cycle(systems: &[String], conflicts: &[Conflict], edges: &[CycleEdge]) -> String {
    let mut msg = format!("dependency cycle among systems [{}]", systems.join(", "));
    if !conflicts.is_empty() {
        let reasons: Vec<String> = conflicts.iter().map(Conflict::to_string).collect();
        msg.push_str(": ");
        msg.push_str(&reasons.join("; "));
    } else if !edges.is_empty() {
        let reasons: Vec<String> = edges.iter().map(CycleEdge::to_string).collect();
        msg.push_str(": ");
        msg.push_str(&reasons.join("; "));
    }
    msg
}

impl CycleError {
    /// Diagnose the nodes Kahn's algorithm could not emit.
    ///
    /// Stuck nodes with no stuck successor cannot be on a cycle; peeling them
    /// off repeatedly leaves only the systems that actually form one.
    fn from_stuck(graph: &DependencyGraph, in_degree: &[usize]) -> Self {
        let n = graph.len();
        let stuck: Vec<bool> = in_degree.iter().map(|&d| d > 0).collect();
        let mut on_cycle = stuck.clone();

        let mut out_degree: Vec<usize> = (0..n)
            .map(|i| {
                if stuck[i] {
                    graph.successors(i).iter().filter(|&&s| stuck[s]).count()
                } else {
                    0
                }
            })
            .collect();
        let mut peel: VecDeque<usize> = (0..n).filter(|&i| stuck[i] && out_degree[i] == 0).collect();
        while let Some(node) = peel.pop_front() {
            on_cycle[node] = false;
            for &p in graph.predecessors(node) {
                if on_cycle[p] {
                    out_degree[p] -= 1;
                    if out_degree[p] == 0 {
                        peel.push_back(p);
                    }
                }
            }
        }

        let systems = (0..n)
            .filter(|&i| on_cycle[i])
            .map(|i| graph.name(i).to_string())
            .collect();
        let blocked = (0..n)
            .filter(|&i| stuck[i] && !on_cycle[i])
            .map(|i| graph.name(i).to_string())
            .collect();
        let conflicts = graph
            .conflicts()
            .iter()
            .filter(|c| on_cycle[c.first] && on_cycle[c.second])
            .cloned()
            .collect();
        let edges = graph
            .edges()
            .iter()
            .filter(|e| on_cycle[e.from] && on_cycle[e.to])
            .map(|e| CycleEdge {
                from: graph.name(e.from).to_string(),
                to: graph.name(e.to).to_string(),
                resource: graph.resource_name(e.resource),
                kind: e.kind,
            })
            .collect();

        let remaining = (0..n)
            .filter(|&i| stuck[i])
            .map(|i| (graph.name(i).to_string(), in_degree[i]))
            .collect();

        Self {
            systems,
            blocked,
            conflicts,
            edges,
            remaining,
        }
    }

    /// True if `name` is part of the reported cycle.
    pub fn involves(&self, name: &str) -> bool {
        self.systems.iter().any(|s| s == name)
    }
}

/// Order the graph's nodes so every edge points forward.
///
/// Nodes that become ready together are emitted in declaration order, so the
/// result is reproducible for a given input. The graph is left untouched; the
/// in-degree counters live in a scratch vector.
pub fn linearize(graph: &DependencyGraph) -> Result<LinearOrder, CycleError> {
    let n = graph.len();
    let mut in_degree: Vec<usize> = (0..n).map(|i| graph.predecessors(i).len()).collect();
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &next in graph.successors(node) {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() == n {
        return Ok(LinearOrder(order));
    }

    let err = CycleError::from_stuck(graph, &in_degree);
    warn!(
        ordered = order.len(),
        total = n,
        cycle = ?err.systems,
        blocked = ?err.blocked,
        "linearization failed"
    );
    Err(err)
}
