use ordo_core::SystemSet;
use serde::Serialize;

use crate::graph::{DependencyGraph, EdgeKind};
use crate::linearize::{linearize, CycleError, LinearOrder};

/// A graph together with a valid linearization of it.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    graph: DependencyGraph,
    order: LinearOrder,
}

impl ExecutionPlan {
    /// Build the graph for `set` and linearize it.
    pub fn new(set: &SystemSet) -> Result<Self, CycleError> {
        let graph = DependencyGraph::build(set);
        let order = linearize(&graph)?;
        Ok(Self { graph, order })
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn order(&self) -> &LinearOrder {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// System names in execution order.
    pub fn ordered_names(&self) -> Vec<&str> {
        self.order.iter().map(|i| self.graph.name(i)).collect()
    }

    /// Group nodes into waves by longest predecessor chain.
    ///
    /// Every node in wave `k` depends only on nodes in waves `< k`, so a wave
    /// is a set of systems that may run concurrently once the previous waves
    /// are done. Within a wave nodes keep their linear order.
    pub fn stages(&self) -> Vec<Vec<usize>> {
        let mut level = vec![0usize; self.graph.len()];
        let mut stages: Vec<Vec<usize>> = Vec::new();
        for node in self.order.iter() {
            let depth = self
                .graph
                .predecessors(node)
                .iter()
                .map(|&p| level[p] + 1)
                .max()
                .unwrap_or(0);
            level[node] = depth;
            if stages.len() <= depth {
                stages.resize_with(depth + 1, Vec::new);
            }
            stages[depth].push(node);
        }
        stages
    }

    /// Name-resolved, serializable view of the plan.
    pub fn summary(&self) -> PlanSummary {
        let name = |i: usize| self.graph.name(i).to_string();
        PlanSummary {
            order: self.order.iter().map(name).collect(),
            stages: self
                .stages()
                .into_iter()
                .map(|stage| stage.into_iter().map(name).collect())
                .collect(),
            edges: self
                .graph
                .edges()
                .iter()
                .map(|e| PlanEdge {
                    from: name(e.from),
                    to: name(e.to),
                    resource: self.graph.resource_name(e.resource),
                    kind: e.kind,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub order: Vec<String>,
    pub stages: Vec<Vec<String>>,
    pub edges: Vec<PlanEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEdge {
    pub from: String,
    pub to: String,
    pub resource: String,
    pub kind: EdgeKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn scenario_a_stages() {
        let mut set = SystemSet::new();
        set.declare("Poison", ["PoisonCounter"], ["Health"]).unwrap();
        set.declare("GameOver", ["Health"], ["GameState"]).unwrap();
        set.declare("HealthBar", ["Health"], ["GUI"]).unwrap();
        set.declare("Movement", ["Input"], ["Position"]).unwrap();

        let plan = ExecutionPlan::new(&set).unwrap();
        assert_eq!(plan.ordered_names(), vec!["Poison", "Movement", "GameOver", "HealthBar"]);
        assert_eq!(plan.stages(), vec![vec![0, 3], vec![1, 2]]);

        let summary = plan.summary();
        assert_eq!(summary.stages[0], vec!["Poison", "Movement"]);
        assert_eq!(summary.stages[1], vec!["GameOver", "HealthBar"]);
        assert_eq!(summary.edges.len(), 2);
        assert_eq!(summary.edges[0].resource, "Health");
    }

    #[test]
    fn chain_gets_one_stage_per_link() {
        let mut set = SystemSet::new();
        set.declare("C", ["Y"], NONE).unwrap();
        set.declare("B", ["X"], ["Y"]).unwrap();
        set.declare("A", NONE, ["X"]).unwrap();
        let plan = ExecutionPlan::new(&set).unwrap();
        assert_eq!(plan.ordered_names(), vec!["A", "B", "C"]);
        assert_eq!(plan.stages(), vec![vec![2], vec![1], vec![0]]);
    }

    #[test]
    fn empty_plan() {
        let plan = ExecutionPlan::new(&SystemSet::new()).unwrap();
        assert!(plan.is_empty());
        assert!(plan.stages().is_empty());
        assert!(plan.summary().order.is_empty());
    }

    #[test]
    fn summary_serializes() {
        let mut set = SystemSet::new();
        set.declare("W", NONE, ["X"]).unwrap();
        set.declare("R", ["X"], NONE).unwrap();
        let json = serde_json::to_value(ExecutionPlan::new(&set).unwrap().summary()).unwrap();
        assert_eq!(json["order"][0], "W");
        assert_eq!(json["edges"][0]["kind"], "write_read");
    }
}
