//! Spike-adjusted edge costs for one run.

use petgraph::graph::EdgeIndex;
use petgraph::visit::EdgeRef;

use super::SupplyGraph;
use crate::detect::SpikeSnapshot;

/// Adjusted cost of every edge, computed once from a spike snapshot.
///
/// `adjusted = base + penalty` when the edge's destination is spiking,
/// otherwise `adjusted = base`. The model is immutable once frozen; a new run
/// freezes a new model.
#[derive(Debug, Clone)]
pub struct CostModel {
    costs: Vec<f64>,
}

impl CostModel {
    pub fn freeze(graph: &SupplyGraph, snapshot: &SpikeSnapshot, penalty: f64) -> Self {
        let g = graph.graph();
        let mut costs = vec![0.0; g.edge_count()];
        for edge in g.edge_references() {
            let destination = graph.name(edge.target());
            let surcharge = if snapshot.is_spiking(destination) {
                penalty
            } else {
                0.0
            };
            costs[edge.id().index()] = edge.weight().cost + surcharge;
        }
        Self { costs }
    }

    /// Adjusted cost of an edge. Unknown edges cost infinity.
    pub fn adjusted_cost(&self, edge: EdgeIndex) -> f64 {
        self.costs.get(edge.index()).copied().unwrap_or(f64::INFINITY)
    }

    /// Sum of adjusted costs along a sequence of edges.
    pub fn path_cost(&self, edges: &[EdgeIndex]) -> f64 {
        edges.iter().map(|&e| self.adjusted_cost(e)).sum()
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}
