//! Supply network: a directed, weighted graph from suppliers to products.
//!
//! - **Structure** ([`SupplyGraph`]): `petgraph` digraph with a name index.
//!   Nodes exist only as edge endpoints; parallel edges are kept.
//! - **Cost model** ([`cost::CostModel`]): spike-adjusted edge costs frozen
//!   for one run.
//! - **Shortest paths** ([`bellman_ford`]): bounded Bellman-Ford relaxation
//!   over the adjusted costs.

pub mod bellman_ford;
pub mod cost;

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// A directed supply route between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyEdge {
    pub from: String,
    pub to: String,
    /// Cost before any spike penalty.
    pub cost: f64,
}

impl SupplyEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, cost: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            cost,
        }
    }
}

/// How the route source(s) of a run were resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SourceResolution {
    /// Every route starts at this node.
    MainSupplier { name: String },
    /// Products were routed independently from these candidates.
    ///
    /// `fallback` lists the non-root nodes tried for products that no
    /// candidate reaches.
    PerProduct {
        candidates: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        fallback: Vec<String>,
    },
}

/// Directed supply graph keyed by node name.
#[derive(Debug, Clone, Default)]
pub struct SupplyGraph {
    graph: DiGraph<String, SupplyEdge>,
    node_index: HashMap<String, NodeIndex>,
}

impl SupplyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a list of edges, stopping at the first invalid one.
    pub fn from_edges<I>(edges: I) -> GraphResult<Self>
    where
        I: IntoIterator<Item = SupplyEdge>,
    {
        let mut graph = Self::new();
        for edge in edges {
            graph.insert_edge(edge)?;
        }
        Ok(graph)
    }

    /// Ensure a node exists for `name`, returning its index.
    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.node_index.insert(name.to_string(), idx);
        idx
    }

    /// Add a directed edge, creating its endpoints if needed.
    pub fn add_edge(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        cost: f64,
    ) -> GraphResult<EdgeIndex> {
        self.insert_edge(SupplyEdge::new(from, to, cost))
    }

    /// Add an edge value. Costs must be finite and non-negative.
    pub fn insert_edge(&mut self, edge: SupplyEdge) -> GraphResult<EdgeIndex> {
        if !edge.cost.is_finite() || edge.cost < 0.0 {
            return Err(GraphError::InvalidCost {
                from: edge.from,
                to: edge.to,
                cost: edge.cost,
            });
        }
        let from = self.ensure_node(&edge.from);
        let to = self.ensure_node(&edge.to);
        Ok(self.graph.add_edge(from, to, edge))
    }

    /// The underlying petgraph structure.
    pub fn graph(&self) -> &DiGraph<String, SupplyEdge> {
        &self.graph
    }

    pub fn node(&self, name: &str) -> Option<NodeIndex> {
        self.node_index.get(name).copied()
    }

    /// Name of a node; empty for an index from another graph.
    pub fn name(&self, idx: NodeIndex) -> &str {
        self.graph.node_weight(idx).map(String::as_str).unwrap_or("")
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Nodes with outgoing edges and no incoming edges, sorted by name.
    pub fn supplier_roots(&self) -> Vec<NodeIndex> {
        let mut roots: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&n| {
                self.graph
                    .neighbors_directed(n, Direction::Incoming)
                    .next()
                    .is_none()
                    && self
                        .graph
                        .neighbors_directed(n, Direction::Outgoing)
                        .next()
                        .is_some()
            })
            .collect();
        roots.sort_by(|a, b| self.name(*a).cmp(self.name(*b)));
        roots
    }

    /// The unique supplier root, if the network has exactly one.
    pub fn main_supplier(&self) -> GraphResult<NodeIndex> {
        let roots = self.supplier_roots();
        match roots.as_slice() {
            [] => Err(GraphError::NoMainSupplier),
            [only] => Ok(*only),
            many => Err(GraphError::AmbiguousMainSupplier {
                candidates: many.iter().map(|&n| self.name(n).to_string()).collect(),
            }),
        }
    }

    /// Nodes with at least one outgoing edge, sorted by name.
    pub fn nodes_with_outgoing(&self) -> Vec<NodeIndex> {
        let mut nodes: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&n| {
                self.graph
                    .neighbors_directed(n, Direction::Outgoing)
                    .next()
                    .is_some()
            })
            .collect();
        nodes.sort_by(|a, b| self.name(*a).cmp(self.name(*b)));
        nodes
    }
}
