//! Spike-aware Bellman-Ford over the frozen adjusted costs.
//!
//! ```text
//! dist[source] = 0, dist[v] = inf, pred[v] = none
//! repeat at most |V| - 1 times:
//!   for each edge e = (u, v):
//!     if dist[u] + adjusted(e) < dist[v]:
//!       dist[v] = dist[u] + adjusted(e); pred[v] = e
//! ```
//!
//! Every edge is relaxed on its own, so parallel edges compete. Costs are
//! non-negative (the graph rejects negative base costs and the penalty is
//! validated), so no negative cycle can exist and no detection pass is run.
//! Relaxation stops early once a pass changes nothing; the result is the
//! same as running all `|V| - 1` passes.

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use super::SupplyGraph;
use super::cost::CostModel;

/// Distances and predecessor edges from one source.
///
/// Invariants: `distance(source) == 0.0`; an unreached node has infinite
/// distance and no predecessor.
#[derive(Clone, Debug)]
pub struct ShortestPaths {
    source: NodeIndex,
    /// Cheapest adjusted cost from the source, indexed by node.
    dists: Vec<f64>,
    /// Last edge on the cheapest path, indexed by node.
    preds: Vec<Option<EdgeIndex>>,
    passes: usize,
}

/// Run the bounded relaxation from `source`.
pub fn shortest_paths(graph: &SupplyGraph, costs: &CostModel, source: NodeIndex) -> ShortestPaths {
    let n_nodes = graph.node_count();
    let mut paths = ShortestPaths::init(n_nodes, source);

    for _ in 1..n_nodes {
        if !paths.relax_pass(graph, costs) {
            break;
        }
    }

    tracing::debug!(
        source = graph.name(source),
        nodes = n_nodes,
        edges = graph.edge_count(),
        passes = paths.passes,
        "shortest paths computed"
    );
    paths
}

impl ShortestPaths {
    fn init(n_nodes: usize, source: NodeIndex) -> Self {
        let mut dists = vec![f64::INFINITY; n_nodes];
        if let Some(d) = dists.get_mut(source.index()) {
            *d = 0.0;
        }
        Self {
            source,
            dists,
            preds: vec![None; n_nodes],
            passes: 0,
        }
    }

    /// One relaxation pass over every edge. Returns whether anything changed.
    fn relax_pass(&mut self, graph: &SupplyGraph, costs: &CostModel) -> bool {
        self.passes += 1;
        let mut updated = false;
        for edge in graph.graph().edge_references() {
            let (u, v) = (edge.source().index(), edge.target().index());
            if !self.dists[u].is_finite() {
                continue;
            }
            let candidate = self.dists[u] + costs.adjusted_cost(edge.id());
            if candidate < self.dists[v] {
                self.dists[v] = candidate;
                self.preds[v] = Some(edge.id());
                updated = true;
            }
        }
        updated
    }

    pub fn source(&self) -> NodeIndex {
        self.source
    }

    /// Relaxation passes executed, including the final quiet one.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Cheapest adjusted cost to `node`; infinity when unreached.
    pub fn distance(&self, node: NodeIndex) -> f64 {
        self.dists.get(node.index()).copied().unwrap_or(f64::INFINITY)
    }

    pub fn is_reachable(&self, node: NodeIndex) -> bool {
        self.distance(node).is_finite()
    }

    /// Last edge on the cheapest path to `node`.
    pub fn predecessor(&self, node: NodeIndex) -> Option<EdgeIndex> {
        self.preds.get(node.index()).copied().flatten()
    }

    /// Edges of the cheapest path from the source to `target`, in travel order.
    ///
    /// `None` when the predecessor walk does not end at the source. The walk
    /// is bounded by the node count.
    pub fn edges_to(&self, graph: &SupplyGraph, target: NodeIndex) -> Option<Vec<EdgeIndex>> {
        if !self.is_reachable(target) {
            return None;
        }
        let mut edges = Vec::new();
        let mut node = target;
        while let Some(edge) = self.predecessor(node) {
            if edges.len() >= self.dists.len() {
                return None;
            }
            edges.push(edge);
            node = graph.graph().edge_endpoints(edge)?.0;
        }
        if node != self.source {
            return None;
        }
        edges.reverse();
        Some(edges)
    }

    /// Nodes of the cheapest path, source first and `target` last.
    pub fn path_to(&self, graph: &SupplyGraph, target: NodeIndex) -> Option<Vec<NodeIndex>> {
        let edges = self.edges_to(graph, target)?;
        self.nodes_along(graph, &edges)
    }

    /// Nodes visited by `edges` from this run's source, source first.
    pub fn nodes_along(&self, graph: &SupplyGraph, edges: &[EdgeIndex]) -> Option<Vec<NodeIndex>> {
        let mut nodes = Vec::with_capacity(edges.len() + 1);
        nodes.push(self.source);
        for &edge in edges {
            nodes.push(graph.graph().edge_endpoints(edge)?.1);
        }
        Some(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::SpikeSnapshot;

    fn calm(graph: &SupplyGraph) -> CostModel {
        CostModel::freeze(graph, &SpikeSnapshot::default(), 10.0)
    }

    fn names(graph: &SupplyGraph, path: &[NodeIndex]) -> Vec<String> {
        path.iter().map(|&n| graph.name(n).to_string()).collect()
    }

    #[test]
    fn kitchen_network_distances() {
        let mut g = SupplyGraph::new();
        g.add_edge("Kitchen", "Burger", 5.0).unwrap();
        g.add_edge("Kitchen", "Fries", 4.0).unwrap();
        g.add_edge("Kitchen", "Soda", 3.0).unwrap();
        g.add_edge("Burger", "Fries", 2.0).unwrap();
        g.add_edge("Fries", "Soda", 1.5).unwrap();
        let kitchen = g.node("Kitchen").unwrap();

        let p = shortest_paths(&g, &calm(&g), kitchen);
        assert_eq!(p.distance(kitchen), 0.0);
        assert_eq!(p.predecessor(kitchen), None);
        assert_eq!(p.distance(g.node("Burger").unwrap()), 5.0);
        assert_eq!(p.distance(g.node("Fries").unwrap()), 4.0);
        assert_eq!(p.distance(g.node("Soda").unwrap()), 3.0);

        let path = p.path_to(&g, g.node("Fries").unwrap()).unwrap();
        assert_eq!(names(&g, &path), ["Kitchen", "Fries"]);
    }

    #[test]
    fn spike_penalty_reroutes() {
        let mut g = SupplyGraph::new();
        g.add_edge("S", "A", 1.0).unwrap();
        g.add_edge("S", "B", 2.0).unwrap();
        g.add_edge("A", "T", 1.0).unwrap();
        g.add_edge("B", "T", 1.5).unwrap();
        let (s, t) = (g.node("S").unwrap(), g.node("T").unwrap());

        let p = shortest_paths(&g, &calm(&g), s);
        assert_eq!(names(&g, &p.path_to(&g, t).unwrap()), ["S", "A", "T"]);
        assert_eq!(p.distance(t), 2.0);

        let costs = CostModel::freeze(&g, &SpikeSnapshot::from_names(["A"]), 10.0);
        let p = shortest_paths(&g, &costs, s);
        assert_eq!(names(&g, &p.path_to(&g, t).unwrap()), ["S", "B", "T"]);
        assert_eq!(p.distance(t), 3.5);
    }

    #[test]
    fn cheapest_parallel_edge_wins() {
        let mut g = SupplyGraph::new();
        g.add_edge("Mill", "Bread", 3.0).unwrap();
        let cheap = g.add_edge("Mill", "Bread", 1.0).unwrap();
        let (mill, bread) = (g.node("Mill").unwrap(), g.node("Bread").unwrap());

        let p = shortest_paths(&g, &calm(&g), mill);
        assert_eq!(p.predecessor(bread), Some(cheap));
        assert_eq!(p.distance(bread), 1.0);
    }

    #[test]
    fn cycles_terminate() {
        let mut g = SupplyGraph::new();
        g.add_edge("S", "A", 1.0).unwrap();
        g.add_edge("A", "B", 1.0).unwrap();
        g.add_edge("B", "C", 1.0).unwrap();
        g.add_edge("C", "A", 1.0).unwrap();
        let s = g.node("S").unwrap();

        let p = shortest_paths(&g, &calm(&g), s);
        assert!(p.passes() <= g.node_count() - 1);
        let c = g.node("C").unwrap();
        assert_eq!(p.distance(c), 3.0);
        assert_eq!(names(&g, &p.path_to(&g, c).unwrap()), ["S", "A", "B", "C"]);
    }

    #[test]
    fn unreached_nodes_have_no_path() {
        let mut g = SupplyGraph::new();
        g.add_edge("Kitchen", "Burger", 5.0).unwrap();
        g.add_edge("Bakery", "Bun", 1.0).unwrap();
        let kitchen = g.node("Kitchen").unwrap();
        let bun = g.node("Bun").unwrap();

        let p = shortest_paths(&g, &calm(&g), kitchen);
        assert_eq!(p.distance(bun), f64::INFINITY);
        assert_eq!(p.predecessor(bun), None);
        assert!(p.path_to(&g, bun).is_none());
        assert!(p.edges_to(&g, bun).is_none());
    }

    #[test]
    fn source_path_is_itself() {
        let mut g = SupplyGraph::new();
        g.add_edge("Kitchen", "Burger", 5.0).unwrap();
        let kitchen = g.node("Kitchen").unwrap();
        let p = shortest_paths(&g, &calm(&g), kitchen);
        assert_eq!(p.path_to(&g, kitchen).unwrap(), [kitchen]);
    }

    #[test]
    fn distances_never_increase_between_passes() {
        // Inserted back to front so each pass only advances one hop.
        let mut g = SupplyGraph::new();
        g.add_edge("C", "D", 1.0).unwrap();
        g.add_edge("B", "C", 1.0).unwrap();
        g.add_edge("A", "B", 1.0).unwrap();
        g.add_edge("S", "A", 1.0).unwrap();
        g.add_edge("S", "D", 10.0).unwrap();
        let costs = calm(&g);
        let s = g.node("S").unwrap();

        let mut p = ShortestPaths::init(g.node_count(), s);
        let mut previous = p.dists.clone();
        for _ in 1..g.node_count() {
            p.relax_pass(&g, &costs);
            for (before, after) in previous.iter().zip(&p.dists) {
                assert!(after <= before);
            }
            previous = p.dists.clone();
        }
        assert_eq!(p.distance(g.node("D").unwrap()), 4.0);
        // Fixed point: one more pass changes nothing.
        assert!(!p.relax_pass(&g, &costs));
        assert_eq!(p.dists, previous);
    }

    #[test]
    fn path_cost_matches_distance() {
        let mut g = SupplyGraph::new();
        g.add_edge("Kitchen", "Burger", 5.0).unwrap();
        g.add_edge("Burger", "Fries", 2.0).unwrap();
        g.add_edge("Fries", "Soda", 1.5).unwrap();
        g.add_edge("Kitchen", "Soda", 30.0).unwrap();
        let costs = CostModel::freeze(&g, &SpikeSnapshot::from_names(["Burger", "Fries"]), 10.0);
        let kitchen = g.node("Kitchen").unwrap();
        let soda = g.node("Soda").unwrap();

        let p = shortest_paths(&g, &costs, kitchen);
        let edges = p.edges_to(&g, soda).unwrap();
        assert_eq!(costs.path_cost(&edges), p.distance(soda));
        assert_eq!(p.distance(soda), 28.5);
        let path = p.path_to(&g, soda).unwrap();
        assert_eq!(path.first(), Some(&kitchen));
        assert_eq!(path.last(), Some(&soda));
        assert_eq!(p.nodes_along(&g, &edges).unwrap(), path);
    }

    #[test]
    fn empty_graph_is_harmless() {
        let g = SupplyGraph::new();
        let p = shortest_paths(&g, &calm(&g), NodeIndex::new(0));
        assert_eq!(p.passes(), 0);
        assert!(!p.is_reachable(NodeIndex::new(0)));
    }
}
