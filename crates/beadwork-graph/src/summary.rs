use crate::graph::DependencyGraph;
use crate::metrics::critical_path::longest_path_depths;
use crate::phase1::topo_order_indices;
use petgraph::algo::tarjan_scc;
use serde::{Deserialize, Serialize};

/// One-glance structural roll-up of a dependency graph.
///
/// Cheap enough to compute synchronously; dashboards and log lines use
/// this without waiting for Phase-2.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub is_dag: bool,
    /// Non-trivial strongly connected components (cycle clusters).
    pub cycle_scc_count: usize,
    /// Longest blocks-chain length in nodes over the acyclic portion.
    pub critical_path_length: usize,
    /// Nodes currently blocking at least one other node.
    pub blocker_count: usize,
}

pub fn summarize(graph: &DependencyGraph) -> GraphSummary {
    let (_, is_dag) = topo_order_indices(graph);
    let cycle_scc_count = tarjan_scc(graph.inner())
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .count();

    let (depths, _) = longest_path_depths(graph);
    let critical_path_length = depths.iter().copied().max().map(|d| d + 1).unwrap_or(0);

    let blocker_count = graph
        .node_indices()
        .filter(|&idx| graph.out_degree(idx) > 0)
        .count();

    GraphSummary {
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        density: graph.density(),
        is_dag,
        cycle_scc_count,
        critical_path_length,
        blocker_count,
    }
}
