use crate::graph::DependencyGraph;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, BTreeMap};

/// Synchronous structural metrics, always available before the analysis
/// handle is returned.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Phase1Metrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub out_degree: BTreeMap<String, f64>,
    pub in_degree: BTreeMap<String, f64>,
    /// Kahn order; on a cyclic graph this is the prefix of removable nodes.
    pub topo_order: Vec<String>,
    pub is_dag: bool,
}

pub fn compute_phase1(graph: &DependencyGraph) -> Phase1Metrics {
    let mut out_degree = BTreeMap::new();
    let mut in_degree = BTreeMap::new();
    for idx in graph.node_indices() {
        let id = graph.id_of(idx).to_string();
        out_degree.insert(id.clone(), graph.out_degree(idx) as f64);
        in_degree.insert(id, graph.in_degree(idx) as f64);
    }

    let (order, is_dag) = topo_order_indices(graph);
    let topo_order = order.iter().map(|&i| graph.id_of(i).to_string()).collect();

    Phase1Metrics {
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        density: graph.density(),
        out_degree,
        in_degree,
        topo_order,
        is_dag,
    }
}

/// Kahn's algorithm with a min-heap on node index.
///
/// The heap pins tie-breaks: among simultaneously ready nodes the smallest
/// index (= smallest id) is emitted first. Returns the emitted order and
/// whether it covers the whole graph (false means cycles exist and the
/// order is the acyclic prefix).
pub fn topo_order_indices(graph: &DependencyGraph) -> (Vec<NodeIndex>, bool) {
    let n = graph.node_count();
    let mut indegree: Vec<usize> = vec![0; n];
    for idx in graph.node_indices() {
        indegree[idx.index()] = graph.in_degree(idx);
    }

    let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph
        .node_indices()
        .filter(|idx| indegree[idx.index()] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(idx)) = ready.pop() {
        order.push(idx);
        for succ in graph.blocked_by_node(idx) {
            let entry = &mut indegree[succ.index()];
            *entry -= 1;
            if *entry == 0 {
                ready.push(Reverse(succ));
            }
        }
    }

    let complete = order.len() == n;
    (order, complete)
}
