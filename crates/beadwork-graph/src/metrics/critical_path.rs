use super::{Interrupt, MetricControl};
use crate::graph::DependencyGraph;
use crate::phase1::topo_order_indices;
use std::collections::BTreeMap;

/// Longest-path depth in edges for every node, via DP over the topological
/// order. Ties between predecessors with equal depth resolve to the
/// smaller node index (the ascending predecessor scan never replaces on
/// equality).
pub fn longest_path_depths(graph: &DependencyGraph) -> (Vec<usize>, Vec<Option<usize>>) {
    let n = graph.node_count();
    let (topo, _) = topo_order_indices(graph);
    let mut depth = vec![0_usize; n];
    let mut chosen_pred: Vec<Option<usize>> = vec![None; n];

    for &v in &topo {
        for u in graph.blockers_of_node(v) {
            let candidate = depth[u.index()] + 1;
            if candidate > depth[v.index()] {
                depth[v.index()] = candidate;
                chosen_pred[v.index()] = Some(u.index());
            }
        }
    }
    (depth, chosen_pred)
}

/// Critical-path score: longest-path depth normalized to [0, 1] by the
/// global maximum. Nodes trapped in cycles (outside the topo prefix) score
/// zero.
pub fn compute(
    graph: &DependencyGraph,
    control: &MetricControl,
) -> Result<BTreeMap<String, f64>, Interrupt> {
    control.check()?;
    let (depth, _) = longest_path_depths(graph);
    control.check()?;

    let max_depth = depth.iter().copied().max().unwrap_or(0);
    Ok(graph
        .node_indices()
        .map(|idx| {
            let score = if max_depth > 0 {
                depth[idx.index()] as f64 / max_depth as f64
            } else {
                0.0
            };
            (graph.id_of(idx).to_string(), score)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beadwork_core::Issue;

    fn issue(id: &str) -> Issue {
        Issue::new(id, id)
    }

    #[test]
    fn chain_scores_scale_linearly() {
        let graph = DependencyGraph::from_issues(&[
            issue("a"),
            issue("b").blocked_by("a"),
            issue("c").blocked_by("b"),
        ]);
        let scores = compute(&graph, &MetricControl::unbounded()).unwrap();
        assert_eq!(scores["a"], 0.0);
        assert_eq!(scores["b"], 0.5);
        assert_eq!(scores["c"], 1.0);
    }

    #[test]
    fn diamond_tie_break_picks_smaller_predecessor() {
        // a -> b -> d, a -> c -> d: both b and c give d depth 2; the scan
        // keeps b (smaller index).
        let graph = DependencyGraph::from_issues(&[
            issue("a"),
            issue("b").blocked_by("a"),
            issue("c").blocked_by("a"),
            issue("d").blocked_by("b").blocked_by("c"),
        ]);
        let (depth, pred) = longest_path_depths(&graph);
        let d = graph.index_of("d").unwrap();
        let b = graph.index_of("b").unwrap();
        assert_eq!(depth[d.index()], 2);
        assert_eq!(pred[d.index()], Some(b.index()));
    }

    #[test]
    fn cycle_nodes_score_zero() {
        let graph = DependencyGraph::from_issues(&[
            issue("a").blocked_by("b"),
            issue("b").blocked_by("a"),
            issue("x"),
            issue("y").blocked_by("x"),
        ]);
        let scores = compute(&graph, &MetricControl::unbounded()).unwrap();
        assert_eq!(scores["a"], 0.0);
        assert_eq!(scores["b"], 0.0);
        assert_eq!(scores["y"], 1.0);
    }
}
