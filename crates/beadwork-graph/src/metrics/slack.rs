use super::{Interrupt, MetricControl};
use crate::graph::DependencyGraph;
use crate::phase1::topo_order_indices;
use std::collections::BTreeMap;

/// Scheduling slack per node over the acyclic portion.
///
/// `slack(v) = global_longest - (longest_to(v) + longest_from(v))`, all in
/// edges. Zero-slack nodes sit on a critical path. Nodes trapped in cycles
/// are mutually blocking and reported with zero slack.
pub fn compute(
    graph: &DependencyGraph,
    control: &MetricControl,
) -> Result<BTreeMap<String, f64>, Interrupt> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(BTreeMap::new());
    }

    let (topo, _) = topo_order_indices(graph);
    control.check()?;

    // Forward pass: longest path from any source, in edges.
    let mut from_source = vec![0_usize; n];
    for &v in &topo {
        for u in graph.blockers_of_node(v) {
            from_source[v.index()] = from_source[v.index()].max(from_source[u.index()] + 1);
        }
    }
    control.check()?;

    // Backward pass: longest path to any sink.
    let mut to_sink = vec![0_usize; n];
    for &v in topo.iter().rev() {
        for w in graph.blocked_by_node(v) {
            to_sink[v.index()] = to_sink[v.index()].max(to_sink[w.index()] + 1);
        }
    }

    let global = topo
        .iter()
        .map(|&v| from_source[v.index()])
        .max()
        .unwrap_or(0);

    let in_topo: Vec<bool> = {
        let mut seen = vec![false; n];
        for &v in &topo {
            seen[v.index()] = true;
        }
        seen
    };

    Ok(graph
        .node_indices()
        .map(|idx| {
            let i = idx.index();
            let slack = if in_topo[i] {
                global.saturating_sub(from_source[i] + to_sink[i])
            } else {
                0
            };
            (graph.id_of(idx).to_string(), slack as f64)
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
    fn diamond_has_zero_slack_everywhere() {
        let graph = DependencyGraph::from_issues(&[
            issue("a"),
            issue("b").blocked_by("a"),
            issue("c").blocked_by("a"),
            issue("d").blocked_by("b").blocked_by("c"),
        ]);
        let slack = compute(&graph, &MetricControl::unbounded()).unwrap();
        for id in ["a", "b", "c", "d"] {
            assert_eq!(slack[id], 0.0, "slack({id})");
        }
    }

    #[test]
    fn short_branch_has_slack() {
        // a -> b -> c -> d and a -> e -> d: e can slip one step.
        let graph = DependencyGraph::from_issues(&[
            issue("a"),
            issue("b").blocked_by("a"),
            issue("c").blocked_by("b"),
            issue("d").blocked_by("c").blocked_by("e"),
            issue("e").blocked_by("a"),
        ]);
        let slack = compute(&graph, &MetricControl::unbounded()).unwrap();
        assert_eq!(slack["e"], 1.0);
        for id in ["a", "b", "c", "d"] {
            assert_eq!(slack[id], 0.0, "slack({id})");
        }
    }

    #[test]
    fn cycle_members_report_zero_slack() {
        let graph = DependencyGraph::from_issues(&[
            issue("a").blocked_by("b"),
            issue("b").blocked_by("a"),
            issue("x"),
        ]);
        let slack = compute(&graph, &MetricControl::unbounded()).unwrap();
        assert_eq!(slack["a"], 0.0);
        assert_eq!(slack["b"], 0.0);
    }
}
