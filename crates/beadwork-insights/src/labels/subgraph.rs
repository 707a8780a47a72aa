use beadwork_core::Issue;
use beadwork_graph::metrics::{critical_path, pagerank, MetricControl};
use beadwork_graph::{topo_order_indices, DependencyGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Label-scoped analysis over the core members plus their halo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelSubgraph {
    pub label: String,
    /// Issues carrying the label, ascending.
    pub core: Vec<String>,
    /// Direct blockers and blockees of the core, even outside the label.
    pub halo: Vec<String>,
    /// PageRank over the core+halo subgraph.
    pub pagerank: BTreeMap<String, f64>,
    /// One longest chain through the subgraph, source first; empty when
    /// the subgraph has a cycle.
    pub critical_path: Vec<String>,
    /// Critical path length in nodes.
    pub critical_path_length: usize,
    pub has_cycle: bool,
}

/// Analyze the subgraph induced by a label's core and halo.
///
/// PageRank reuses the Phase-2 kernel with an unbounded control; the
/// critical path is the longest-path DP over the subgraph's topological
/// order. A cycle inside the subgraph sets `has_cycle` and leaves the
/// path empty.
pub fn analyze_label_subgraph(issues: &[Issue], label: &str) -> LabelSubgraph {
    let full_graph = DependencyGraph::from_issues(issues);

    let core: BTreeSet<String> = issues
        .iter()
        .filter(|i| i.labels.iter().any(|l| l == label))
        .map(|i| i.id.clone())
        .collect();

    let mut halo: BTreeSet<String> = BTreeSet::new();
    for id in &core {
        if let Some(idx) = full_graph.index_of(id) {
            for neighbor in full_graph.undirected_neighbors(idx) {
                let neighbor_id = full_graph.id_of(neighbor);
                if !core.contains(neighbor_id) {
                    halo.insert(neighbor_id.to_string());
                }
            }
        }
    }

    let members: BTreeSet<&str> = core
        .iter()
        .chain(halo.iter())
        .map(String::as_str)
        .collect();
    let sub_issues: Vec<Issue> = issues
        .iter()
        .filter(|i| members.contains(i.id.as_str()))
        .cloned()
        .collect();
    let subgraph = DependencyGraph::from_issues(&sub_issues);

    // Interrupt-free control: label subgraphs are small by construction.
    let pagerank = pagerank::compute(&subgraph, &MetricControl::unbounded())
        .unwrap_or_default();

    let (topo, complete) = topo_order_indices(&subgraph);
    let (critical_path_ids, has_cycle) = if complete {
        let (depth, pred) = critical_path::longest_path_depths(&subgraph);
        let endpoint = topo
            .iter()
            .copied()
            .max_by(|a, b| {
                depth[a.index()]
                    .cmp(&depth[b.index()])
                    .then_with(|| subgraph.id_of(*b).cmp(subgraph.id_of(*a)))
            });
        let mut path = Vec::new();
        if let Some(end) = endpoint {
            let mut cursor = end.index();
            path.push(subgraph.id_of(end).to_string());
            while let Some(previous) = pred[cursor] {
                path.push(
                    subgraph
                        .id_of(petgraph::graph::NodeIndex::new(previous))
                        .to_string(),
                );
                cursor = previous;
            }
            path.reverse();
        }
        (path, false)
    } else {
        (Vec::new(), true)
    };

    LabelSubgraph {
        label: label.to_string(),
        core: core.into_iter().collect(),
        halo: halo.into_iter().collect(),
        pagerank,
        critical_path_length: critical_path_ids.len(),
        critical_path: critical_path_ids,
        has_cycle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(id: &str, label: &str) -> Issue {
        Issue::new(id, id).with_labels([label])
    }

    fn plain(id: &str) -> Issue {
        Issue::new(id, id)
    }

    #[test]
    fn halo_includes_outside_neighbors() {
        let issues = vec![
            plain("outside-blocker"),
            labeled("core-1", "team").blocked_by("outside-blocker"),
            labeled("core-2", "team").blocked_by("core-1"),
            plain("outside-blocked").blocked_by("core-2"),
            plain("unrelated"),
        ];
        let result = analyze_label_subgraph(&issues, "team");
        assert_eq!(result.core, vec!["core-1", "core-2"]);
        assert_eq!(result.halo, vec!["outside-blocked", "outside-blocker"]);
        assert!(!result.pagerank.contains_key("unrelated"));
    }

    #[test]
    fn critical_path_spans_the_subgraph() {
        let issues = vec![
            labeled("a", "team"),
            labeled("b", "team").blocked_by("a"),
            labeled("c", "team").blocked_by("b"),
        ];
        let result = analyze_label_subgraph(&issues, "team");
        assert!(!result.has_cycle);
        assert_eq!(result.critical_path, vec!["a", "b", "c"]);
        assert_eq!(result.critical_path_length, 3);
    }

    #[test]
    fn cycle_sets_flag_and_empties_path() {
        let issues = vec![
            labeled("a", "team").blocked_by("b"),
            labeled("b", "team").blocked_by("a"),
        ];
        let result = analyze_label_subgraph(&issues, "team");
        assert!(result.has_cycle);
        assert!(result.critical_path.is_empty());
        assert_eq!(result.critical_path_length, 0);
    }

    #[test]
    fn unknown_label_yields_empty_result() {
        let result = analyze_label_subgraph(&[plain("a")], "ghost");
        assert!(result.core.is_empty());
        assert!(result.halo.is_empty());
        assert!(result.pagerank.is_empty());
    }
}
