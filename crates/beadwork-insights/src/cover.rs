use crate::status::FeatureStatus;
use beadwork_core::Issue;
use beadwork_triage::TriageContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageItem {
    pub id: String,
    /// Previously uncovered edges this pick covered.
    pub edges_added: usize,
    /// Total incident edges in the open subgraph.
    pub total_degree: usize,
    /// 1-based selection order.
    pub selection_seq: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSet {
    pub items: Vec<CoverageItem>,
    pub edges_covered: usize,
    pub total_edges: usize,
    pub coverage_ratio: f64,
    pub status: FeatureStatus,
}

/// Greedy vertex cover over the `blocks` edges between open issues.
///
/// Repeatedly picks the node with the most remaining uncovered incident
/// edges (tie: lower id) until every edge is covered or the cap is hit.
/// The greedy max-degree rule keeps the classic 2-approximation flavor
/// while producing a deterministic, explainable sequence.
pub fn coverage_set(issues: &[Issue], cap: usize) -> CoverageSet {
    let context = TriageContext::new(issues);
    let graph = context.graph();

    // Open->open blocks edges only.
    let open = |id: &str| context.issue(id).is_some_and(|i| !i.is_closed_like());
    let mut edges: BTreeSet<(String, String)> = BTreeSet::new();
    for idx in graph.node_indices() {
        let from = graph.id_of(idx);
        if !open(from) {
            continue;
        }
        for succ in graph.blocked_by_node(idx) {
            let to = graph.id_of(succ);
            if open(to) {
                edges.insert((from.to_string(), to.to_string()));
            }
        }
    }

    let total_edges = edges.len();
    let total_degree_of = |id: &str| {
        edges
            .iter()
            .filter(|(from, to)| from == id || to == id)
            .count()
    };

    let mut uncovered = edges.clone();
    let mut items: Vec<CoverageItem> = Vec::new();
    let mut truncated = false;

    while !uncovered.is_empty() {
        if items.len() >= cap {
            truncated = true;
            break;
        }

        // Highest uncovered degree, ties toward the smaller id.
        let mut nodes: BTreeSet<&str> = BTreeSet::new();
        for (from, to) in &uncovered {
            nodes.insert(from);
            nodes.insert(to);
        }
        let Some(best) = nodes.into_iter().max_by(|a, b| {
            let da = uncovered.iter().filter(|(f, t)| f == a || t == a).count();
            let db = uncovered.iter().filter(|(f, t)| f == b || t == b).count();
            da.cmp(&db).then_with(|| b.cmp(a))
        }) else {
            break;
        };
        let best = best.to_string();

        let before = uncovered.len();
        uncovered.retain(|(from, to)| from != &best && to != &best);
        let edges_added = before - uncovered.len();

        items.push(CoverageItem {
            total_degree: total_degree_of(&best),
            selection_seq: items.len() + 1,
            id: best,
            edges_added,
        });
    }

    let edges_covered = total_edges - uncovered.len();
    let coverage_ratio = if total_edges > 0 {
        edges_covered as f64 / total_edges as f64
    } else {
        0.0
    };
    let status = if truncated {
        FeatureStatus::capped(items.len(), items.len() + uncovered.len())
    } else {
        FeatureStatus::ok(items.len())
    };

    CoverageSet {
        items,
        edges_covered,
        total_edges,
        coverage_ratio,
        status,
    }
}
