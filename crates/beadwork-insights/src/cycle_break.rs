use crate::status::FeatureStatus;
use beadwork_core::Issue;
use beadwork_graph::{DependencyGraph, CYCLE_DETECTION_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleBreakSuggestion {
    pub from: String,
    pub to: String,
    /// Number of detected cycles this edge participates in.
    pub frequency: usize,
    /// Issues that directly depend on the edge target.
    pub collateral: usize,
    pub advisory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleBreakResult {
    pub suggestions: Vec<CycleBreakSuggestion>,
    pub cycle_count: usize,
    pub advisory: String,
    pub status: FeatureStatus,
}

/// Rank cycle edges by how many detected cycles removing them would open.
///
/// Edge frequency counts every cycle edge including the closing edge; the
/// ranking is frequency descending, then `(from, to)` lexicographic.
pub fn cycle_break_suggestions(
    issues: &[Issue],
    cycles: &[Vec<String>],
    cap: usize,
) -> CycleBreakResult {
    let real_cycles: Vec<&Vec<String>> = cycles
        .iter()
        .filter(|c| !(c.len() == 1 && c[0] == CYCLE_DETECTION_TIMEOUT))
        .collect();

    if real_cycles.is_empty() {
        return CycleBreakResult {
            suggestions: Vec::new(),
            cycle_count: 0,
            advisory: "no dependency cycles detected; the graph is a DAG".to_string(),
            status: FeatureStatus::ok(0),
        };
    }

    let graph = DependencyGraph::from_issues(issues);
    let mut frequency: BTreeMap<(String, String), usize> = BTreeMap::new();
    for cycle in &real_cycles {
        for window in cycle.windows(2) {
            *frequency
                .entry((window[0].clone(), window[1].clone()))
                .or_default() += 1;
        }
        if cycle.len() > 1 {
            // Closing edge back to the cycle head.
            *frequency
                .entry((
                    cycle[cycle.len() - 1].clone(),
                    cycle[0].clone(),
                ))
                .or_default() += 1;
        }
    }

    let mut ranked: Vec<((String, String), usize)> = frequency.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let total = ranked.len();
    let suggestions: Vec<CycleBreakSuggestion> = ranked
        .into_iter()
        .take(cap)
        .map(|((from, to), frequency)| {
            let collateral = graph
                .index_of(&to)
                .map(|idx| graph.blocked_by_node(idx).len())
                .unwrap_or(0);
            let advisory = format!(
                "removing the dependency of {to} on {from} breaks {frequency} cycle(s); \
                 {collateral} issue(s) directly depend on {to}"
            );
            CycleBreakSuggestion {
                from,
                to,
                frequency,
                collateral,
                advisory,
            }
        })
        .collect();

    CycleBreakResult {
        cycle_count: real_cycles.len(),
        advisory: format!("{} dependency cycle(s) detected", real_cycles.len()),
        status: FeatureStatus::sized(suggestions.len(), total),
        suggestions,
    }
}
