pub mod attention;
pub mod cascade;
pub mod flow;
pub mod health;
pub mod subgraph;
pub mod velocity;

use beadwork_core::Issue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-label aggregate counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelStats {
    pub label: String,
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<i64, usize>,
    pub by_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelExtraction {
    pub labels: BTreeMap<String, LabelStats>,
    /// Labels by member count descending, ties label ascending.
    pub top_labels: Vec<String>,
}

/// Collect per-label totals and status/priority/type distributions.
///
/// Label case is preserved exactly; `Backend` and `backend` are distinct.
pub fn extract_labels(issues: &[Issue]) -> LabelExtraction {
    let mut labels: BTreeMap<String, LabelStats> = BTreeMap::new();
    for issue in issues {
        for label in &issue.labels {
            let stats = labels.entry(label.clone()).or_insert_with(|| LabelStats {
                label: label.clone(),
                ..Default::default()
            });
            stats.total += 1;
            *stats.by_status.entry(issue.status.to_string()).or_default() += 1;
            *stats.by_priority.entry(issue.priority).or_default() += 1;
            *stats
                .by_type
                .entry(issue.issue_type.to_string())
                .or_default() += 1;
        }
    }

    let mut top_labels: Vec<String> = labels.keys().cloned().collect();
    top_labels.sort_by(|a, b| labels[b].total.cmp(&labels[a].total).then_with(|| a.cmp(b)));

    LabelExtraction { labels, top_labels }
}

/// Issues carrying the given label.
pub fn issues_with_label<'a>(issues: &'a [Issue], label: &str) -> Vec<&'a Issue> {
    issues
        .iter()
        .filter(|i| i.labels.iter().any(|l| l == label))
        .collect()
}
