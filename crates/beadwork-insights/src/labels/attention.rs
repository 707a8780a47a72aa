use super::extract_labels;
use super::flow::cross_label_flow;
use beadwork_core::Issue;
use beadwork_graph::{StatsSnapshot, RANK_EPSILON};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Attention score and its factors for one label.
///
/// `attention = pagerank_sum * staleness_factor * (1 + block_impact)
///            / (velocity_30 + 1)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelAttention {
    pub label: String,
    pub attention: f64,
    pub pagerank_sum: f64,
    pub staleness_factor: f64,
    pub block_impact: f64,
    pub velocity_30: f64,
    /// 1-based rank after the near-equality-tolerant sort.
    pub rank: usize,
}

/// Rank labels by how much attention they need right now.
///
/// High centrality, staleness, and outgoing blockage raise the score;
/// recent closures lower it. Near-equal scores (within 1e-6) order by
/// label ascending.
pub fn attention_scores(
    issues: &[Issue],
    snapshot: &StatsSnapshot,
    now: DateTime<Utc>,
) -> Vec<LabelAttention> {
    let extraction = extract_labels(issues);
    let flow = cross_label_flow(issues, false);

    let mut scores: Vec<LabelAttention> = extraction
        .labels
        .keys()
        .map(|label| {
            let members: Vec<&Issue> = issues
                .iter()
                .filter(|i| i.labels.iter().any(|l| l == label))
                .collect();
            let open: Vec<&&Issue> = members.iter().filter(|i| !i.is_closed_like()).collect();

            let pagerank_sum: f64 = members
                .iter()
                .filter_map(|i| snapshot.pagerank.values.get(&i.id).copied())
                .sum();

            let avg_stale_days = if open.is_empty() {
                0.0
            } else {
                open.iter()
                    .map(|i| (now - i.updated_at).num_seconds() as f64 / 86_400.0)
                    .sum::<f64>()
                    / open.len() as f64
            };
            let staleness_factor = 1.0 + (avg_stale_days / 30.0).min(1.0);

            let block_impact = flow.outgoing_sum(label) as f64;
            let velocity_30 = members
                .iter()
                .filter(|i| {
                    i.closed_at
                        .is_some_and(|at| now - at <= Duration::days(30) && at <= now)
                })
                .count() as f64;

            let attention =
                pagerank_sum * staleness_factor * (1.0 + block_impact) / (velocity_30 + 1.0);

            LabelAttention {
                label: label.clone(),
                attention,
                pagerank_sum,
                staleness_factor,
                block_impact,
                velocity_30,
                rank: 0,
            }
        })
        .collect();

    scores.sort_by(|a, b| {
        if (a.attention - b.attention).abs() <= RANK_EPSILON {
            a.label.cmp(&b.label)
        } else {
            b.attention
                .partial_cmp(&a.attention)
                .unwrap_or(std::cmp::Ordering::Equal)
        }
    });
    for (i, entry) in scores.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    scores
}
