use super::flow::{cross_label_flow, CrossLabelFlow};
use beadwork_core::{Issue, IssueStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// BFS depth bound over the label flow graph.
pub const MAX_CASCADE_LEVELS: usize = 10;
/// Unblock recommendations reported per source label.
const MAX_RECOMMENDATIONS: usize = 5;

/// One BFS level: which labels are waiting, and on which already-reached
/// labels they wait.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CascadeLevel {
    pub level: usize,
    /// waiting label -> labels (from earlier levels) it waits on.
    pub waiting: BTreeMap<String, Vec<String>>,
}

/// Downstream blockage spreading from one label with blocked issues.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockageCascade {
    pub source_label: String,
    pub levels: Vec<CascadeLevel>,
    /// Top unblock recommendations by heuristic impact.
    pub recommendations: Vec<String>,
}

/// Trace how blockage propagates across labels.
///
/// Every label carrying at least one `blocked` issue seeds a bounded BFS
/// over the cross-label flow matrix; each level reports the labels newly
/// waiting on the frontier.
pub fn blockage_cascades(issues: &[Issue]) -> Vec<BlockageCascade> {
    let flow = cross_label_flow(issues, false);

    let mut sources: BTreeSet<String> = BTreeSet::new();
    for issue in issues.iter().filter(|i| i.status == IssueStatus::Blocked) {
        sources.extend(issue.labels.iter().cloned());
    }

    sources
        .into_iter()
        .map(|source| cascade_from(&flow, &source))
        .collect()
}

fn cascade_from(flow: &CrossLabelFlow, source: &str) -> BlockageCascade {
    let mut reached: BTreeSet<String> = BTreeSet::from([source.to_string()]);
    let mut frontier: Vec<String> = vec![source.to_string()];
    let mut levels: Vec<CascadeLevel> = Vec::new();
    let mut impact: BTreeMap<String, usize> = BTreeMap::new();

    for depth in 1..=MAX_CASCADE_LEVELS {
        let mut waiting: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for from in &frontier {
            let Some(i) = flow.labels.iter().position(|l| l == from) else {
                continue;
            };
            for (j, &count) in flow.matrix[i].iter().enumerate() {
                if count == 0 {
                    continue;
                }
                let to = flow.labels[j].as_str();
                if reached.contains(to) {
                    continue;
                }
                waiting
                    .entry(to.to_string())
                    .or_default()
                    .push(from.clone());
                *impact.entry(from.clone()).or_default() += count;
            }
        }
        if waiting.is_empty() {
            break;
        }
        for sources in waiting.values_mut() {
            sources.sort_unstable();
            sources.dedup();
        }
        let next: Vec<String> = waiting.keys().cloned().collect();
        reached.extend(next.iter().cloned());
        levels.push(CascadeLevel {
            level: depth,
            waiting,
        });
        frontier = next;
    }

    // Highest released-edge count first, label ascending on ties.
    let mut ranked: Vec<(String, usize)> = impact.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let recommendations = ranked
        .into_iter()
        .take(MAX_RECOMMENDATIONS)
        .map(|(label, released)| {
            format!("unblock issues labeled '{label}' to release {released} cross-label edge(s)")
        })
        .collect();

    BlockageCascade {
        source_label: source.to_string(),
        levels,
        recommendations,
    }
}
