use crate::status::FeatureStatus;
use beadwork_core::Issue;
use beadwork_triage::TriageContext;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelCutItem {
    pub id: String,
    /// Net growth of the actionable set if this issue completes:
    /// sole-blocker dependents minus the slot the issue itself frees.
    pub parallel_gain: usize,
    /// The dependents that would become actionable.
    pub unblocks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelCut {
    pub items: Vec<ParallelCutItem>,
    pub current_actionable: usize,
    /// `current_actionable + sum of gains`.
    pub max_parallel: usize,
    pub status: FeatureStatus,
}

/// Find the issues whose completion widens the parallel work frontier.
///
/// For each open issue, count dependents whose *only* remaining open
/// blocker it is; items with a positive net gain are reported sorted by
/// gain descending, id ascending.
pub fn parallel_cut(issues: &[Issue], cap: usize) -> ParallelCut {
    let context = TriageContext::new(issues);
    let current_actionable = context.actionable_issues().len();
    let unblocks_map = context.unblocks_map();

    let mut items: Vec<ParallelCutItem> = unblocks_map
        .into_iter()
        .filter(|(id, _)| context.issue(id).is_some_and(|i| !i.is_closed_like()))
        .filter_map(|(id, unblocks)| {
            let gain = unblocks.len().saturating_sub(1);
            (gain > 0).then_some(ParallelCutItem {
                id,
                parallel_gain: gain,
                unblocks,
            })
        })
        .collect();

    items.sort_by(|a, b| {
        b.parallel_gain
            .cmp(&a.parallel_gain)
            .then_with(|| a.id.cmp(&b.id))
    });

    let total = items.len();
    let gain_sum: usize = items.iter().map(|i| i.parallel_gain).sum();
    items.truncate(cap);

    ParallelCut {
        max_parallel: current_actionable + gain_sum,
        current_actionable,
        status: FeatureStatus::sized(items.len(), total),
        items,
    }
}
