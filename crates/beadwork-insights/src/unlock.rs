use crate::status::FeatureStatus;
use beadwork_core::Issue;
use beadwork_triage::TriageContext;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One greedy selection step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockItem {
    pub id: String,
    /// Issues newly unlocked by this pick, given the preceding picks.
    pub marginal_gain: usize,
    pub unblocks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockSet {
    /// Picks in selection order.
    pub items: Vec<UnlockItem>,
    pub status: FeatureStatus,
}

/// Greedy submodular top-K unlock set.
///
/// Each step picks the open issue whose simulated completion unlocks the
/// most currently-open, currently-blocked issues given everything already
/// chosen; ties go to the lower id. Selection stops at `k` or when no
/// candidate unlocks anything.
pub fn top_unlock_set(issues: &[Issue], k: usize) -> UnlockSet {
    let context = TriageContext::new(issues);

    // Open issues with at least one open blocker, and their blocker sets.
    let mut blocked: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut candidates: BTreeSet<String> = BTreeSet::new();
    for issue in context.issues() {
        if issue.is_closed_like() {
            continue;
        }
        candidates.insert(issue.id.clone());
        let blockers: BTreeSet<String> = context.open_blockers(&issue.id).into_iter().collect();
        if !blockers.is_empty() {
            blocked.insert(issue.id.clone(), blockers);
        }
    }

    let mut chosen: BTreeSet<String> = BTreeSet::new();
    let mut unlocked: BTreeSet<String> = BTreeSet::new();
    let mut items = Vec::new();

    for _ in 0..k {
        let mut best: Option<(usize, &str, Vec<String>)> = None;
        for candidate in candidates.iter().filter(|c| !chosen.contains(*c)) {
            let gains: Vec<String> = blocked
                .iter()
                .filter(|(id, blockers)| {
                    !unlocked.contains(id.as_str())
                        && id.as_str() != candidate.as_str()
                        && !chosen.contains(id.as_str())
                        && blockers
                            .iter()
                            .all(|b| chosen.contains(b) || b == candidate)
                })
                .map(|(id, _)| id.to_string())
                .collect();
            let gain = gains.len();
            // Strictly-greater keeps the first (lowest-id) candidate on ties.
            if gain > 0 && best.as_ref().is_none_or(|(g, _, _)| gain > *g) {
                best = Some((gain, candidate, gains));
            }
        }

        let Some((gain, id, unblocks)) = best else {
            break;
        };
        let id = id.to_string();
        chosen.insert(id.clone());
        unlocked.extend(unblocks.iter().cloned());
        items.push(UnlockItem {
            id,
            marginal_gain: gain,
            unblocks,
        });
    }

    let status = FeatureStatus::ok(items.len());
    UnlockSet { items, status }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beadwork_core::IssueStatus;

    fn issue(id: &str) -> Issue {
        Issue::new(id, id)
    }

    #[test]
    fn chain_picks_head_first() {
        let issues = vec![
            issue("a"),
            issue("b").blocked_by("a"),
            issue("c").blocked_by("b"),
        ];
        let set = top_unlock_set(&issues, 1);
        assert_eq!(set.items.len(), 1);
        assert_eq!(set.items[0].id, "a");
        assert_eq!(set.items[0].marginal_gain, 1);
        assert_eq!(set.items[0].unblocks, vec!["b"]);
    }

    #[test]
    fn hub_with_many_dependents_wins() {
        let issues = vec![
            issue("hub"),
            issue("solo"),
            issue("x").blocked_by("hub"),
            issue("y").blocked_by("hub"),
            issue("z").blocked_by("solo"),
        ];
        let set = top_unlock_set(&issues, 2);
        assert_eq!(set.items[0].id, "hub");
        assert_eq!(set.items[0].marginal_gain, 2);
        assert_eq!(set.items[1].id, "solo");
        assert_eq!(set.items[1].marginal_gain, 1);
    }

    #[test]
    fn second_pick_accounts_for_first() {
        // d needs both a and b; picking a alone does not unlock d.
        let issues = vec![
            issue("a"),
            issue("b"),
            issue("c").blocked_by("a"),
            issue("d").blocked_by("a").blocked_by("b"),
        ];
        let set = top_unlock_set(&issues, 2);
        assert_eq!(set.items[0].id, "a");
        assert_eq!(set.items[0].unblocks, vec!["c"]);
        assert_eq!(set.items[1].id, "b");
        assert_eq!(set.items[1].unblocks, vec!["d"]);
    }

    #[test]
    fn tie_breaks_to_lower_id() {
        let issues = vec![
            issue("m"),
            issue("z"),
            issue("p").blocked_by("z"),
            issue("q").blocked_by("m"),
        ];
        let set = top_unlock_set(&issues, 1);
        assert_eq!(set.items[0].id, "m");
    }

    #[test]
    fn closed_blockers_do_not_count() {
        let issues = vec![
            issue("gone").with_status(IssueStatus::Closed),
            issue("a"),
            issue("x").blocked_by("gone").blocked_by("a"),
        ];
        let set = top_unlock_set(&issues, 1);
        // x's only open blocker is a.
        assert_eq!(set.items[0].id, "a");
        assert_eq!(set.items[0].unblocks, vec!["x"]);
    }

    #[test]
    fn no_blocked_issues_means_empty_selection() {
        let set = top_unlock_set(&[issue("a"), issue("b")], 3);
        assert!(set.items.is_empty());
        assert_eq!(set.status.count, 0);
    }
}
