use crate::cover::{coverage_set, CoverageSet};
use crate::cycle_break::{cycle_break_suggestions, CycleBreakResult};
use crate::parallel::{parallel_cut, ParallelCut};
use crate::paths::{k_longest_paths, KPathsResult};
use crate::status::InsightLimits;
use crate::unlock::{top_unlock_set, UnlockSet};
use beadwork_core::Issue;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The full advanced-insight bundle over one issue set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedInsights {
    pub unlock: UnlockSet,
    pub coverage: CoverageSet,
    pub paths: KPathsResult,
    pub parallel: ParallelCut,
    pub cycle_break: CycleBreakResult,
}

/// Run every recommender under the given limits.
///
/// `detected_cycles` comes from the Phase-2 snapshot; passing an empty
/// slice yields the DAG advisory from the cycle-break recommender.
pub fn advanced_insights(
    issues: &[Issue],
    detected_cycles: &[Vec<String>],
    limits: &InsightLimits,
) -> AdvancedInsights {
    let insights = AdvancedInsights {
        unlock: top_unlock_set(issues, limits.top_k),
        coverage: coverage_set(issues, limits.coverage_cap),
        paths: k_longest_paths(issues, limits.max_paths, limits.path_length_cap),
        parallel: parallel_cut(issues, limits.parallel_cap),
        cycle_break: cycle_break_suggestions(issues, detected_cycles, limits.cycle_break_cap),
    };
    debug!(
        unlock = insights.unlock.items.len(),
        coverage = insights.coverage.items.len(),
        paths = insights.paths.paths.len(),
        parallel = insights.parallel.items.len(),
        cycle_break = insights.cycle_break.suggestions.len(),
        "advanced insights computed"
    );
    insights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(id: &str) -> Issue {
        Issue::new(id, id)
    }

    #[test]
    fn bundle_is_consistent_on_a_fork() {
        let issues = vec![
            issue("hub"),
            issue("a").blocked_by("hub"),
            issue("b").blocked_by("hub"),
            issue("c").blocked_by("hub"),
            issue("d").blocked_by("hub"),
        ];
        let insights = advanced_insights(&issues, &[], &InsightLimits::default());
        assert_eq!(insights.unlock.items[0].id, "hub");
        assert_eq!(insights.coverage.items[0].id, "hub");
        assert_eq!(insights.parallel.max_parallel, 4);
        assert_eq!(insights.cycle_break.cycle_count, 0);
        assert!(!insights.paths.has_cycle);
    }

    #[test]
    fn deterministic_across_runs() {
        let issues = vec![
            issue("a"),
            issue("b").blocked_by("a"),
            issue("c").blocked_by("a"),
            issue("d").blocked_by("b").blocked_by("c"),
        ];
        let first = advanced_insights(&issues, &[], &InsightLimits::default());
        let second = advanced_insights(&issues, &[], &InsightLimits::default());
        assert_eq!(first, second);
    }
}
