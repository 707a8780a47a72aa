//! End-to-end scenarios over the insight and suggestion layers.

use beadwork_core::{Issue, IssueStatus};
use beadwork_graph::Analyzer;
use beadwork_insights::suggest::duplicates::DuplicateConfig;
use beadwork_insights::{
    advanced_insights, generate_suggestions, InsightLimits, SuggestionConfig, SuggestionFilter,
    SuggestionType,
};
use beadwork_triage::TriageContext;

fn issue(id: &str) -> Issue {
    Issue::new(id, id)
}

// S1: linear chain a -> b -> c, all open.
#[test]
fn s1_linear_chain() {
    let issues = vec![
        issue("a"),
        issue("b").blocked_by("a"),
        issue("c").blocked_by("b"),
    ];

    let context = TriageContext::new(&issues);
    assert_eq!(context.actionable_issues(), vec!["a"]);
    let depths = context.all_blocker_depths();
    assert_eq!(depths["a"], 0);
    assert_eq!(depths["b"], 1);
    assert_eq!(depths["c"], 2);

    let limits = InsightLimits {
        top_k: 1,
        ..Default::default()
    };
    let insights = advanced_insights(&issues, &[], &limits);
    assert_eq!(insights.paths.paths[0].path, vec!["a", "b", "c"]);
    assert_eq!(insights.paths.paths[0].length, 3);
    assert_eq!(insights.unlock.items.len(), 1);
    assert_eq!(insights.unlock.items[0].id, "a");
    assert_eq!(insights.unlock.items[0].marginal_gain, 1);
    assert_eq!(insights.unlock.items[0].unblocks, vec!["b"]);
}

// S2: triangle cycle a -> b -> c -> a, all open.
#[tokio::test]
async fn s2_triangle_cycle() {
    let issues = vec![
        issue("a").blocked_by("c"),
        issue("b").blocked_by("a"),
        issue("c").blocked_by("b"),
    ];

    let context = TriageContext::new(&issues);
    assert!(context.actionable_issues().is_empty());

    let analyzer = Analyzer::new();
    let handle = analyzer.analyze(&issues, None).await.unwrap();
    let cycles = handle.snapshot().cycles.clone();
    assert_eq!(cycles.len(), 1, "exactly one cycle up to rotation");
    assert_eq!(cycles[0], vec!["a", "b", "c"]);

    let insights = advanced_insights(&issues, &cycles, &InsightLimits::default());
    let suggestions = &insights.cycle_break.suggestions;
    assert_eq!(suggestions.len(), 3);
    // Equal frequency everywhere, so (from, to) lexicographic order.
    let edges: Vec<(&str, &str)> = suggestions
        .iter()
        .map(|s| (s.from.as_str(), s.to.as_str()))
        .collect();
    assert_eq!(edges, vec![("a", "b"), ("b", "c"), ("c", "a")]);
    for suggestion in suggestions {
        assert_eq!(suggestion.frequency, 1);
    }
}

// S3: fork hub -> {a, b, c, d}, all open.
#[test]
fn s3_fork() {
    let issues = vec![
        issue("hub"),
        issue("a").blocked_by("hub"),
        issue("b").blocked_by("hub"),
        issue("c").blocked_by("hub"),
        issue("d").blocked_by("hub"),
    ];

    let context = TriageContext::new(&issues);
    assert_eq!(context.actionable_issues(), vec!["hub"]);

    let insights = advanced_insights(&issues, &[], &InsightLimits::default());
    assert_eq!(insights.parallel.items.len(), 1);
    assert_eq!(insights.parallel.items[0].id, "hub");
    assert_eq!(insights.parallel.items[0].parallel_gain, 3);
    assert_eq!(insights.parallel.max_parallel, 4);

    assert_eq!(insights.coverage.items[0].id, "hub");
    assert_eq!(insights.coverage.items[0].edges_added, 4);
    assert_eq!(insights.coverage.coverage_ratio, 1.0);
}

// S4: diamond a -> b, a -> c, b -> d, c -> d.
#[test]
fn s4_diamond() {
    let issues = vec![
        issue("a"),
        issue("b").blocked_by("a"),
        issue("c").blocked_by("a"),
        issue("d").blocked_by("b").blocked_by("c"),
    ];

    let insights = advanced_insights(&issues, &[], &InsightLimits::default());
    // Longest path covers 3 nodes; the a-ascending predecessor tie-break
    // selects the branch through b.
    assert_eq!(insights.paths.paths[0].path, vec!["a", "b", "d"]);
    assert_eq!(insights.paths.paths[0].length, 3);
}

// S5: identical titles, both open; then one tombstoned.
#[test]
fn s5_duplicate_pair() {
    let title = "Implement user authentication system";
    let issues = vec![Issue::new("a", title), Issue::new("b", title)];

    let set = generate_suggestions(
        &issues,
        &[],
        &SuggestionConfig::default(),
        &SuggestionFilter {
            types: Some(vec![SuggestionType::PotentialDuplicate]),
            ..Default::default()
        },
    );
    assert_eq!(set.suggestions.len(), 1);
    let suggestion = &set.suggestions[0];
    assert_eq!(suggestion.suggestion_type, SuggestionType::PotentialDuplicate);
    assert!(suggestion.confidence >= 0.9);
    assert!(suggestion.action_command.is_some());

    let with_tombstone = vec![
        Issue::new("a", title),
        Issue::new("b", title).with_status(IssueStatus::Tombstone),
    ];
    let set = generate_suggestions(
        &with_tombstone,
        &[],
        &SuggestionConfig::default(),
        &SuggestionFilter::default(),
    );
    let duplicates = set
        .suggestions
        .iter()
        .filter(|s| s.suggestion_type == SuggestionType::PotentialDuplicate)
        .count();
    assert_eq!(duplicates, 0);
}

// S6: open/closed pair under both IgnoreClosedVsOpen settings.
#[test]
fn s6_mixed_open_closed_pair() {
    let title = "Implement user authentication system";
    let issues = vec![
        Issue::new("a", title),
        Issue::new("b", title).with_status(IssueStatus::Closed),
    ];

    let default_config = SuggestionConfig::default();
    let set = generate_suggestions(
        &issues,
        &[],
        &default_config,
        &SuggestionFilter {
            types: Some(vec![SuggestionType::PotentialDuplicate]),
            ..Default::default()
        },
    );
    assert!(set.suggestions.is_empty());

    let mut relaxed = SuggestionConfig::default();
    relaxed.duplicates = DuplicateConfig {
        ignore_closed_vs_open: false,
        ..Default::default()
    };
    let set = generate_suggestions(
        &issues,
        &[],
        &relaxed,
        &SuggestionFilter {
            types: Some(vec![SuggestionType::PotentialDuplicate]),
            ..Default::default()
        },
    );
    assert_eq!(set.suggestions.len(), 1);
    assert!(set.suggestions[0].action_command.is_none());
}

// Invariant 6: every covered edge touches a coverage pick.
#[test]
fn coverage_invariant_on_random_dag() {
    let mut issues: Vec<Issue> = (0..12).map(|i| issue(&format!("n{i:02}"))).collect();
    for i in 0..12_usize {
        for j in (i + 1)..12 {
            // Deterministic pseudo-random sparse edges.
            if (i * 7 + j * 13) % 5 == 0 {
                let target = format!("n{i:02}");
                issues[j] = issues[j].clone().blocked_by(target);
            }
        }
    }
    let insights = advanced_insights(&issues, &[], &InsightLimits::default());
    let picked: std::collections::BTreeSet<&str> = insights
        .coverage
        .items
        .iter()
        .map(|i| i.id.as_str())
        .collect();
    if !insights.coverage.status.capped {
        assert_eq!(insights.coverage.coverage_ratio, 1.0);
    }
    // Reconstruct edges and check the cover.
    for issue in &issues {
        for dep in issue.blocking_deps() {
            let covered = picked.contains(issue.id.as_str()) || picked.contains(dep.target.as_str());
            if !insights.coverage.status.capped {
                assert!(covered, "edge {} -> {} uncovered", dep.target, issue.id);
            }
        }
    }
}

// Invariant 8: removing a suggested edge empties the cycles through it.
#[tokio::test]
async fn cycle_break_removal_kills_cycles() {
    let issues = vec![
        issue("a").blocked_by("c"),
        issue("b").blocked_by("a"),
        issue("c").blocked_by("b"),
    ];
    let analyzer = Analyzer::new();
    let handle = analyzer.analyze(&issues, None).await.unwrap();
    let cycles = handle.snapshot().cycles.clone();
    let insights = advanced_insights(&issues, &cycles, &InsightLimits::default());
    let top = &insights.cycle_break.suggestions[0];

    // Drop the dependency of `to` on `from` and re-analyze.
    let rewritten: Vec<Issue> = issues
        .iter()
        .cloned()
        .map(|mut i| {
            if i.id == top.to {
                i.dependencies.retain(|d| d.target != top.from);
            }
            i
        })
        .collect();
    let handle = analyzer.analyze(&rewritten, None).await.unwrap();
    assert!(handle.snapshot().cycles.is_empty());
}
