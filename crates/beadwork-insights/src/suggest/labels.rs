use super::keywords::issue_keywords;
use super::{Suggestion, SuggestionType};
use beadwork_core::Issue;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
pub struct LabelSuggestConfig {
    pub min_confidence: f64,
    pub max_per_issue: usize,
    pub max_total: usize,
}

impl Default for LabelSuggestConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            max_per_issue: 2,
            max_total: 20,
        }
    }
}

/// Contribution of one built-in keyword match.
const BUILTIN_WEIGHT: f64 = 0.3;
/// Learned contribution: base plus a per-occurrence bump, capped.
const LEARNED_BASE: f64 = 0.1;
const LEARNED_STEP: f64 = 0.05;
const LEARNED_CAP: f64 = 0.4;
const CONFIDENCE_CAP: f64 = 0.95;

/// Curated keyword-to-label mappings.
static BUILTIN_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("crash", "bug"),
        ("panic", "bug"),
        ("regression", "bug"),
        ("broken", "bug"),
        ("error", "bug"),
        ("slow", "performance"),
        ("latency", "performance"),
        ("memory", "performance"),
        ("leak", "performance"),
        ("performance", "performance"),
        ("security", "security"),
        ("vulnerability", "security"),
        ("auth", "security"),
        ("authentication", "security"),
        ("docs", "documentation"),
        ("documentation", "documentation"),
        ("readme", "documentation"),
        ("test", "testing"),
        ("tests", "testing"),
        ("flaky", "testing"),
        ("api", "api"),
        ("endpoint", "api"),
        ("database", "storage"),
        ("migration", "storage"),
        ("schema", "storage"),
    ]
    .into_iter()
    .collect()
});

/// Suggest labels from built-in keyword mappings plus mappings learned
/// from already-labeled issues.
///
/// Per keyword: built-in matches contribute 0.3; learned matches
/// contribute `0.1 + 0.05 * count` capped at 0.4. The final score is
/// clamped to 0.95.
pub fn detect(issues: &[Issue], config: &LabelSuggestConfig) -> Vec<Suggestion> {
    let mut candidates: Vec<&Issue> = issues.iter().filter(|i| !i.is_closed_like()).collect();
    candidates.sort_by(|a, b| a.id.cmp(&b.id));
    candidates.dedup_by(|a, b| a.id == b.id);

    // Learn keyword -> (label -> occurrence count) from labeled issues,
    // tombstones excluded.
    let mut learned: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for issue in issues.iter().filter(|i| !i.is_tombstone()) {
        if issue.labels.is_empty() {
            continue;
        }
        for keyword in issue_keywords(issue) {
            for label in &issue.labels {
                *learned
                    .entry(keyword.clone())
                    .or_default()
                    .entry(label.clone())
                    .or_default() += 1;
            }
        }
    }

    let mut suggestions: Vec<Suggestion> = Vec::new();
    for issue in &candidates {
        let mut scores: BTreeMap<&str, (f64, Vec<String>)> = BTreeMap::new();
        let keywords = issue_keywords(issue);

        for keyword in &keywords {
            if let Some(&label) = BUILTIN_LABELS.get(keyword.as_str()) {
                let entry = scores.entry(label).or_insert_with(|| (0.0, Vec::new()));
                entry.0 += BUILTIN_WEIGHT;
                entry.1.push(keyword.clone());
            }
            if let Some(label_counts) = learned.get(keyword) {
                for (label, &count) in label_counts {
                    // Discount the candidate's own contribution to the
                    // learned counts.
                    let self_count = usize::from(issue.labels.iter().any(|l| l == label));
                    let external = count.saturating_sub(self_count);
                    if external == 0 {
                        continue;
                    }
                    let contribution =
                        (LEARNED_BASE + LEARNED_STEP * external as f64).min(LEARNED_CAP);
                    let entry = scores
                        .entry(label.as_str())
                        .or_insert_with(|| (0.0, Vec::new()));
                    entry.0 += contribution;
                    entry.1.push(keyword.clone());
                }
            }
        }

        let mut ranked: Vec<(&str, f64, Vec<String>)> = scores
            .into_iter()
            .filter(|(label, _)| !issue.labels.iter().any(|l| l == label))
            .map(|(label, (score, words))| (label, score.min(CONFIDENCE_CAP), words))
            .filter(|(_, score, _)| *score >= config.min_confidence)
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        ranked.truncate(config.max_per_issue);

        for (label, score, mut words) in ranked {
            words.sort_unstable();
            words.dedup();
            let mut metadata = BTreeMap::new();
            metadata.insert("label".to_string(), label.to_string());
            metadata.insert("matched_keywords".to_string(), words.join(","));
            suggestions.push(Suggestion {
                suggestion_type: SuggestionType::LabelSuggestion,
                target_bead: issue.id.clone(),
                related_bead: None,
                summary: format!("label {} as '{label}'", issue.id),
                reason: format!("keywords {} indicate '{label}'", words.join(", ")),
                confidence: score,
                action_command: Some(format!("bd label add {} {label}", issue.id)),
                metadata,
            });
        }
    }

    suggestions.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.target_bead.cmp(&b.target_bead))
    });
    suggestions.truncate(config.max_total);
    suggestions
}
