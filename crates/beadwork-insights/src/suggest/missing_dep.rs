use super::keywords::issue_keywords;
use super::{Suggestion, SuggestionType};
use beadwork_core::Issue;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct MissingDepConfig {
    /// Shared keywords required before a pair is considered at all.
    pub min_keyword_overlap: usize,
    /// Confidence floor for emitting a suggestion.
    pub min_confidence: f64,
    /// Report pairs even when a dependency already links them.
    pub include_linked: bool,
    pub max_suggestions: usize,
}

impl Default for MissingDepConfig {
    fn default() -> Self {
        Self {
            min_keyword_overlap: 3,
            min_confidence: 0.4,
            include_linked: false,
            max_suggestions: 20,
        }
    }
}

/// Shared-keyword contribution per overlapping keyword.
const KEYWORD_WEIGHT: f64 = 0.08;
const KEYWORD_BASE: f64 = 0.2;
const KEYWORD_CAP: f64 = 0.5;
/// Bonus per shared label.
const LABEL_BONUS: f64 = 0.1;
const LABEL_CAP: f64 = 0.2;
/// Bonus when one title mentions the other issue's id.
const MENTION_BONUS: f64 = 0.3;
const CONFIDENCE_CAP: f64 = 0.95;

/// Detect likely-but-undeclared dependencies between open issues.
pub fn detect(issues: &[Issue], config: &MissingDepConfig) -> Vec<Suggestion> {
    let mut open: Vec<&Issue> = issues.iter().filter(|i| !i.is_closed_like()).collect();
    open.sort_by(|a, b| a.id.cmp(&b.id));
    open.dedup_by(|a, b| a.id == b.id);

    let keyword_sets: Vec<BTreeSet<String>> = open.iter().map(|i| issue_keywords(i)).collect();
    let label_sets: Vec<BTreeSet<&str>> = open
        .iter()
        .map(|i| i.labels.iter().map(String::as_str).collect())
        .collect();
    let linked = |a: &Issue, b: &Issue| {
        a.dependencies.iter().any(|d| d.target == b.id)
            || b.dependencies.iter().any(|d| d.target == a.id)
    };

    let mut suggestions: Vec<Suggestion> = Vec::new();
    for i in 0..open.len() {
        for j in (i + 1)..open.len() {
            let a = open[i];
            let b = open[j];
            if !config.include_linked && linked(a, b) {
                continue;
            }

            let shared_keywords = keyword_sets[i].intersection(&keyword_sets[j]).count();
            if shared_keywords < config.min_keyword_overlap {
                continue;
            }
            let shared_labels = label_sets[i].intersection(&label_sets[j]).count();

            let mentions = a.title.contains(&b.id) || b.title.contains(&a.id);
            let keyword_part = (KEYWORD_BASE + shared_keywords as f64 * KEYWORD_WEIGHT)
                .min(KEYWORD_CAP);
            let label_part = (shared_labels as f64 * LABEL_BONUS).min(LABEL_CAP);
            let mention_part = if mentions { MENTION_BONUS } else { 0.0 };
            let confidence = (keyword_part + label_part + mention_part).min(CONFIDENCE_CAP);
            if confidence < config.min_confidence {
                continue;
            }

            let mut metadata = BTreeMap::new();
            metadata.insert(
                "shared_keywords".to_string(),
                shared_keywords.to_string(),
            );
            metadata.insert("shared_labels".to_string(), shared_labels.to_string());

            suggestions.push(Suggestion {
                suggestion_type: SuggestionType::MissingDependency,
                target_bead: a.id.clone(),
                related_bead: Some(b.id.clone()),
                summary: format!("{} may depend on {}", a.id, b.id),
                reason: format!(
                    "{shared_keywords} shared keyword(s), {shared_labels} shared label(s){}",
                    if mentions { ", title mentions the other issue" } else { "" }
                ),
                confidence,
                action_command: Some(format!("bd dep add {} {}", a.id, b.id)),
                metadata,
            });
        }
    }

    suggestions.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.target_bead.cmp(&b.target_bead))
            .then_with(|| a.related_bead.cmp(&b.related_bead))
    });
    suggestions.truncate(config.max_suggestions);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use beadwork_core::Dependency;

    fn issue(id: &str, title: &str) -> Issue {
        Issue::new(id, title)
    }

    #[test]
    fn overlapping_topics_suggest_a_link() {
        let issues = vec![
            issue("auth-1", "Token refresh flow for session service"),
            issue("auth-2", "Session service token refresh edge cases"),
        ];
        let found = detect(&issues, &MissingDepConfig::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].target_bead, "auth-1");
        assert!(found[0].action_command.is_some());
    }

    #[test]
    fn already_linked_pairs_skipped() {
        let issues = vec![
            issue("auth-1", "Token refresh flow for session service")
                .with_dependency(Dependency::blocks("auth-2")),
            issue("auth-2", "Session service token refresh edge cases"),
        ];
        assert!(detect(&issues, &MissingDepConfig::default()).is_empty());

        let relaxed = MissingDepConfig {
            include_linked: true,
            ..Default::default()
        };
        assert_eq!(detect(&issues, &relaxed).len(), 1);
    }

    #[test]
    fn title_mention_boosts_confidence() {
        let plain = vec![
            issue("core-7", "Retry logic for ingest worker pipeline"),
            issue("core-9", "Ingest worker pipeline retry coverage"),
        ];
        let mentioning = vec![
            issue("core-7", "Retry logic for ingest worker pipeline"),
            issue("core-9", "Ingest worker pipeline retry blocked on core-7"),
        ];
        let base = detect(&plain, &MissingDepConfig::default())[0].confidence;
        let boosted = detect(&mentioning, &MissingDepConfig::default())[0].confidence;
        assert!(boosted > base);
    }

    #[test]
    fn shared_labels_add_signal() {
        let config = MissingDepConfig {
            min_confidence: 0.1,
            ..Default::default()
        };
        let unlabeled = vec![
            issue("a", "storage compaction threshold tuning"),
            issue("b", "storage compaction threshold alerts"),
        ];
        let labeled = vec![
            issue("a", "storage compaction threshold tuning").with_labels(["storage"]),
            issue("b", "storage compaction threshold alerts").with_labels(["storage"]),
        ];
        let base = detect(&unlabeled, &config)[0].confidence;
        let bonus = detect(&labeled, &config)[0].confidence;
        assert!(bonus > base);
    }

    #[test]
    fn too_little_overlap_is_silent() {
        let issues = vec![
            issue("a", "payment gateway retries"),
            issue("b", "dark mode toggle"),
        ];
        assert!(detect(&issues, &MissingDepConfig::default()).is_empty());
    }
}
