use super::keywords::issue_keywords;
use super::{Suggestion, SuggestionType};
use beadwork_core::Issue;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct DuplicateConfig {
    /// Jaccard similarity required to report a pair.
    pub min_similarity: f64,
    /// Skip pairs where exactly one side is closed-like.
    pub ignore_closed_vs_open: bool,
    pub max_suggestions: usize,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.6,
            ignore_closed_vs_open: true,
            max_suggestions: 20,
        }
    }
}

/// Keyword-Jaccard duplicate detection over an inverted index.
///
/// Tombstones never participate. The index maps each keyword to the
/// issues containing it; overlaps are counted pairwise for `j > i` only,
/// so every pair is considered once.
pub fn detect(issues: &[Issue], config: &DuplicateConfig) -> Vec<Suggestion> {
    // Sorted by id for stable indexing; tombstones out entirely.
    let mut candidates: Vec<&Issue> = issues.iter().filter(|i| !i.is_tombstone()).collect();
    candidates.sort_by(|a, b| a.id.cmp(&b.id));
    candidates.dedup_by(|a, b| a.id == b.id);

    let keyword_sets: Vec<BTreeSet<String>> =
        candidates.iter().map(|i| issue_keywords(i)).collect();

    let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, keywords) in keyword_sets.iter().enumerate() {
        for keyword in keywords {
            index.entry(keyword.as_str()).or_default().push(i);
        }
    }

    let mut suggestions: Vec<(f64, Suggestion)> = Vec::new();
    for i in 0..candidates.len() {
        // Count keyword overlaps with every later issue via the index.
        let mut overlap: BTreeMap<usize, usize> = BTreeMap::new();
        for keyword in &keyword_sets[i] {
            if let Some(hits) = index.get(keyword.as_str()) {
                for &j in hits.iter().filter(|&&j| j > i) {
                    *overlap.entry(j).or_default() += 1;
                }
            }
        }

        for (j, shared) in overlap {
            let a = candidates[i];
            let b = candidates[j];
            if config.ignore_closed_vs_open && a.is_closed_like() != b.is_closed_like() {
                continue;
            }
            let union = keyword_sets[i].len() + keyword_sets[j].len() - shared;
            if union == 0 {
                continue;
            }
            let similarity = shared as f64 / union as f64;
            if similarity < config.min_similarity {
                continue;
            }

            let common: Vec<&str> = keyword_sets[i]
                .intersection(&keyword_sets[j])
                .map(String::as_str)
                .collect();
            let both_open = !a.is_closed_like() && !b.is_closed_like();
            let mut metadata = BTreeMap::new();
            metadata.insert("similarity".to_string(), format!("{similarity:.3}"));
            metadata.insert("common_keywords".to_string(), common.join(","));

            suggestions.push((
                similarity,
                Suggestion {
                    suggestion_type: SuggestionType::PotentialDuplicate,
                    target_bead: a.id.clone(),
                    related_bead: Some(b.id.clone()),
                    summary: format!("{} looks like a duplicate of {}", a.id, b.id),
                    reason: format!(
                        "titles and descriptions share {shared} keyword(s) \
                         (similarity {similarity:.2})"
                    ),
                    confidence: similarity,
                    action_command: both_open
                        .then(|| format!("bd merge {} {}", b.id, a.id)),
                    metadata,
                },
            ));
        }
    }

    suggestions.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.target_bead.cmp(&b.1.target_bead))
            .then_with(|| a.1.related_bead.cmp(&b.1.related_bead))
    });
    suggestions.truncate(config.max_suggestions);
    suggestions.into_iter().map(|(_, s)| s).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use beadwork_core::IssueStatus;

    fn issue(id: &str, title: &str) -> Issue {
        Issue::new(id, title)
    }

    #[test]
    fn identical_titles_report_high_confidence() {
        let issues = vec![
            issue("a", "Implement user authentication system"),
            issue("b", "Implement user authentication system"),
        ];
        let found = detect(&issues, &DuplicateConfig::default());
        assert_eq!(found.len(), 1);
        assert!(found[0].confidence >= 0.9);
        assert_eq!(found[0].target_bead, "a");
        assert_eq!(found[0].related_bead.as_deref(), Some("b"));
        assert!(found[0].action_command.is_some());
        assert!(found[0].metadata["common_keywords"].contains("authentication"));
    }

    #[test]
    fn tombstone_suppresses_pair() {
        let issues = vec![
            issue("a", "Implement user authentication system"),
            issue("b", "Implement user authentication system").with_status(IssueStatus::Tombstone),
        ];
        let found = detect(&issues, &DuplicateConfig::default());
        assert!(found.is_empty());
    }

    #[test]
    fn mixed_open_closed_skipped_by_default() {
        let issues = vec![
            issue("a", "Implement user authentication system"),
            issue("b", "Implement user authentication system").with_status(IssueStatus::Closed),
        ];
        assert!(detect(&issues, &DuplicateConfig::default()).is_empty());

        let relaxed = DuplicateConfig {
            ignore_closed_vs_open: false,
            ..Default::default()
        };
        let found = detect(&issues, &relaxed);
        assert_eq!(found.len(), 1);
        // A closed participant means no action command.
        assert!(found[0].action_command.is_none());
    }

    #[test]
    fn unrelated_titles_do_not_match() {
        let issues = vec![
            issue("a", "Refactor payment gateway retries"),
            issue("b", "Document websocket reconnect logic"),
        ];
        assert!(detect(&issues, &DuplicateConfig::default()).is_empty());
    }

    #[test]
    fn results_sorted_by_similarity() {
        let issues = vec![
            issue("a", "cache eviction policy rework"),
            issue("b", "cache eviction policy rework"),
            issue("c", "cache eviction policy tuning pass"),
        ];
        let config = DuplicateConfig {
            min_similarity: 0.3,
            ..Default::default()
        };
        let found = detect(&issues, &config);
        assert!(found.len() >= 2);
        for pair in found.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }
}
