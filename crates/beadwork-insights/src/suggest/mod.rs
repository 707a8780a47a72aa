pub mod cycles;
pub mod duplicates;
pub mod keywords;
pub mod labels;
pub mod missing_dep;

use crate::status::FeatureStatus;
use beadwork_core::{compute_data_hash, Issue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    PotentialDuplicate,
    MissingDependency,
    LabelSuggestion,
    CycleWarning,
}

impl std::fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SuggestionType::PotentialDuplicate => "potential_duplicate",
            SuggestionType::MissingDependency => "missing_dependency",
            SuggestionType::LabelSuggestion => "label_suggestion",
            SuggestionType::CycleWarning => "cycle_warning",
        };
        write!(f, "{}", s)
    }
}

/// One recommendation from the unified pipeline.
///
/// `action_command` is an opaque string composed here and parsed by
/// consumers; the core never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub suggestion_type: SuggestionType,
    pub target_bead: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_bead: Option<String>,
    pub summary: String,
    pub reason: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_command: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionSet {
    pub suggestions: Vec<Suggestion>,
    /// Fingerprint of the issue set the suggestions were derived from,
    /// for cache coordination.
    pub data_hash: String,
    pub status: FeatureStatus,
}

/// Per-detector knobs plus the aggregate cap.
#[derive(Debug, Clone)]
pub struct SuggestionConfig {
    pub duplicates: duplicates::DuplicateConfig,
    pub missing_dep: missing_dep::MissingDepConfig,
    pub labels: labels::LabelSuggestConfig,
    pub max_total: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            duplicates: duplicates::DuplicateConfig::default(),
            missing_dep: missing_dep::MissingDepConfig::default(),
            labels: labels::LabelSuggestConfig::default(),
            max_total: 50,
        }
    }
}

/// Post-hoc filter applied by the aggregator.
#[derive(Debug, Clone, Default)]
pub struct SuggestionFilter {
    pub types: Option<Vec<SuggestionType>>,
    pub min_confidence: Option<f64>,
    pub target: Option<String>,
}

/// Run all four detectors, filter, sort by confidence descending, cap.
pub fn generate_suggestions(
    issues: &[Issue],
    detected_cycles: &[Vec<String>],
    config: &SuggestionConfig,
    filter: &SuggestionFilter,
) -> SuggestionSet {
    let mut all: Vec<Suggestion> = Vec::new();
    all.extend(duplicates::detect(issues, &config.duplicates));
    all.extend(missing_dep::detect(issues, &config.missing_dep));
    all.extend(labels::detect(issues, &config.labels));
    all.extend(cycles::detect(detected_cycles));

    all.retain(|s| {
        filter
            .types
            .as_ref()
            .is_none_or(|types| types.contains(&s.suggestion_type))
            && filter
                .min_confidence
                .is_none_or(|min| s.confidence >= min)
            && filter
                .target
                .as_ref()
                .is_none_or(|target| &s.target_bead == target)
    });

    all.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.target_bead.cmp(&b.target_bead))
            .then_with(|| a.related_bead.cmp(&b.related_bead))
    });

    let total = all.len();
    all.truncate(config.max_total);
    tracing::debug!(total, kept = all.len(), "suggestion pipeline finished");

    SuggestionSet {
        status: FeatureStatus::sized(all.len(), total),
        data_hash: compute_data_hash(issues),
        suggestions: all,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(id: &str, title: &str) -> Issue {
        Issue::new(id, title)
    }

    #[test]
    fn aggregator_filters_by_type() {
        let issues = vec![
            issue("a", "Implement user authentication system"),
            issue("b", "Implement user authentication system"),
        ];
        let config = SuggestionConfig::default();

        let all = generate_suggestions(&issues, &[], &config, &SuggestionFilter::default());
        assert!(!all.suggestions.is_empty());

        let none = generate_suggestions(
            &issues,
            &[],
            &config,
            &SuggestionFilter {
                types: Some(vec![SuggestionType::CycleWarning]),
                ..Default::default()
            },
        );
        assert!(none.suggestions.is_empty());
    }

    #[test]
    fn aggregator_caps_and_records_precap() {
        let issues: Vec<Issue> = (0..8)
            .map(|i| issue(&format!("i{i}"), "shared keyword payload overlap"))
            .collect();
        let config = SuggestionConfig {
            max_total: 3,
            ..Default::default()
        };
        let set = generate_suggestions(&issues, &[], &config, &SuggestionFilter::default());
        assert!(set.suggestions.len() <= 3);
        if set.status.capped {
            assert!(set.status.limited.unwrap() > 3);
        }
    }

    #[test]
    fn data_hash_tracks_issue_set() {
        let one = vec![issue("a", "first")];
        let two = vec![issue("a", "second")];
        let config = SuggestionConfig::default();
        let set_one = generate_suggestions(&one, &[], &config, &SuggestionFilter::default());
        let set_two = generate_suggestions(&two, &[], &config, &SuggestionFilter::default());
        assert_ne!(set_one.data_hash, set_two.data_hash);
    }

    #[test]
    fn min_confidence_filter() {
        let issues = vec![
            issue("a", "Implement user authentication system"),
            issue("b", "Implement user authentication system"),
        ];
        let set = generate_suggestions(
            &issues,
            &[],
            &SuggestionConfig::default(),
            &SuggestionFilter {
                min_confidence: Some(1.1),
                ..Default::default()
            },
        );
        assert!(set.suggestions.is_empty());
    }
}
