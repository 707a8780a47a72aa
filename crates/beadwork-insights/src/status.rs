use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureState {
    Ok,
    Empty,
    Skipped,
}

/// Status carried by every advanced-insight output.
///
/// `capped` is set when a collection was truncated to its configured
/// limit; `limited` then records the pre-cap size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStatus {
    pub state: FeatureState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub capped: bool,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limited: Option<usize>,
}

impl FeatureStatus {
    pub fn ok(count: usize) -> Self {
        Self {
            state: if count == 0 {
                FeatureState::Empty
            } else {
                FeatureState::Ok
            },
            reason: None,
            capped: false,
            count,
            limited: None,
        }
    }

    pub fn capped(count: usize, original: usize) -> Self {
        Self {
            state: FeatureState::Ok,
            reason: None,
            capped: true,
            count,
            limited: Some(original),
        }
    }

    pub fn empty(reason: impl Into<String>) -> Self {
        Self {
            state: FeatureState::Empty,
            reason: Some(reason.into()),
            capped: false,
            count: 0,
            limited: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            state: FeatureState::Skipped,
            reason: Some(reason.into()),
            capped: false,
            count: 0,
            limited: None,
        }
    }

    /// `ok` or `capped` depending on whether truncation happened.
    pub fn sized(count: usize, original: usize) -> Self {
        if count < original {
            Self::capped(count, original)
        } else {
            Self::ok(count)
        }
    }
}

/// Caps applied across the advanced-insight collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightLimits {
    /// Top-K unlock selections.
    pub top_k: usize,
    /// Coverage set size.
    pub coverage_cap: usize,
    /// Number of critical paths reported.
    pub max_paths: usize,
    /// Nodes retained per reported path.
    pub path_length_cap: usize,
    /// Parallel-cut items reported.
    pub parallel_cap: usize,
    /// Cycle-break suggestions reported.
    pub cycle_break_cap: usize,
}

impl Default for InsightLimits {
    fn default() -> Self {
        Self {
            top_k: 5,
            coverage_cap: 20,
            max_paths: 10,
            path_length_cap: 50,
            parallel_cap: 20,
            cycle_break_cap: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sized_picks_capped_when_truncated() {
        let status = FeatureStatus::sized(5, 12);
        assert!(status.capped);
        assert_eq!(status.limited, Some(12));
        assert_eq!(status.count, 5);

        let status = FeatureStatus::sized(12, 12);
        assert!(!status.capped);
        assert_eq!(status.limited, None);
    }

    #[test]
    fn zero_count_is_empty() {
        assert_eq!(FeatureStatus::ok(0).state, FeatureState::Empty);
        assert_eq!(FeatureStatus::ok(3).state, FeatureState::Ok);
    }
}
