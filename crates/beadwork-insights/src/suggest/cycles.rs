use super::{Suggestion, SuggestionType};
use beadwork_graph::CYCLE_DETECTION_TIMEOUT;
use std::collections::BTreeMap;

/// Confidence starts at 1.0 for a 2-cycle and decays with length.
const LENGTH_PENALTY: f64 = 0.1;
const CONFIDENCE_FLOOR: f64 = 0.5;

/// Turn detected cycles into actionable warnings.
///
/// Shorter cycles are more certainly wrong, so confidence is
/// `1.0 - (len - 2) * 0.1` floored at 0.5. The suggested action removes
/// the closing edge (the first node's dependency on the last node).
pub fn detect(cycles: &[Vec<String>]) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = cycles
        .iter()
        .filter(|cycle| cycle.len() >= 2)
        .filter(|cycle| !(cycle.len() == 1 && cycle[0] == CYCLE_DETECTION_TIMEOUT))
        .map(|cycle| {
            let confidence =
                (1.0 - (cycle.len() as f64 - 2.0) * LENGTH_PENALTY).max(CONFIDENCE_FLOOR);
            let head = &cycle[0];
            let tail = &cycle[cycle.len() - 1];
            let path = cycle.join(" -> ");

            let mut metadata = BTreeMap::new();
            metadata.insert("cycle_path".to_string(), path.clone());
            metadata.insert("cycle_length".to_string(), cycle.len().to_string());

            Suggestion {
                suggestion_type: SuggestionType::CycleWarning,
                target_bead: head.clone(),
                related_bead: Some(tail.clone()),
                summary: format!("dependency cycle through {}", path),
                reason: format!(
                    "{} issue(s) block each other; none can become actionable",
                    cycle.len()
                ),
                confidence,
                action_command: Some(format!("bd dep remove {head} {tail}")),
                metadata,
            }
        })
        .collect();

    suggestions.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.target_bead.cmp(&b.target_bead))
    });
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn two_cycle_is_full_confidence() {
        let found = detect(&[cycle(&["a", "b"])]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].confidence, 1.0);
        assert_eq!(found[0].action_command.as_deref(), Some("bd dep remove a b"));
    }

    #[test]
    fn confidence_decays_with_length_to_floor() {
        let found = detect(&[cycle(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"])]);
        assert_eq!(found[0].confidence, 0.5);
    }

    #[test]
    fn triangle_confidence() {
        let found = detect(&[cycle(&["a", "b", "c"])]);
        assert!((found[0].confidence - 0.9).abs() < 1e-12);
        assert_eq!(found[0].metadata["cycle_path"], "a -> b -> c");
    }

    #[test]
    fn sentinel_ignored() {
        let found = detect(&[vec![CYCLE_DETECTION_TIMEOUT.to_string()]]);
        assert!(found.is_empty());
    }
}
