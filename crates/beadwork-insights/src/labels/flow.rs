use beadwork_core::{DependencyType, Issue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Cross-label blocking flow.
///
/// `matrix[i][j]` counts `blocks` edges whose blocker carries
/// `labels[i]` and whose blocked issue carries `labels[j]`, for distinct
/// labels. Closed-like issues are excluded unless requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossLabelFlow {
    pub labels: Vec<String>,
    pub matrix: Vec<Vec<usize>>,
    /// Labels with the maximum outgoing (blocking) sum, ascending.
    pub bottleneck_labels: Vec<String>,
}

impl CrossLabelFlow {
    pub fn outgoing_sum(&self, label: &str) -> usize {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.matrix[i].iter().sum())
            .unwrap_or(0)
    }

    pub fn incoming_sum(&self, label: &str) -> usize {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|j| self.matrix.iter().map(|row| row[j]).sum())
            .unwrap_or(0)
    }
}

pub fn cross_label_flow(issues: &[Issue], include_closed: bool) -> CrossLabelFlow {
    let visible: HashMap<&str, &Issue> = issues
        .iter()
        .filter(|i| include_closed || !i.is_closed_like())
        .map(|i| (i.id.as_str(), i))
        .collect();

    let mut labels: Vec<String> = visible
        .values()
        .flat_map(|i| i.labels.iter().cloned())
        .collect();
    labels.sort_unstable();
    labels.dedup();
    let index: BTreeMap<&str, usize> = labels
        .iter()
        .enumerate()
        .map(|(i, l)| (l.as_str(), i))
        .collect();

    let mut matrix = vec![vec![0_usize; labels.len()]; labels.len()];
    for blocked in visible.values() {
        for dep in &blocked.dependencies {
            if dep.dep_type != DependencyType::Blocks || dep.target == blocked.id {
                continue;
            }
            let Some(blocker) = visible.get(dep.target.as_str()) else {
                continue;
            };
            for from_label in &blocker.labels {
                for to_label in &blocked.labels {
                    if from_label == to_label {
                        continue;
                    }
                    matrix[index[from_label.as_str()]][index[to_label.as_str()]] += 1;
                }
            }
        }
    }

    let max_outgoing = matrix
        .iter()
        .map(|row| row.iter().sum::<usize>())
        .max()
        .unwrap_or(0);
    let bottleneck_labels = if max_outgoing == 0 {
        Vec::new()
    } else {
        labels
            .iter()
            .enumerate()
            .filter(|(i, _)| matrix[*i].iter().sum::<usize>() == max_outgoing)
            .map(|(_, l)| l.clone())
            .collect()
    };

    CrossLabelFlow {
        labels,
        matrix,
        bottleneck_labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beadwork_core::IssueStatus;

    fn labeled(id: &str, labels: &[&str]) -> Issue {
        Issue::new(id, id).with_labels(labels.iter().copied())
    }

    #[test]
    fn counts_cross_label_edges() {
        let issues = vec![
            labeled("infra-1", &["infra"]),
            labeled("app-1", &["app"]).blocked_by("infra-1"),
            labeled("app-2", &["app"]).blocked_by("infra-1"),
        ];
        let flow = cross_label_flow(&issues, false);
        assert_eq!(flow.outgoing_sum("infra"), 2);
        assert_eq!(flow.incoming_sum("app"), 2);
        assert_eq!(flow.bottleneck_labels, vec!["infra"]);
    }

    #[test]
    fn same_label_edges_ignored() {
        let issues = vec![
            labeled("a", &["core"]),
            labeled("b", &["core"]).blocked_by("a"),
        ];
        let flow = cross_label_flow(&issues, false);
        assert_eq!(flow.outgoing_sum("core"), 0);
        assert!(flow.bottleneck_labels.is_empty());
    }

    #[test]
    fn closed_issues_excluded_by_default() {
        let issues = vec![
            labeled("infra-1", &["infra"]).with_status(IssueStatus::Closed),
            labeled("app-1", &["app"]).blocked_by("infra-1"),
        ];
        let flow = cross_label_flow(&issues, false);
        assert_eq!(flow.outgoing_sum("infra"), 0);

        let with_closed = cross_label_flow(&issues, true);
        assert_eq!(with_closed.outgoing_sum("infra"), 1);
    }
}
