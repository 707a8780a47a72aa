use crate::context::TriageContext;
use beadwork_core::{Issue, IssueStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Composite weights: fan variance, churn, cross-repo, status.
const W_FAN: f64 = 0.30;
const W_CHURN: f64 = 0.30;
const W_CROSS_REPO: f64 = 0.20;
const W_STATUS: f64 = 0.20;

/// A contributor only reaches the explanation above this level.
const EXPLAIN_THRESHOLD: f64 = 0.3;

/// Per-issue risk signals, each in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSignals {
    /// Coefficient of variation of the open blockers' in-degrees.
    pub fan_variance: f64,
    /// Comment and update activity relative to issue age.
    pub activity_churn: f64,
    /// Fraction of blocking deps that cross repository boundaries.
    pub cross_repo: f64,
    /// Status-and-staleness term.
    pub status_risk: f64,
    /// Weighted composite, capped at 1.0.
    pub composite: f64,
    /// Human-readable list of the non-trivial contributors.
    pub explanation: String,
}

/// Assess every open, non-tombstone issue.
pub fn assess_all(context: &TriageContext, now: DateTime<Utc>) -> BTreeMap<String, RiskSignals> {
    context
        .issues()
        .filter(|issue| !issue.is_closed_like())
        .map(|issue| (issue.id.clone(), assess(context, issue, now)))
        .collect()
}

pub fn assess(context: &TriageContext, issue: &Issue, now: DateTime<Utc>) -> RiskSignals {
    let fan_variance = fan_variance(context, issue);
    let activity_churn = activity_churn(issue, now);
    let cross_repo = cross_repo_risk(context, issue);
    let status_risk = status_risk(issue, now);

    let composite = (W_FAN * fan_variance
        + W_CHURN * activity_churn
        + W_CROSS_REPO * cross_repo
        + W_STATUS * status_risk)
        .min(1.0);

    let mut reasons: Vec<&str> = Vec::new();
    if fan_variance > EXPLAIN_THRESHOLD {
        reasons.push("uneven blocker fan-out");
    }
    if activity_churn > EXPLAIN_THRESHOLD {
        reasons.push("high activity churn");
    }
    if cross_repo > EXPLAIN_THRESHOLD {
        reasons.push("cross-repository blockers");
    }
    if status_risk > EXPLAIN_THRESHOLD {
        reasons.push("status indicates stall risk");
    }
    let explanation = if reasons.is_empty() {
        "no significant risk signals".to_string()
    } else {
        reasons.join("; ")
    };

    RiskSignals {
        fan_variance,
        activity_churn,
        cross_repo,
        status_risk,
        composite,
        explanation,
    }
}

/// Coefficient of variation of the in-degrees of the issue's open
/// blockers, clamped to 1.0. Fewer than two blockers carry no variance.
fn fan_variance(context: &TriageContext, issue: &Issue) -> f64 {
    let blockers = context.open_blockers(&issue.id);
    if blockers.len() < 2 {
        return 0.0;
    }
    let graph = context.graph();
    let degrees: Vec<f64> = blockers
        .iter()
        .filter_map(|id| graph.index_of(id))
        .map(|idx| graph.in_degree(idx) as f64)
        .collect();
    let n = degrees.len() as f64;
    let mean = degrees.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = degrees.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
    (variance.sqrt() / mean).min(1.0)
}

/// `0.6 * (comments / age_days) + 0.4 * (update_span_days / age_days)`,
/// clamped to 1.0. Age is floored at one day.
fn activity_churn(issue: &Issue, now: DateTime<Utc>) -> f64 {
    let age_days = days_between(issue.created_at, now).max(1.0);
    let update_span_days = days_between(issue.created_at, issue.updated_at).max(0.0);
    let comment_rate = issue.comments.len() as f64 / age_days;
    let span_ratio = update_span_days / age_days;
    (0.6 * comment_rate + 0.4 * span_ratio).min(1.0)
}

/// Fraction of blocking deps whose target lives in a different
/// `source_repo`. Dangling targets are ignored.
fn cross_repo_risk(context: &TriageContext, issue: &Issue) -> f64 {
    let mut total = 0_usize;
    let mut foreign = 0_usize;
    for dep in issue.blocking_deps() {
        let Some(target) = context.issue(&dep.target) else {
            continue;
        };
        total += 1;
        if target.source_repo != issue.source_repo {
            foreign += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        foreign as f64 / total as f64
    }
}

/// Piecewise status-by-staleness risk.
fn status_risk(issue: &Issue, now: DateTime<Utc>) -> f64 {
    let stale_days = days_between(issue.updated_at, now).max(0.0);
    let age_days = days_between(issue.created_at, now).max(0.0);
    match issue.status {
        IssueStatus::Blocked => {
            if stale_days > 7.0 {
                0.9
            } else {
                0.7
            }
        }
        IssueStatus::InProgress => {
            if stale_days < 7.0 {
                0.1
            } else if stale_days < 14.0 {
                0.4
            } else {
                0.8
            }
        }
        IssueStatus::Open => {
            if age_days > 30.0 {
                0.3
            } else {
                0.1
            }
        }
        IssueStatus::Closed | IssueStatus::Tombstone => 0.0,
    }
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 86_400.0
}
