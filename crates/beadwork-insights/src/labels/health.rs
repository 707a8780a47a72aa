use super::flow::cross_label_flow;
use super::issues_with_label;
use beadwork_core::Issue;
use beadwork_graph::StatsSnapshot;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Composite weights: velocity, freshness, flow, criticality.
const W_VELOCITY: f64 = 0.3;
const W_FRESHNESS: f64 = 0.3;
const W_FLOW: f64 = 0.2;
const W_CRITICALITY: f64 = 0.2;

/// Open issues untouched this long count as stale.
const STALE_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    Healthy,
    Warning,
    Critical,
}

impl HealthLevel {
    fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            HealthLevel::Healthy
        } else if score >= 40.0 {
            HealthLevel::Warning
        } else {
            HealthLevel::Critical
        }
    }
}

/// Health report for one label; every sub-score is on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelHealth {
    pub label: String,
    pub velocity_score: f64,
    pub freshness_score: f64,
    pub flow_score: f64,
    pub criticality_score: f64,
    pub composite: f64,
    pub level: HealthLevel,

    pub closures_7d: usize,
    pub closures_30d: usize,
    pub avg_days_to_close: f64,
    pub avg_days_since_update: f64,
    pub stale_count: usize,
    pub incoming_flow: usize,
    pub outgoing_flow: usize,
}

/// Assess one label against the issue set and the analysis snapshot.
pub fn label_health(
    issues: &[Issue],
    label: &str,
    snapshot: &StatsSnapshot,
    now: DateTime<Utc>,
) -> LabelHealth {
    let members = issues_with_label(issues, label);
    let open: Vec<&&Issue> = members.iter().filter(|i| !i.is_closed_like()).collect();

    // Velocity: recent closures relative to what remains open.
    let closed_within = |days: i64| {
        members
            .iter()
            .filter(|i| {
                i.closed_at
                    .is_some_and(|at| now - at <= Duration::days(days) && at <= now)
            })
            .count()
    };
    let closures_7d = closed_within(7);
    let closures_30d = closed_within(30);
    let close_durations: Vec<f64> = members
        .iter()
        .filter_map(|i| i.closed_at.map(|at| days_f64(at - i.created_at)))
        .collect();
    let avg_days_to_close = mean(&close_durations);
    let velocity_score = if open.is_empty() {
        100.0
    } else {
        let weekly_pace = closures_7d as f64 + closures_30d as f64 / 4.0;
        (weekly_pace / open.len() as f64 * 100.0).clamp(0.0, 100.0)
    };

    // Freshness: how recently open members were touched.
    let update_ages: Vec<f64> = open.iter().map(|i| days_f64(now - i.updated_at)).collect();
    let avg_days_since_update = mean(&update_ages);
    let stale_count = update_ages
        .iter()
        .filter(|&&age| age > STALE_DAYS as f64)
        .count();
    let freshness_score = if open.is_empty() {
        100.0
    } else {
        let age_part = (1.0 - (avg_days_since_update / 30.0).min(1.0)) * 70.0;
        let stale_part = (1.0 - stale_count as f64 / open.len() as f64) * 30.0;
        (age_part + stale_part).clamp(0.0, 100.0)
    };

    // Flow: cross-label blocking pressure in either direction.
    let flow = cross_label_flow(issues, false);
    let incoming_flow = flow.incoming_sum(label);
    let outgoing_flow = flow.outgoing_sum(label);
    let flow_score = if members.is_empty() {
        100.0
    } else {
        let pressure = (incoming_flow + outgoing_flow) as f64 / (2.0 * members.len() as f64);
        ((1.0 - pressure.min(1.0)) * 100.0).clamp(0.0, 100.0)
    };

    // Criticality: centrality of the label's members in the whole graph.
    // Highly central labels are bottleneck-prone, which lowers health.
    let max_pagerank = max_value(snapshot.pagerank.values.values());
    let max_betweenness = max_value(snapshot.betweenness.values.values());
    let member_pageranks: Vec<f64> = members
        .iter()
        .filter_map(|i| snapshot.pagerank.values.get(&i.id).copied())
        .collect();
    let member_max_betweenness = members
        .iter()
        .filter_map(|i| snapshot.betweenness.values.get(&i.id).copied())
        .fold(0.0, f64::max);
    let avg_pr_norm = if max_pagerank > 0.0 {
        mean(&member_pageranks) / max_pagerank
    } else {
        0.0
    };
    let bw_norm = if max_betweenness > 0.0 {
        member_max_betweenness / max_betweenness
    } else {
        0.0
    };
    let criticality_score = ((1.0 - 0.5 * avg_pr_norm - 0.5 * bw_norm) * 100.0).clamp(0.0, 100.0);

    let composite = (W_VELOCITY * velocity_score
        + W_FRESHNESS * freshness_score
        + W_FLOW * flow_score
        + W_CRITICALITY * criticality_score)
        .clamp(0.0, 100.0);

    LabelHealth {
        label: label.to_string(),
        velocity_score,
        freshness_score,
        flow_score,
        criticality_score,
        composite,
        level: HealthLevel::from_score(composite),
        closures_7d,
        closures_30d,
        avg_days_to_close,
        avg_days_since_update,
        stale_count,
        incoming_flow,
        outgoing_flow,
    }
}

fn days_f64(duration: Duration) -> f64 {
    duration.num_seconds() as f64 / 86_400.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn max_value<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    values.copied().fold(0.0, f64::max)
}
