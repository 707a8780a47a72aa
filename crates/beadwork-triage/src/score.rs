use crate::context::{TriageContext, DEPTH_CYCLE};
use crate::risk;
use beadwork_core::Issue;
use beadwork_graph::StatsSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Component names, in the order they appear in breakdowns.
pub const COMPONENTS: [&str; 8] = [
    "pagerank",
    "betweenness",
    "blocker_ratio",
    "staleness",
    "priority",
    "time_to_impact",
    "urgency",
    "risk",
];

/// Per-component weights; the defaults sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub pagerank: f64,
    pub betweenness: f64,
    pub blocker_ratio: f64,
    pub staleness: f64,
    pub priority: f64,
    pub time_to_impact: f64,
    pub urgency: f64,
    pub risk: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            pagerank: 0.20,
            betweenness: 0.15,
            blocker_ratio: 0.20,
            staleness: 0.10,
            priority: 0.15,
            time_to_impact: 0.10,
            urgency: 0.05,
            risk: 0.05,
        }
    }
}

impl ScoreWeights {
    pub fn as_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("pagerank".into(), self.pagerank),
            ("betweenness".into(), self.betweenness),
            ("blocker_ratio".into(), self.blocker_ratio),
            ("staleness".into(), self.staleness),
            ("priority".into(), self.priority),
            ("time_to_impact".into(), self.time_to_impact),
            ("urgency".into(), self.urgency),
            ("risk".into(), self.risk),
        ])
    }

    pub fn from_map(map: &BTreeMap<String, f64>) -> Self {
        let get = |name: &str| map.get(name).copied().unwrap_or(0.0);
        Self {
            pagerank: get("pagerank"),
            betweenness: get("betweenness"),
            blocker_ratio: get("blocker_ratio"),
            staleness: get("staleness"),
            priority: get("priority"),
            time_to_impact: get("time_to_impact"),
            urgency: get("urgency"),
            risk: get("risk"),
        }
    }

    pub fn sum(&self) -> f64 {
        self.as_map().values().sum()
    }
}

/// Scorer knobs beyond the weights.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Count transitive descendants as blocked work instead of direct only.
    pub transitive_blockers: bool,
    /// Days after which staleness saturates at 1.0.
    pub staleness_cap_days: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            transitive_blockers: true,
            staleness_cap_days: 30.0,
        }
    }
}

/// One scored issue with its full per-component breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactScore {
    pub id: String,
    pub score: f64,
    /// Normalized component values in [0, 1].
    pub components: BTreeMap<String, f64>,
    /// `weight * component` terms that sum to `score`.
    pub weighted: BTreeMap<String, f64>,
    pub risk_explanation: String,
}

/// Weighted impact scoring over the open issues of a triage context.
pub struct ImpactScorer<'a> {
    context: &'a TriageContext,
    snapshot: &'a StatsSnapshot,
    weights: ScoreWeights,
    config: ScorerConfig,
    now: DateTime<Utc>,
}

impl<'a> ImpactScorer<'a> {
    pub fn new(context: &'a TriageContext, snapshot: &'a StatsSnapshot) -> Self {
        Self {
            context,
            snapshot,
            weights: ScoreWeights::default(),
            config: ScorerConfig::default(),
            now: Utc::now(),
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_config(mut self, config: ScorerConfig) -> Self {
        self.config = config;
        self
    }

    /// Pin the clock for reproducible scoring.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Score every open, non-tombstone issue, sorted score descending with
    /// id-ascending tie-break.
    pub fn score_all(&self) -> Vec<ImpactScore> {
        let risks = risk::assess_all(self.context, self.now);
        let max_pagerank = max_value(&self.snapshot.pagerank.values);
        let max_betweenness = max_value(&self.snapshot.betweenness.values);
        let node_count = self.context.graph().node_count();

        let mut scores: Vec<ImpactScore> = self
            .context
            .issues()
            .filter(|issue| !issue.is_closed_like())
            .map(|issue| {
                self.score_issue(issue, &risks, max_pagerank, max_betweenness, node_count)
            })
            .collect();

        scores.sort_by(|a, b| {
            let delta = b.score - a.score;
            if delta.abs() <= beadwork_graph::RANK_EPSILON {
                a.id.cmp(&b.id)
            } else {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }
        });
        scores
    }

    fn score_issue(
        &self,
        issue: &Issue,
        risks: &BTreeMap<String, risk::RiskSignals>,
        max_pagerank: f64,
        max_betweenness: f64,
        node_count: usize,
    ) -> ImpactScore {
        let pagerank = normalized(&self.snapshot.pagerank.values, &issue.id, max_pagerank);
        let betweenness = normalized(
            &self.snapshot.betweenness.values,
            &issue.id,
            max_betweenness,
        );
        let blocker_ratio = self.blocker_ratio(issue, node_count);
        let staleness = self.staleness(issue);
        let priority = priority_boost(issue.priority);
        let time_to_impact = self.time_to_impact(issue);
        let urgency = self.urgency(issue);
        let (risk_value, risk_explanation) = risks
            .get(&issue.id)
            .map(|r| (r.composite, r.explanation.clone()))
            .unwrap_or_else(|| (0.0, String::new()));

        let components = BTreeMap::from([
            ("pagerank".to_string(), pagerank),
            ("betweenness".to_string(), betweenness),
            ("blocker_ratio".to_string(), blocker_ratio),
            ("staleness".to_string(), staleness),
            ("priority".to_string(), priority),
            ("time_to_impact".to_string(), time_to_impact),
            ("urgency".to_string(), urgency),
            ("risk".to_string(), risk_value),
        ]);

        let weight_map = self.weights.as_map();
        let weighted: BTreeMap<String, f64> = components
            .iter()
            .map(|(name, value)| (name.clone(), weight_map[name] * value))
            .collect();
        let score = weighted.values().sum();

        ImpactScore {
            id: issue.id.clone(),
            score,
            components,
            weighted,
            risk_explanation,
        }
    }

    /// How much open work this issue gates, as a fraction of the graph.
    fn blocker_ratio(&self, issue: &Issue, node_count: usize) -> f64 {
        if node_count <= 1 {
            return 0.0;
        }
        let graph = self.context.graph();
        let Some(start) = graph.index_of(&issue.id) else {
            return 0.0;
        };
        let blocked = if self.config.transitive_blockers {
            let mut seen = std::collections::HashSet::new();
            let mut stack = graph.blocked_by_node(start);
            while let Some(node) = stack.pop() {
                if seen.insert(node) {
                    stack.extend(graph.blocked_by_node(node));
                }
            }
            seen.len()
        } else {
            graph.blocked_by_node(start).len()
        };
        blocked as f64 / (node_count - 1) as f64
    }

    fn staleness(&self, issue: &Issue) -> f64 {
        let days = (self.now - issue.updated_at).num_seconds() as f64 / 86_400.0;
        (days / self.config.staleness_cap_days).clamp(0.0, 1.0)
    }

    /// Inverse blocker depth; cycles never resolve, so they score zero.
    fn time_to_impact(&self, issue: &Issue) -> f64 {
        let depth = self.context.blocker_depth(&issue.id);
        if depth == DEPTH_CYCLE {
            0.0
        } else {
            1.0 / (1.0 + depth as f64)
        }
    }

    fn urgency(&self, issue: &Issue) -> f64 {
        let age_days = (self.now - issue.created_at).num_seconds() as f64 / 86_400.0;
        match issue.status {
            beadwork_core::IssueStatus::InProgress => 0.7,
            beadwork_core::IssueStatus::Blocked => 0.5,
            beadwork_core::IssueStatus::Open => 0.3 + 0.3 * (age_days / 30.0).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

/// Monotone map from priority (lower = more important) into [0, 1].
fn priority_boost(priority: i64) -> f64 {
    match priority {
        i64::MIN..=0 => 1.0,
        1 => 0.8,
        2 => 0.6,
        3 => 0.4,
        _ => 0.2,
    }
}

fn max_value(values: &BTreeMap<String, f64>) -> f64 {
    values.values().copied().fold(0.0, f64::max)
}

fn normalized(values: &BTreeMap<String, f64>, id: &str, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    (values.get(id).copied().unwrap_or(0.0) / max).clamp(0.0, 1.0)
}
