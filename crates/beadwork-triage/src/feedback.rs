use crate::score::ScoreWeights;
use beadwork_core::{BeadworkError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const FEEDBACK_VERSION: &str = "1.0";
pub const FEEDBACK_FILE: &str = "feedback.json";

/// Per-event learning rate applied to a component's contribution.
const LEARN_RATE: f64 = 0.1;
/// EMA smoothing toward the per-event target.
const EMA_ALPHA: f64 = 0.2;
/// Multiplier bounds.
const MIN_MULTIPLIER: f64 = 0.5;
const MAX_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
    Accept,
    Ignore,
}

impl FeedbackAction {
    fn direction(self) -> f64 {
        match self {
            FeedbackAction::Accept => 1.0,
            FeedbackAction::Ignore => -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub issue_id: String,
    pub action: FeedbackAction,
    pub score: f64,
    pub ts: DateTime<Utc>,
}

/// Running aggregate over all recorded events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAggregate {
    pub total_events: u64,
    pub accepts: u64,
    pub ignores: u64,
    pub mean_accepted_score: f64,
    pub mean_ignored_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FeedbackFile {
    version: String,
    events: Vec<FeedbackEvent>,
    aggregate: FeedbackAggregate,
    /// Per-component weight multipliers, bounded [0.5, 2.0].
    multipliers: BTreeMap<String, f64>,
}

impl Default for FeedbackFile {
    fn default() -> Self {
        Self {
            version: FEEDBACK_VERSION.to_string(),
            events: Vec::new(),
            aggregate: FeedbackAggregate::default(),
            multipliers: BTreeMap::new(),
        }
    }
}

/// Persistent accept/ignore feedback and the weight multipliers it learns.
///
/// Unlike the result caches, persistence failures here are *not* silently
/// swallowed: load and save errors surface as [`BeadworkError::Feedback`].
#[derive(Debug)]
pub struct FeedbackStore {
    path: PathBuf,
    state: Mutex<FeedbackFile>,
}

impl FeedbackStore {
    /// Open (or initialize) `feedback.json` under `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| BeadworkError::Feedback(format!("create {}: {e}", dir.display())))?;
        let path = dir.join(FEEDBACK_FILE);
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| BeadworkError::Feedback(format!("read {}: {e}", path.display())))?;
            let parsed: FeedbackFile = serde_json::from_str(&contents)
                .map_err(|e| BeadworkError::Feedback(format!("parse {}: {e}", path.display())))?;
            if parsed.version != FEEDBACK_VERSION {
                return Err(BeadworkError::Feedback(format!(
                    "unsupported feedback version {} (expected {})",
                    parsed.version, FEEDBACK_VERSION
                )));
            }
            parsed
        } else {
            FeedbackFile::default()
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one event and adjust multipliers from the event's normalized
    /// component contributions.
    ///
    /// For each component with contribution `c`: the target is
    /// `clamp(current + direction * c * 0.1, 0.5, 2.0)` and the stored
    /// multiplier moves by EMA with alpha 0.2.
    pub fn record(
        &self,
        event: FeedbackEvent,
        contributions: &BTreeMap<String, f64>,
    ) -> Result<()> {
        let mut state = self.state.lock();

        for (component, contribution) in contributions {
            let current = state.multipliers.get(component).copied().unwrap_or(1.0);
            let delta = event.action.direction() * contribution * LEARN_RATE;
            let target = (current + delta).clamp(MIN_MULTIPLIER, MAX_MULTIPLIER);
            let smoothed = EMA_ALPHA * target + (1.0 - EMA_ALPHA) * current;
            state.multipliers.insert(component.clone(), smoothed);
        }

        match event.action {
            FeedbackAction::Accept => {
                let n = state.aggregate.accepts as f64;
                state.aggregate.mean_accepted_score =
                    (state.aggregate.mean_accepted_score * n + event.score) / (n + 1.0);
                state.aggregate.accepts += 1;
            }
            FeedbackAction::Ignore => {
                let n = state.aggregate.ignores as f64;
                state.aggregate.mean_ignored_score =
                    (state.aggregate.mean_ignored_score * n + event.score) / (n + 1.0);
                state.aggregate.ignores += 1;
            }
        }
        state.aggregate.total_events += 1;
        state.events.push(event);

        self.save(&state)?;
        debug!(total = state.aggregate.total_events, "feedback recorded");
        Ok(())
    }

    pub fn aggregate(&self) -> FeedbackAggregate {
        self.state.lock().aggregate.clone()
    }

    pub fn multiplier(&self, component: &str) -> f64 {
        self.state
            .lock()
            .multipliers
            .get(component)
            .copied()
            .unwrap_or(1.0)
    }

    /// `base * multiplier` per component, L1-normalized to sum 1.
    pub fn effective_weights(&self, base: &ScoreWeights) -> ScoreWeights {
        let state = self.state.lock();
        let mut map = base.as_map();
        for (component, weight) in map.iter_mut() {
            let multiplier = state.multipliers.get(component).copied().unwrap_or(1.0);
            *weight *= multiplier;
        }
        drop(state);

        let total: f64 = map.values().sum();
        if total > 0.0 {
            for weight in map.values_mut() {
                *weight /= total;
            }
        }
        ScoreWeights::from_map(&map)
    }

    fn save(&self, state: &FeedbackFile) -> Result<()> {
        let blob = serde_json::to_vec_pretty(state)
            .map_err(|e| BeadworkError::Feedback(format!("serialize feedback: {e}")))?;
        std::fs::write(&self.path, blob)
            .map_err(|e| BeadworkError::Feedback(format!("write {}: {e}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn event(action: FeedbackAction, score: f64) -> FeedbackEvent {
        FeedbackEvent {
            issue_id: "x".into(),
            action,
            score,
            ts: Utc::now(),
        }
    }

    fn contributions(pagerank: f64) -> BTreeMap<String, f64> {
        BTreeMap::from([("pagerank".to_string(), pagerank)])
    }

    #[test]
    fn accept_raises_multiplier_ignore_lowers() {
        let dir = TempDir::new().unwrap();
        let store = FeedbackStore::open(dir.path()).unwrap();

        store
            .record(event(FeedbackAction::Accept, 0.9), &contributions(1.0))
            .unwrap();
        let up = store.multiplier("pagerank");
        assert!(up > 1.0);

        for _ in 0..10 {
            store
                .record(event(FeedbackAction::Ignore, 0.9), &contributions(1.0))
                .unwrap();
        }
        assert!(store.multiplier("pagerank") < up);
    }

    #[test]
    fn multipliers_stay_bounded() {
        let dir = TempDir::new().unwrap();
        let store = FeedbackStore::open(dir.path()).unwrap();
        for _ in 0..500 {
            store
                .record(event(FeedbackAction::Accept, 1.0), &contributions(1.0))
                .unwrap();
        }
        let high = store.multiplier("pagerank");
        assert!(high <= MAX_MULTIPLIER + 1e-9, "multiplier = {high}");

        for _ in 0..1000 {
            store
                .record(event(FeedbackAction::Ignore, 1.0), &contributions(1.0))
                .unwrap();
        }
        let low = store.multiplier("pagerank");
        assert!(low >= MIN_MULTIPLIER - 1e-9, "multiplier = {low}");
    }

    #[test]
    fn effective_weights_stay_normalized() {
        let dir = TempDir::new().unwrap();
        let store = FeedbackStore::open(dir.path()).unwrap();
        for _ in 0..20 {
            store
                .record(event(FeedbackAction::Accept, 0.8), &contributions(0.9))
                .unwrap();
        }
        let weights = store.effective_weights(&ScoreWeights::default());
        assert!((weights.sum() - 1.0).abs() < 1e-9);
        // The boosted component gained relative share.
        assert!(weights.pagerank > ScoreWeights::default().pagerank);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FeedbackStore::open(dir.path()).unwrap();
            store
                .record(event(FeedbackAction::Accept, 0.5), &contributions(1.0))
                .unwrap();
        }
        let reopened = FeedbackStore::open(dir.path()).unwrap();
        assert_eq!(reopened.aggregate().total_events, 1);
        assert!(reopened.multiplier("pagerank") > 1.0);
    }

    #[test]
    fn version_mismatch_is_a_typed_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(FEEDBACK_FILE),
            r#"{"version":"9.9","events":[],"aggregate":{"total_events":0,"accepts":0,"ignores":0,"mean_accepted_score":0.0,"mean_ignored_score":0.0},"multipliers":{}}"#,
        )
        .unwrap();
        match FeedbackStore::open(dir.path()) {
            Err(BeadworkError::Feedback(message)) => {
                assert!(message.contains("version"));
            }
            other => panic!("expected feedback error, got {other:?}"),
        }
    }

    #[test]
    fn aggregate_tracks_means() {
        let dir = TempDir::new().unwrap();
        let store = FeedbackStore::open(dir.path()).unwrap();
        store
            .record(event(FeedbackAction::Accept, 0.4), &BTreeMap::new())
            .unwrap();
        store
            .record(event(FeedbackAction::Accept, 0.8), &BTreeMap::new())
            .unwrap();
        let aggregate = store.aggregate();
        assert_eq!(aggregate.accepts, 2);
        assert!((aggregate.mean_accepted_score - 0.6).abs() < 1e-12);
    }
}
