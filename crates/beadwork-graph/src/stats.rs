use crate::phase1::Phase1Metrics;
use beadwork_core::AnalysisConfig;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Near-equality tolerance used before any float ordering comparison.
pub const RANK_EPSILON: f64 = 1e-6;

/// Sentinel cycle entry injected when cycle enumeration is cut short.
pub const CYCLE_DETECTION_TIMEOUT: &str = "CYCLE_DETECTION_TIMEOUT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricState {
    Pending,
    Computed,
    Skipped,
    Timeout,
    Error,
}

/// Terminal (or pending) state of a single metric computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStatus {
    pub state: MetricState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Elapsed wall time, whole milliseconds.
    #[serde(rename = "ms")]
    pub elapsed_ms: u64,
}

impl MetricStatus {
    pub fn pending() -> Self {
        Self {
            state: MetricState::Pending,
            reason: None,
            elapsed_ms: 0,
        }
    }

    pub fn computed(elapsed_ms: u64) -> Self {
        Self {
            state: MetricState::Computed,
            reason: None,
            elapsed_ms,
        }
    }

    pub fn computed_with_reason(reason: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            state: MetricState::Computed,
            reason: Some(reason.into()),
            elapsed_ms,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            state: MetricState::Skipped,
            reason: Some(reason.into()),
            elapsed_ms: 0,
        }
    }

    pub fn timeout(elapsed_ms: u64) -> Self {
        Self {
            state: MetricState::Timeout,
            reason: Some("deadline expired".into()),
            elapsed_ms,
        }
    }

    pub fn error(reason: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            state: MetricState::Error,
            reason: Some(reason.into()),
            elapsed_ms,
        }
    }

    pub fn is_computed(&self) -> bool {
        self.state == MetricState::Computed
    }
}

impl Default for MetricStatus {
    fn default() -> Self {
        Self::pending()
    }
}

/// One metric's value map, derived ranking, and status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub values: BTreeMap<String, f64>,
    /// Dense 1-based ranks, highest value first, ties broken id ascending.
    pub ranks: BTreeMap<String, usize>,
    pub status: MetricStatus,
}

impl MetricResult {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: MetricStatus::skipped(reason),
            ..Self::default()
        }
    }

    pub fn computed(values: BTreeMap<String, f64>, elapsed_ms: u64) -> Self {
        let ranks = dense_ranks(&values);
        Self {
            values,
            ranks,
            status: MetricStatus::computed(elapsed_ms),
        }
    }
}

/// Assign ranks 1..=n by value descending; values within [`RANK_EPSILON`]
/// compare equal and fall back to id ascending.
pub fn dense_ranks(values: &BTreeMap<String, f64>) -> BTreeMap<String, usize> {
    let mut entries: Vec<(&String, f64)> = values.iter().map(|(k, v)| (k, *v)).collect();
    entries.sort_by(|a, b| {
        if (a.1 - b.1).abs() <= RANK_EPSILON {
            a.0.cmp(b.0)
        } else {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
        }
    });
    entries
        .into_iter()
        .enumerate()
        .map(|(i, (id, _))| (id.clone(), i + 1))
        .collect()
}

/// Fully serializable analysis result: Phase-1 structure plus every
/// Phase-2 metric with its status. This is the blob the result caches
/// persist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub out_degree: MetricResult,
    pub in_degree: MetricResult,
    pub topo_order: Vec<String>,
    pub is_dag: bool,

    pub pagerank: MetricResult,
    pub betweenness: MetricResult,
    pub eigenvector: MetricResult,
    pub hits_hubs: MetricResult,
    pub hits_authorities: MetricResult,
    pub critical_path: MetricResult,
    pub k_core: MetricResult,
    pub slack: MetricResult,

    /// Detected simple cycles; may end with a [`CYCLE_DETECTION_TIMEOUT`]
    /// sentinel entry when enumeration was cut short.
    pub cycles: Vec<Vec<String>>,
    pub cycles_status: MetricStatus,

    /// Sorted list for deterministic serialization.
    pub articulation: Vec<String>,
    pub articulation_status: MetricStatus,
}

impl StatsSnapshot {
    /// Phase-1-only snapshot; Phase-2 slots carry the given initial status
    /// per metric (pending for enabled, skipped otherwise).
    pub fn from_phase1(phase1: &Phase1Metrics, config: &AnalysisConfig) -> Self {
        let slot = |settings: &beadwork_core::MetricSettings| {
            if settings.enabled {
                MetricResult::pending()
            } else {
                MetricResult::skipped(
                    settings
                        .skip_reason
                        .clone()
                        .unwrap_or_else(|| "disabled".into()),
                )
            }
        };
        let status_slot = |settings: &beadwork_core::MetricSettings| {
            if settings.enabled {
                MetricStatus::pending()
            } else {
                MetricStatus::skipped(
                    settings
                        .skip_reason
                        .clone()
                        .unwrap_or_else(|| "disabled".into()),
                )
            }
        };

        Self {
            node_count: phase1.node_count,
            edge_count: phase1.edge_count,
            density: phase1.density,
            out_degree: MetricResult::computed(phase1.out_degree.clone(), 0),
            in_degree: MetricResult::computed(phase1.in_degree.clone(), 0),
            topo_order: phase1.topo_order.clone(),
            is_dag: phase1.is_dag,
            pagerank: slot(&config.pagerank),
            betweenness: slot(&config.betweenness),
            eigenvector: slot(&config.eigenvector),
            hits_hubs: slot(&config.hits),
            hits_authorities: slot(&config.hits),
            critical_path: slot(&config.critical_path),
            k_core: slot(&config.k_core),
            slack: slot(&config.slack),
            cycles: Vec::new(),
            cycles_status: status_slot(&config.cycles),
            articulation: Vec::new(),
            articulation_status: status_slot(&config.articulation),
        }
    }

    /// Per-metric statuses keyed by metric name.
    pub fn statuses(&self) -> BTreeMap<&'static str, &MetricStatus> {
        let mut map = BTreeMap::new();
        map.insert("out_degree", &self.out_degree.status);
        map.insert("in_degree", &self.in_degree.status);
        map.insert("pagerank", &self.pagerank.status);
        map.insert("betweenness", &self.betweenness.status);
        map.insert("eigenvector", &self.eigenvector.status);
        map.insert("hits", &self.hits_hubs.status);
        map.insert("critical_path", &self.critical_path.status);
        map.insert("cycles", &self.cycles_status);
        map.insert("k_core", &self.k_core.status);
        map.insert("articulation", &self.articulation_status);
        map.insert("slack", &self.slack.status);
        map
    }

    /// True once no metric is pending.
    pub fn phase2_terminal(&self) -> bool {
        self.statuses()
            .values()
            .all(|s| s.state != MetricState::Pending)
    }

    /// Drop all but the top `limit` ranked entries from every value map
    /// (`BW_INSIGHTS_MAP_LIMIT`).
    pub fn apply_map_limit(&mut self, limit: usize) {
        for result in [
            &mut self.out_degree,
            &mut self.in_degree,
            &mut self.pagerank,
            &mut self.betweenness,
            &mut self.eigenvector,
            &mut self.hits_hubs,
            &mut self.hits_authorities,
            &mut self.critical_path,
            &mut self.k_core,
            &mut self.slack,
        ] {
            if result.values.len() > limit {
                let keep: std::collections::HashSet<String> = result
                    .ranks
                    .iter()
                    .filter(|(_, &rank)| rank <= limit)
                    .map(|(id, _)| id.clone())
                    .collect();
                result.values.retain(|id, _| keep.contains(id));
                result.ranks.retain(|id, _| keep.contains(id));
            }
        }
    }
}

/// Live handle to an analysis run.
///
/// Phase-1 data is complete at construction. Phase-2 results are installed
/// in one atomic snapshot swap; the ready signal is a one-shot broadcast
/// that fires after every enabled metric has terminated. Readers therefore
/// observe either the Phase-1-only snapshot or the fully populated one,
/// never a partial Phase-2.
#[derive(Debug)]
pub struct AnalysisHandle {
    data_hash: String,
    structure_hash: String,
    config_hash: String,
    config: AnalysisConfig,
    phase1: Phase1Metrics,
    snapshot: RwLock<Arc<StatsSnapshot>>,
    ready_tx: watch::Sender<bool>,
    ready_rx: watch::Receiver<bool>,
}

impl AnalysisHandle {
    pub fn new(
        data_hash: String,
        structure_hash: String,
        config_hash: String,
        config: AnalysisConfig,
        phase1: Phase1Metrics,
    ) -> Self {
        let initial = StatsSnapshot::from_phase1(&phase1, &config);
        let (ready_tx, ready_rx) = watch::channel(false);
        Self {
            data_hash,
            structure_hash,
            config_hash,
            config,
            phase1,
            snapshot: RwLock::new(Arc::new(initial)),
            ready_tx,
            ready_rx,
        }
    }

    /// Handle over an already-complete snapshot (cache hits); ready fires
    /// immediately.
    pub fn from_snapshot(
        data_hash: String,
        structure_hash: String,
        config_hash: String,
        config: AnalysisConfig,
        phase1: Phase1Metrics,
        snapshot: StatsSnapshot,
    ) -> Self {
        let handle = Self::new(data_hash, structure_hash, config_hash, config, phase1);
        handle.install_phase2(snapshot);
        handle
    }

    pub fn data_hash(&self) -> &str {
        &self.data_hash
    }

    pub fn structure_hash(&self) -> &str {
        &self.structure_hash
    }

    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    /// `data_hash|config_hash`, the key both cache tiers use.
    pub fn cache_key(&self) -> String {
        format!("{}|{}", self.data_hash, self.config_hash)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn phase1(&self) -> &Phase1Metrics {
        &self.phase1
    }

    /// Current snapshot. Cheap Arc clone; never blocks on computation.
    pub fn snapshot(&self) -> Arc<StatsSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    /// Block until the Phase-2 ready signal has fired.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready_rx.clone();
        // wait_for returns immediately when the value is already true.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Install the complete Phase-2 snapshot and fire the ready signal.
    ///
    /// The write lock is held only across the pointer swap. Idempotent in
    /// the sense that the signal latches; the supervisor calls this once.
    pub fn install_phase2(&self, mut snapshot: StatsSnapshot) {
        if let Some(limit) = self.config.map_limit {
            snapshot.apply_map_limit(limit);
        }
        *self.snapshot.write() = Arc::new(snapshot);
        let _ = self.ready_tx.send(true);
    }
}
