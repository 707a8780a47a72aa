use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment flag that disables every Phase-2 metric.
pub const ENV_SKIP_PHASE2: &str = "BW_SKIP_PHASE2";
/// Environment override for every enabled Phase-2 timeout, in whole seconds.
pub const ENV_PHASE2_TIMEOUT_S: &str = "BW_PHASE2_TIMEOUT_S";
/// Cap on entries retained in exported full-stats map fields.
pub const ENV_INSIGHTS_MAP_LIMIT: &str = "BW_INSIGHTS_MAP_LIMIT";

/// How a metric should be computed for the current graph size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricMode {
    Exact,
    Approximate,
    Skip,
}

/// Per-metric slice of the analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSettings {
    pub enabled: bool,
    pub timeout: Duration,
    pub mode: MetricMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl MetricSettings {
    pub fn enabled(timeout: Duration) -> Self {
        Self {
            enabled: true,
            timeout,
            mode: MetricMode::Exact,
            skip_reason: None,
        }
    }

    pub fn approximate(timeout: Duration) -> Self {
        Self {
            enabled: true,
            timeout,
            mode: MetricMode::Approximate,
            skip_reason: None,
        }
    }

    pub fn disabled(reason: &str) -> Self {
        Self {
            enabled: false,
            timeout: Duration::ZERO,
            mode: MetricMode::Skip,
            skip_reason: Some(reason.to_string()),
        }
    }
}

/// Analysis configuration: which metrics run, how, and under which budgets.
///
/// Built by [`AnalysisConfig::for_graph`] as a pure function of node and
/// edge counts, then optionally adjusted by environment overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub pagerank: MetricSettings,
    pub betweenness: MetricSettings,
    pub eigenvector: MetricSettings,
    pub hits: MetricSettings,
    pub critical_path: MetricSettings,
    pub cycles: MetricSettings,
    pub k_core: MetricSettings,
    pub articulation: MetricSettings,
    pub slack: MetricSettings,
    /// Maximum simple cycles stored per analysis.
    pub max_cycles: usize,
    /// Source-sample size for approximate betweenness.
    pub sample_size: usize,
    /// Optional cap on exported map fields (`BW_INSIGHTS_MAP_LIMIT`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_limit: Option<usize>,
}

impl AnalysisConfig {
    /// Pick metric modes and budgets from graph size and density.
    ///
    /// | Regime | n       | Betweenness              | Cycles     | HITS          | Timeout  |
    /// |--------|---------|--------------------------|------------|---------------|----------|
    /// | Small  | < 100   | exact                    | on (≤1000) | on            | 2 s      |
    /// | Medium | < 500   | exact                    | on (≤100)  | on            | 500 ms   |
    /// | Large  | < 2000  | approx if d < 0.01 else skip | on (≤50) | on          | 300 ms   |
    /// | XL     | ≥ 2000  | approx                   | off        | on iff d < 0.001 | 200–500 ms |
    pub fn for_graph(node_count: usize, edge_count: usize) -> Self {
        let n = node_count;
        let density = if n > 1 {
            edge_count as f64 / (n as f64 * (n as f64 - 1.0))
        } else {
            0.0
        };

        if n < 100 {
            Self::uniform(Duration::from_secs(2), 1000, n)
        } else if n < 500 {
            Self::uniform(Duration::from_millis(500), 100, n)
        } else if n < 2000 {
            let mut config = Self::uniform(Duration::from_millis(300), 50, n);
            config.betweenness = if density < 0.01 {
                MetricSettings::approximate(Duration::from_millis(300))
            } else {
                MetricSettings::disabled("graph too dense for sampled betweenness")
            };
            config
        } else {
            let base = Duration::from_millis(200);
            let mut config = Self::uniform(base, 0, n);
            config.pagerank.timeout = Duration::from_millis(500);
            config.betweenness = MetricSettings::approximate(Duration::from_millis(500));
            config.cycles = MetricSettings::disabled("cycle enumeration disabled for XL graphs");
            if density >= 0.001 {
                config.hits = MetricSettings::disabled("graph too dense for HITS at this size");
            }
            config
        }
    }

    fn uniform(timeout: Duration, max_cycles: usize, node_count: usize) -> Self {
        Self {
            pagerank: MetricSettings::enabled(timeout),
            betweenness: MetricSettings::enabled(timeout),
            eigenvector: MetricSettings::enabled(timeout),
            hits: MetricSettings::enabled(timeout),
            critical_path: MetricSettings::enabled(timeout),
            cycles: MetricSettings::enabled(timeout),
            k_core: MetricSettings::enabled(timeout),
            articulation: MetricSettings::enabled(timeout),
            slack: MetricSettings::enabled(timeout),
            max_cycles,
            sample_size: recommend_sample_size(node_count),
            map_limit: None,
        }
    }

    /// Preset for triage scoring: only the metrics the impact scorer and
    /// triage context consume stay enabled.
    pub fn triage_only(node_count: usize, edge_count: usize) -> Self {
        let mut config = Self::for_graph(node_count, edge_count);
        let unused = "not consumed by triage scoring";
        config.eigenvector = MetricSettings::disabled(unused);
        config.hits = MetricSettings::disabled(unused);
        config.k_core = MetricSettings::disabled(unused);
        config.articulation = MetricSettings::disabled(unused);
        config.slack = MetricSettings::disabled(unused);
        config
    }

    /// Preset with no Phase-2 work at all.
    pub fn no_phase2() -> Self {
        let off = "phase 2 disabled";
        Self {
            pagerank: MetricSettings::disabled(off),
            betweenness: MetricSettings::disabled(off),
            eigenvector: MetricSettings::disabled(off),
            hits: MetricSettings::disabled(off),
            critical_path: MetricSettings::disabled(off),
            cycles: MetricSettings::disabled(off),
            k_core: MetricSettings::disabled(off),
            articulation: MetricSettings::disabled(off),
            slack: MetricSettings::disabled(off),
            max_cycles: 0,
            sample_size: 0,
            map_limit: None,
        }
    }

    /// Apply `BW_SKIP_PHASE2`, `BW_PHASE2_TIMEOUT_S`, and
    /// `BW_INSIGHTS_MAP_LIMIT` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(flag) = std::env::var(ENV_SKIP_PHASE2) {
            if is_truthy(&flag) {
                tracing::debug!("{ENV_SKIP_PHASE2} set, disabling all phase-2 metrics");
                *self = Self::no_phase2();
                return;
            }
        }
        if let Ok(raw) = std::env::var(ENV_PHASE2_TIMEOUT_S) {
            if let Ok(seconds) = raw.trim().parse::<u64>() {
                if seconds > 0 {
                    tracing::debug!(seconds, "{ENV_PHASE2_TIMEOUT_S} overrides metric timeouts");
                    let timeout = Duration::from_secs(seconds);
                    for settings in self.all_settings_mut() {
                        if settings.enabled {
                            settings.timeout = timeout;
                        }
                    }
                }
            }
        }
        if let Ok(raw) = std::env::var(ENV_INSIGHTS_MAP_LIMIT) {
            if let Ok(limit) = raw.trim().parse::<usize>() {
                self.map_limit = Some(limit);
            }
        }
    }

    pub fn phase2_enabled(&self) -> bool {
        self.all_settings().iter().any(|s| s.enabled)
    }

    pub fn all_settings(&self) -> [&MetricSettings; 9] {
        [
            &self.pagerank,
            &self.betweenness,
            &self.eigenvector,
            &self.hits,
            &self.critical_path,
            &self.cycles,
            &self.k_core,
            &self.articulation,
            &self.slack,
        ]
    }

    fn all_settings_mut(&mut self) -> [&mut MetricSettings; 9] {
        [
            &mut self.pagerank,
            &mut self.betweenness,
            &mut self.eigenvector,
            &mut self.hits,
            &mut self.critical_path,
            &mut self.cycles,
            &mut self.k_core,
            &mut self.articulation,
            &mut self.slack,
        ]
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::for_graph(0, 0)
    }
}

/// Source-sample size for approximate betweenness on an `n`-node graph.
///
/// Grows with sqrt(n) so sampled Brandes stays near-linear in edges while
/// keeping enough sources for stable centrality estimates.
pub fn recommend_sample_size(node_count: usize) -> usize {
    if node_count == 0 {
        return 0;
    }
    let sqrt = (node_count as f64).sqrt().ceil() as usize;
    (sqrt * 2).clamp(16, 256).min(node_count)
}

/// Truthiness parser shared by every boolean environment flag.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}
