pub mod articulation;
pub mod betweenness;
pub mod critical_path;
pub mod cycles;
pub mod eigenvector;
pub mod hits;
pub mod kcore;
pub mod pagerank;
pub mod slack;

use crate::graph::DependencyGraph;
use crate::stats::{MetricResult, MetricStatus, CYCLE_DETECTION_TIMEOUT};
use beadwork_core::{AnalysisConfig, MetricMode, MetricSettings};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Why a metric computation stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The metric's own deadline expired.
    Deadline,
    /// The parent analysis was cancelled.
    Cancelled,
}

/// Cooperative deadline + cancellation checked at iteration boundaries.
///
/// Metric kernels have no preemption; they call [`MetricControl::check`]
/// between iterations, BFS sources, or DFS steps and unwind on `Err`.
#[derive(Debug, Clone)]
pub struct MetricControl {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl MetricControl {
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel,
        }
    }

    /// No deadline, no cancel source. For callers reusing a kernel outside
    /// the phased analyzer (label subgraphs, tests).
    pub fn unbounded() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn check(&self) -> Result<(), Interrupt> {
        if self.cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Interrupt::Deadline);
            }
        }
        Ok(())
    }
}

/// Identity of a Phase-2 metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    PageRank,
    Betweenness,
    Eigenvector,
    Hits,
    CriticalPath,
    Cycles,
    KCore,
    Articulation,
    Slack,
}

impl MetricKind {
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::PageRank => "pagerank",
            MetricKind::Betweenness => "betweenness",
            MetricKind::Eigenvector => "eigenvector",
            MetricKind::Hits => "hits",
            MetricKind::CriticalPath => "critical_path",
            MetricKind::Cycles => "cycles",
            MetricKind::KCore => "k_core",
            MetricKind::Articulation => "articulation",
            MetricKind::Slack => "slack",
        }
    }
}

/// Runtime binding of one metric: identity plus the settings C4 chose.
///
/// Descriptors are plain data; [`run_metric`] binds each kind to its pure
/// kernel `(graph, mode, control) -> (output, status)`.
#[derive(Debug, Clone)]
pub struct MetricDescriptor {
    pub kind: MetricKind,
    pub enabled: bool,
    pub timeout: Duration,
    pub mode: MetricMode,
    pub skip_reason: Option<String>,
}

impl MetricDescriptor {
    fn from_settings(kind: MetricKind, settings: &MetricSettings) -> Self {
        Self {
            kind,
            enabled: settings.enabled,
            timeout: settings.timeout,
            mode: settings.mode,
            skip_reason: settings.skip_reason.clone(),
        }
    }
}

/// The full descriptor table for a configuration, in canonical order.
pub fn descriptors(config: &AnalysisConfig) -> Vec<MetricDescriptor> {
    vec![
        MetricDescriptor::from_settings(MetricKind::PageRank, &config.pagerank),
        MetricDescriptor::from_settings(MetricKind::Betweenness, &config.betweenness),
        MetricDescriptor::from_settings(MetricKind::Eigenvector, &config.eigenvector),
        MetricDescriptor::from_settings(MetricKind::Hits, &config.hits),
        MetricDescriptor::from_settings(MetricKind::CriticalPath, &config.critical_path),
        MetricDescriptor::from_settings(MetricKind::Cycles, &config.cycles),
        MetricDescriptor::from_settings(MetricKind::KCore, &config.k_core),
        MetricDescriptor::from_settings(MetricKind::Articulation, &config.articulation),
        MetricDescriptor::from_settings(MetricKind::Slack, &config.slack),
    ]
}

/// Output of one metric run, shaped per kind.
#[derive(Debug, Clone)]
pub enum MetricOutput {
    Map(MetricResult),
    Hits {
        hubs: MetricResult,
        authorities: MetricResult,
    },
    Cycles {
        cycles: Vec<Vec<String>>,
        status: MetricStatus,
    },
    Articulation {
        nodes: Vec<String>,
        status: MetricStatus,
    },
}

fn interrupt_status(interrupt: Interrupt, elapsed_ms: u64) -> MetricStatus {
    match interrupt {
        Interrupt::Deadline => MetricStatus::timeout(elapsed_ms),
        Interrupt::Cancelled => MetricStatus::skipped("parent cancelled"),
    }
}

/// Run one metric under its own deadline and the parent cancel token.
///
/// On deadline or cancellation the output is empty with the appropriate
/// status; the error never propagates past this function.
pub fn run_metric(
    graph: &DependencyGraph,
    descriptor: &MetricDescriptor,
    config: &AnalysisConfig,
    cancel: CancellationToken,
) -> MetricOutput {
    let control = MetricControl::new(descriptor.timeout, cancel);
    let started = Instant::now();
    let elapsed = |started: Instant| started.elapsed().as_millis() as u64;

    match descriptor.kind {
        MetricKind::PageRank => to_map_output(pagerank::compute(graph, &control), started),
        MetricKind::Betweenness => to_map_output(
            betweenness::compute(graph, descriptor.mode, config.sample_size, &control),
            started,
        ),
        MetricKind::Eigenvector => to_map_output(eigenvector::compute(graph, &control), started),
        MetricKind::CriticalPath => {
            to_map_output(critical_path::compute(graph, &control), started)
        }
        MetricKind::KCore => to_map_output(kcore::compute(graph, &control), started),
        MetricKind::Slack => to_map_output(slack::compute(graph, &control), started),
        MetricKind::Hits => match hits::compute(graph, &control) {
            Ok((hubs, authorities)) => {
                let ms = elapsed(started);
                MetricOutput::Hits {
                    hubs: MetricResult::computed(hubs, ms),
                    authorities: MetricResult::computed(authorities, ms),
                }
            }
            Err(interrupt) => {
                let status = interrupt_status(interrupt, elapsed(started));
                MetricOutput::Hits {
                    hubs: MetricResult {
                        status: status.clone(),
                        ..Default::default()
                    },
                    authorities: MetricResult {
                        status,
                        ..Default::default()
                    },
                }
            }
        },
        MetricKind::Cycles => {
            let outcome = cycles::compute(graph, config.max_cycles, &control);
            let ms = elapsed(started);
            let (found, status) = match outcome {
                cycles::CycleOutcome::Complete(found) => (found, MetricStatus::computed(ms)),
                cycles::CycleOutcome::Truncated(mut found) => {
                    found.push(vec![CYCLE_DETECTION_TIMEOUT.to_string()]);
                    (
                        found,
                        MetricStatus::computed_with_reason("cycle cap reached", ms),
                    )
                }
                cycles::CycleOutcome::Interrupted(mut found, Interrupt::Deadline) => {
                    found.push(vec![CYCLE_DETECTION_TIMEOUT.to_string()]);
                    (found, MetricStatus::timeout(ms))
                }
                cycles::CycleOutcome::Interrupted(_, Interrupt::Cancelled) => {
                    (Vec::new(), MetricStatus::skipped("parent cancelled"))
                }
            };
            MetricOutput::Cycles {
                cycles: found,
                status,
            }
        }
        MetricKind::Articulation => match articulation::compute(graph, &control) {
            Ok(nodes) => MetricOutput::Articulation {
                nodes,
                status: MetricStatus::computed(elapsed(started)),
            },
            Err(interrupt) => MetricOutput::Articulation {
                nodes: Vec::new(),
                status: interrupt_status(interrupt, elapsed(started)),
            },
        },
    }
}

fn to_map_output(
    outcome: Result<std::collections::BTreeMap<String, f64>, Interrupt>,
    started: Instant,
) -> MetricOutput {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(values) => MetricOutput::Map(MetricResult::computed(values, elapsed_ms)),
        Err(interrupt) => MetricOutput::Map(MetricResult {
            status: interrupt_status(interrupt, elapsed_ms),
            ..Default::default()
        }),
    }
}
