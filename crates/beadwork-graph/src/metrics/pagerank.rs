use super::{Interrupt, MetricControl};
use crate::graph::DependencyGraph;
use std::collections::BTreeMap;

pub const DAMPING: f64 = 0.85;
pub const TOLERANCE: f64 = 1e-6;
pub const MAX_ITERATIONS: usize = 100;

/// Standard damped PageRank over the blocks-graph.
///
/// Iteration order is ascending node index, so the floating-point
/// accumulation is identical run to run. Dangling mass is redistributed
/// uniformly each sweep.
pub fn compute(
    graph: &DependencyGraph,
    control: &MetricControl,
) -> Result<BTreeMap<String, f64>, Interrupt> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(BTreeMap::new());
    }
    let nf = n as f64;

    let indices: Vec<_> = graph.node_indices().collect();
    let out_degree: Vec<f64> = indices.iter().map(|&i| graph.out_degree(i) as f64).collect();
    let predecessors: Vec<Vec<usize>> = indices
        .iter()
        .map(|&i| {
            graph
                .blockers_of_node(i)
                .into_iter()
                .map(|p| p.index())
                .collect()
        })
        .collect();

    let mut rank = vec![1.0 / nf; n];
    for _ in 0..MAX_ITERATIONS {
        control.check()?;

        let dangling: f64 = (0..n)
            .filter(|&i| out_degree[i] == 0.0)
            .map(|i| rank[i])
            .sum();
        let base = (1.0 - DAMPING) / nf + DAMPING * dangling / nf;

        let mut next = vec![0.0; n];
        for v in 0..n {
            let mut incoming = 0.0;
            for &u in &predecessors[v] {
                incoming += rank[u] / out_degree[u];
            }
            next[v] = base + DAMPING * incoming;
        }

        let delta: f64 = (0..n).map(|i| (next[i] - rank[i]).abs()).sum();
        rank = next;
        if delta < TOLERANCE {
            break;
        }
    }

    Ok(indices
        .into_iter()
        .enumerate()
        .map(|(i, idx)| (graph.id_of(idx).to_string(), rank[i]))
        .collect())
}
