use super::pagerank::{MAX_ITERATIONS, TOLERANCE};
use super::{Interrupt, MetricControl};
use crate::graph::DependencyGraph;
use std::collections::BTreeMap;

/// HITS mutual hub/authority iteration.
///
/// Authorities gather from in-edges, hubs from out-edges; both vectors are
/// L2-normalized each sweep. Returns `(hubs, authorities)` under a shared
/// status.
pub fn compute(
    graph: &DependencyGraph,
    control: &MetricControl,
) -> Result<(BTreeMap<String, f64>, BTreeMap<String, f64>), Interrupt> {
    let n = graph.node_count();
    if n == 0 {
        return Ok((BTreeMap::new(), BTreeMap::new()));
    }

    let indices: Vec<_> = graph.node_indices().collect();
    let successors: Vec<Vec<usize>> = indices
        .iter()
        .map(|&i| {
            graph
                .blocked_by_node(i)
                .into_iter()
                .map(|s| s.index())
                .collect()
        })
        .collect();
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

    let mut hub = vec![1.0; n];
    let mut auth = vec![1.0; n];

    for _ in 0..MAX_ITERATIONS {
        control.check()?;

        let mut next_auth = vec![0.0; n];
        for v in 0..n {
            for &u in &predecessors[v] {
                next_auth[v] += hub[u];
            }
        }
        normalize(&mut next_auth);

        let mut next_hub = vec![0.0; n];
        for v in 0..n {
            for &w in &successors[v] {
                next_hub[v] += next_auth[w];
            }
        }
        normalize(&mut next_hub);

        let delta: f64 = (0..n)
            .map(|i| (next_auth[i] - auth[i]).abs() + (next_hub[i] - hub[i]).abs())
            .sum();
        auth = next_auth;
        hub = next_hub;
        if delta < TOLERANCE {
            break;
        }
    }

    let hubs = indices
        .iter()
        .enumerate()
        .map(|(i, &idx)| (graph.id_of(idx).to_string(), hub[i]))
        .collect();
    let authorities = indices
        .iter()
        .enumerate()
        .map(|(i, &idx)| (graph.id_of(idx).to_string(), auth[i]))
        .collect();
    Ok((hubs, authorities))
}

fn normalize(values: &mut [f64]) {
    let norm = values.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for value in values.iter_mut() {
            *value /= norm;
        }
    }
}
