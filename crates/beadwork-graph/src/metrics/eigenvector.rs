use super::pagerank::{MAX_ITERATIONS, TOLERANCE};
use super::{Interrupt, MetricControl};
use crate::graph::DependencyGraph;
use std::collections::BTreeMap;

/// Eigenvector centrality by power iteration on the in-edge adjacency.
///
/// Shares the PageRank tolerance and iteration cap. A graph whose
/// iteration collapses to the zero vector (no edges) reports all zeros.
pub fn compute(
    graph: &DependencyGraph,
    control: &MetricControl,
) -> Result<BTreeMap<String, f64>, Interrupt> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(BTreeMap::new());
    }

    let indices: Vec<_> = graph.node_indices().collect();
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

    let mut score = vec![1.0 / n as f64; n];
    for _ in 0..MAX_ITERATIONS {
        control.check()?;

        let mut next = vec![0.0; n];
        for v in 0..n {
            for &u in &predecessors[v] {
                next[v] += score[u];
            }
        }

        let norm = next.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm == 0.0 {
            return Ok(zeroed(graph, &indices));
        }
        for value in &mut next {
            *value /= norm;
        }

        let delta: f64 = (0..n).map(|i| (next[i] - score[i]).abs()).sum();
        score = next;
        if delta < TOLERANCE {
            break;
        }
    }

    Ok(indices
        .into_iter()
        .enumerate()
        .map(|(i, idx)| (graph.id_of(idx).to_string(), score[i]))
        .collect())
}

fn zeroed(
    graph: &DependencyGraph,
    indices: &[petgraph::graph::NodeIndex],
) -> BTreeMap<String, f64> {
    indices
        .iter()
        .map(|&idx| (graph.id_of(idx).to_string(), 0.0))
        .collect()
}
