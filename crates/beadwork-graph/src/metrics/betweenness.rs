use super::{Interrupt, MetricControl};
use crate::graph::DependencyGraph;
use beadwork_core::MetricMode;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, VecDeque};

/// Fixed seed for source sampling so approximate runs are reproducible.
const SAMPLE_SEED: u64 = 0xBEAD;

/// Brandes betweenness centrality over directed shortest paths.
///
/// `Exact` accumulates from every source. `Approximate` restricts to a
/// uniformly sampled source subset of `sample_size` nodes and scales the
/// accumulated values by `n / s`. `Skip` never reaches this function.
pub fn compute(
    graph: &DependencyGraph,
    mode: MetricMode,
    sample_size: usize,
    control: &MetricControl,
) -> Result<BTreeMap<String, f64>, Interrupt> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(BTreeMap::new());
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

    let (sources, scale) = match mode {
        MetricMode::Approximate if sample_size > 0 && sample_size < n => {
            let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
            let mut picked: Vec<usize> =
                rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
            picked.sort_unstable();
            let scale = n as f64 / sample_size as f64;
            (picked, scale)
        }
        _ => ((0..n).collect(), 1.0),
    };

    let mut centrality = vec![0.0_f64; n];

    // One Brandes pass per source; the cancel/deadline check sits between
    // sources, which bounds overshoot to a single BFS.
    for &s in &sources {
        control.check()?;

        let mut stack: Vec<usize> = Vec::with_capacity(n);
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut dist = vec![-1_i64; n];
        sigma[s] = 1.0;
        dist[s] = 0;

        let mut queue = VecDeque::new();
        queue.push_back(s);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in &successors[v] {
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0_f64; n];
        while let Some(w) = stack.pop() {
            for &v in &preds[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                centrality[w] += delta[w];
            }
        }
    }

    Ok(indices
        .into_iter()
        .enumerate()
        .map(|(i, idx)| (graph.id_of(idx).to_string(), centrality[i] * scale))
        .collect())
}
