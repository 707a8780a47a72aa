use super::{Interrupt, MetricControl};
use crate::graph::DependencyGraph;
use std::collections::{BTreeMap, BTreeSet};

/// k-core decomposition of the undirected view by standard peeling.
///
/// The peel set is ordered by `(degree, node index)`, which pins the
/// removal order and keeps the decomposition deterministic.
pub fn compute(
    graph: &DependencyGraph,
    control: &MetricControl,
) -> Result<BTreeMap<String, f64>, Interrupt> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(BTreeMap::new());
    }

    let indices: Vec<_> = graph.node_indices().collect();
    let neighbors: Vec<Vec<usize>> = indices
        .iter()
        .map(|&i| {
            graph
                .undirected_neighbors(i)
                .into_iter()
                .map(|x| x.index())
                .collect()
        })
        .collect();

    let mut degree: Vec<usize> = neighbors.iter().map(Vec::len).collect();
    let mut remaining: BTreeSet<(usize, usize)> =
        (0..n).map(|v| (degree[v], v)).collect();
    let mut core = vec![0_usize; n];
    let mut current_core = 0_usize;

    while let Some(&(deg, v)) = remaining.iter().next() {
        control.check()?;
        remaining.remove(&(deg, v));
        current_core = current_core.max(deg);
        core[v] = current_core;
        for &u in &neighbors[v] {
            if remaining.remove(&(degree[u], u)) {
                degree[u] -= 1;
                remaining.insert((degree[u], u));
            }
        }
    }

    Ok(indices
        .into_iter()
        .enumerate()
        .map(|(i, idx)| (graph.id_of(idx).to_string(), core[i] as f64))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beadwork_core::Issue;

    fn issue(id: &str) -> Issue {
        Issue::new(id, id)
    }

    #[test]
    fn star_is_one_core() {
        let graph = DependencyGraph::from_issues(&[
            issue("hub"),
            issue("a").blocked_by("hub"),
            issue("b").blocked_by("hub"),
            issue("c").blocked_by("hub"),
        ]);
        let cores = compute(&graph, &MetricControl::unbounded()).unwrap();
        for value in cores.values() {
            assert_eq!(*value, 1.0);
        }
    }

    #[test]
    fn triangle_is_two_core() {
        let graph = DependencyGraph::from_issues(&[
            issue("a").blocked_by("c"),
            issue("b").blocked_by("a"),
            issue("c").blocked_by("b"),
            issue("tail").blocked_by("a"),
        ]);
        let cores = compute(&graph, &MetricControl::unbounded()).unwrap();
        assert_eq!(cores["a"], 2.0);
        assert_eq!(cores["b"], 2.0);
        assert_eq!(cores["c"], 2.0);
        assert_eq!(cores["tail"], 1.0);
    }

    #[test]
    fn isolated_node_is_zero_core() {
        let graph = DependencyGraph::from_issues(&[issue("a"), issue("lone")]);
        let cores = compute(&graph, &MetricControl::unbounded()).unwrap();
        assert_eq!(cores["lone"], 0.0);
    }
}
