use super::{Interrupt, MetricControl};
use crate::graph::DependencyGraph;

/// Articulation points of the undirected view via iterative low-link DFS.
///
/// Returned ids are sorted ascending; the serialized form is always a
/// sorted list.
pub fn compute(
    graph: &DependencyGraph,
    control: &MetricControl,
) -> Result<Vec<String>, Interrupt> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(Vec::new());
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

    let mut disc = vec![usize::MAX; n];
    let mut low = vec![usize::MAX; n];
    let mut parent: Vec<Option<usize>> = vec![None; n];
    let mut is_articulation = vec![false; n];
    let mut timer = 0_usize;

    for root in 0..n {
        if disc[root] != usize::MAX {
            continue;
        }
        control.check()?;

        // Frame: (node, index of next neighbor to visit).
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        disc[root] = timer;
        low[root] = timer;
        timer += 1;
        let mut root_children = 0_usize;

        while let Some(frame) = stack.last_mut() {
            let v = frame.0;
            if frame.1 < neighbors[v].len() {
                let u = neighbors[v][frame.1];
                frame.1 += 1;

                if disc[u] == usize::MAX {
                    parent[u] = Some(v);
                    if v == root {
                        root_children += 1;
                    }
                    disc[u] = timer;
                    low[u] = timer;
                    timer += 1;
                    stack.push((u, 0));
                } else if parent[v] != Some(u) {
                    low[v] = low[v].min(disc[u]);
                }
            } else {
                stack.pop();
                if let Some(&(p, _)) = stack.last() {
                    low[p] = low[p].min(low[v]);
                    if p != root && low[v] >= disc[p] {
                        is_articulation[p] = true;
                    }
                }
            }
        }

        if root_children >= 2 {
            is_articulation[root] = true;
        }
    }

    let mut out: Vec<String> = indices
        .iter()
        .enumerate()
        .filter(|(i, _)| is_articulation[*i])
        .map(|(_, &idx)| graph.id_of(idx).to_string())
        .collect();
    out.sort_unstable();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beadwork_core::Issue;

    fn issue(id: &str) -> Issue {
        Issue::new(id, id)
    }

    #[test]
    fn chain_interior_nodes_are_articulation() {
        let graph = DependencyGraph::from_issues(&[
            issue("a"),
            issue("b").blocked_by("a"),
            issue("c").blocked_by("b"),
        ]);
        let points = compute(&graph, &MetricControl::unbounded()).unwrap();
        assert_eq!(points, vec!["b"]);
    }

    #[test]
    fn cycle_has_no_articulation_points() {
        let graph = DependencyGraph::from_issues(&[
            issue("a").blocked_by("c"),
            issue("b").blocked_by("a"),
            issue("c").blocked_by("b"),
        ]);
        let points = compute(&graph, &MetricControl::unbounded()).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn bridge_node_between_components() {
        // Two triangles joined at m.
        let graph = DependencyGraph::from_issues(&[
            issue("a").blocked_by("b"),
            issue("b").blocked_by("m"),
            issue("m").blocked_by("a"),
            issue("x").blocked_by("m"),
            issue("y").blocked_by("x"),
            issue("m2").blocked_by("y"),
        ]);
        // m connects the left triangle to the x-y-m2 tail.
        let points = compute(&graph, &MetricControl::unbounded()).unwrap();
        assert!(points.contains(&"m".to_string()));
    }

    #[test]
    fn star_hub_is_articulation() {
        let graph = DependencyGraph::from_issues(&[
            issue("hub"),
            issue("a").blocked_by("hub"),
            issue("b").blocked_by("hub"),
        ]);
        let points = compute(&graph, &MetricControl::unbounded()).unwrap();
        assert_eq!(points, vec!["hub"]);
    }
}
