use super::{Interrupt, MetricControl};
use crate::graph::DependencyGraph;
use petgraph::algo::tarjan_scc;
use std::collections::HashSet;

/// How cycle enumeration ended. Partial results are kept in every case so
/// downstream consumers (cycle-break suggestions, warnings) still see what
/// was found before the cut-off.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Complete(Vec<Vec<String>>),
    /// The configured cycle cap was reached.
    Truncated(Vec<Vec<String>>),
    Interrupted(Vec<Vec<String>>, Interrupt),
}

/// Enumerate up to `max_cycles` simple cycles.
///
/// Tarjan condenses the graph first; only non-trivial SCCs are searched.
/// Within an SCC, cycles are rooted at their minimum node index so each
/// simple cycle is produced exactly once and already in canonical
/// rotation (smallest id first).
pub fn compute(
    graph: &DependencyGraph,
    max_cycles: usize,
    control: &MetricControl,
) -> CycleOutcome {
    let mut components: Vec<Vec<petgraph::graph::NodeIndex>> = tarjan_scc(graph.inner())
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .collect();
    for scc in &mut components {
        scc.sort_unstable();
    }
    components.sort_by_key(|scc| scc[0]);

    let mut cycles: Vec<Vec<String>> = Vec::new();

    for scc in &components {
        let members: HashSet<usize> = scc.iter().map(|idx| idx.index()).collect();

        for &root in scc {
            if let Err(interrupt) = control.check() {
                return CycleOutcome::Interrupted(cycles, interrupt);
            }
            // DFS from `root`, restricted to member nodes with a larger
            // index; an edge back to `root` closes a cycle.
            let mut path: Vec<usize> = vec![root.index()];
            let mut on_path: HashSet<usize> = HashSet::from([root.index()]);
            let mut pending: Vec<Vec<usize>> = vec![sorted_successors(graph, root.index())];

            while let Some(frontier) = pending.last_mut() {
                if let Err(interrupt) = control.check() {
                    return CycleOutcome::Interrupted(cycles, interrupt);
                }
                let Some(next) = frontier.pop() else {
                    pending.pop();
                    let done = path.pop();
                    if let Some(v) = done {
                        on_path.remove(&v);
                    }
                    continue;
                };

                if next == root.index() {
                    cycles.push(
                        path.iter()
                            .map(|&i| {
                                graph
                                    .id_of(petgraph::graph::NodeIndex::new(i))
                                    .to_string()
                            })
                            .collect(),
                    );
                    if cycles.len() >= max_cycles {
                        return CycleOutcome::Truncated(cycles);
                    }
                    continue;
                }
                if next <= root.index() || !members.contains(&next) || on_path.contains(&next) {
                    continue;
                }

                path.push(next);
                on_path.insert(next);
                pending.push(sorted_successors(graph, next));
            }
        }
    }

    CycleOutcome::Complete(cycles)
}

/// Successors in descending order so the Vec-as-stack pops ascending.
fn sorted_successors(graph: &DependencyGraph, node: usize) -> Vec<usize> {
    let mut succ: Vec<usize> = graph
        .blocked_by_node(petgraph::graph::NodeIndex::new(node))
        .into_iter()
        .map(|idx| idx.index())
        .collect();
    succ.sort_unstable_by(|a, b| b.cmp(a));
    succ
}

#[cfg(test)]
mod tests {
    use super::*;
    use beadwork_core::Issue;

    fn issue(id: &str) -> Issue {
        Issue::new(id, id)
    }

    fn triangle() -> DependencyGraph {
        DependencyGraph::from_issues(&[
            issue("a").blocked_by("c"),
            issue("b").blocked_by("a"),
            issue("c").blocked_by("b"),
        ])
    }

    #[test]
    fn dag_has_no_cycles() {
        let graph = DependencyGraph::from_issues(&[issue("a"), issue("b").blocked_by("a")]);
        match compute(&graph, 100, &MetricControl::unbounded()) {
            CycleOutcome::Complete(cycles) => assert!(cycles.is_empty()),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn triangle_yields_one_canonical_cycle() {
        match compute(&triangle(), 100, &MetricControl::unbounded()) {
            CycleOutcome::Complete(cycles) => {
                assert_eq!(cycles, vec![vec!["a", "b", "c"]]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn two_node_cycle_found() {
        let graph = DependencyGraph::from_issues(&[
            issue("x").blocked_by("y"),
            issue("y").blocked_by("x"),
        ]);
        match compute(&graph, 100, &MetricControl::unbounded()) {
            CycleOutcome::Complete(cycles) => assert_eq!(cycles, vec![vec!["x", "y"]]),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn cap_truncates() {
        // Two overlapping cycles: a<->b and a->b->c->a.
        let graph = DependencyGraph::from_issues(&[
            issue("a").blocked_by("b").blocked_by("c"),
            issue("b").blocked_by("a"),
            issue("c").blocked_by("b"),
        ]);
        match compute(&graph, 1, &MetricControl::unbounded()) {
            CycleOutcome::Truncated(cycles) => assert_eq!(cycles.len(), 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn overlapping_cycles_all_enumerated() {
        let graph = DependencyGraph::from_issues(&[
            issue("a").blocked_by("b").blocked_by("c"),
            issue("b").blocked_by("a"),
            issue("c").blocked_by("b"),
        ]);
        match compute(&graph, 100, &MetricControl::unbounded()) {
            CycleOutcome::Complete(cycles) => {
                assert_eq!(cycles.len(), 2);
                assert!(cycles.contains(&vec!["a".to_string(), "b".to_string()]));
                assert!(cycles.contains(&vec![
                    "a".to_string(),
                    "b".to_string(),
                    "c".to_string()
                ]));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
