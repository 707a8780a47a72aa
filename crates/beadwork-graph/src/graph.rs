use beadwork_core::{dedupe_issues, DependencyType, Issue};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};

/// Directed dependency graph over issue ids.
///
/// Edge direction is `blocker -> blocked`: `u -> v` means issue `v` declares
/// a `blocks` dependency on `u`. Nodes are allocated in sorted-id order so
/// ascending `NodeIndex` is ascending id, which every deterministic
/// tie-break in the metric kernels relies on.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_of: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build from an issue set in a single pass.
    ///
    /// Duplicate issue ids collapse last-write-wins, self-edges are
    /// rejected, and dependencies on absent ids are silently dropped.
    /// Parallel edges collapse to one.
    pub fn from_issues(issues: &[Issue]) -> Self {
        let deduped = dedupe_issues(issues);

        let mut ids: Vec<&str> = deduped.iter().map(|i| i.id.as_str()).collect();
        ids.sort_unstable();

        let mut graph = DiGraph::with_capacity(ids.len(), deduped.len());
        let mut node_of: HashMap<String, NodeIndex> = HashMap::with_capacity(ids.len());
        for id in &ids {
            let idx = graph.add_node((*id).to_string());
            node_of.insert((*id).to_string(), idx);
        }

        let mut edges: BTreeSet<(NodeIndex, NodeIndex)> = BTreeSet::new();
        for issue in &deduped {
            let blocked = node_of[issue.id.as_str()];
            for dep in &issue.dependencies {
                if dep.dep_type != DependencyType::Blocks || dep.target == issue.id {
                    continue;
                }
                if let Some(&blocker) = node_of.get(dep.target.as_str()) {
                    edges.insert((blocker, blocked));
                }
            }
        }
        for (from, to) in edges {
            graph.add_edge(from, to, ());
        }

        Self { graph, node_of }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// `E / (N * (N - 1))`, zero when fewer than two nodes.
    pub fn density(&self) -> f64 {
        let n = self.node_count();
        if n > 1 {
            self.edge_count() as f64 / (n as f64 * (n as f64 - 1.0))
        } else {
            0.0
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_of.contains_key(id)
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.node_of.get(id).copied()
    }

    /// Panics if the index did not come from this graph.
    pub fn id_of(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    /// All node indices in ascending (= id-sorted) order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    /// All ids in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        self.graph.node_weights().map(String::as_str).collect()
    }

    /// Nodes this node blocks, ascending.
    pub fn blocked_by_node(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        out.sort_unstable();
        out
    }

    /// Nodes blocking this node, ascending.
    pub fn blockers_of_node(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .collect();
        out.sort_unstable();
        out
    }

    /// Undirected neighborhood, ascending, deduplicated.
    pub fn undirected_neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .chain(self.graph.neighbors_directed(idx, Direction::Incoming))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn out_degree(&self, idx: NodeIndex) -> usize {
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .count()
    }

    pub fn in_degree(&self, idx: NodeIndex) -> usize {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .count()
    }

    pub fn inner(&self) -> &DiGraph<String, ()> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beadwork_core::{Dependency, DependencyType};

    fn issue(id: &str) -> Issue {
        Issue::new(id, id.to_uppercase())
    }

    #[test]
    fn builds_blocks_edges_only() {
        let issues = vec![
            issue("a"),
            issue("b")
                .blocked_by("a")
                .with_dependency(Dependency::new("a", DependencyType::Related)),
            issue("c").with_dependency(Dependency::new("a", DependencyType::ParentChild)),
        ];
        let graph = DependencyGraph::from_issues(&issues);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 1);

        let a = graph.index_of("a").unwrap();
        let b = graph.index_of("b").unwrap();
        assert_eq!(graph.blocked_by_node(a), vec![b]);
    }

    #[test]
    fn rejects_self_edges_and_dangling_targets() {
        let issues = vec![issue("a").blocked_by("a").blocked_by("missing")];
        let graph = DependencyGraph::from_issues(&issues);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn collapses_parallel_edges() {
        let issues = vec![issue("a"), issue("b").blocked_by("a").blocked_by("a")];
        let graph = DependencyGraph::from_issues(&issues);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn node_index_order_is_id_order() {
        let issues = vec![issue("zeta"), issue("alpha"), issue("mid")];
        let graph = DependencyGraph::from_issues(&issues);
        assert_eq!(graph.ids(), vec!["alpha", "mid", "zeta"]);
        let indices: Vec<_> = graph.node_indices().collect();
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn duplicate_ids_last_write_wins() {
        let mut second = issue("a");
        second.title = "rewritten".into();
        let issues = vec![issue("a"), second];
        let graph = DependencyGraph::from_issues(&issues);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn density_empty_and_pair() {
        assert_eq!(DependencyGraph::from_issues(&[]).density(), 0.0);
        let pair = DependencyGraph::from_issues(&[issue("a"), issue("b").blocked_by("a")]);
        assert!((pair.density() - 0.5).abs() < 1e-12);
    }
}
