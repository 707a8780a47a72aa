use crate::status::FeatureStatus;
use beadwork_core::{DependencyType, Issue};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPath {
    /// Node ids from source to endpoint.
    pub path: Vec<String>,
    /// Number of nodes in the (possibly truncated) path.
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KPathsResult {
    pub paths: Vec<CriticalPath>,
    /// Set when the open subgraph failed to sort; `paths` is then empty.
    pub has_cycle: bool,
    pub status: FeatureStatus,
}

/// K longest dependency chains over the open issues.
///
/// The open subgraph is reindexed by sorted id, Kahn-sorted with a
/// min-heap, and walked with a longest-path DP whose predecessor
/// tie-break is the smaller index. Endpoints are ranked length-desc then
/// id-asc, reconstructed, deduplicated by source id, and truncated to the
/// per-path cap.
pub fn k_longest_paths(issues: &[Issue], k: usize, path_length_cap: usize) -> KPathsResult {
    // Reindex: open issues only, ascending id.
    let open: BTreeMap<&str, &Issue> = issues
        .iter()
        .filter(|i| !i.is_closed_like())
        .map(|i| (i.id.as_str(), i))
        .collect();
    let ids: Vec<&str> = open.keys().copied().collect();
    let index_of: BTreeMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let n = ids.len();

    let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    let mut predecessors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    for issue in open.values() {
        let to = index_of[issue.id.as_str()];
        for dep in issue.dependencies.iter() {
            if dep.dep_type != DependencyType::Blocks || dep.target == issue.id {
                continue;
            }
            if let Some(&from) = index_of.get(dep.target.as_str()) {
                successors[from].insert(to);
                predecessors[to].insert(from);
            }
        }
    }

    // Kahn with a min-heap; a leftover node means a cycle.
    let mut indegree: Vec<usize> = predecessors.iter().map(BTreeSet::len).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
        .filter(|&v| indegree[v] == 0)
        .map(Reverse)
        .collect();
    let mut topo: Vec<usize> = Vec::with_capacity(n);
    while let Some(Reverse(v)) = ready.pop() {
        topo.push(v);
        for &w in &successors[v] {
            indegree[w] -= 1;
            if indegree[w] == 0 {
                ready.push(Reverse(w));
            }
        }
    }
    if topo.len() != n {
        return KPathsResult {
            paths: Vec::new(),
            has_cycle: true,
            status: FeatureStatus::empty("open subgraph contains a cycle"),
        };
    }

    // Longest-path DP; ascending predecessor scan with strict improvement
    // keeps the smallest predecessor on ties.
    let mut dist = vec![0_usize; n];
    let mut pred: Vec<Option<usize>> = vec![None; n];
    for &v in &topo {
        for &u in &predecessors[v] {
            if dist[u] + 1 > dist[v] {
                dist[v] = dist[u] + 1;
                pred[v] = Some(u);
            }
        }
    }

    // Endpoints by length desc, id asc.
    let mut endpoints: Vec<usize> = (0..n).collect();
    endpoints.sort_by(|&a, &b| dist[b].cmp(&dist[a]).then_with(|| ids[a].cmp(ids[b])));

    let mut seen_sources: HashSet<usize> = HashSet::new();
    let mut paths: Vec<CriticalPath> = Vec::new();
    let mut considered = 0_usize;
    for &endpoint in &endpoints {
        if dist[endpoint] == 0 {
            break; // remaining endpoints are isolated or pure sources
        }
        let mut chain = vec![endpoint];
        let mut cursor = endpoint;
        while let Some(previous) = pred[cursor] {
            chain.push(previous);
            cursor = previous;
        }
        chain.reverse();

        let source = chain[0];
        if !seen_sources.insert(source) {
            continue;
        }
        considered += 1;
        if paths.len() >= k {
            continue; // keep counting for the pre-cap size
        }

        chain.truncate(path_length_cap);
        paths.push(CriticalPath {
            length: chain.len(),
            path: chain.into_iter().map(|i| ids[i].to_string()).collect(),
        });
    }

    let status = FeatureStatus::sized(paths.len(), considered);
    KPathsResult {
        paths,
        has_cycle: false,
        status,
    }
}
