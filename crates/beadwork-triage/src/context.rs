use beadwork_core::{dedupe_issues, Issue};
use beadwork_graph::DependencyGraph;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Blocker depth reported when the chain enters a cycle.
pub const DEPTH_CYCLE: i64 = -1;

/// Issue lookup plus the lazily computed triage queries.
///
/// All derived maps are memoized on first access; the issue set and graph
/// are immutable for the context's lifetime.
#[derive(Debug, Default)]
struct TriageState {
    actionable: Option<BTreeSet<String>>,
    open_blockers: HashMap<String, Vec<String>>,
    depths: HashMap<String, i64>,
    unblocks: Option<BTreeMap<String, Vec<String>>>,
}

fn issue_map(issues: &[Issue]) -> BTreeMap<String, Issue> {
    dedupe_issues(issues)
        .into_iter()
        .map(|i| (i.id.clone(), i))
        .collect()
}

fn open_blockers_of(
    issues: &BTreeMap<String, Issue>,
    graph: &DependencyGraph,
    state: &mut TriageState,
    id: &str,
) -> Vec<String> {
    if let Some(cached) = state.open_blockers.get(id) {
        return cached.clone();
    }
    let blockers = match graph.index_of(id) {
        Some(idx) => graph
            .blockers_of_node(idx)
            .into_iter()
            .map(|b| graph.id_of(b).to_string())
            .filter(|b| issues.get(b).is_some_and(|i| !i.is_closed_like()))
            .collect(),
        None => Vec::new(),
    };
    state.open_blockers.insert(id.to_string(), blockers.clone());
    blockers
}

fn compute_actionable(
    issues: &BTreeMap<String, Issue>,
    graph: &DependencyGraph,
    state: &mut TriageState,
) -> BTreeSet<String> {
    if let Some(cached) = &state.actionable {
        return cached.clone();
    }
    let actionable: BTreeSet<String> = issues
        .values()
        .filter(|issue| !issue.is_closed_like())
        .filter(|issue| open_blockers_of(issues, graph, state, &issue.id).is_empty())
        .map(|issue| issue.id.clone())
        .collect();
    state.actionable = Some(actionable.clone());
    actionable
}

/// Longest open-`blocks` chain ending at `id`; [`DEPTH_CYCLE`] when the
/// chain reaches back into itself.
fn depth_of(
    issues: &BTreeMap<String, Issue>,
    graph: &DependencyGraph,
    state: &mut TriageState,
    visiting: &mut HashSet<String>,
    id: &str,
) -> i64 {
    if let Some(&cached) = state.depths.get(id) {
        return cached;
    }
    visiting.insert(id.to_string());

    let mut depth = 0_i64;
    for blocker in open_blockers_of(issues, graph, state, id) {
        if visiting.contains(&blocker) {
            depth = DEPTH_CYCLE;
            break;
        }
        let below = depth_of(issues, graph, state, visiting, &blocker);
        if below == DEPTH_CYCLE {
            depth = DEPTH_CYCLE;
            break;
        }
        depth = depth.max(below + 1);
    }

    visiting.remove(id);
    state.depths.insert(id.to_string(), depth);
    depth
}

fn compute_unblocks(
    issues: &BTreeMap<String, Issue>,
    graph: &DependencyGraph,
    state: &mut TriageState,
) -> BTreeMap<String, Vec<String>> {
    if let Some(cached) = &state.unblocks {
        return cached.clone();
    }
    let mut unblocks: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for issue in issues.values() {
        if issue.is_closed_like() {
            continue;
        }
        let blockers = open_blockers_of(issues, graph, state, &issue.id);
        if let [sole] = blockers.as_slice() {
            unblocks
                .entry(sole.clone())
                .or_default()
                .push(issue.id.clone());
        }
    }
    for targets in unblocks.values_mut() {
        targets.sort_unstable();
    }
    state.unblocks = Some(unblocks.clone());
    unblocks
}

/// Single-threaded triage context: memoized queries behind a `RefCell`,
/// no locking.
pub struct TriageContext {
    issues: BTreeMap<String, Issue>,
    graph: DependencyGraph,
    state: RefCell<TriageState>,
}

impl TriageContext {
    pub fn new(issues: &[Issue]) -> Self {
        let graph = DependencyGraph::from_issues(issues);
        Self {
            issues: issue_map(issues),
            graph,
            state: RefCell::new(TriageState::default()),
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.issues.get(id)
    }

    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.issues.values()
    }

    /// Non-closed issues with no open `blocks` blocker, sorted by id.
    pub fn actionable_issues(&self) -> Vec<String> {
        let mut state = self.state.borrow_mut();
        compute_actionable(&self.issues, &self.graph, &mut state)
            .into_iter()
            .collect()
    }

    pub fn is_actionable(&self, id: &str) -> bool {
        let mut state = self.state.borrow_mut();
        compute_actionable(&self.issues, &self.graph, &mut state).contains(id)
    }

    pub fn open_blockers(&self, id: &str) -> Vec<String> {
        let mut state = self.state.borrow_mut();
        open_blockers_of(&self.issues, &self.graph, &mut state, id)
    }

    pub fn blocker_depth(&self, id: &str) -> i64 {
        let mut state = self.state.borrow_mut();
        depth_of(
            &self.issues,
            &self.graph,
            &mut state,
            &mut HashSet::new(),
            id,
        )
    }

    pub fn all_blocker_depths(&self) -> BTreeMap<String, i64> {
        let mut state = self.state.borrow_mut();
        let ids: Vec<String> = self.issues.keys().cloned().collect();
        ids.into_iter()
            .map(|id| {
                let depth = depth_of(
                    &self.issues,
                    &self.graph,
                    &mut state,
                    &mut HashSet::new(),
                    &id,
                );
                (id, depth)
            })
            .collect()
    }

    /// `A -> [B..]` where A is the sole remaining open blocker of each B.
    pub fn unblocks_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut state = self.state.borrow_mut();
        compute_unblocks(&self.issues, &self.graph, &mut state)
    }
}

/// Thread-safe variant: one mutex guards every memo field. The recursive
/// depth computation takes the lock once at the top and stays lock-held,
/// which keeps it re-entrancy free.
pub struct SharedTriageContext {
    issues: BTreeMap<String, Issue>,
    graph: DependencyGraph,
    state: Mutex<TriageState>,
}

impl SharedTriageContext {
    pub fn new(issues: &[Issue]) -> Self {
        let graph = DependencyGraph::from_issues(issues);
        Self {
            issues: issue_map(issues),
            graph,
            state: Mutex::new(TriageState::default()),
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.issues.get(id)
    }

    pub fn actionable_issues(&self) -> Vec<String> {
        let mut state = self.state.lock();
        compute_actionable(&self.issues, &self.graph, &mut state)
            .into_iter()
            .collect()
    }

    pub fn is_actionable(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        compute_actionable(&self.issues, &self.graph, &mut state).contains(id)
    }

    pub fn open_blockers(&self, id: &str) -> Vec<String> {
        let mut state = self.state.lock();
        open_blockers_of(&self.issues, &self.graph, &mut state, id)
    }

    pub fn blocker_depth(&self, id: &str) -> i64 {
        let mut state = self.state.lock();
        depth_of(
            &self.issues,
            &self.graph,
            &mut state,
            &mut HashSet::new(),
            id,
        )
    }

    pub fn all_blocker_depths(&self) -> BTreeMap<String, i64> {
        let mut state = self.state.lock();
        let ids: Vec<String> = self.issues.keys().cloned().collect();
        ids.into_iter()
            .map(|id| {
                let depth = depth_of(
                    &self.issues,
                    &self.graph,
                    &mut state,
                    &mut HashSet::new(),
                    &id,
                );
                (id, depth)
            })
            .collect()
    }

    pub fn unblocks_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut state = self.state.lock();
        compute_unblocks(&self.issues, &self.graph, &mut state)
    }
}
