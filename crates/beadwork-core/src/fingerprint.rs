use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::types::{dedupe_issues, Comment, Dependency, DependencyType, Issue};
use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

/// All fingerprints are the first 16 hex chars of a SHA-256 digest.
pub const HASH_PREFIX_LEN: usize = 16;

/// Separator written between canonicalized issues (ASCII record separator).
const ISSUE_SEPARATOR: u8 = 0x1E;
/// Terminator written after every canonicalized field.
const FIELD_TERMINATOR: u8 = 0x00;

fn finish(hasher: Sha256) -> String {
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(HASH_PREFIX_LEN);
    for byte in digest.iter().take(HASH_PREFIX_LEN / 2) {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

fn write_field(hasher: &mut Sha256, value: &str) {
    hasher.update(value.as_bytes());
    hasher.update([FIELD_TERMINATOR]);
}

fn write_opt(hasher: &mut Sha256, value: Option<&str>) {
    write_field(hasher, value.unwrap_or(""));
}

fn write_time(hasher: &mut Sha256, value: &DateTime<Utc>) {
    write_field(hasher, &value.to_rfc3339_opts(SecondsFormat::Nanos, true));
}

fn write_opt_time(hasher: &mut Sha256, value: Option<&DateTime<Utc>>) {
    match value {
        Some(t) => write_time(hasher, t),
        None => write_field(hasher, ""),
    }
}

fn sorted_labels(issue: &Issue) -> Vec<&str> {
    let mut labels: Vec<&str> = issue.labels.iter().map(String::as_str).collect();
    labels.sort_unstable();
    labels
}

fn sorted_deps(issue: &Issue) -> Vec<&Dependency> {
    let mut deps: Vec<&Dependency> = issue.dependencies.iter().collect();
    deps.sort_by(|a, b| {
        a.target
            .cmp(&b.target)
            .then_with(|| a.dep_type.cmp(&b.dep_type))
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.created_by.cmp(&b.created_by))
    });
    deps
}

fn sorted_comments(issue: &Issue) -> Vec<&Comment> {
    let mut comments: Vec<&Comment> = issue.comments.iter().collect();
    comments.sort_by(|a, b| {
        a.id.cmp(&b.id)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.author.cmp(&b.author))
            .then_with(|| a.text.cmp(&b.text))
    });
    comments
}

fn write_content_fields(hasher: &mut Sha256, issue: &Issue) {
    write_field(hasher, &issue.id);
    write_field(hasher, &issue.title);
    write_field(hasher, &issue.description);
    write_field(hasher, &issue.design);
    write_field(hasher, &issue.acceptance_criteria);
    write_field(hasher, &issue.notes);
    write_field(hasher, &issue.assignee);
    write_field(hasher, &issue.source_repo);
    write_opt(hasher, issue.external_ref.as_deref());
    write_field(hasher, &issue.status.to_string());
    write_field(hasher, &issue.issue_type.to_string());
    write_field(hasher, &issue.priority.to_string());
    write_opt(
        hasher,
        issue.estimated_minutes.map(|m| m.to_string()).as_deref(),
    );
    write_time(hasher, &issue.created_at);
    write_time(hasher, &issue.updated_at);
    write_opt_time(hasher, issue.closed_at.as_ref());
    for label in sorted_labels(issue) {
        write_field(hasher, label);
    }
    for comment in sorted_comments(issue) {
        write_field(hasher, &comment.id.to_string());
        write_time(hasher, &comment.created_at);
        write_field(hasher, &comment.author);
        write_field(hasher, &comment.text);
    }
}

fn write_dep_fields(hasher: &mut Sha256, issue: &Issue) {
    for dep in sorted_deps(issue) {
        write_field(hasher, &dep.target);
        write_field(hasher, &dep.dep_type.to_string());
        write_time(hasher, &dep.created_at);
        write_field(hasher, &dep.created_by);
    }
}

/// Fingerprint of the whole issue set: content plus dependencies plus
/// comments, canonically ordered.
///
/// Invariant under permutation of the input and of each issue's labels,
/// dependencies, and comments. Label case is significant.
pub fn compute_data_hash(issues: &[Issue]) -> String {
    let mut deduped = dedupe_issues(issues);
    deduped.sort_by(|a, b| a.id.cmp(&b.id));

    let mut hasher = Sha256::new();
    for issue in &deduped {
        write_content_fields(&mut hasher, issue);
        write_dep_fields(&mut hasher, issue);
        hasher.update([ISSUE_SEPARATOR]);
    }
    finish(hasher)
}

/// Fingerprint of one issue's content, dependencies excluded.
pub fn issue_content_hash(issue: &Issue) -> String {
    let mut hasher = Sha256::new();
    write_content_fields(&mut hasher, issue);
    finish(hasher)
}

/// Fingerprint of one issue's dependency list only.
pub fn issue_dependency_hash(issue: &Issue) -> String {
    let mut hasher = Sha256::new();
    write_dep_fields(&mut hasher, issue);
    finish(hasher)
}

/// Fingerprint of the analysis configuration.
pub fn compute_config_hash(config: &AnalysisConfig) -> Result<String> {
    let blob = serde_json::to_vec(config)?;
    let mut hasher = Sha256::new();
    hasher.update(&blob);
    Ok(finish(hasher))
}

/// Fingerprint of graph *structure* only: sorted ids and sorted `blocks`
/// edges. Content-only edits leave this hash unchanged, which lets the
/// analyzer reuse a previous Phase-2 result.
pub fn compute_structure_hash(issues: &[Issue]) -> String {
    let deduped = dedupe_issues(issues);
    let mut ids: Vec<&str> = deduped.iter().map(|i| i.id.as_str()).collect();
    ids.sort_unstable();

    let present: std::collections::HashSet<&str> = ids.iter().copied().collect();
    let mut edges: Vec<(&str, &str)> = Vec::new();
    for issue in &deduped {
        for dep in issue.dependencies.iter() {
            if dep.dep_type == DependencyType::Blocks
                && dep.target != issue.id
                && present.contains(dep.target.as_str())
            {
                edges.push((dep.target.as_str(), issue.id.as_str()));
            }
        }
    }
    edges.sort_unstable();
    edges.dedup();

    let mut hasher = Sha256::new();
    for id in ids {
        write_field(&mut hasher, id);
    }
    hasher.update([ISSUE_SEPARATOR]);
    for (from, to) in edges {
        write_field(&mut hasher, from);
        write_field(&mut hasher, to);
    }
    finish(hasher)
}

/// Per-issue difference between two issue sets, driven by the per-issue
/// content and dependency fingerprints. Every list is sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Ids present in both sets with any change at all.
    pub modified: Vec<String>,
    /// Subset of `modified` whose non-dependency content changed.
    pub content_changed: Vec<String>,
    /// Subset of `modified` whose dependency list changed.
    pub dep_changed: Vec<String>,
    pub unchanged: Vec<String>,
}

/// Compare two issue sets by per-issue fingerprints.
pub fn compute_issue_diff(old: &[Issue], new: &[Issue]) -> IssueDiff {
    use std::collections::HashMap;

    let old_issues = dedupe_issues(old);
    let new_issues = dedupe_issues(new);

    let old_hashes: HashMap<&str, (String, String)> = old_issues
        .iter()
        .map(|i| {
            (
                i.id.as_str(),
                (issue_content_hash(i), issue_dependency_hash(i)),
            )
        })
        .collect();
    let new_hashes: HashMap<&str, (String, String)> = new_issues
        .iter()
        .map(|i| {
            (
                i.id.as_str(),
                (issue_content_hash(i), issue_dependency_hash(i)),
            )
        })
        .collect();

    let mut diff = IssueDiff::default();

    for (id, (new_content, new_deps)) in &new_hashes {
        match old_hashes.get(id) {
            None => diff.added.push((*id).to_string()),
            Some((old_content, old_deps)) => {
                let content_changed = old_content != new_content;
                let dep_changed = old_deps != new_deps;
                if content_changed || dep_changed {
                    diff.modified.push((*id).to_string());
                    if content_changed {
                        diff.content_changed.push((*id).to_string());
                    }
                    if dep_changed {
                        diff.dep_changed.push((*id).to_string());
                    }
                } else {
                    diff.unchanged.push((*id).to_string());
                }
            }
        }
    }
    for id in old_hashes.keys() {
        if !new_hashes.contains_key(id) {
            diff.removed.push((*id).to_string());
        }
    }

    diff.added.sort_unstable();
    diff.removed.sort_unstable();
    diff.modified.sort_unstable();
    diff.content_changed.sort_unstable();
    diff.dep_changed.sort_unstable();
    diff.unchanged.sort_unstable();
    diff
}
