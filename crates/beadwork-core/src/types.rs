use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Workflow status of an issue.
///
/// `Closed` and `Tombstone` are both "closed-like": neither blocks other
/// issues. `Tombstone` additionally drops the issue from every suggestion
/// and risk output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    InProgress,
    Blocked,
    Closed,
    Tombstone,
}

impl IssueStatus {
    pub fn is_closed_like(&self) -> bool {
        matches!(self, IssueStatus::Closed | IssueStatus::Tombstone)
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueStatus::Open => "open",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Blocked => "blocked",
            IssueStatus::Closed => "closed",
            IssueStatus::Tombstone => "tombstone",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(IssueStatus::Open),
            "in_progress" => Ok(IssueStatus::InProgress),
            "blocked" => Ok(IssueStatus::Blocked),
            "closed" => Ok(IssueStatus::Closed),
            "tombstone" => Ok(IssueStatus::Tombstone),
            other => Err(format!("unknown issue status: {}", other)),
        }
    }
}

/// Kind of work an issue represents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IssueType {
    Bug,
    Feature,
    Task,
    Epic,
    Chore,
    Other(String),
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueType::Bug => "bug",
            IssueType::Feature => "feature",
            IssueType::Task => "task",
            IssueType::Epic => "epic",
            IssueType::Chore => "chore",
            IssueType::Other(s) => s.as_str(),
        };
        write!(f, "{}", s)
    }
}

impl FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bug" => Ok(IssueType::Bug),
            "feature" => Ok(IssueType::Feature),
            "task" => Ok(IssueType::Task),
            "epic" => Ok(IssueType::Epic),
            "chore" => Ok(IssueType::Chore),
            other => Ok(IssueType::Other(other.to_string())),
        }
    }
}

impl Serialize for IssueType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IssueType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        IssueType::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Typed link from the holding issue to another issue.
///
/// Only `Blocks` gates actionability and participates in longest-path and
/// unlock reasoning. `ParentChild` is a hierarchy view concern. `Related`
/// and `DiscoveredFrom` never block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    Blocks,
    ParentChild,
    Related,
    DiscoveredFrom,
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyType::Blocks => "blocks",
            DependencyType::ParentChild => "parent_child",
            DependencyType::Related => "related",
            DependencyType::DiscoveredFrom => "discovered_from",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for DependencyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blocks" => Ok(DependencyType::Blocks),
            "parent_child" | "parent-child" => Ok(DependencyType::ParentChild),
            "related" => Ok(DependencyType::Related),
            "discovered_from" | "discovered-from" => Ok(DependencyType::DiscoveredFrom),
            other => Err(format!("unknown dependency type: {}", other)),
        }
    }
}

/// Back-reference from the holding issue to the issue it depends on.
///
/// For a `Blocks` dependency the `target` blocks the holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub target: String,
    pub dep_type: DependencyType,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl Dependency {
    pub fn new(target: impl Into<String>, dep_type: DependencyType) -> Self {
        Self {
            target: target.into(),
            dep_type,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            created_by: String::new(),
        }
    }

    pub fn blocks(target: impl Into<String>) -> Self {
        Self::new(target, DependencyType::Blocks)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A single work item and its outgoing dependency list.
///
/// Issues are read-only inputs to an analysis run; reverse lookups (who
/// blocks whom) come from the built graph, never from the issue itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub design: String,
    #[serde(default)]
    pub acceptance_criteria: String,
    #[serde(default)]
    pub notes: String,
    pub status: IssueStatus,
    pub issue_type: IssueType,
    /// Lower values are more important.
    pub priority: i64,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub source_repo: String,
    #[serde(default)]
    pub external_ref: Option<String>,
    #[serde(default)]
    pub estimated_minutes: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl Issue {
    /// Minimal open task with epoch timestamps; field setters below fill in
    /// the rest for ingestion producers and tests.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            design: String::new(),
            acceptance_criteria: String::new(),
            notes: String::new(),
            status: IssueStatus::Open,
            issue_type: IssueType::Task,
            priority: 2,
            labels: Vec::new(),
            assignee: String::new(),
            source_repo: String::new(),
            external_ref: None,
            estimated_minutes: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
            closed_at: None,
            comments: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: IssueStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dependency(mut self, dep: Dependency) -> Self {
        self.dependencies.push(dep);
        self
    }

    pub fn blocked_by(self, target: impl Into<String>) -> Self {
        self.with_dependency(Dependency::blocks(target))
    }

    pub fn is_closed_like(&self) -> bool {
        self.status.is_closed_like()
    }

    pub fn is_tombstone(&self) -> bool {
        self.status == IssueStatus::Tombstone
    }

    /// Outgoing `Blocks` dependencies only.
    pub fn blocking_deps(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies
            .iter()
            .filter(|d| d.dep_type == DependencyType::Blocks)
    }
}

/// Collapse duplicate issue ids, keeping the last occurrence.
///
/// Ordering of the surviving issues follows their first appearance in the
/// input so callers that care about sequence keep a stable view.
pub fn dedupe_issues(issues: &[Issue]) -> Vec<Issue> {
    let mut position: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    let mut out: Vec<Issue> = Vec::with_capacity(issues.len());
    for issue in issues {
        match position.get(issue.id.as_str()) {
            Some(&at) => out[at] = issue.clone(),
            None => {
                position.insert(issue.id.as_str(), out.len());
                out.push(issue.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for s in ["open", "in_progress", "blocked", "closed", "tombstone"] {
            let status: IssueStatus = s.parse().unwrap();
            assert_eq!(status.to_string(), s);
        }
    }

    #[test]
    fn closed_like_covers_closed_and_tombstone() {
        assert!(IssueStatus::Closed.is_closed_like());
        assert!(IssueStatus::Tombstone.is_closed_like());
        assert!(!IssueStatus::Open.is_closed_like());
        assert!(!IssueStatus::Blocked.is_closed_like());
    }

    #[test]
    fn unknown_issue_type_preserved() {
        let t: IssueType = "spike".parse().unwrap();
        assert_eq!(t, IssueType::Other("spike".into()));
        assert_eq!(t.to_string(), "spike");
    }

    #[test]
    fn blocking_deps_filters_other_types() {
        let issue = Issue::new("a", "A")
            .with_dependency(Dependency::blocks("b"))
            .with_dependency(Dependency::new("c", DependencyType::Related))
            .with_dependency(Dependency::new("d", DependencyType::ParentChild));
        let blockers: Vec<_> = issue.blocking_deps().map(|d| d.target.as_str()).collect();
        assert_eq!(blockers, vec!["b"]);
    }

    #[test]
    fn dedupe_keeps_last_write() {
        let issues = vec![
            Issue::new("a", "first"),
            Issue::new("b", "B"),
            Issue::new("a", "second"),
        ];
        let deduped = dedupe_issues(&issues);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title, "second");
        assert_eq!(deduped[1].id, "b");
    }
}
