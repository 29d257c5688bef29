//! Cache keys.

use std::fmt;

use taskdeck_core::{ProjectId, TaskId};

/// Identifies one cached query.
///
/// Collection keys and per-entity keys are independent entries; a write
/// declares every key it touches. `tasks` covers each `tasks:project:{id}`
/// for cache-level invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
    /// `projects`
    Projects,
    /// `project:{id}`
    Project(ProjectId),
    /// `tasks`
    Tasks,
    /// `task:{id}`
    Task(TaskId),
    /// `tasks:project:{id}`
    TasksByProject(ProjectId),
}

impl QueryKey {
    /// Whether the key caches a list rather than a single entity.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Projects | Self::Tasks | Self::TasksByProject(_))
    }

    /// Whether invalidating `self` also makes `other` stale.
    #[must_use]
    pub fn covers(&self, other: &QueryKey) -> bool {
        self == other || matches!((self, other), (Self::Tasks, Self::TasksByProject(_)))
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Projects => f.write_str("projects"),
            Self::Project(id) => write!(f, "project:{id}"),
            Self::Tasks => f.write_str("tasks"),
            Self::Task(id) => write!(f, "task:{id}"),
            Self::TasksByProject(id) => write!(f, "tasks:project:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        assert_eq!(QueryKey::Projects.to_string(), "projects");
        assert_eq!(QueryKey::Project(ProjectId::from("3")).to_string(), "project:3");
        assert_eq!(QueryKey::Tasks.to_string(), "tasks");
        assert_eq!(QueryKey::Task(TaskId::from("9")).to_string(), "task:9");
        assert_eq!(
            QueryKey::TasksByProject(ProjectId::from("7")).to_string(),
            "tasks:project:7"
        );
    }

    #[test]
    fn collection_keys() {
        assert!(QueryKey::Tasks.is_collection());
        assert!(QueryKey::TasksByProject(ProjectId::from("1")).is_collection());
        assert!(!QueryKey::Task(TaskId::from("1")).is_collection());
    }

    #[test]
    fn tasks_covers_project_lists_only() {
        let by_project = QueryKey::TasksByProject(ProjectId::from("7"));
        assert!(QueryKey::Tasks.covers(&QueryKey::Tasks));
        assert!(QueryKey::Tasks.covers(&by_project));
        assert!(!QueryKey::Tasks.covers(&QueryKey::Task(TaskId::from("7"))));
        assert!(!by_project.covers(&QueryKey::Tasks));
        assert!(!QueryKey::Projects.covers(&QueryKey::Project(ProjectId::from("7"))));
    }
}
