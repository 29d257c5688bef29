//! Core types for the project/task model.
//!
//! All serializable types use `camelCase` for wire compatibility with the
//! JSON store. The client never owns authoritative state: every value here is
//! a cached copy of what the store returned.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::{ProjectId, TaskId, string_or_number};

// ─────────────────────────────────────────────────────────────────────────────
// Enums
// ─────────────────────────────────────────────────────────────────────────────

/// Task status in the workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not started.
    #[default]
    #[serde(rename = "todo")]
    Todo,
    /// Some work done.
    #[serde(rename = "in-progress")]
    InProgress,
    /// Finished.
    #[serde(rename = "done")]
    Done,
}

impl TaskStatus {
    /// Wire string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "in-progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// Task priority level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Low priority.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Elevated priority.
    High,
}

impl TaskPriority {
    /// Wire string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown task priority: {other}")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain types
// ─────────────────────────────────────────────────────────────────────────────

/// A project grouping tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique ID.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Due date (`YYYY-MM-DD` or RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl Project {
    /// Build a new project with a fresh client-generated ID.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
            description: None,
            due_date: None,
        }
    }
}

/// A checklist item inside a task.
///
/// IDs are unique within the parent task's list only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    /// Local ID (numeric string when generated by this client).
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    /// What to do.
    pub title: String,
    /// Whether the item is checked.
    #[serde(default)]
    pub completed: bool,
}

/// A comment on a task. Append-only; list order is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Local ID (numeric string when generated by this client).
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    /// Display name of the author.
    pub author: String,
    /// Comment body.
    pub content: String,
    /// RFC 3339 creation timestamp.
    #[serde(default)]
    pub created_at: String,
}

/// A task in the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique ID.
    pub id: TaskId,
    /// Short description.
    pub title: String,
    /// Detailed description.
    #[serde(default)]
    pub description: String,
    /// Owning project.
    pub project_id: ProjectId,
    /// Current status.
    #[serde(default)]
    pub status: TaskStatus,
    /// Priority level.
    #[serde(default)]
    pub priority: TaskPriority,
    /// Due date (`YYYY-MM-DD` or RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Categorization tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Checklist items.
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    /// Discussion thread.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Task {
    /// Look up a subtask by its local ID.
    #[must_use]
    pub fn subtask(&self, subtask_id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == subtask_id)
    }

    /// Number of checked subtasks.
    #[must_use]
    pub fn completed_subtasks(&self) -> usize {
        self.subtasks.iter().filter(|s| s.completed).count()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Patches
// ─────────────────────────────────────────────────────────────────────────────

/// Field-level optional update for a project. Only present fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New due date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl ProjectPatch {
    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.due_date.is_none()
    }
}

/// Field-level optional update for a task. Only present fields are sent.
///
/// `subtasks` and `comments` are full-list replacements; the store has no
/// endpoint for individual items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Move to a different project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    /// New status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// New priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    /// New due date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Replacement tag list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Replacement subtask list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<Subtask>>,
    /// Replacement comment list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
}

impl TaskPatch {
    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.project_id.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.tags.is_none()
            && self.subtasks.is_none()
            && self.comments.is_none()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
