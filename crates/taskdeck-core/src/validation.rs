//! Task form input and its validation.
//!
//! A [`TaskDraft`] holds what the create/edit form collects. Validation runs
//! locally and reports every failing field; a draft that fails never reaches
//! the store.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationErrors;
use crate::ids::{ProjectId, TaskId};
use crate::types::{Comment, Subtask, Task, TaskPatch, TaskPriority, TaskStatus};

/// Subtask row of the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubtaskDraft {
    /// Existing ID when editing; assigned on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Subtask title.
    pub title: String,
    /// Checked state.
    pub completed: bool,
}

/// Comment row of the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentDraft {
    /// Existing ID when editing; assigned on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Author name.
    pub author: String,
    /// Comment body.
    pub content: String,
    /// Existing timestamp when editing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Values collected by the task form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskDraft {
    /// Task title.
    pub title: String,
    /// Task description.
    pub description: String,
    /// Selected project (empty until chosen).
    pub project_id: String,
    /// Priority selector.
    pub priority: TaskPriority,
    /// Status selector.
    pub status: TaskStatus,
    /// Due date input (`YYYY-MM-DD`).
    pub due_date: String,
    /// Comma-separated tags.
    pub tags: String,
    /// Subtask rows.
    pub subtasks: Vec<SubtaskDraft>,
    /// Comment rows.
    pub comments: Vec<CommentDraft>,
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Split a comma-separated tag string, trimming and dropping empties.
#[must_use]
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

impl TaskDraft {
    /// Pre-fill the form from an existing task.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            project_id: task.project_id.to_string(),
            priority: task.priority,
            status: task.status,
            due_date: task.due_date.clone().unwrap_or_default(),
            tags: task.tags.join(", "),
            subtasks: task
                .subtasks
                .iter()
                .map(|s| SubtaskDraft {
                    id: Some(s.id.clone()),
                    title: s.title.clone(),
                    completed: s.completed,
                })
                .collect(),
            comments: task
                .comments
                .iter()
                .map(|c| CommentDraft {
                    id: Some(c.id.clone()),
                    author: c.author.clone(),
                    content: c.content.clone(),
                    created_at: Some(c.created_at.clone()),
                })
                .collect(),
        }
    }

    /// Check every field, collecting all failures.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if blank(&self.title) {
            errors.push("title", "Title is required");
        }
        if blank(&self.description) {
            errors.push("description", "Description is required");
        }
        if blank(&self.project_id) {
            errors.push("projectId", "Project is required");
        }
        if blank(&self.due_date) {
            errors.push("dueDate", "Due date is required");
        }
        for (i, sub) in self.subtasks.iter().enumerate() {
            if blank(&sub.title) {
                errors.push(format!("subtasks.{i}.title"), "Subtask title is required");
            }
        }
        for (i, comment) in self.comments.iter().enumerate() {
            if blank(&comment.author) {
                errors.push(format!("comments.{i}.author"), "Author is required");
            }
            if blank(&comment.content) {
                errors.push(format!("comments.{i}.content"), "Comment is required");
            }
        }
        errors.into_result()
    }

    /// Validate and build a brand-new task with a fresh ID.
    ///
    /// Subtasks and comments are numbered `"1".."n"` in form order; comments
    /// are stamped with `now`.
    pub fn into_new_task(self, now: DateTime<Utc>) -> Result<Task, ValidationErrors> {
        self.validate()?;
        let created_at = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        Ok(Task {
            id: TaskId::new(),
            title: self.title,
            description: self.description,
            project_id: ProjectId::from(self.project_id),
            status: self.status,
            priority: self.priority,
            due_date: Some(self.due_date),
            tags: parse_tags(&self.tags),
            subtasks: self
                .subtasks
                .into_iter()
                .enumerate()
                .map(|(i, s)| Subtask {
                    id: (i + 1).to_string(),
                    title: s.title,
                    completed: s.completed,
                })
                .collect(),
            comments: self
                .comments
                .into_iter()
                .enumerate()
                .map(|(i, c)| Comment {
                    id: (i + 1).to_string(),
                    author: c.author,
                    content: c.content,
                    created_at: created_at.clone(),
                })
                .collect(),
        })
    }

    /// Validate and turn an edited draft into a patch carrying every field.
    ///
    /// Rows without an ID get the next local ID of their list; comments
    /// without a timestamp are stamped with `now`.
    pub fn into_patch(self, now: DateTime<Utc>) -> Result<TaskPatch, ValidationErrors> {
        self.validate()?;
        let created_at = now.to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut taken = kept_ids(self.subtasks.iter().map(|s| s.id.as_deref()));
        let mut subtasks: Vec<Subtask> = Vec::with_capacity(self.subtasks.len());
        for s in self.subtasks {
            let id = match s.id {
                Some(id) if !blank(&id) => id,
                _ => assign_id(&mut taken),
            };
            subtasks.push(Subtask {
                id,
                title: s.title,
                completed: s.completed,
            });
        }

        let mut taken = kept_ids(self.comments.iter().map(|c| c.id.as_deref()));
        let mut comments: Vec<Comment> = Vec::with_capacity(self.comments.len());
        for c in self.comments {
            let id = match c.id {
                Some(id) if !blank(&id) => id,
                _ => assign_id(&mut taken),
            };
            comments.push(Comment {
                id,
                author: c.author,
                content: c.content,
                created_at: c
                    .created_at
                    .filter(|ts| !blank(ts))
                    .unwrap_or_else(|| created_at.clone()),
            });
        }

        Ok(TaskPatch {
            title: Some(self.title),
            description: Some(self.description),
            project_id: Some(ProjectId::from(self.project_id)),
            status: Some(self.status),
            priority: Some(self.priority),
            due_date: Some(self.due_date),
            tags: Some(parse_tags(&self.tags)),
            subtasks: Some(subtasks),
            comments: Some(comments),
        })
    }
}

/// IDs already carried by draft rows, wherever they sit in the list.
fn kept_ids<'a>(ids: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    ids.flatten()
        .filter(|id| !blank(id))
        .map(str::to_owned)
        .collect()
}

fn assign_id(taken: &mut Vec<String>) -> String {
    let id = crate::derive::next_local_id(taken.iter().map(String::as_str));
    taken.push(id.clone());
    id
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
