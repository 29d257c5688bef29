//! Task and project writes.
//!
//! Each action builds a typed patch, hands the store call to the
//! [`MutationCoordinator`] together with the keys it touches, and returns the
//! stored entity. Subtask and comment edits replace the whole list in one
//! PATCH; subtask edits carry the derived status in the same body.
//!
//! [`Actions::set_status`] writes the status as given. It does not look at
//! subtasks, and a later subtask change derives the status from the list
//! again.

use chrono::{DateTime, SecondsFormat, Utc};
use taskdeck_core::derive::{next_local_id, status_for_counts};
use taskdeck_core::validation::TaskDraft;
use taskdeck_core::{
    Comment, Project, ProjectId, ProjectPatch, StoreError, StoreResult, Subtask, Task, TaskPatch,
    TaskStatus, ValidationErrors,
};
use taskdeck_store::StoreClient;

use crate::board::QueryData;
use crate::keys::QueryKey;
use crate::mutation::{MutationCoordinator, project_keys, task_keys};

// ─────────────────────────────────────────────────────────────────────────────
// Patch builders
// ─────────────────────────────────────────────────────────────────────────────

/// Patch replacing the subtask list, with the status derived from it.
///
/// An empty list carries no status.
#[must_use]
pub fn subtasks_patch(subtasks: Vec<Subtask>) -> TaskPatch {
    let completed = subtasks.iter().filter(|s| s.completed).count();
    TaskPatch {
        status: status_for_counts(completed, subtasks.len()),
        subtasks: Some(subtasks),
        ..TaskPatch::default()
    }
}

fn missing_subtask(task: &Task, subtask_id: &str) -> StoreError {
    StoreError::not_found(format!("tasks/{}/subtasks", task.id), subtask_id)
}

/// Flip one subtask's checkbox.
pub fn toggle_subtask_patch(task: &Task, subtask_id: &str) -> StoreResult<TaskPatch> {
    if task.subtask(subtask_id).is_none() {
        return Err(missing_subtask(task, subtask_id));
    }
    let subtasks = task
        .subtasks
        .iter()
        .map(|s| Subtask {
            completed: if s.id == subtask_id { !s.completed } else { s.completed },
            ..s.clone()
        })
        .collect();
    Ok(subtasks_patch(subtasks))
}

/// Append an unchecked subtask with the next local ID.
///
/// The ID is one past the highest current ID, so removing the top subtask
/// frees its ID for the next one added.
pub fn add_subtask_patch(task: &Task, title: &str) -> StoreResult<TaskPatch> {
    let title = title.trim();
    if title.is_empty() {
        let mut errors = ValidationErrors::new();
        errors.push("title", "Subtask title is required");
        return Err(errors.into());
    }
    let mut subtasks = task.subtasks.clone();
    subtasks.push(Subtask {
        id: next_local_id(task.subtasks.iter().map(|s| s.id.as_str())),
        title: title.to_string(),
        completed: false,
    });
    Ok(subtasks_patch(subtasks))
}

/// Drop one subtask.
pub fn remove_subtask_patch(task: &Task, subtask_id: &str) -> StoreResult<TaskPatch> {
    if task.subtask(subtask_id).is_none() {
        return Err(missing_subtask(task, subtask_id));
    }
    let subtasks = task
        .subtasks
        .iter()
        .filter(|s| s.id != subtask_id)
        .cloned()
        .collect();
    Ok(subtasks_patch(subtasks))
}

/// Append a comment stamped with `now`.
pub fn comment_patch(
    task: &Task,
    author: &str,
    content: &str,
    now: DateTime<Utc>,
) -> StoreResult<TaskPatch> {
    let mut errors = ValidationErrors::new();
    if author.trim().is_empty() {
        errors.push("author", "Author is required");
    }
    if content.trim().is_empty() {
        errors.push("content", "Comment is required");
    }
    errors.into_result()?;

    let mut comments = task.comments.clone();
    comments.push(Comment {
        id: next_local_id(task.comments.iter().map(|c| c.id.as_str())),
        author: author.trim().to_string(),
        content: content.trim().to_string(),
        created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    });
    Ok(TaskPatch {
        comments: Some(comments),
        ..TaskPatch::default()
    })
}

/// Keys a patch to `task` touches. A move to another project adds the
/// destination's list key.
#[must_use]
pub fn update_keys(task: &Task, patch: &TaskPatch) -> Vec<QueryKey> {
    let mut keys = task_keys(&task.id, &task.project_id);
    if let Some(target) = &patch.project_id {
        if *target != task.project_id {
            keys.push(QueryKey::TasksByProject(target.clone()));
        }
    }
    keys
}

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

/// Write operations over the store, invalidating through the coordinator.
#[derive(Clone)]
pub struct Actions {
    client: StoreClient,
    mutations: MutationCoordinator<QueryData>,
}

impl Actions {
    /// Wire a client to a coordinator.
    pub fn new(client: StoreClient, mutations: MutationCoordinator<QueryData>) -> Self {
        Self { client, mutations }
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// Validate a draft and create the task. The new task is seeded into
    /// `task:{id}`.
    pub async fn create_task(&self, draft: TaskDraft) -> StoreResult<Task> {
        let task = draft.into_new_task(Utc::now())?;
        let keys = task_keys(&task.id, &task.project_id);
        let created = self
            .mutations
            .mutate(self.client.create_task(&task), &keys)
            .await?;
        self.mutations
            .cache()
            .set_data(&QueryKey::Task(created.id.clone()), QueryData::Task(created.clone()));
        Ok(created)
    }

    /// Validate an edited draft and send every field.
    pub async fn edit_task(&self, task: &Task, draft: TaskDraft) -> StoreResult<Task> {
        let patch = draft.into_patch(Utc::now())?;
        self.update_task(task, patch).await
    }

    /// Send a partial update.
    pub async fn update_task(&self, task: &Task, patch: TaskPatch) -> StoreResult<Task> {
        let keys = update_keys(task, &patch);
        self.mutations
            .mutate(self.client.update_task(&task.id, &patch), &keys)
            .await
    }

    /// Set the status directly, regardless of subtasks.
    pub async fn set_status(&self, task: &Task, status: TaskStatus) -> StoreResult<Task> {
        let patch = TaskPatch {
            status: Some(status),
            ..TaskPatch::default()
        };
        self.update_task(task, patch).await
    }

    /// Flip a subtask and re-derive the status.
    pub async fn toggle_subtask(&self, task: &Task, subtask_id: &str) -> StoreResult<Task> {
        let patch = toggle_subtask_patch(task, subtask_id)?;
        self.update_task(task, patch).await
    }

    /// Append a subtask and re-derive the status.
    pub async fn add_subtask(&self, task: &Task, title: &str) -> StoreResult<Task> {
        let patch = add_subtask_patch(task, title)?;
        self.update_task(task, patch).await
    }

    /// Remove a subtask and re-derive the status.
    pub async fn remove_subtask(&self, task: &Task, subtask_id: &str) -> StoreResult<Task> {
        let patch = remove_subtask_patch(task, subtask_id)?;
        self.update_task(task, patch).await
    }

    /// Append a comment.
    pub async fn add_comment(&self, task: &Task, author: &str, content: &str) -> StoreResult<Task> {
        let patch = comment_patch(task, author, content, Utc::now())?;
        self.update_task(task, patch).await
    }

    /// Delete a task and drop its `task:{id}` entry.
    pub async fn delete_task(&self, task: &Task) -> StoreResult<()> {
        let keys = task_keys(&task.id, &task.project_id);
        self.mutations
            .mutate(self.client.delete_task(&task.id), &keys)
            .await?;
        self.mutations.cache().remove(&QueryKey::Task(task.id.clone()));
        Ok(())
    }

    // ── Projects ─────────────────────────────────────────────────────

    /// Create a project and seed `project:{id}`.
    pub async fn create_project(&self, project: Project) -> StoreResult<Project> {
        let keys = project_keys(&project.id);
        let created = self
            .mutations
            .mutate(self.client.create_project(&project), &keys)
            .await?;
        self.mutations.cache().set_data(
            &QueryKey::Project(created.id.clone()),
            QueryData::Project(created.clone()),
        );
        Ok(created)
    }

    /// Rename or otherwise patch a project.
    pub async fn update_project(&self, id: &ProjectId, patch: ProjectPatch) -> StoreResult<Project> {
        let keys = project_keys(id);
        self.mutations
            .mutate(self.client.update_project(id, &patch), &keys)
            .await
    }

    /// Delete a project and drop its `project:{id}` entry. Its tasks stay
    /// in the store.
    pub async fn delete_project(&self, id: &ProjectId) -> StoreResult<()> {
        let keys = project_keys(id);
        self.mutations
            .mutate(self.client.delete_project(id), &keys)
            .await?;
        self.mutations.cache().remove(&QueryKey::Project(id.clone()));
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use taskdeck_core::{TaskId, TaskPriority};

    fn subtask(id: &str, completed: bool) -> Subtask {
        Subtask {
            id: id.into(),
            title: format!("step {id}"),
            completed,
        }
    }

    fn task_with(subtasks: Vec<Subtask>, status: TaskStatus) -> Task {
        Task {
            id: TaskId::from("t1"),
            title: "Ship".into(),
            description: "Ship it".into(),
            project_id: ProjectId::from("p1"),
            status,
            priority: TaskPriority::High,
            due_date: None,
            tags: Vec::new(),
            subtasks,
            comments: Vec::new(),
        }
    }

    // ── Subtasks ─────────────────────────────────────────────────────

    #[test]
    fn toggle_derives_in_progress() {
        let task = task_with(
            vec![subtask("1", true), subtask("2", false), subtask("3", false)],
            TaskStatus::Todo,
        );
        let patch = toggle_subtask_patch(&task, "2").unwrap();
        let subtasks = patch.subtasks.unwrap();
        assert!(subtasks[1].completed);
        assert_eq!(subtasks.len(), 3);
        assert_eq!(patch.status, Some(TaskStatus::InProgress));
        assert!(patch.title.is_none());
    }

    #[test]
    fn toggle_last_open_subtask_derives_done() {
        let task = task_with(vec![subtask("1", true), subtask("2", false)], TaskStatus::InProgress);
        let patch = toggle_subtask_patch(&task, "2").unwrap();
        assert_eq!(patch.status, Some(TaskStatus::Done));
    }

    #[test]
    fn untoggle_all_derives_todo() {
        let task = task_with(vec![subtask("1", true)], TaskStatus::Done);
        let patch = toggle_subtask_patch(&task, "1").unwrap();
        assert_eq!(patch.status, Some(TaskStatus::Todo));
    }

    #[test]
    fn toggle_overrides_manual_status() {
        // Manually done with open subtasks: the next toggle re-derives.
        let task = task_with(
            vec![subtask("1", false), subtask("2", false)],
            TaskStatus::Done,
        );
        let patch = toggle_subtask_patch(&task, "1").unwrap();
        assert_eq!(patch.status, Some(TaskStatus::InProgress));
    }

    #[test]
    fn toggle_unknown_subtask_is_not_found() {
        let task = task_with(vec![subtask("1", false)], TaskStatus::Todo);
        let err = toggle_subtask_patch(&task, "9").unwrap_err();
        assert_matches!(err, StoreError::NotFound { ref id, .. } if id == "9");
    }

    #[test]
    fn add_subtask_uses_next_id_and_rederives() {
        let task = task_with(vec![subtask("1", true), subtask("3", true)], TaskStatus::Done);
        let patch = add_subtask_patch(&task, "  Verify ").unwrap();
        let subtasks = patch.subtasks.unwrap();
        assert_eq!(subtasks[2].id, "4");
        assert_eq!(subtasks[2].title, "Verify");
        assert!(!subtasks[2].completed);
        assert_eq!(patch.status, Some(TaskStatus::InProgress));
    }

    #[test]
    fn add_blank_subtask_is_rejected() {
        let task = task_with(Vec::new(), TaskStatus::Todo);
        let err = add_subtask_patch(&task, "   ").unwrap_err();
        assert!(!err.is_retryable());
        assert_matches!(err, StoreError::ValidationFailed(_));
    }

    #[test]
    fn removing_last_subtask_keeps_status() {
        let task = task_with(vec![subtask("1", false)], TaskStatus::InProgress);
        let patch = remove_subtask_patch(&task, "1").unwrap();
        assert_eq!(patch.subtasks, Some(Vec::new()));
        assert!(patch.status.is_none());
    }

    #[test]
    fn removing_open_subtask_can_complete_task() {
        let task = task_with(vec![subtask("1", true), subtask("2", false)], TaskStatus::InProgress);
        let patch = remove_subtask_patch(&task, "2").unwrap();
        assert_eq!(patch.status, Some(TaskStatus::Done));
    }

    #[test]
    fn removed_top_id_is_handed_out_again() {
        // IDs follow max + 1 over the current list; there is no high-water mark.
        let mut task = task_with(
            vec![subtask("1", false), subtask("2", false), subtask("3", false)],
            TaskStatus::Todo,
        );
        task.subtasks = remove_subtask_patch(&task, "3").unwrap().subtasks.unwrap();
        let subtasks = add_subtask_patch(&task, "Retest").unwrap().subtasks.unwrap();
        let ids: Vec<&str> = subtasks.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(subtasks[2].title, "Retest");
    }

    // ── Comments ─────────────────────────────────────────────────────

    #[test]
    fn comment_appends_with_next_id() {
        let mut task = task_with(Vec::new(), TaskStatus::Todo);
        task.comments.push(Comment {
            id: "2".into(),
            author: "Ana".into(),
            content: "first".into(),
            created_at: "2025-01-01T00:00:00.000Z".into(),
        });
        let now = Utc::now();
        let patch = comment_patch(&task, "Bo", "looks good", now).unwrap();
        let comments = patch.comments.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[1].id, "3");
        assert_eq!(comments[1].author, "Bo");
        assert_eq!(
            comments[1].created_at,
            now.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        assert!(patch.subtasks.is_none());
        assert!(patch.status.is_none());
    }

    #[test]
    fn comment_requires_author_and_content() {
        let task = task_with(Vec::new(), TaskStatus::Todo);
        let err = comment_patch(&task, " ", "", Utc::now()).unwrap_err();
        let StoreError::ValidationFailed(errors) = err else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.message_for("author"), Some("Author is required"));
        assert_eq!(errors.message_for("content"), Some("Comment is required"));
    }

    // ── Keys ─────────────────────────────────────────────────────────

    #[test]
    fn move_declares_both_project_lists() {
        let task = task_with(Vec::new(), TaskStatus::Todo);
        let patch = TaskPatch {
            project_id: Some(ProjectId::from("p2")),
            ..TaskPatch::default()
        };
        let keys = update_keys(&task, &patch);
        assert_eq!(keys.len(), 4);
        assert!(keys.contains(&QueryKey::TasksByProject(ProjectId::from("p1"))));
        assert!(keys.contains(&QueryKey::TasksByProject(ProjectId::from("p2"))));
    }

    #[test]
    fn same_project_patch_declares_three_keys() {
        let task = task_with(Vec::new(), TaskStatus::Todo);
        let patch = TaskPatch {
            project_id: Some(ProjectId::from("p1")),
            title: Some("Renamed".into()),
            ..TaskPatch::default()
        };
        assert_eq!(update_keys(&task, &patch), task_keys(&task.id, &task.project_id));
    }
}
