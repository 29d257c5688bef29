//! Typed projects/tasks API over any [`RemoteStore`].

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use taskdeck_core::{Project, ProjectId, ProjectPatch, StoreResult, Task, TaskId, TaskPatch};

use crate::remote::{Collection, Filter, RemoteStore};

/// Typed client. Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct StoreClient {
    store: Arc<dyn RemoteStore>,
}

impl StoreClient {
    /// Wrap a store.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// The underlying raw store.
    #[must_use]
    pub fn raw(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    // ── Projects ─────────────────────────────────────────────────────

    /// All projects in store order.
    pub async fn projects(&self) -> StoreResult<Vec<Project>> {
        decode_list(self.store.list(Collection::Projects, None).await?)
    }

    /// One project by ID.
    pub async fn project(&self, id: &ProjectId) -> StoreResult<Project> {
        decode(self.store.get(Collection::Projects, id.as_str()).await?)
    }

    /// Create a project (its ID is part of the body).
    pub async fn create_project(&self, project: &Project) -> StoreResult<Project> {
        decode(self.store.create(Collection::Projects, encode(project)?).await?)
    }

    /// Apply a partial update to a project.
    pub async fn update_project(&self, id: &ProjectId, patch: &ProjectPatch) -> StoreResult<Project> {
        decode(
            self.store
                .patch(Collection::Projects, id.as_str(), encode(patch)?)
                .await?,
        )
    }

    /// Delete a project. Its tasks are left in place.
    pub async fn delete_project(&self, id: &ProjectId) -> StoreResult<()> {
        self.store.delete(Collection::Projects, id.as_str()).await
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// All tasks in store order.
    pub async fn tasks(&self) -> StoreResult<Vec<Task>> {
        decode_list(self.store.list(Collection::Tasks, None).await?)
    }

    /// One task by ID.
    pub async fn task(&self, id: &TaskId) -> StoreResult<Task> {
        decode(self.store.get(Collection::Tasks, id.as_str()).await?)
    }

    /// Tasks belonging to one project (`GET /tasks?projectId=`).
    pub async fn tasks_by_project(&self, project_id: &ProjectId) -> StoreResult<Vec<Task>> {
        let filter = Filter::eq("projectId", project_id.as_str());
        decode_list(self.store.list(Collection::Tasks, Some(&filter)).await?)
    }

    /// Create a task (its ID is part of the body).
    pub async fn create_task(&self, task: &Task) -> StoreResult<Task> {
        decode(self.store.create(Collection::Tasks, encode(task)?).await?)
    }

    /// Apply a partial update to a task and return the full stored task.
    pub async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> StoreResult<Task> {
        decode(
            self.store
                .patch(Collection::Tasks, id.as_str(), encode(patch)?)
                .await?,
        )
    }

    /// Delete a task.
    pub async fn delete_task(&self, id: &TaskId) -> StoreResult<()> {
        self.store.delete(Collection::Tasks, id.as_str()).await
    }
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Value> {
    Ok(serde_json::to_value(value)?)
}

fn decode<T: DeserializeOwned>(value: Value) -> StoreResult<T> {
    Ok(serde_json::from_value(value)?)
}

fn decode_list<T: DeserializeOwned>(values: Vec<Value>) -> StoreResult<Vec<T>> {
    values.into_iter().map(decode).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
