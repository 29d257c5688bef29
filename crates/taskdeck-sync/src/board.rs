//! The facade views talk to.
//!
//! Reads go through the shared [`QueryCache`] under their [`QueryKey`];
//! writes go through [`Actions`]. One `Taskboard` is built per process and
//! passed to whatever needs it.

use std::sync::Arc;

use chrono::Utc;
use taskdeck_core::{Project, ProjectId, StoreError, StoreResult, Task, TaskId};
use taskdeck_settings::TaskdeckSettings;
use taskdeck_store::{RemoteStore, StoreClient};

use crate::actions::Actions;
use crate::cache::{CacheEvent, QueryCache, SubscriptionId};
use crate::keys::QueryKey;
use crate::mutation::MutationCoordinator;
use crate::projections::{Dashboard, ProjectOverview, StatusTab, TaskDetail, filter_tasks};

/// Value stored under a cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryData {
    /// `projects`
    Projects(Vec<Project>),
    /// `project:{id}`
    Project(Project),
    /// `tasks`, `tasks:project:{id}`
    Tasks(Vec<Task>),
    /// `task:{id}`
    Task(Task),
}

fn mismatch(key: &QueryKey) -> StoreError {
    StoreError::Decode(format!("cache entry {key} holds an unexpected shape"))
}

/// Default number of tasks on the dashboard's recent list.
const DEFAULT_RECENT_LIMIT: usize = 4;

/// Cache-backed reads and coordinated writes over one store.
#[derive(Clone)]
pub struct Taskboard {
    client: StoreClient,
    cache: QueryCache<QueryData>,
    actions: Actions,
    recent_limit: usize,
}

impl Taskboard {
    /// Build a board over `store` with a fresh cache.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        let client = StoreClient::new(store);
        let cache = QueryCache::new();
        let actions = Actions::new(client.clone(), MutationCoordinator::new(cache.clone()));
        Self {
            client,
            cache,
            actions,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }

    /// Build a board using view settings from `settings`.
    pub fn with_settings(store: Arc<dyn RemoteStore>, settings: &TaskdeckSettings) -> Self {
        Self::new(store).with_recent_limit(settings.dashboard.recent_limit)
    }

    /// Change how many tasks the dashboard lists.
    #[must_use]
    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    /// The shared cache.
    #[must_use]
    pub fn cache(&self) -> &QueryCache<QueryData> {
        &self.cache
    }

    /// Write operations.
    #[must_use]
    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    /// Notify `callback` on every change to `key`.
    pub fn subscribe(
        &self,
        key: QueryKey,
        callback: impl Fn(&CacheEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.cache.subscribe(key, callback)
    }

    // ── Keyed loads ──────────────────────────────────────────────────

    /// `projects`
    pub async fn projects(&self) -> StoreResult<Vec<Project>> {
        let key = QueryKey::Projects;
        let client = self.client.clone();
        let data = self
            .cache
            .fetch(&key, move || async move { client.projects().await.map(QueryData::Projects) })
            .await?;
        match data {
            QueryData::Projects(projects) => Ok(projects),
            _ => Err(mismatch(&key)),
        }
    }

    /// `project:{id}`
    pub async fn project(&self, id: &ProjectId) -> StoreResult<Project> {
        let key = QueryKey::Project(id.clone());
        let client = self.client.clone();
        let id = id.clone();
        let data = self
            .cache
            .fetch(&key, move || async move { client.project(&id).await.map(QueryData::Project) })
            .await?;
        match data {
            QueryData::Project(project) => Ok(project),
            _ => Err(mismatch(&key)),
        }
    }

    /// `tasks`
    pub async fn tasks(&self) -> StoreResult<Vec<Task>> {
        let key = QueryKey::Tasks;
        let client = self.client.clone();
        let data = self
            .cache
            .fetch(&key, move || async move { client.tasks().await.map(QueryData::Tasks) })
            .await?;
        match data {
            QueryData::Tasks(tasks) => Ok(tasks),
            _ => Err(mismatch(&key)),
        }
    }

    /// `task:{id}`
    pub async fn task(&self, id: &TaskId) -> StoreResult<Task> {
        let key = QueryKey::Task(id.clone());
        let client = self.client.clone();
        let id = id.clone();
        let data = self
            .cache
            .fetch(&key, move || async move { client.task(&id).await.map(QueryData::Task) })
            .await?;
        match data {
            QueryData::Task(task) => Ok(task),
            _ => Err(mismatch(&key)),
        }
    }

    /// `tasks:project:{id}`
    pub async fn tasks_by_project(&self, id: &ProjectId) -> StoreResult<Vec<Task>> {
        let key = QueryKey::TasksByProject(id.clone());
        let client = self.client.clone();
        let id = id.clone();
        let data = self
            .cache
            .fetch(&key, move || async move {
                client.tasks_by_project(&id).await.map(QueryData::Tasks)
            })
            .await?;
        match data {
            QueryData::Tasks(tasks) => Ok(tasks),
            _ => Err(mismatch(&key)),
        }
    }

    // ── Views ────────────────────────────────────────────────────────

    /// Counters over every task and the leading tasks of the list.
    pub async fn dashboard(&self) -> StoreResult<Dashboard> {
        let tasks = self.tasks().await?;
        Ok(Dashboard::build(&tasks, self.recent_limit, Utc::now()))
    }

    /// Tasks on `tab` matching `query`, from the `tasks` entry.
    pub async fn task_list(&self, tab: StatusTab, query: &str) -> StoreResult<Vec<Task>> {
        let tasks = self.tasks().await?;
        Ok(filter_tasks(&tasks, tab, query).into_iter().cloned().collect())
    }

    /// One task with its subtask counts.
    pub async fn task_detail(&self, id: &TaskId) -> StoreResult<TaskDetail> {
        Ok(TaskDetail::build(self.task(id).await?))
    }

    /// A project with its tasks and progress. Both loads run concurrently.
    pub async fn project_overview(&self, id: &ProjectId) -> StoreResult<ProjectOverview> {
        let (project, tasks) = futures::try_join!(self.project(id), self.tasks_by_project(id))?;
        Ok(ProjectOverview::build(project, tasks))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
