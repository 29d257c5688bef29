//! Write path: run a store call, then invalidate the keys it declared.
//!
//! Invalidation happens only after the write succeeds, and only for the
//! declared keys. A failed write leaves the cache untouched and returns the
//! error to the caller; nothing is applied optimistically.
//!
//! Writes are not serialized against each other. Two concurrent patches to
//! the same task both reach the store and the last one to complete wins.

use std::future::Future;

use taskdeck_core::{ProjectId, StoreResult, TaskId};
use tracing::{info, warn};

use crate::cache::QueryCache;
use crate::keys::QueryKey;

/// Keys a task write touches: `task:{id}`, `tasks`, `tasks:project:{project}`.
#[must_use]
pub fn task_keys(task_id: &TaskId, project_id: &ProjectId) -> Vec<QueryKey> {
    vec![
        QueryKey::Task(task_id.clone()),
        QueryKey::Tasks,
        QueryKey::TasksByProject(project_id.clone()),
    ]
}

/// Keys a project write touches: `project:{id}`, `projects`.
#[must_use]
pub fn project_keys(project_id: &ProjectId) -> Vec<QueryKey> {
    vec![QueryKey::Project(project_id.clone()), QueryKey::Projects]
}

fn describe(keys: &[QueryKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Runs writes against the store and keeps the cache in step.
pub struct MutationCoordinator<V> {
    cache: QueryCache<V>,
}

impl<V> Clone for MutationCoordinator<V> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
        }
    }
}

impl<V> MutationCoordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Coordinate writes for `cache`.
    pub fn new(cache: QueryCache<V>) -> Self {
        Self { cache }
    }

    /// The cache this coordinator invalidates.
    #[must_use]
    pub fn cache(&self) -> &QueryCache<V> {
        &self.cache
    }

    /// Await `operation`; on success invalidate exactly `affected`.
    pub async fn mutate<T, Fut>(&self, operation: Fut, affected: &[QueryKey]) -> StoreResult<T>
    where
        Fut: Future<Output = StoreResult<T>>,
    {
        match operation.await {
            Ok(value) => {
                for key in affected {
                    self.cache.invalidate_exact(key);
                }
                info!(keys = %describe(affected), "mutation applied");
                Ok(value)
            }
            Err(err) => {
                warn!(keys = %describe(affected), error = %err, "mutation failed");
                Err(err)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use taskdeck_core::StoreError;
    use taskdeck_core::logging::capture_logs;
    use tracing::Level;

    fn primed() -> MutationCoordinator<u32> {
        let cache = QueryCache::new();
        for key in [
            QueryKey::Projects,
            QueryKey::Project(ProjectId::from("p1")),
            QueryKey::Tasks,
            QueryKey::Task(TaskId::from("t1")),
            QueryKey::Task(TaskId::from("t2")),
            QueryKey::TasksByProject(ProjectId::from("p1")),
            QueryKey::TasksByProject(ProjectId::from("p2")),
        ] {
            cache.set_data(&key, 0);
        }
        MutationCoordinator::new(cache)
    }

    fn stale_keys(coordinator: &MutationCoordinator<u32>) -> Vec<QueryKey> {
        let cache = coordinator.cache();
        cache
            .keys()
            .into_iter()
            .filter(|k| cache.state(k).stale)
            .collect()
    }

    #[test]
    fn task_key_set() {
        let keys = task_keys(&TaskId::from("9"), &ProjectId::from("2"));
        let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["task:9", "tasks", "tasks:project:2"]);
    }

    #[test]
    fn project_key_set() {
        let keys = project_keys(&ProjectId::from("2"));
        let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["project:2", "projects"]);
    }

    #[tokio::test]
    async fn success_invalidates_exactly_declared_keys() {
        let coordinator = primed();
        let keys = task_keys(&TaskId::from("t1"), &ProjectId::from("p1"));

        let out = coordinator.mutate(async { Ok(5) }, &keys).await;
        assert_eq!(out, Ok(5));

        let mut expected = keys.clone();
        expected.sort();
        assert_eq!(stale_keys(&coordinator), expected);
    }

    #[tokio::test]
    async fn failure_invalidates_nothing() {
        let (logs, _guard) = capture_logs();
        let coordinator = primed();
        let keys = task_keys(&TaskId::from("t1"), &ProjectId::from("p1"));

        let out: StoreResult<()> = coordinator
            .mutate(
                async { Err(StoreError::request_failed(500, "PATCH", "/tasks/t1")) },
                &keys,
            )
            .await;
        assert_eq!(out.unwrap_err().status(), Some(500));
        assert!(stale_keys(&coordinator).is_empty());
        assert!(logs.has_event(Level::WARN, "mutation failed"));
    }

    #[tokio::test]
    async fn success_is_logged_with_keys() {
        let (logs, _guard) = capture_logs();
        let coordinator = primed();
        let keys = project_keys(&ProjectId::from("p1"));

        coordinator.mutate(async { Ok(()) }, &keys).await.unwrap();
        assert!(logs.has_event(Level::INFO, "mutation applied"));
        assert_eq!(
            logs.field_of("mutation applied", "keys").as_deref(),
            Some("project:p1, projects")
        );
    }

    #[tokio::test]
    async fn invalidation_waits_for_the_write() {
        let coordinator = primed();
        let keys = vec![QueryKey::Tasks];
        let cache = coordinator.cache().clone();

        coordinator
            .mutate(
                async {
                    assert!(!cache.state(&QueryKey::Tasks).stale);
                    Ok(())
                },
                &keys,
            )
            .await
            .unwrap();
        assert!(coordinator.cache().state(&QueryKey::Tasks).stale);
    }
}
