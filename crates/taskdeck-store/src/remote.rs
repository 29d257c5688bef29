//! The remote store contract.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use taskdeck_core::StoreResult;

/// A collection of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// `/projects`
    Projects,
    /// `/tasks`
    Tasks,
}

impl Collection {
    /// Path segment and display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Tasks => "tasks",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equality filter sent as query parameters (`?projectId=7`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pairs: Vec<(String, String)>,
}

impl Filter {
    /// Filter on a single `field == value`.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::default().and(field, value)
    }

    /// Add another `field == value` condition.
    #[must_use]
    pub fn and(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((field.into(), value.into()));
        self
    }

    /// The `(field, value)` pairs in insertion order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Whether a JSON record satisfies every condition.
    ///
    /// Values compare by their string form, so `7` matches `"7"`.
    #[must_use]
    pub fn matches(&self, record: &Value) -> bool {
        self.pairs.iter().all(|(field, expected)| {
            match record.get(field) {
                Some(Value::String(s)) => s == expected,
                Some(Value::Number(n)) => n.to_string() == *expected,
                Some(Value::Bool(b)) => b.to_string() == *expected,
                _ => false,
            }
        })
    }
}

/// CRUD verbs against a collection-based JSON store.
///
/// Implementations translate calls into requests and responses only.
/// A single-entity `get` that fails for any reason yields
/// [`StoreError::NotFound`](taskdeck_core::StoreError::NotFound); `list` with a
/// filter that matches nothing returns an empty vector.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List a collection, optionally filtered server-side.
    async fn list(&self, collection: Collection, filter: Option<&Filter>) -> StoreResult<Vec<Value>>;

    /// Fetch one entity.
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Value>;

    /// Create an entity (the body includes its ID) and return the stored copy.
    async fn create(&self, collection: Collection, entity: Value) -> StoreResult<Value>;

    /// Merge `partial` into an entity and return the full updated entity.
    async fn patch(&self, collection: Collection, id: &str, partial: Value) -> StoreResult<Value>;

    /// Remove an entity.
    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
