//! In-process store with the same semantics as the HTTP API.
//!
//! Records are kept as raw JSON in insertion order. `patch` is a shallow
//! merge of top-level keys, list filters compare by string form, and a
//! missing entity answers 404 on `patch`/`delete` and `NotFound` on `get`.
//! Failures can be injected per operation, and every call is counted.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use taskdeck_core::{StoreError, StoreResult};
use tracing::debug;

use crate::remote::{Collection, Filter, RemoteStore};

/// The verb of a store call, for failure injection and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// `list`
    List,
    /// `get`
    Get,
    /// `create`
    Create,
    /// `patch`
    Patch,
    /// `delete`
    Delete,
}

impl StoreOp {
    fn method(self) -> &'static str {
        match self {
            Self::List | Self::Get => "GET",
            Self::Create => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Create => "create",
            Self::Patch => "patch",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Default)]
struct MemoryState {
    records: HashMap<Collection, Vec<Map<String, Value>>>,
    failures: HashMap<StoreOp, VecDeque<u16>>,
    calls: HashMap<StoreOp, usize>,
}

impl MemoryState {
    /// Count the call and pop an injected failure, if one is queued.
    fn begin(&mut self, op: StoreOp) -> Option<u16> {
        *self.calls.entry(op).or_insert(0) += 1;
        self.failures.get_mut(&op).and_then(VecDeque::pop_front)
    }

    fn collection(&mut self, collection: Collection) -> &mut Vec<Map<String, Value>> {
        self.records.entry(collection).or_default()
    }
}

/// Thread-safe in-memory [`RemoteStore`].
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert records directly, bypassing counters and injected failures.
    ///
    /// Non-object values are skipped.
    pub fn seed<T: Serialize>(&self, collection: Collection, records: impl IntoIterator<Item = T>) {
        let mut state = self.state.lock();
        let list = state.collection(collection);
        for record in records {
            match serde_json::to_value(record) {
                Ok(Value::Object(map)) => list.push(map),
                Ok(other) => debug!(%collection, value = %other, "skipping non-object seed record"),
                Err(e) => debug!(%collection, error = %e, "skipping unserializable seed record"),
            }
        }
    }

    /// Make the next call of `op` fail with HTTP `status`.
    ///
    /// Calls queue up: two injections fail the next two calls.
    pub fn fail_next(&self, op: StoreOp, status: u16) {
        self.state
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(status);
    }

    /// How many times `op` has been called.
    #[must_use]
    pub fn call_count(&self, op: StoreOp) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Reset every call counter.
    pub fn reset_counts(&self) {
        self.state.lock().calls.clear();
    }

    /// Snapshot of a collection's raw records.
    #[must_use]
    pub fn records(&self, collection: Collection) -> Vec<Value> {
        self.state
            .lock()
            .records
            .get(&collection)
            .map(|list| list.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }
}

fn record_id(record: &Map<String, Value>) -> Option<String> {
    match record.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn path(collection: Collection, id: Option<&str>) -> String {
    match id {
        Some(id) => format!("/{collection}/{id}"),
        None => format!("/{collection}"),
    }
}

fn injected(op: StoreOp, status: u16, collection: Collection, id: Option<&str>) -> StoreError {
    debug!(%op, status, %collection, "injected store failure");
    StoreError::request_failed(status, op.method(), path(collection, id))
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list(&self, collection: Collection, filter: Option<&Filter>) -> StoreResult<Vec<Value>> {
        let mut state = self.state.lock();
        if let Some(status) = state.begin(StoreOp::List) {
            return Err(injected(StoreOp::List, status, collection, None));
        }
        Ok(state
            .collection(collection)
            .iter()
            .map(|record| Value::Object(record.clone()))
            .filter(|value| filter.is_none_or(|f| f.matches(value)))
            .collect())
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Value> {
        let mut state = self.state.lock();
        if state.begin(StoreOp::Get).is_some() {
            return Err(StoreError::not_found(collection.as_str(), id));
        }
        state
            .collection(collection)
            .iter()
            .find(|record| record_id(record).as_deref() == Some(id))
            .map(|record| Value::Object(record.clone()))
            .ok_or_else(|| StoreError::not_found(collection.as_str(), id))
    }

    async fn create(&self, collection: Collection, entity: Value) -> StoreResult<Value> {
        let mut state = self.state.lock();
        if let Some(status) = state.begin(StoreOp::Create) {
            return Err(injected(StoreOp::Create, status, collection, None));
        }
        let Value::Object(mut record) = entity else {
            return Err(StoreError::request_failed(400, "POST", path(collection, None)));
        };
        let id = match record_id(&record) {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::now_v7().to_string();
                let _ = record.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };
        let list = state.collection(collection);
        if list.iter().any(|r| record_id(r).as_deref() == Some(id.as_str())) {
            return Err(StoreError::request_failed(500, "POST", path(collection, None)));
        }
        list.push(record.clone());
        Ok(Value::Object(record))
    }

    async fn patch(&self, collection: Collection, id: &str, partial: Value) -> StoreResult<Value> {
        let mut state = self.state.lock();
        if let Some(status) = state.begin(StoreOp::Patch) {
            return Err(injected(StoreOp::Patch, status, collection, Some(id)));
        }
        let record = state
            .collection(collection)
            .iter_mut()
            .find(|record| record_id(record).as_deref() == Some(id))
            .ok_or_else(|| StoreError::request_failed(404, "PATCH", path(collection, Some(id))))?;
        if let Value::Object(fields) = partial {
            for (key, value) in fields {
                // The stored ID is immutable.
                if key == "id" {
                    continue;
                }
                let _ = record.insert(key, value);
            }
        }
        Ok(Value::Object(record.clone()))
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let mut state = self.state.lock();
        if let Some(status) = state.begin(StoreOp::Delete) {
            return Err(injected(StoreOp::Delete, status, collection, Some(id)));
        }
        let list = state.collection(collection);
        let before = list.len();
        list.retain(|record| record_id(record).as_deref() != Some(id));
        if list.len() == before {
            return Err(StoreError::request_failed(404, "DELETE", path(collection, Some(id))));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
