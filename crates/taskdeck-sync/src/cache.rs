//! Per-key query cache.
//!
//! Each [`QueryKey`] owns one entry: `idle`, `loading`, `success` or `error`,
//! plus the last data, the last error, and a stale flag. Loads go through
//! [`QueryCache::fetch`]:
//!
//! - a fresh `success` entry is served without calling the loader
//! - a key that is already loading joins the in-flight request
//! - anything else (idle, error, stale) invokes the loader
//!
//! Invalidating `tasks` also marks every `tasks:project:{id}` list stale;
//! [`QueryCache::invalidate_exact`] marks a single key.
//!
//! Every load carries a request number. A result is applied only while the
//! entry is still waiting on that request; invalidation, [`refetch`],
//! [`set_data`] and [`remove`] all detach the in-flight request, so its
//! result is dropped when it lands.
//!
//! Subscribers registered per key receive a [`CacheEvent`] for each state
//! change. Callbacks run after the cache lock is released and may call back
//! into the cache.
//!
//! [`refetch`]: QueryCache::refetch
//! [`set_data`]: QueryCache::set_data
//! [`remove`]: QueryCache::remove

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use taskdeck_core::{StoreError, StoreResult};
use tracing::debug;

use crate::keys::QueryKey;

/// Load state of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never loaded.
    Idle,
    /// A request is in flight.
    Loading,
    /// Holds data from the last applied load.
    Success,
    /// The last applied load failed.
    Error,
}

/// Snapshot of one key.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<V> {
    /// Load state.
    pub status: QueryStatus,
    /// Last successfully loaded value. Kept through reloads and failures.
    pub data: Option<V>,
    /// Failure of the last applied load.
    pub error: Option<StoreError>,
    /// Marked by invalidation; the next fetch reloads.
    pub stale: bool,
}

impl<V> QueryState<V> {
    fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            stale: false,
        }
    }

    /// Whether a load is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }
}

/// Handle returned by [`QueryCache::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// What happened to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    /// A load started.
    Loading,
    /// New data was stored.
    Updated,
    /// A load failed.
    Failed,
    /// The entry was marked stale.
    Invalidated,
    /// The entry was dropped.
    Removed,
}

/// Notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    /// Affected key.
    pub key: QueryKey,
    /// What changed.
    pub kind: CacheEventKind,
}

type Callback = Arc<dyn Fn(&CacheEvent) + Send + Sync>;
type SharedLoad<V> = Shared<BoxFuture<'static, StoreResult<V>>>;

struct InFlight<V> {
    request: u64,
    load: SharedLoad<V>,
}

struct Entry<V> {
    status: QueryStatus,
    data: Option<V>,
    error: Option<StoreError>,
    stale: bool,
    inflight: Option<InFlight<V>>,
}

impl<V> Default for Entry<V> {
    fn default() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            stale: false,
            inflight: None,
        }
    }
}

impl<V> Entry<V> {
    /// Drop the in-flight request, falling back to whatever was settled before.
    fn detach(&mut self) -> Option<u64> {
        let request = self.inflight.take()?.request;
        self.status = if self.error.is_some() {
            QueryStatus::Error
        } else if self.data.is_some() {
            QueryStatus::Success
        } else {
            QueryStatus::Idle
        };
        Some(request)
    }
}

struct Subscriber {
    id: SubscriptionId,
    key: QueryKey,
    callback: Callback,
}

struct Inner<V> {
    entries: HashMap<QueryKey, Entry<V>>,
    subscribers: Vec<Subscriber>,
    next_request: u64,
    next_subscription: u64,
}

fn callbacks_for(subscribers: &[Subscriber], key: &QueryKey) -> Vec<Callback> {
    subscribers
        .iter()
        .filter(|s| s.key == *key)
        .map(|s| Arc::clone(&s.callback))
        .collect()
}

fn dispatch(callbacks: &[Callback], key: &QueryKey, kind: CacheEventKind) {
    if callbacks.is_empty() {
        return;
    }
    let event = CacheEvent {
        key: key.clone(),
        kind,
    };
    for callback in callbacks {
        callback(&event);
    }
}

/// Shared query cache. Clones share state.
pub struct QueryCache<V> {
    inner: Arc<Mutex<Inner<V>>>,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                subscribers: Vec::new(),
                next_request: 0,
                next_subscription: 0,
            })),
        }
    }

    /// Read `key`, loading it with `loader` when needed.
    ///
    /// `loader` is called at most once, under the cache lock, and only to
    /// build the request future; it must not touch the cache itself.
    pub async fn fetch<F, Fut>(&self, key: &QueryKey, loader: F) -> StoreResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StoreResult<V>> + Send + 'static,
    {
        let (load, callbacks) = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            let entry = inner.entries.entry(key.clone()).or_default();

            if entry.status == QueryStatus::Success && !entry.stale {
                if let Some(data) = &entry.data {
                    debug!(%key, "cache hit");
                    return Ok(data.clone());
                }
            }

            if let Some(inflight) = &entry.inflight {
                debug!(%key, request = inflight.request, "joining in-flight fetch");
                (inflight.load.clone(), Vec::new())
            } else {
                inner.next_request += 1;
                let request = inner.next_request;
                let load = self.track(key.clone(), request, loader());
                debug!(%key, request, "fetch started");
                entry.status = QueryStatus::Loading;
                entry.inflight = Some(InFlight {
                    request,
                    load: load.clone(),
                });
                (load, callbacks_for(&inner.subscribers, key))
            }
        };

        dispatch(&callbacks, key, CacheEventKind::Loading);
        load.await
    }

    /// Start a new load for `key` even if one is in flight or the data is
    /// fresh. Any in-flight request is superseded.
    pub async fn refetch<F, Fut>(&self, key: &QueryKey, loader: F) -> StoreResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StoreResult<V>> + Send + 'static,
    {
        let (load, callbacks) = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            let entry = inner.entries.entry(key.clone()).or_default();
            if let Some(old) = entry.detach() {
                debug!(%key, request = old, "superseding in-flight fetch");
            }
            inner.next_request += 1;
            let request = inner.next_request;
            let load = self.track(key.clone(), request, loader());
            debug!(%key, request, "refetch started");
            entry.status = QueryStatus::Loading;
            entry.inflight = Some(InFlight {
                request,
                load: load.clone(),
            });
            (load, callbacks_for(&inner.subscribers, key))
        };

        dispatch(&callbacks, key, CacheEventKind::Loading);
        load.await
    }

    /// Wrap a request so it settles into the cache exactly once, whichever
    /// waiter drives it to completion.
    fn track<Fut>(&self, key: QueryKey, request: u64, fut: Fut) -> SharedLoad<V>
    where
        Fut: Future<Output = StoreResult<V>> + Send + 'static,
    {
        let inner = Arc::downgrade(&self.inner);
        async move {
            let result = fut.await;
            settle(&inner, &key, request, &result);
            result
        }
        .boxed()
        .shared()
    }

    /// Mark `key` stale so the next fetch reloads it, together with every
    /// filtered list it covers (`tasks` covers each `tasks:project:{id}`).
    ///
    /// Data stays readable until the reload lands. A request in flight for
    /// a marked key is superseded. Keys with no entry are ignored.
    pub fn invalidate(&self, key: &QueryKey) {
        self.mark_stale(|candidate| key.covers(candidate));
    }

    /// Mark only `key` stale, leaving the lists it covers untouched.
    pub fn invalidate_exact(&self, key: &QueryKey) {
        self.mark_stale(|candidate| candidate == key);
    }

    fn mark_stale(&self, selected: impl Fn(&QueryKey) -> bool) {
        let mut marked: Vec<(QueryKey, Vec<Callback>)> = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            let mut marked = Vec::new();
            for (key, entry) in inner.entries.iter_mut().filter(|(k, _)| selected(k)) {
                entry.stale = true;
                match entry.detach() {
                    Some(request) => {
                        debug!(%key, request, "invalidated, in-flight fetch superseded");
                    }
                    None => debug!(%key, "invalidated"),
                }
                marked.push((key.clone(), callbacks_for(&inner.subscribers, key)));
            }
            marked
        };
        marked.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, callbacks) in &marked {
            dispatch(callbacks, key, CacheEventKind::Invalidated);
        }
    }

    /// Store `value` as fresh data for `key`, superseding any in-flight load.
    pub fn set_data(&self, key: &QueryKey, value: V) {
        let callbacks = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            let entry = inner.entries.entry(key.clone()).or_default();
            let _ = entry.detach();
            entry.status = QueryStatus::Success;
            entry.data = Some(value);
            entry.error = None;
            entry.stale = false;
            debug!(%key, "data set");
            callbacks_for(&inner.subscribers, key)
        };
        dispatch(&callbacks, key, CacheEventKind::Updated);
    }

    /// Drop the entry for `key`. A load still in flight is discarded when
    /// it lands.
    pub fn remove(&self, key: &QueryKey) {
        let callbacks = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            if inner.entries.remove(key).is_none() {
                return;
            }
            debug!(%key, "entry removed");
            callbacks_for(&inner.subscribers, key)
        };
        dispatch(&callbacks, key, CacheEventKind::Removed);
    }

    /// Snapshot of `key`; `idle` when nothing is cached.
    #[must_use]
    pub fn state(&self, key: &QueryKey) -> QueryState<V> {
        let inner = self.inner.lock();
        inner
            .entries
            .get(key)
            .map_or_else(QueryState::idle, |entry| QueryState {
                status: entry.status,
                data: entry.data.clone(),
                error: entry.error.clone(),
                stale: entry.stale,
            })
    }

    /// Last loaded data for `key`, fresh or stale.
    #[must_use]
    pub fn data(&self, key: &QueryKey) -> Option<V> {
        self.inner.lock().entries.get(key)?.data.clone()
    }

    /// Every key with an entry, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self.inner.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Call `callback` on every change to `key`.
    pub fn subscribe(
        &self,
        key: QueryKey,
        callback: impl Fn(&CacheEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut inner = self.inner.lock();
        inner.next_subscription += 1;
        let id = SubscriptionId(inner.next_subscription);
        inner.subscribers.push(Subscriber {
            id,
            key,
            callback: Arc::new(callback),
        });
        id
    }

    /// Stop a subscription. Unknown IDs are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.lock().subscribers.retain(|s| s.id != id);
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

/// Apply a finished load if its entry is still waiting on `request`.
fn settle<V: Clone>(
    inner: &Weak<Mutex<Inner<V>>>,
    key: &QueryKey,
    request: u64,
    result: &StoreResult<V>,
) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let (callbacks, kind) = {
        let mut guard = inner.lock();
        let inner = &mut *guard;
        let Some(entry) = inner.entries.get_mut(key) else {
            debug!(%key, request, "discarding result for removed key");
            return;
        };
        if entry.inflight.as_ref().map(|f| f.request) != Some(request) {
            debug!(%key, request, "discarding superseded result");
            return;
        }
        entry.inflight = None;
        let kind = match result {
            Ok(value) => {
                entry.status = QueryStatus::Success;
                entry.data = Some(value.clone());
                entry.error = None;
                entry.stale = false;
                debug!(%key, request, "fetch succeeded");
                CacheEventKind::Updated
            }
            Err(err) => {
                entry.status = QueryStatus::Error;
                entry.error = Some(err.clone());
                debug!(%key, request, error = %err, "fetch failed");
                CacheEventKind::Failed
            }
        };
        (callbacks_for(&inner.subscribers, key), kind)
    };
    dispatch(&callbacks, key, kind);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
