//! # taskdeck-sync
//!
//! Keeps views consistent with the remote store.
//!
//! - [`QueryCache`]: per-key load state with request de-duplication,
//!   stale-result discard, invalidation, and subscriptions
//! - [`MutationCoordinator`]: runs a write and invalidates exactly the
//!   keys it declares, only after the write succeeds
//! - [`actions`]: task and project writes, each with its key set
//! - [`projections`]: pure view shaping (tabs, search, overviews)
//! - [`Taskboard`]: the facade views talk to

#![deny(unsafe_code)]

pub mod actions;
pub mod board;
pub mod cache;
pub mod keys;
pub mod mutation;
pub mod projections;

pub use actions::Actions;
pub use board::{QueryData, Taskboard};
pub use cache::{CacheEvent, CacheEventKind, QueryCache, QueryState, QueryStatus, SubscriptionId};
pub use keys::QueryKey;
pub use mutation::{MutationCoordinator, project_keys, task_keys};
pub use projections::{Dashboard, ProjectOverview, StatusTab, TaskDetail};
