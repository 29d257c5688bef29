//! # taskdeck-store
//!
//! Client side of the collection-oriented JSON store.
//!
//! - [`RemoteStore`]: the five CRUD verbs over raw JSON, object-safe
//! - [`HttpStore`]: `reqwest` implementation against the HTTP API
//! - [`MemoryStore`]: in-process implementation with the same semantics,
//!   failure injection, and call counters
//! - [`StoreClient`]: typed projects/tasks API over any [`RemoteStore`]
//!
//! No business logic lives here and nothing is retried: every failure is
//! returned to the caller as a [`StoreError`](taskdeck_core::StoreError).

#![deny(unsafe_code)]

pub mod client;
pub mod http;
pub mod memory;
pub mod remote;

pub use client::StoreClient;
pub use http::HttpStore;
pub use memory::{MemoryStore, StoreOp};
pub use remote::{Collection, Filter, RemoteStore};
