//! # taskdeck-core
//!
//! Foundation types for the taskdeck client: the project/task data model,
//! typed partial patches, the pure derivation rules (task status from
//! subtasks, project progress, dashboard counters), task form validation,
//! the error taxonomy shared by every layer, and logging setup.

#![deny(unsafe_code)]

pub mod derive;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod types;
pub mod validation;

pub use errors::{StoreError, StoreResult, ValidationErrors};
pub use ids::{ProjectId, TaskId};
pub use types::{
    Comment, Project, ProjectPatch, Subtask, Task, TaskPatch, TaskPriority, TaskStatus,
};
