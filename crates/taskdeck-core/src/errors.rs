//! Error taxonomy shared by the store client, the query cache, and the
//! mutation coordinator.
//!
//! - [`StoreError::NotFound`]: single-entity fetch failed (absent or unreachable)
//! - [`StoreError::RequestFailed`]: non-2xx response on any other call
//! - [`StoreError::ValidationFailed`]: local input rejected before any request
//! - [`StoreError::Transport`]: the store could not be reached
//! - [`StoreError::Decode`]: a 2xx response carried an unexpected body
//!
//! Errors are `Clone` so one in-flight result can be handed to every waiter
//! and kept as a cache entry's error at the same time.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single failed form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field path, e.g. `title` or `subtasks.1.title`.
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

/// Every failed field of a validated form, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed field.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Whether no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failed fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// All failures.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Message for a field, if it failed.
    #[must_use]
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Failure of a store round-trip or of local validation ahead of one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The entity is absent, or the store was unreachable for a
    /// single-entity fetch.
    #[error("{collection}/{id} not found")]
    NotFound {
        /// Collection name (`projects`, `tasks`).
        collection: String,
        /// Requested ID.
        id: String,
    },

    /// The store answered with a non-2xx status.
    #[error("Request failed: {status} ({method} {url})")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// HTTP method.
        method: String,
        /// Request URL or path.
        url: String,
    },

    /// Local input failed validation; no request was sent.
    #[error("validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    /// The store could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// A successful response could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl StoreError {
    /// Build a `NotFound` error.
    #[must_use]
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Build a `RequestFailed` error.
    #[must_use]
    pub fn request_failed(status: u16, method: impl Into<String>, url: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            method: method.into(),
            url: url.into(),
        }
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a view should offer to retry the failed operation.
    ///
    /// Validation failures need corrected input, not a retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::ValidationFailed(_))
    }
}

impl From<ValidationErrors> for StoreError {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationFailed(errors)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn not_found_display() {
        let err = StoreError::not_found("tasks", "42");
        assert_eq!(err.to_string(), "tasks/42 not found");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn request_failed_carries_status() {
        let err = StoreError::request_failed(500, "PATCH", "/tasks/1");
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("Request failed: 500"));
    }

    #[test]
    fn validation_errors_display_and_lookup() {
        let mut errors = ValidationErrors::new();
        errors.push("title", "Title is required");
        errors.push("dueDate", "Due date is required");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.message_for("title"), Some("Title is required"));
        assert_eq!(errors.message_for("priority"), None);
        assert_eq!(
            errors.to_string(),
            "title: Title is required; dueDate: Due date is required"
        );
    }

    #[test]
    fn into_result_empty_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
        let mut errors = ValidationErrors::new();
        errors.push("title", "Title is required");
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn validation_not_retryable() {
        let err: StoreError = ValidationErrors::new().into();
        assert!(!err.is_retryable());
        assert!(StoreError::Transport("refused".into()).is_retryable());
        assert!(StoreError::not_found("tasks", "1").is_retryable());
    }

    #[test]
    fn json_error_becomes_decode() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err: StoreError = json_err.into();
        assert_matches!(err, StoreError::Decode(_));
    }
}
