//! Domain error types.

use thiserror::Error;

/// Errors raised by storage ports.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    /// The row changed since it was read (optimistic concurrency check failed).
    #[error("Version conflict")]
    VersionConflict,

    #[error("Duplicate value: {0}")]
    Duplicate(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Errors raised by card management operations.
#[derive(Debug, Error)]
pub enum CardError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Member is not eligible: {0}")]
    Ineligible(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CardError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        CardError::NotFound(resource.into())
    }

    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        CardError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl From<StoreError> for CardError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => CardError::NotFound("Record".to_string()),
            StoreError::VersionConflict => CardError::Conflict(
                "Record was modified concurrently; re-read it and retry".to_string(),
            ),
            StoreError::Duplicate(what) => CardError::Conflict(format!("Duplicate {}", what)),
            StoreError::Backend(msg) => CardError::Internal(msg),
        }
    }
}
