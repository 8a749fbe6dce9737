//! Mapping from sqlx errors to storage port errors.

use domain::StoreError;

/// Unique constraint on `member_cards.verification_token`.
pub const TOKEN_UNIQUE_CONSTRAINT: &str = "uq_member_cards_token";

/// Converts a sqlx error into the domain storage error.
pub fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(db.constraint().unwrap_or("unique").to_string())
        }
        _ => {
            tracing::error!(error = %err, "Database operation failed");
            StoreError::Backend(err.to_string())
        }
    }
}

/// True when the error is a unique violation on the named constraint.
pub fn is_unique_violation_on(err: &sqlx::Error, constraint: &str) -> bool {
    matches!(err, sqlx::Error::Database(db)
        if db.is_unique_violation() && db.constraint() == Some(constraint))
}
