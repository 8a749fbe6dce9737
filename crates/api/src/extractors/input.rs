//! Body, path and query extraction with envelope-shaped rejections.
//!
//! Handlers take `Result<Extractor<T>, Rejection>` and unwrap it through
//! these helpers so that malformed input uses the same error envelope as
//! every other failure.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::Json;
use validator::Validate;

use crate::error::ApiError;

pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    result
        .map(|Json(value)| value)
        .map_err(|err| ApiError::Validation(err.body_text()))
}

/// Unwraps a JSON body and runs its `validator` rules.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    let value = extract_json(result)?;
    value.validate()?;
    Ok(value)
}

pub fn extract_path<T>(result: Result<Path<T>, PathRejection>) -> Result<T, ApiError> {
    result
        .map(|Path(value)| value)
        .map_err(|err| ApiError::Validation(err.body_text()))
}

pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    result
        .map(|Query(value)| value)
        .map_err(|err| ApiError::Validation(err.body_text()))
}
