use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::CardError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Member ineligible: {0}")]
    Ineligible(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {} field(s) invalid", .0.len())]
    InvalidFields(Vec<ValidationDetail>),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// `{ "success": false, "error": ..., "message": ..., "details"?: [...] }`
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

impl ApiError {
    fn parts(self) -> (StatusCode, &'static str, String, Option<Vec<ValidationDetail>>) {
        match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::InvalidTransition { from, to } => (
                StatusCode::CONFLICT,
                "invalid_transition",
                format!("Cannot change status from {} to {}", from, to),
                None,
            ),
            ApiError::Ineligible(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "member_ineligible",
                msg,
                None,
            ),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg, None),
            ApiError::InvalidFields(details) => {
                let message = match details.as_slice() {
                    [only] => format!("{}: {}", only.field, only.message),
                    _ => format!("{} validation errors", details.len()),
                };
                (
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    message,
                    Some(details),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message, details) = self.parts();
        let body = ErrorBody {
            success: false,
            error,
            message,
            details,
        };
        (status, Json(body)).into_response()
    }
}

impl From<CardError> for ApiError {
    fn from(err: CardError) -> Self {
        match err {
            CardError::NotFound(resource) => ApiError::NotFound(format!("{} not found", resource)),
            CardError::InvalidTransition { from, to } => ApiError::InvalidTransition { from, to },
            CardError::Conflict(msg) => ApiError::Conflict(msg),
            CardError::Ineligible(reason) => ApiError::Ineligible(reason),
            CardError::Validation(msg) => ApiError::Validation(msg),
            CardError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::InvalidFields(details)
    }
}
