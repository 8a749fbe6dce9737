//! API key authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::api_key::{ApiKeyAuth, API_KEY_HEADER};

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<ApiKeyAuth, ApiError> {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Invalid or missing API key".to_string()))?;

    ApiKeyAuth::validate(&state.pool, api_key).await
}

/// Requires a valid `X-API-Key`. The authenticated key is stored in request
/// extensions for rate limiting and handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()).await {
        Ok(auth) => {
            req.extensions_mut().insert(auth);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

/// Requires a valid admin `X-API-Key`.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()).await {
        Ok(auth) if auth.is_admin => {
            req.extensions_mut().insert(auth);
            next.run(req).await
        }
        Ok(auth) => {
            tracing::warn!(api_key_id = auth.api_key_id, "Non-admin key rejected on admin route");
            ApiError::Forbidden("Admin access required".to_string()).into_response()
        }
        Err(err) => err.into_response(),
    }
}
