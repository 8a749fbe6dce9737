//! API key authentication for providers and administrators.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use sqlx::PgPool;

use crate::app::AppState;
use crate::error::ApiError;
use persistence::repositories::ApiKeyRepository;
use shared::crypto::{sha256_hex, API_KEY_PREFIX};

/// Header carrying the raw API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Shortest key worth hashing: the prefix plus 8 characters.
const MIN_KEY_LEN: usize = API_KEY_PREFIX.len() + 8;

/// Authenticated API key information, stored in request extensions by the
/// auth middleware.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    pub api_key_id: i64,
    /// Display prefix, the 8 characters after `ak_`.
    pub key_prefix: String,
    pub is_admin: bool,
}

impl ApiKeyAuth {
    /// Identifies the key in logs without exposing its prefix.
    pub fn provider_label(&self) -> String {
        format!("api_key:{}", self.api_key_id)
    }

    pub async fn validate(pool: &PgPool, api_key: &str) -> Result<Self, ApiError> {
        if api_key.len() < MIN_KEY_LEN || !api_key.starts_with(API_KEY_PREFIX) {
            return Err(ApiError::Unauthorized(
                "Invalid or missing API key".to_string(),
            ));
        }

        let repo = ApiKeyRepository::new(pool.clone());
        let key = repo
            .find_by_key_hash(&sha256_hex(api_key))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "API key lookup failed");
                ApiError::ServiceUnavailable("Authentication service unavailable".to_string())
            })?
            .ok_or_else(|| ApiError::Unauthorized("Invalid or missing API key".to_string()))?;

        if !key.is_valid_at(Utc::now()) {
            let message = if key.is_active {
                "API key has expired"
            } else {
                "Invalid or missing API key"
            };
            return Err(ApiError::Unauthorized(message.to_string()));
        }

        let key_id = key.id;
        tokio::spawn(async move {
            if let Err(e) = repo.update_last_used(key_id).await {
                tracing::warn!(api_key_id = key_id, error = %e, "Failed to update API key last_used_at");
            }
        });

        Ok(ApiKeyAuth {
            api_key_id: key.id,
            key_prefix: key.key_prefix,
            is_admin: key.is_admin,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<ApiKeyAuth>() {
            return Ok(auth.clone());
        }

        let api_key = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Invalid or missing API key".to_string()))?;

        Self::validate(&state.pool, api_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_label() {
        let auth = ApiKeyAuth {
            api_key_id: 17,
            key_prefix: "Q2xpbmlj".to_string(),
            is_admin: false,
        };
        assert_eq!(auth.provider_label(), "api_key:17");
    }

    #[test]
    fn test_min_key_len_covers_prefix() {
        assert_eq!(MIN_KEY_LEN, 11);
    }
}
