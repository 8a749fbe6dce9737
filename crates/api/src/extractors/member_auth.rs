//! Member session extractor.
//!
//! Members authenticate with an RS256 Bearer token minted by the external
//! session service. Only the subject (member ID) is used here.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use shared::jwt::{JwtConfig, JwtError};

use crate::app::AppState;
use crate::error::ApiError;

/// The member a request was made on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberAuth {
    pub member_id: i64,
}

impl MemberAuth {
    pub fn from_header(jwt: &JwtConfig, header: Option<&str>) -> Result<Self, ApiError> {
        let header = header
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;
        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("Invalid Authorization header format".to_string())
        })?;

        let member_id = jwt.validate_member_token(token).map_err(|e| match e {
            JwtError::TokenExpired => ApiError::Unauthorized("Session has expired".to_string()),
            _ => ApiError::Unauthorized("Invalid or expired token".to_string()),
        })?;

        Ok(Self { member_id })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MemberAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jwt = state.jwt.as_deref().ok_or_else(|| {
            ApiError::ServiceUnavailable("Member sessions are not configured".to_string())
        })?;

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        Self::from_header(jwt, header)
    }
}
