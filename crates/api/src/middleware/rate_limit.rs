//! Per API key rate limiting.
//!
//! Every authenticated route shares one budget per key. Card verification
//! has a second, tighter budget so a leaked provider key cannot be used to
//! enumerate tokens quickly.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovRateLimiter,
};
use serde_json::json;
use std::{
    collections::HashMap,
    num::NonZeroU32,
    sync::{Arc, RwLock},
};

use crate::app::AppState;
use crate::extractors::api_key::ApiKeyAuth;

type KeyRateLimiter = GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// One governor limiter per API key ID.
pub struct RateLimiterState {
    limiters: RwLock<HashMap<i64, Arc<KeyRateLimiter>>>,
    per_minute: NonZeroU32,
}

impl RateLimiterState {
    /// Returns `None` when `per_minute` is 0 (limiting disabled).
    pub fn new(per_minute: u32) -> Option<Self> {
        NonZeroU32::new(per_minute).map(|per_minute| Self {
            limiters: RwLock::new(HashMap::new()),
            per_minute,
        })
    }

    pub fn per_minute(&self) -> u32 {
        self.per_minute.get()
    }

    fn limiter_for(&self, key_id: i64) -> Arc<KeyRateLimiter> {
        if let Some(limiter) = self
            .limiters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key_id)
        {
            return limiter.clone();
        }

        self.limiters
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key_id)
            .or_insert_with(|| Arc::new(GovRateLimiter::direct(Quota::per_minute(self.per_minute))))
            .clone()
    }

    /// `Err(retry_after_secs)` when the key has exhausted its budget.
    pub fn check(&self, key_id: i64) -> Result<(), u64> {
        self.limiter_for(key_id).check().map_err(|not_until| {
            not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1)
        })
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("per_minute", &self.per_minute)
            .field(
                "active_limiters",
                &self.limiters.read().map(|l| l.len()).unwrap_or(0),
            )
            .finish()
    }
}

async fn enforce(limiter: Option<&RateLimiterState>, req: Request<Body>, next: Next) -> Response {
    let Some(limiter) = limiter else {
        return next.run(req).await;
    };
    // Runs after auth; without a key the request never got this far.
    let Some(key_id) = req.extensions().get::<ApiKeyAuth>().map(|a| a.api_key_id) else {
        return next.run(req).await;
    };

    if let Err(retry_after) = limiter.check(key_id) {
        tracing::warn!(
            api_key_id = key_id,
            path = %req.uri().path(),
            retry_after,
            "Rate limit exceeded"
        );
        return rate_limited_response(limiter.per_minute(), retry_after);
    }

    next.run(req).await
}

/// General per-key budget for authenticated routes.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    enforce(state.rate_limiter.as_deref(), req, next).await
}

/// Verification-only per-key budget.
pub async fn verify_rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    enforce(state.verify_rate_limiter.as_deref(), req, next).await
}

fn rate_limited_response(limit: u32, retry_after: u64) -> Response {
    let body = json!({
        "success": false,
        "error": "rate_limited",
        "message": format!("Rate limit of {} requests/minute exceeded", limit),
        "retryAfter": retry_after
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}
