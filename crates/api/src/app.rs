use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use domain::CardServices;
use shared::jwt::JwtConfig;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{Config, JwtAuthConfig};
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, require_admin, require_auth,
    security_headers_middleware, trace_id, verify_rate_limit_middleware, RateLimiterState,
};
use crate::routes::{analytics, batches, cards, health, templates, verification};

/// Lifetime of tokens minted when a signing key is configured.
const LOCAL_TOKEN_EXPIRY_SECS: i64 = 3600;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub services: CardServices,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
    pub verify_rate_limiter: Option<Arc<RateLimiterState>>,
    /// Member session verification; `None` when no issuer key is configured.
    pub jwt: Option<Arc<JwtConfig>>,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Self {
        let services = CardServices::new(persistence::pg_stores(pool.clone()), config.card_settings());
        let rate_limiter = RateLimiterState::new(config.security.rate_limit_per_minute).map(Arc::new);
        let verify_rate_limiter =
            RateLimiterState::new(config.security.verify_rate_limit_per_minute).map(Arc::new);
        let jwt = member_session_verifier(&config.jwt).map(Arc::new);

        Self {
            pool,
            config: Arc::new(config),
            services,
            rate_limiter,
            verify_rate_limiter,
            jwt,
        }
    }
}

fn member_session_verifier(config: &JwtAuthConfig) -> Option<JwtConfig> {
    if config.public_key.trim().is_empty() {
        tracing::warn!("jwt.public_key is not set; member card downloads are disabled");
        return None;
    }

    let result = if config.private_key.trim().is_empty() {
        JwtConfig::verifier(&config.public_key, config.leeway_secs)
    } else {
        JwtConfig::new(
            &config.private_key,
            &config.public_key,
            LOCAL_TOKEN_EXPIRY_SECS,
            config.leeway_secs,
        )
    };

    match result {
        Ok(jwt) => Some(jwt),
        Err(e) => {
            tracing::warn!(error = %e, "Invalid member session keys; member card downloads are disabled");
            None
        }
    }
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    build_router(AppState::new(config, pool))
}

pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Verification carries its own, tighter budget on top of the general one.
    let verify_routes = Router::new()
        .route("/api/v1/cards/verify", post(verification::verify_card))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            verify_rate_limit_middleware,
        ));

    // Provider routes (API key). Auth is the outermost layer so the rate
    // limiters can key on the authenticated API key.
    let provider_routes = Router::new()
        .route("/api/v1/cards/generate", post(cards::generate_cards))
        .route(
            "/api/v1/cards/member/:member_id",
            get(cards::list_member_cards),
        )
        .route("/api/v1/cards/:card_id", get(cards::get_card))
        .route(
            "/api/v1/cards/:card_id/status",
            put(cards::update_card_status),
        )
        .route("/api/v1/cards/:card_id/replace", post(cards::replace_card))
        .route(
            "/api/v1/cards/:card_id/verifications",
            get(cards::card_verifications),
        )
        .merge(verify_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Admin routes (admin API key)
    let admin_routes = Router::new()
        .route(
            "/api/v1/cards/verifications",
            get(analytics::list_verifications),
        )
        .route(
            "/api/v1/cards/analytics/usage",
            get(analytics::usage_statistics),
        )
        .route(
            "/api/v1/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/api/v1/templates/:template_id",
            get(templates::get_template).put(templates::update_template),
        )
        .route("/api/v1/batches", get(batches::list_batches))
        .route("/api/v1/batches/:batch_id", get(batches::get_batch))
        .route(
            "/api/v1/batches/:batch_id/cards",
            get(batches::list_batch_cards),
        )
        .route(
            "/api/v1/batches/:batch_id/status",
            put(batches::advance_batch),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Member routes (session token, checked by the MemberAuth extractor)
    let member_routes = Router::new().route(
        "/api/v1/cards/member/download-card/:card_id",
        get(cards::download_card),
    );

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(provider_routes)
        .merge(admin_routes)
        .merge(member_routes)
        // Global middleware (bottom layers run first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
