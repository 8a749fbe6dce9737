//! Common test utilities for integration tests.
//!
//! These helpers run the real router against a PostgreSQL database named by
//! `TEST_DATABASE_URL`. When it is unset the tests return early.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use member_cards_api::{
    app::{build_router, AppState},
    config::Config,
};
use persistence::repositories::ApiKeyRepository;
use fake::Fake;
use shared::jwt::JwtConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceExt;

pub const MEMBER_SESSION_SECRET: &str = "integration-test-member-session-secret";

/// Connects to the test database, or `None` when `TEST_DATABASE_URL` is unset.
pub async fn create_test_pool() -> Option<PgPool> {
    let database_url = std::env::var("TEST_DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    run_migrations(&pool).await;
    Some(pool)
}

/// Applies the persistence migrations. They are idempotent.
pub async fn run_migrations(pool: &PgPool) {
    let migration_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("persistence/src/migrations");

    let mut entries: Vec<_> = std::fs::read_dir(&migration_dir)
        .expect("Failed to read migrations directory")
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|ext| ext == "sql").unwrap_or(false))
        .collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let sql = std::fs::read_to_string(entry.path()).expect("Failed to read migration file");
        sqlx::raw_sql(&sql)
            .execute(pool)
            .await
            .expect("Failed to apply migration");
    }
}

/// Config for tests: rate limits off, member sessions configured separately.
pub fn test_config() -> Config {
    Config::load_for_test(&[
        (
            "database.url",
            std::env::var("TEST_DATABASE_URL")
                .unwrap_or_default()
                .as_str(),
        ),
        ("server.host", "127.0.0.1"),
        ("logging.format", "pretty"),
        ("security.rate_limit_per_minute", "0"),
        ("security.verify_rate_limit_per_minute", "0"),
        ("cards.verification_base_url", "https://verify.example.com/cards"),
    ])
    .expect("Failed to build test config")
}

pub fn member_sessions() -> JwtConfig {
    JwtConfig::new_for_testing(MEMBER_SESSION_SECRET)
}

/// Builds the router with an HS256 member session verifier.
pub fn create_test_app(config: Config, pool: PgPool) -> Router {
    let mut state = AppState::new(config, pool);
    state.jwt = Some(Arc::new(member_sessions()));
    build_router(state)
}

/// Mints a member session token accepted by [`create_test_app`].
pub fn member_token(member_id: i64) -> String {
    member_sessions()
        .issue_member_token(member_id)
        .expect("Failed to issue member token")
}

async fn insert_api_key(pool: &PgPool, name: &str, is_admin: bool) -> String {
    let api_key = format!("ak_test_{}", uuid::Uuid::new_v4().simple());
    let key_prefix =
        shared::crypto::extract_key_prefix(&api_key).expect("Test API key should have valid format");

    ApiKeyRepository::new(pool.clone())
        .create(
            &shared::crypto::sha256_hex(&api_key),
            key_prefix,
            name,
            is_admin,
            None,
        )
        .await
        .expect("Failed to create test API key");

    api_key
}

/// Creates a provider API key and returns the raw key.
pub async fn create_test_api_key(pool: &PgPool, name: &str) -> String {
    insert_api_key(pool, name, false).await
}

/// Creates an admin API key and returns the raw key.
pub async fn create_test_admin_api_key(pool: &PgPool, name: &str) -> String {
    insert_api_key(pool, name, true).await
}

/// A member row in the member store.
pub struct TestMember {
    pub id: i64,
    pub company_id: i64,
    pub coverage_status: &'static str,
    pub coverage_end_date: Option<chrono::NaiveDate>,
}

impl TestMember {
    /// A covered member with a random ID so tests do not collide.
    pub fn new() -> Self {
        Self {
            id: (1_000_000_i64..2_000_000_000_i64).fake(),
            company_id: (1_000_i64..1_000_000_i64).fake(),
            coverage_status: "active",
            coverage_end_date: None,
        }
    }

    pub fn with_coverage_status(mut self, status: &'static str) -> Self {
        self.coverage_status = status;
        self
    }
}

/// Inserts the member, replacing any previous row with the same ID.
pub async fn seed_member(pool: &PgPool, member: &TestMember) {
    sqlx::query(
        r#"
        INSERT INTO members (id, company_id, first_name, last_name, member_type,
                             date_of_birth, coverage_status, coverage_end_date)
        VALUES ($1, $2, 'Test', 'Member', 'subscriber', '1985-04-12', $3::coverage_status, $4)
        ON CONFLICT (id) DO UPDATE
        SET company_id = EXCLUDED.company_id,
            coverage_status = EXCLUDED.coverage_status,
            coverage_end_date = EXCLUDED.coverage_end_date
        "#,
    )
    .bind(member.id)
    .bind(member.company_id)
    .bind(member.coverage_status)
    .bind(member.coverage_end_date)
    .execute(pool)
    .await
    .expect("Failed to seed member");
}

/// Build a JSON request with API key authentication.
pub fn json_request_with_api_key(
    method: Method,
    uri: &str,
    body: serde_json::Value,
    api_key: &str,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("X-API-Key", api_key)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a GET request with API key authentication.
pub fn get_request_with_api_key(uri: &str, api_key: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("X-API-Key", api_key)
        .body(Body::empty())
        .unwrap()
}

/// Build a GET request with a member Bearer token.
pub fn get_request_with_member_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub async fn parse_response_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}

/// Sends a request and returns the status with the parsed body.
pub async fn send(app: &Router, request: Request<Body>) -> (axum::http::StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, parse_response_body(response).await)
}

/// Issues cards through the API and returns the `data` array.
pub async fn generate_cards(
    app: &Router,
    api_key: &str,
    member_id: i64,
    card_type: &str,
) -> Vec<serde_json::Value> {
    let (status, body) = send(
        app,
        json_request_with_api_key(
            Method::POST,
            "/api/v1/cards/generate",
            serde_json::json!({
                "memberId": member_id,
                "cardType": card_type,
                "shippingAddress": "1 Main St, Springfield",
            }),
            api_key,
        ),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::CREATED, "{}", body);
    body["data"].as_array().cloned().unwrap_or_default()
}

/// Fetches the owner's download and returns its QR payload.
pub async fn qr_code_data(app: &Router, member_id: i64, card_id: &str) -> String {
    let (status, body) = send(
        app,
        get_request_with_member_token(
            &format!("/api/v1/cards/member/download-card/{}", card_id),
            &member_token(member_id),
        ),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::OK, "{}", body);
    body["data"]["qrCodeData"]
        .as_str()
        .expect("download carries qrCodeData")
        .to_string()
}
