//! Prometheus metrics: HTTP middleware, card counters and the scrape handler.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{header, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::card::MemberCard;
use domain::models::verification::{FailureCode, VerificationOutcome};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

use crate::app::AppState;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Records `http_requests_total{method,path,status}` and
/// `http_request_duration_seconds{method,path}`.
///
/// The path label is the matched route template so card IDs do not explode
/// label cardinality.
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = method_to_str(req.method());
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    counter!(
        "http_requests_total",
        "method" => method,
        "path" => path.clone(),
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(start.elapsed().as_secs_f64());

    response
}

fn method_to_str(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        _ => "OTHER",
    }
}

/// `cards_issued_total{card_type}`, one increment per card.
pub fn record_cards_issued(cards: &[MemberCard]) {
    for card in cards {
        counter!("cards_issued_total", "card_type" => card.card_type.as_str()).increment(1);
    }
}

/// `card_verifications_total{result,failure_code}`.
pub fn record_verification(outcome: &VerificationOutcome) {
    let (result, code) = verification_labels(outcome);
    counter!(
        "card_verifications_total",
        "result" => result,
        "failure_code" => code
    )
    .increment(1);
}

fn verification_labels(outcome: &VerificationOutcome) -> (&'static str, &'static str) {
    if outcome.valid {
        return ("success", "none");
    }
    let code = match outcome.failure_code {
        Some(FailureCode::CardNotFound) => "card_not_found",
        Some(FailureCode::CardReported) => "card_reported",
        Some(FailureCode::CardInactive) => "card_inactive",
        Some(FailureCode::CardExpired) => "card_expired",
        Some(FailureCode::MemberIneligible) => "member_ineligible",
        Some(FailureCode::MemberNotFound) => "member_not_found",
        Some(FailureCode::InternalError) | None => "internal_error",
    };
    ("failed", code)
}

/// GET /metrics
///
/// Connection pool gauges are refreshed on every scrape.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    persistence::metrics::record_pool_metrics(&state.pool);

    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized",
        )
            .into_response(),
    }
}

/// Installs the global Prometheus recorder. Later calls are no-ops.
pub fn init_metrics() -> Result<(), BuildError> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(&[0.001, 0.005, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0])?
        .install_recorder()?;
    let _ = PROMETHEUS_HANDLE.set(handle);
    Ok(())
}
