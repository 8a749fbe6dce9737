//! Security headers added to every response.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;

/// Adds `X-Content-Type-Options`, `X-Frame-Options`, `Cache-Control` and,
/// when `security.hsts_enabled` is set, `Strict-Transport-Security`.
///
/// Responses can carry verification tokens, so nothing is cacheable.
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    apply_security_headers(&mut response, state.config.security.hsts_enabled);
    response
}

fn apply_security_headers(response: &mut Response, hsts_enabled: bool) {
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers
        .entry(header::CACHE_CONTROL)
        .or_insert(HeaderValue::from_static("no-store"));

    if hsts_enabled {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_headers_without_hsts() {
        let mut response = "ok".into_response();
        apply_security_headers(&mut response, false);

        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert!(!headers.contains_key(header::STRICT_TRANSPORT_SECURITY));
    }

    #[test]
    fn test_hsts_when_enabled() {
        let mut response = "ok".into_response();
        apply_security_headers(&mut response, true);
        assert!(response
            .headers()
            .contains_key(header::STRICT_TRANSPORT_SECURITY));
    }

    #[test]
    fn test_existing_cache_control_is_kept() {
        let mut response = (
            [(header::CACHE_CONTROL, "public, max-age=60")],
            "ok",
        )
            .into_response();
        apply_security_headers(&mut response, false);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "public, max-age=60");
    }
}
