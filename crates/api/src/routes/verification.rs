//! Point-of-care card verification.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use domain::models::verification::{VerificationOutcome, VerifyCardRequest};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::extract_validated_json;
use crate::middleware::metrics::record_verification;
use crate::response::ApiResponse;

/// POST /api/v1/cards/verify
///
/// A failed verification is still a 200: the outcome carries `valid: false`
/// and a failure code. Only malformed requests are rejected.
pub async fn verify_card(
    State(state): State<AppState>,
    body: Result<Json<VerifyCardRequest>, JsonRejection>,
) -> Result<ApiResponse<VerificationOutcome>, ApiError> {
    let request = extract_validated_json(body)?;

    let outcome = state.services.verifier.verify(&request).await;
    record_verification(&outcome);

    Ok(ApiResponse::ok(outcome))
}
