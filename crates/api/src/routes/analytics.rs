//! Verification analytics for administrators.

use axum::extract::{rejection::QueryRejection, Query, State};
use domain::models::analytics::{UsageQuery, UsageStatistics};
use domain::models::verification::{ListVerificationsQuery, VerificationPage};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::extract_query;
use crate::response::ApiResponse;

/// GET /api/v1/cards/analytics/usage?memberId=&startDate=&endDate=
pub async fn usage_statistics(
    State(state): State<AppState>,
    query: Result<Query<UsageQuery>, QueryRejection>,
) -> Result<ApiResponse<UsageStatistics>, ApiError> {
    let query = extract_query(query)?;
    let stats = state.services.analytics.usage_statistics(query).await?;
    Ok(ApiResponse::ok(stats))
}

/// GET /api/v1/cards/verifications
///
/// Filters: `memberId`, `result`, `verificationType`, `from`, `to`. Paged by
/// an opaque `cursor`.
pub async fn list_verifications(
    State(state): State<AppState>,
    query: Result<Query<ListVerificationsQuery>, QueryRejection>,
) -> Result<ApiResponse<VerificationPage>, ApiError> {
    let query = extract_query(query)?;
    let page = state.services.analytics.list_verifications(query).await?;
    Ok(ApiResponse::ok(page))
}
