//! Production batch tracking for physical cards.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use domain::models::card::MemberCard;
use domain::models::production_batch::{
    AdvanceBatchRequest, AdvancedBatch, CardProductionBatch, ListBatchesQuery,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{extract_path, extract_query, extract_validated_json};
use crate::response::ApiResponse;

/// GET /api/v1/batches?status=
pub async fn list_batches(
    State(state): State<AppState>,
    query: Result<Query<ListBatchesQuery>, QueryRejection>,
) -> Result<ApiResponse<Vec<CardProductionBatch>>, ApiError> {
    let query = extract_query(query)?;
    let batches = state.services.batches.list_batches(query.status).await?;
    Ok(ApiResponse::ok(batches))
}

/// GET /api/v1/batches/:batch_id
pub async fn get_batch(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<CardProductionBatch>, ApiError> {
    let batch_id = extract_path(path)?;
    let batch = state.services.batches.get_batch(batch_id).await?;
    Ok(ApiResponse::ok(batch))
}

/// GET /api/v1/batches/:batch_id/cards
pub async fn list_batch_cards(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<Vec<MemberCard>>, ApiError> {
    let batch_id = extract_path(path)?;
    let cards = state.services.batches.list_batch_cards(batch_id).await?;
    Ok(ApiResponse::ok(cards))
}

/// PUT /api/v1/batches/:batch_id/status
///
/// Shipping requires a tracking number, which is copied onto every card in
/// the batch. Cancelling lists the batch's still-pending cards under
/// `strandedCardIds`.
pub async fn advance_batch(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<AdvanceBatchRequest>, JsonRejection>,
) -> Result<ApiResponse<AdvancedBatch>, ApiError> {
    let batch_id = extract_path(path)?;
    let request = extract_validated_json(body)?;

    let advanced = state
        .services
        .batches
        .advance_status(batch_id, request)
        .await?;
    Ok(ApiResponse::ok(advanced))
}
