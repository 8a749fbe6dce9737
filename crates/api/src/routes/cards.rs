//! Card lifecycle routes for providers and members.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    Json,
};
use domain::models::card::{
    GenerateCardsRequest, MemberCard, ReplaceCardRequest, UpdateCardStatusRequest,
};
use domain::models::verification::VerificationPage;
use domain::services::DigitalCardDownload;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{
    extract_path, extract_query, extract_validated_json, ApiKeyAuth, MemberAuth,
};
use crate::middleware::metrics::record_cards_issued;
use crate::response::ApiResponse;

/// Paging parameters for a card's verification history.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

/// POST /api/v1/cards/generate
///
/// `cardType` selects one physical card, one digital card, or one of each
/// (`both`). Every card is stored or none is; physical cards join the pending
/// production batch in the same write.
pub async fn generate_cards(
    State(state): State<AppState>,
    Extension(auth): Extension<ApiKeyAuth>,
    body: Result<Json<GenerateCardsRequest>, JsonRejection>,
) -> Result<ApiResponse<Vec<MemberCard>>, ApiError> {
    let request = extract_validated_json(body)?;
    let member_id = request.member_id;

    let cards = state.services.lifecycle.generate_cards(request).await?;
    record_cards_issued(&cards);

    info!(
        member_id,
        issued = cards.len(),
        issuer = %auth.provider_label(),
        "Cards generated"
    );

    let message = format!("Issued {} card(s)", cards.len());
    Ok(ApiResponse::created(cards).with_message(message))
}

/// GET /api/v1/cards/member/:member_id
pub async fn list_member_cards(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<Vec<MemberCard>>, ApiError> {
    let member_id = extract_path(path)?;
    let cards = state.services.lifecycle.list_member_cards(member_id).await?;
    Ok(ApiResponse::ok(cards))
}

/// GET /api/v1/cards/:card_id
pub async fn get_card(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<MemberCard>, ApiError> {
    let card_id = extract_path(path)?;
    let card = state.services.lifecycle.get_card(card_id).await?;
    Ok(ApiResponse::ok(card))
}

/// PUT /api/v1/cards/:card_id/status
pub async fn update_card_status(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateCardStatusRequest>, JsonRejection>,
) -> Result<ApiResponse<MemberCard>, ApiError> {
    let card_id = extract_path(path)?;
    let request = extract_validated_json(body)?;

    let card = state
        .services
        .lifecycle
        .update_status(card_id, request)
        .await?;

    Ok(ApiResponse::ok(card).with_message("Card status updated"))
}

/// POST /api/v1/cards/:card_id/replace
///
/// Returns the new card. The original keeps its status and is linked to it.
pub async fn replace_card(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ReplaceCardRequest>, JsonRejection>,
) -> Result<ApiResponse<MemberCard>, ApiError> {
    let card_id = extract_path(path)?;
    let request = extract_validated_json(body)?;

    let replacement = state
        .services
        .lifecycle
        .request_replacement(card_id, request)
        .await?;
    record_cards_issued(std::slice::from_ref(&replacement));

    Ok(ApiResponse::created(replacement).with_message("Replacement card issued"))
}

/// GET /api/v1/cards/:card_id/verifications
pub async fn card_verifications(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<ApiResponse<VerificationPage>, ApiError> {
    let card_id = extract_path(path)?;
    let query = extract_query(query)?;

    let page = state
        .services
        .verifier
        .card_history(card_id, query.cursor.as_deref(), query.limit)
        .await?;
    Ok(ApiResponse::ok(page))
}

/// GET /api/v1/cards/member/download-card/:card_id
///
/// Member-facing; only the card's owner can download it.
pub async fn download_card(
    State(state): State<AppState>,
    auth: MemberAuth,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<DigitalCardDownload>, ApiError> {
    let card_id = extract_path(path)?;
    let download = state
        .services
        .lifecycle
        .digital_card(auth.member_id, card_id)
        .await?;
    Ok(ApiResponse::ok(download))
}
