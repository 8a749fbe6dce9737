//! Card template administration.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use domain::models::card_template::{
    CardTemplate, CreateTemplateRequest, ListTemplatesQuery, UpdateTemplateRequest,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{extract_path, extract_query, extract_validated_json};
use crate::response::ApiResponse;

/// GET /api/v1/templates?companyId=
pub async fn list_templates(
    State(state): State<AppState>,
    query: Result<Query<ListTemplatesQuery>, QueryRejection>,
) -> Result<ApiResponse<Vec<CardTemplate>>, ApiError> {
    let query = extract_query(query)?;
    let templates = state
        .services
        .templates
        .list_templates(query.company_id)
        .await?;
    Ok(ApiResponse::ok(templates))
}

/// POST /api/v1/templates
pub async fn create_template(
    State(state): State<AppState>,
    body: Result<Json<CreateTemplateRequest>, JsonRejection>,
) -> Result<ApiResponse<CardTemplate>, ApiError> {
    let request = extract_validated_json(body)?;
    let template = state.services.templates.create_template(request).await?;
    Ok(ApiResponse::created(template))
}

/// GET /api/v1/templates/:template_id
pub async fn get_template(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<CardTemplate>, ApiError> {
    let template_id = extract_path(path)?;
    let template = state.services.templates.get_template(template_id).await?;
    Ok(ApiResponse::ok(template))
}

/// PUT /api/v1/templates/:template_id
pub async fn update_template(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateTemplateRequest>, JsonRejection>,
) -> Result<ApiResponse<CardTemplate>, ApiError> {
    let template_id = extract_path(path)?;
    let request = extract_validated_json(body)?;
    let template = state
        .services
        .templates
        .update_template(template_id, request)
        .await?;
    Ok(ApiResponse::ok(template).with_message("Template updated"))
}
