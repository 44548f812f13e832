//! Field registry handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{request_account, AppError, AppState};
use safra_core::models::{FarmOverview, Field, FieldQuery, Property};

/// GET /api/properties - List farm properties
pub async fn list_properties(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Property>>, AppError> {
    let account = request_account(&headers, &state.config);
    Ok(Json(state.db.list_properties(&account)?))
}

/// GET /api/safras - Harvest-season labels, newest first
pub async fn list_safras(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>, AppError> {
    let account = request_account(&headers, &state.config);
    Ok(Json(state.db.list_safras(&account)?))
}

/// Query parameters for listing fields
#[derive(Debug, Deserialize)]
pub struct FieldListQuery {
    pub property_id: Option<String>,
    pub crop: Option<String>,
    /// Only active fields
    #[serde(default)]
    pub active: bool,
}

/// GET /api/fields - List fields, excluding the default field
pub async fn list_fields(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FieldListQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<Field>>, AppError> {
    let account = request_account(&headers, &state.config);
    let query = FieldQuery {
        only_active: params.active,
        non_default_only: true,
        crop: params.crop,
        property_id: params.property_id,
    };
    Ok(Json(state.db.list_fields(&account, &query)?))
}

/// GET /api/farm/overview - Area and field counts
pub async fn farm_overview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<FarmOverview>, AppError> {
    let account = request_account(&headers, &state.config);
    Ok(Json(state.db.farm_overview(&account)?))
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub id: String,
    pub active: bool,
}

/// POST /api/fields/:id/toggle - Flip a field's active flag
pub async fn toggle_field(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ToggleResponse>, AppError> {
    let account = request_account(&headers, &state.config);
    let active = state.db.toggle_field_active(&account, &id)?;

    state.db.log_audit(
        &account,
        "toggle",
        Some("field"),
        Some(&id),
        Some(&format!("active={}", active)),
    )?;

    Ok(Json(ToggleResponse { id, active }))
}
