//! Stock handlers

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};

use crate::{request_account, AppError, AppState};
use safra_core::ProductGroup;

/// GET /api/stock/groups - Registered products clustered by similar name
pub async fn stock_groups(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProductGroup>>, AppError> {
    let account = request_account(&headers, &state.config);
    Ok(Json(state.db.stock_groups(&account)?))
}
