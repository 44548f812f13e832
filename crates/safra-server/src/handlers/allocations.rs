//! Manual field allocation handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{read_json, request_account, AppError, AppState};
use safra_core::models::{AllocationInput, FieldAllocation};

/// Request body for replacing allocations
#[derive(Debug, Deserialize)]
pub struct AllocationsRequest {
    pub allocations: Vec<AllocationInput>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: usize,
}

/// The transaction must belong to the requesting account
fn ensure_transaction(state: &AppState, account: &str, id: &str) -> Result<(), AppError> {
    state
        .db
        .get_transaction(account, id)?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("Transaction not found"))
}

/// GET /api/transactions/:id/allocations - List a transaction's allocations
pub async fn list_allocations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<FieldAllocation>>, AppError> {
    let account = request_account(&headers, &state.config);
    ensure_transaction(&state, &account, &id)?;

    Ok(Json(state.db.list_allocations(&id)?))
}

/// PUT /api/transactions/:id/allocations - Replace a transaction's allocations
pub async fn replace_allocations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Vec<FieldAllocation>>, AppError> {
    let account = request_account(request.headers(), &state.config);
    let req: AllocationsRequest = read_json(request).await?;
    ensure_transaction(&state, &account, &id)?;

    state.db.replace_allocations(&id, &req.allocations)?;

    state.db.log_audit(
        &account,
        "allocate",
        Some("transaction"),
        Some(&id),
        Some(&format!("fields={}", req.allocations.len())),
    )?;

    Ok(Json(state.db.list_allocations(&id)?))
}

/// DELETE /api/transactions/:id/allocations - Remove a transaction's allocations
pub async fn delete_allocations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<DeletedResponse>, AppError> {
    let account = request_account(&headers, &state.config);
    ensure_transaction(&state, &account, &id)?;

    let deleted = state.db.delete_allocations(&id)?;

    state.db.log_audit(
        &account,
        "unallocate",
        Some("transaction"),
        Some(&id),
        Some(&format!("deleted={}", deleted)),
    )?;

    Ok(Json(DeletedResponse { deleted }))
}
