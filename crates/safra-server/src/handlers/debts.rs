//! Debt and financing handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{read_json, request_account, AppError, AppState, SuccessResponse};
use safra_core::models::{Debt, DebtStatus, DebtTotals, NewDebt};

/// Query parameters for listing debts
#[derive(Debug, Deserialize)]
pub struct DebtQuery {
    /// Ativa, Liquidada or Renegociada
    pub status: Option<String>,
    /// Contract type, e.g. "Custeio"
    pub kind: Option<String>,
}

/// GET /api/debts - List debts, newest contract first
pub async fn list_debts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DebtQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<Debt>>, AppError> {
    let account = request_account(&headers, &state.config);

    let status = params
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<DebtStatus>())
        .transpose()
        .map_err(|e| AppError::bad_request(&e))?;
    let kind = params.kind.as_deref().filter(|s| !s.is_empty());

    Ok(Json(state.db.list_debts(&account, status, kind)?))
}

/// GET /api/debts/:id - Get a specific debt
pub async fn get_debt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Debt>, AppError> {
    let account = request_account(&headers, &state.config);

    let debt = state
        .db
        .get_debt(&account, id)?
        .ok_or_else(|| AppError::not_found("Debt not found"))?;

    Ok(Json(debt))
}

/// POST /api/debts - Create a debt
pub async fn create_debt(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Debt>, AppError> {
    let account = request_account(request.headers(), &state.config);
    let new_debt: NewDebt = read_json(request).await?;

    let id = state.db.create_debt(&account, &new_debt)?;

    state.db.log_audit(
        &account,
        "create",
        Some("debt"),
        Some(&id.to_string()),
        Some(&format!(
            "name={}, creditor={}, amount={}",
            new_debt.name, new_debt.creditor, new_debt.contracted_amount
        )),
    )?;

    let debt = state
        .db
        .get_debt(&account, id)?
        .ok_or_else(|| AppError::not_found("Debt not found"))?;

    Ok(Json(debt))
}

/// PUT /api/debts/:id - Replace a debt's terms
pub async fn update_debt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Debt>, AppError> {
    let account = request_account(request.headers(), &state.config);
    let terms: NewDebt = read_json(request).await?;

    state.db.update_debt(&account, id, &terms)?;

    state
        .db
        .log_audit(&account, "update", Some("debt"), Some(&id.to_string()), None)?;

    let debt = state
        .db
        .get_debt(&account, id)?
        .ok_or_else(|| AppError::not_found("Debt not found"))?;

    Ok(Json(debt))
}

/// DELETE /api/debts/:id - Delete a debt
pub async fn delete_debt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    let account = request_account(&headers, &state.config);

    state.db.delete_debt(&account, id)?;

    state
        .db
        .log_audit(&account, "delete", Some("debt"), Some(&id.to_string()), None)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/debts/:id/settle - Mark a debt as paid off
pub async fn settle_debt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    let account = request_account(&headers, &state.config);

    state.db.settle_debt(&account, id)?;

    state
        .db
        .log_audit(&account, "settle", Some("debt"), Some(&id.to_string()), None)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/debts/:id/renegotiate - Mark a debt as renegotiated
pub async fn renegotiate_debt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    let account = request_account(&headers, &state.config);

    state.db.renegotiate_debt(&account, id)?;

    state.db.log_audit(
        &account,
        "renegotiate",
        Some("debt"),
        Some(&id.to_string()),
        None,
    )?;

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/debts/totals - Contracted amounts per status
pub async fn debt_totals(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DebtTotals>, AppError> {
    let account = request_account(&headers, &state.config);
    Ok(Json(state.db.debt_totals(&account)?))
}
