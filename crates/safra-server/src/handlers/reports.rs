//! Cost report handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{request_account, AppError, AppState};
use safra_core::models::{CostDetail, CostReport, FieldSnapshot, Indicators, MacroGroup};
use safra_core::period::today;
use safra_core::{CostAllocator, CostFilter, DateWindow, InsumosBreakdown};

/// Query parameters shared by the cost-per-field endpoints
#[derive(Debug, Default, Deserialize)]
pub struct CostReportQuery {
    /// Harvest season, e.g. "2024/2025"
    pub safra: Option<String>,
    /// Month, e.g. "2025-03"; wins over `safra`
    pub month: Option<String>,
    /// Comma-separated field ids or names
    pub fields: Option<String>,
    pub property_id: Option<String>,
    pub macro_group: Option<String>,
}

impl CostReportQuery {
    fn to_filter(&self) -> Result<CostFilter, AppError> {
        let macro_group = self
            .macro_group
            .as_deref()
            .map(MacroGroup::parse_filter)
            .transpose()
            .map_err(|e| AppError::bad_request(&e))?
            .flatten();

        Ok(CostFilter {
            month: self.month.clone().filter(|s| !s.is_empty()),
            safra: self.safra.clone().filter(|s| !s.is_empty()),
            fields: self
                .fields
                .as_deref()
                .map(crate::parse_list)
                .unwrap_or_default(),
            property_id: self.property_id.clone().filter(|s| !s.is_empty()),
            macro_group,
        })
    }
}

fn parse_date(value: Option<&str>, name: &str) -> Result<Option<NaiveDate>, AppError> {
    value
        .filter(|s| !s.is_empty())
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| AppError::bad_request(&format!("Invalid {} date format (use YYYY-MM-DD)", name)))
}

/// GET /api/reports/cost-per-field - Per-field cost breakdown
pub async fn cost_per_field(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CostReportQuery>,
    headers: HeaderMap,
) -> Result<Json<CostReport>, AppError> {
    let account = request_account(&headers, &state.config);
    let filter = params.to_filter()?;

    let allocator = CostAllocator::new(&state.db, &state.classifier);
    let report = allocator.cost_per_field(&account, &filter, today())?;

    state.db.log_audit(
        &account,
        "report",
        Some("cost_per_field"),
        None,
        Some(&format!(
            "from={}, to={}, rows={}, warnings={}",
            report.period.from,
            report.period.to,
            report.rows.len(),
            report.warnings.len()
        )),
    )?;

    Ok(Json(report))
}

/// GET /api/reports/cost-per-field/:field_id/details - Line items of one field
pub async fn field_details(
    State(state): State<Arc<AppState>>,
    Path(field_id): Path<String>,
    Query(params): Query<CostReportQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<CostDetail>>, AppError> {
    let account = request_account(&headers, &state.config);
    let filter = params.to_filter()?;

    let allocator = CostAllocator::new(&state.db, &state.classifier);
    let details = allocator.field_details(&account, &field_id, &filter, today())?;

    Ok(Json(details))
}

/// Query parameters for the input-cost breakdown
#[derive(Debug, Deserialize)]
pub struct InsumosQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// GET /api/reports/insumos - Input costs per field
pub async fn insumos(
    State(state): State<Arc<AppState>>,
    Query(params): Query<InsumosQuery>,
    headers: HeaderMap,
) -> Result<Json<InsumosBreakdown>, AppError> {
    let account = request_account(&headers, &state.config);
    let window = DateWindow {
        start: parse_date(params.from.as_deref(), "from")?,
        end: parse_date(params.to.as_deref(), "to")?,
    };

    let allocator = CostAllocator::new(&state.db, &state.classifier);
    Ok(Json(allocator.insumos_by_field(&account, &window)))
}

/// GET /api/reports/indicators - Headline figures
pub async fn indicators(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CostReportQuery>,
    headers: HeaderMap,
) -> Result<Json<Indicators>, AppError> {
    let account = request_account(&headers, &state.config);
    let filter = params.to_filter()?;

    let allocator = CostAllocator::new(&state.db, &state.classifier);
    Ok(Json(allocator.indicators(&account, &filter, today())?))
}

/// Query parameters for the revenue-inclusive snapshot
#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    /// Cut-off date, defaults to today
    pub date: Option<String>,
}

/// GET /api/reports/snapshot - Per-field totals including revenue
pub async fn snapshot(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SnapshotQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<FieldSnapshot>>, AppError> {
    let account = request_account(&headers, &state.config);
    let up_to = parse_date(params.date.as_deref(), "snapshot")?.unwrap_or_else(today);

    let allocator = CostAllocator::new(&state.db, &state.classifier);
    Ok(Json(allocator.snapshot(&account, up_to)?))
}
