//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod allocations;
pub mod audit;
pub mod debts;
pub mod fields;
pub mod reports;
pub mod stock;

// Re-export all handlers for use in router
pub use allocations::*;
pub use audit::*;
pub use debts::*;
pub use fields::*;
pub use reports::*;
pub use stock::*;

use axum::Json;

/// GET /api/health - Liveness check
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
