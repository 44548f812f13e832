//! Safra Web Server
//!
//! Axum-based JSON API over the Safra farm cost tool.
//!
//! Security features:
//! - API-key authentication (enabled whenever keys are configured)
//! - Restrictive CORS policy
//! - Security headers on every response
//! - Audit logging for every write
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use safra_core::{Classifier, Database};

mod handlers;

/// Maximum JSON request body (1 MB)
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Maximum audit log page
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Header naming the account a request acts on
pub const ACCOUNT_HEADER: &str = "x-safra-account";

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// API keys accepted as "Bearer <key>"; empty disables authentication
    pub api_keys: Vec<String>,
    /// Account used when a request carries no account header
    pub default_account: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            api_keys: vec![],
            default_account: "local".to_string(),
        }
    }
}

impl ServerConfig {
    /// Read `SAFRA_API_KEYS` and `SAFRA_CORS_ORIGINS` (both comma-separated)
    pub fn from_env(default_account: &str) -> Self {
        Self {
            allowed_origins: parse_list(&std::env::var("SAFRA_CORS_ORIGINS").unwrap_or_default()),
            api_keys: parse_list(&std::env::var("SAFRA_API_KEYS").unwrap_or_default()),
            default_account: default_account.to_string(),
        }
    }

    pub fn auth_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }
}

/// Split a comma-separated setting, dropping blanks
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub classifier: Classifier,
    pub config: ServerConfig,
}

/// Authentication middleware - validates the Bearer API key
///
/// API keys are compared in constant time. The health check is always open.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.auth_enabled() || request.uri().path() == "/api/health" {
        return next.run(request).await;
    }

    let api_key_valid = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid API key");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Validate an API key against the configured keys using constant-time comparison
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    valid_keys.iter().any(|key| {
        let key_bytes = key.as_bytes();
        provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// Account a request acts on: the `X-Safra-Account` header, else the default
pub fn request_account(headers: &HeaderMap, config: &ServerConfig) -> String {
    headers
        .get(ACCOUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| config.default_account.clone())
}

/// Read a JSON request body, mapping failures to 400
pub(crate) async fn read_json<T: DeserializeOwned>(request: Request) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_SIZE)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes).map_err(|e| AppError::bad_request(&format!("Invalid JSON: {}", e)))
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, classifier: Classifier, config: ServerConfig) -> Router {
    let state = Arc::new(AppState {
        db,
        classifier,
        config: config.clone(),
    });

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Field registry
        .route("/properties", get(handlers::list_properties))
        .route("/safras", get(handlers::list_safras))
        .route("/fields", get(handlers::list_fields))
        .route("/fields/:id/toggle", post(handlers::toggle_field))
        .route("/farm/overview", get(handlers::farm_overview))
        // Cost reports
        .route("/reports/cost-per-field", get(handlers::cost_per_field))
        .route(
            "/reports/cost-per-field/:field_id/details",
            get(handlers::field_details),
        )
        .route("/reports/insumos", get(handlers::insumos))
        .route("/reports/indicators", get(handlers::indicators))
        .route("/reports/snapshot", get(handlers::snapshot))
        // Stock
        .route("/stock/groups", get(handlers::stock_groups))
        // Debts
        .route(
            "/debts",
            get(handlers::list_debts).post(handlers::create_debt),
        )
        .route("/debts/totals", get(handlers::debt_totals))
        .route(
            "/debts/:id",
            get(handlers::get_debt)
                .put(handlers::update_debt)
                .delete(handlers::delete_debt),
        )
        .route("/debts/:id/settle", post(handlers::settle_debt))
        .route("/debts/:id/renegotiate", post(handlers::renegotiate_debt))
        // Manual allocations
        .route(
            "/transactions/:id/allocations",
            get(handlers::list_allocations)
                .put(handlers::replace_allocations)
                .delete(handlers::delete_allocations),
        )
        // Audit log
        .route("/audit", get(handlers::list_audit_log));

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers = [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        header::HeaderName::from_static(ACCOUNT_HEADER),
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new().allow_methods(methods).allow_headers(headers)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
    };

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    classifier: Classifier,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.auth_enabled() {
        warn!("Authentication disabled (SAFRA_API_KEYS is empty) - do not expose to network!");
    }

    let app = create_router(db, classifier, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        match err.downcast_ref::<safra_core::Error>() {
            Some(safra_core::Error::NotFound(msg)) => Self::not_found(msg),
            Some(safra_core::Error::InvalidData(msg)) => Self::bad_request(msg),
            _ => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                // Return generic message to client
                message: "An internal error occurred".to_string(),
                // Keep full error for logging
                internal: Some(err),
            },
        }
    }
}

#[cfg(test)]
mod tests;
