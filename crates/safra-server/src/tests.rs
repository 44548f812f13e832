//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use safra_core::{ClassifierConfig, Snapshot};
use tower::ServiceExt;

const SEED: &str = r#"{
    "properties": [{"id": "p1", "name": "Fazenda Boa Vista"}],
    "fields": [
        {"id": "a", "name": "Talhão A", "area_ha": 10.0, "property_id": "p1", "crop": "Café", "safra": "2024/2025"},
        {"id": "b", "name": "Talhão B", "area_ha": 30.0, "property_id": "p1", "crop": "Milho", "safra": "2023/2024"}
    ],
    "transactions": [
        {"id": "t1", "amount": -400.0, "category": "Irrigação", "description": "Energia bomba",
         "linked_area": "", "scheduled_date": "2024-10-10", "kind": "GASTO", "status": "Pago"},
        {"id": "t2", "amount": -120.0, "category": "Seguro", "description": "Apólice",
         "linked_area": "Talhão A", "scheduled_date": "2024-11-01", "kind": "GASTO", "status": "Pago"},
        {"id": "t3", "amount": 900.0, "category": "Receita", "description": "Venda café",
         "linked_area": "", "scheduled_date": "2024-12-01", "kind": "RECEITA", "status": "Pago"}
    ],
    "activities": [{"id": "act", "name": "Adubação", "date": "2024-09-01"}],
    "product_usages": [
        {"activity_id": "act", "product_id": 1, "product_name": "NPK",
         "quantity": 100.0, "unit": "kg", "line_cost_raw": 8000000000}
    ],
    "activity_fields": [{"activity_id": "act", "field_id": "a"}]
}"#;

fn seeded_db() -> Database {
    let db = Database::in_memory().unwrap();
    db.import_snapshot("local", &Snapshot::from_json(SEED).unwrap())
        .unwrap();
    db
}

fn classifier() -> Classifier {
    Classifier::with_config(ClassifierConfig::embedded().unwrap())
}

fn setup_test_app() -> Router {
    create_router(seeded_db(), classifier(), ServerConfig::default())
}

fn setup_test_app_with_keys(keys: &[&str]) -> Router {
    let config = ServerConfig {
        api_keys: keys.iter().map(|k| k.to_string()).collect(),
        ..Default::default()
    };
    create_router(seeded_db(), classifier(), config)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// ========== Health / Security Tests ==========

#[tokio::test]
async fn test_health() {
    let app = setup_test_app();

    let response = app.oneshot(get("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_auth_required_when_keys_configured() {
    let app = setup_test_app_with_keys(&["secret-key"]);

    let response = app.clone().oneshot(get("/api/fields")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/fields")
                .header("authorization", "Bearer wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/fields")
                .header("authorization", "Bearer secret-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // liveness stays open
    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_validate_api_key() {
    let keys = vec!["abc".to_string(), "longer-key".to_string()];
    assert!(validate_api_key("abc", &keys));
    assert!(validate_api_key("longer-key", &keys));
    assert!(!validate_api_key("abd", &keys));
    assert!(!validate_api_key("", &keys));
    assert!(!validate_api_key("abc", &[]));
}

#[test]
fn test_parse_list() {
    assert_eq!(parse_list(" a, ,b ,"), vec!["a", "b"]);
    assert!(parse_list("").is_empty());
}

// ========== Field Registry Tests ==========

#[tokio::test]
async fn test_list_fields_and_overview() {
    let app = setup_test_app();

    let response = app.clone().oneshot(get("/api/fields")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(get("/api/fields?property_id=p1"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let response = app.clone().oneshot(get("/api/safras")).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json, serde_json::json!(["2024/2025", "2023/2024"]));

    let response = app.oneshot(get("/api/farm/overview")).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total_area_ha"], 40.0);
    assert_eq!(json["field_count"], 2);
}

#[tokio::test]
async fn test_account_header_scopes_requests() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/fields")
                .header(ACCOUNT_HEADER, "other-farm")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_toggle_field() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(post("/api/fields/a/toggle"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["active"], false);

    let response = app
        .clone()
        .oneshot(post("/api/fields/missing/toggle"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/api/audit")).await.unwrap();
    let json = get_body_json(response).await;
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "toggle");
    assert_eq!(entries[0]["entity_id"], "a");
}

// ========== Report Tests ==========

#[tokio::test]
async fn test_cost_per_field_report() {
    let app = setup_test_app();

    let response = app
        .oneshot(get("/api/reports/cost-per-field?safra=2024/2025"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["period"]["from"], "2024-05-01");

    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    let a = rows.iter().find(|r| r["field_id"] == "a").unwrap();
    let b = rows.iter().find(|r| r["field_id"] == "b").unwrap();
    assert_eq!(a["groups"]["operacional"], 100.0);
    assert_eq!(b["groups"]["operacional"], 300.0);
    assert_eq!(a["groups"]["administrativos"], 120.0);
    assert_eq!(a["groups"]["insumos"], 8.0);
    assert_eq!(b["groups"]["insumos"], 0.0);
}

#[tokio::test]
async fn test_cost_report_filters() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(get(
            "/api/reports/cost-per-field?safra=2024/2025&fields=b&macro_group=operacional",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    // the pool is spread over the filtered set only
    assert_eq!(rows[0]["groups"]["operacional"], 400.0);

    let response = app
        .clone()
        .oneshot(get("/api/reports/cost-per-field?safra=2024"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get("/api/reports/cost-per-field?macro_group=maquinas"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cost_report_todos_means_every_group() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(get("/api/reports/cost-per-field?safra=2024/2025"))
        .await
        .unwrap();
    let unfiltered = get_body_json(response).await;

    let response = app
        .oneshot(get(
            "/api/reports/cost-per-field?safra=2024/2025&macro_group=Todos",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["rows"], unfiltered["rows"]);
    assert_eq!(json["period"], unfiltered["period"]);
}

#[tokio::test]
async fn test_field_details() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(get(
            "/api/reports/cost-per-field/a/details?safra=2024/2025",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let details = json.as_array().unwrap();
    assert_eq!(details.len(), 3);
    let total: f64 = details.iter().map(|d| d["amount"].as_f64().unwrap()).sum();
    assert!((total - 228.0).abs() < 1e-6);

    let response = app
        .oneshot(get(
            "/api/reports/cost-per-field/zzz/details?safra=2024/2025",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_insumos_indicators_snapshot() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(get("/api/reports/insumos?from=2024-05-01&to=2025-04-30"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["per_field"]["a"], 8.0);

    let response = app
        .clone()
        .oneshot(get("/api/reports/insumos?from=01/05/2024"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(get("/api/reports/indicators?safra=2024/2025"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total_costs"], 528.0);
    assert_eq!(json["total_area_ha"], 40.0);

    let response = app
        .oneshot(get("/api/reports/snapshot?date=2025-04-30"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let a = json
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["field_id"] == "a")
        .unwrap()
        .clone();
    assert_eq!(a["groups"]["administrativos"], 120.0);
    assert_eq!(a["groups"]["insumos"], 0.0);
}

#[tokio::test]
async fn test_stock_groups_empty() {
    let app = setup_test_app();

    let response = app.oneshot(get("/api/stock/groups")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert!(json.as_array().unwrap().is_empty());
}

// ========== Debt Tests ==========

fn debt_body(name: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "creditor": "Sicredi",
        "kind": "Custeio",
        "contract_date": "2024-07-01",
        "contracted_amount": 50000.0,
        "rate": "8% a.a.",
        "grace_period": null,
        "collateral": null,
        "responsible": null,
        "notes": null,
        "payment_method": null,
        "status": "Ativa",
        "payment_plan": {
            "type": "single",
            "amount": 54000.0,
            "due_date": "2025-07-01"
        }
    })
}

#[tokio::test]
async fn test_debt_lifecycle() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/debts", debt_body("Custeio café")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let id = json["id"].as_i64().unwrap();
    assert_eq!(json["payment_plan"]["type"], "single");

    let response = app
        .clone()
        .oneshot(get(&format!("/api/debts/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post(&format!("/api/debts/{}/settle", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/api/debts?status=Liquidada"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let response = app.clone().oneshot(get("/api/debts/totals")).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["settled"], 50000.0);
    assert_eq!(json["active"], 0.0);

    let mut updated = debt_body("Custeio café 2");
    updated["status"] = serde_json::json!("Renegociada");
    let response = app
        .clone()
        .oneshot(send_json("PUT", &format!("/api/debts/{}", id), updated))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["name"], "Custeio café 2");
    assert_eq!(json["status"], "Renegociada");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/debts/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get(&format!("/api/debts/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_debt_validation() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/debts")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/debts", debt_body("  ")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get("/api/debts?status=paga"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Allocation Tests ==========

#[tokio::test]
async fn test_allocations() {
    let app = setup_test_app();

    let body = serde_json::json!({
        "allocations": [
            {"field_id": "a", "percentage": 30.0},
            {"field_id": "b", "percentage": 70.0}
        ]
    });
    let response = app
        .clone()
        .oneshot(send_json("PUT", "/api/transactions/t1/allocations", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[0]["field_name"], "Talhão A");

    let bad = serde_json::json!({
        "allocations": [{"field_id": "a", "percentage": 60.0}]
    });
    let response = app
        .clone()
        .oneshot(send_json("PUT", "/api/transactions/t1/allocations", bad))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(get("/api/transactions/t1/allocations"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/transactions/t1/allocations")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["deleted"], 2);

    let response = app
        .oneshot(get("/api/transactions/unknown/allocations"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
