use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::workflows::reportgen::memory::{
    InMemoryBilling, InMemoryPacks, InMemoryProfiles, InMemoryReleases, InMemoryWorkOrders,
    RecordingAuditSink, SnapshotSpineExporter,
};
use crate::workflows::reportgen::router::reportgen_router;
use crate::workflows::reportgen::rules::RulesConfig;
use crate::workflows::reportgen::ReportgenPipeline;

fn app() -> Router {
    let work_orders = Arc::new(InMemoryWorkOrders::default());
    let pipeline = Arc::new(ReportgenPipeline::new(
        work_orders.clone(),
        Arc::new(InMemoryProfiles::default()),
        Arc::new(InMemoryPacks::default()),
        Arc::new(InMemoryReleases::default()),
        Arc::new(SnapshotSpineExporter::new(work_orders)),
        Arc::new(InMemoryBilling::default()),
        Arc::new(RecordingAuditSink::default()),
        RulesConfig::default(),
    ));
    reportgen_router(pipeline)
}

fn json_request(method: &str, uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request builds")
}

async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

async fn create_work_order(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/reportgen/work-orders",
            json!({
                "org": "org-acme",
                "report_type": "land_and_building",
                "parent_ref": "case-1001",
            }),
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = read_json_body(response).await;
    body["id"].as_str().expect("id present").to_string()
}

#[tokio::test]
async fn work_order_creation_returns_a_draft() {
    let app = app();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/reportgen/work-orders",
            json!({
                "org": "org-acme",
                "report_type": "land_and_building",
            }),
        ))
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "draft");
    assert!(body["id"].as_str().is_some_and(|id| id.starts_with("wo-")));
}

#[tokio::test]
async fn contract_patch_returns_warnings_and_status() {
    let app = app();
    let id = create_work_order(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/reportgen/work-orders/{id}/contract"),
            json!({
                "party": {
                    "bank_name": "State Bank of India",
                    "bank_branch": "Camp Branch",
                },
                "property": { "address": "Plot 12, Shivaji Nagar, Pune" },
            }),
        ))
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["work_order"]["status"], "data_pending");
    assert!(body["warnings"].is_array());
    assert_eq!(body["snapshot"]["version"], 2);
}

#[tokio::test]
async fn checklist_endpoint_serves_the_projection() {
    let app = app();
    let id = create_work_order(&app).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/v1/reportgen/work-orders/{id}/checklist"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["profile_name"], "standard-land-building");
    assert!(body["rows"].as_array().is_some_and(|rows| !rows.is_empty()));
}

#[tokio::test]
async fn unknown_work_order_maps_to_not_found() {
    let app = app();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/reportgen/work-orders/wo-missing/checklist")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert!(body["error"].as_str().is_some_and(|e| e.contains("not found")));
}

#[tokio::test]
async fn premature_pack_requests_are_rejected() {
    let app = app();
    let id = create_work_order(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/reportgen/work-orders/{id}/packs"),
            json!({ "request_id": "req-1" }),
        ))
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn release_without_override_reason_is_rejected() {
    let app = app();
    let id = create_work_order(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/reportgen/work-orders/{id}/release"),
            json!({
                "idempotency_key": "rel-1",
                "override_requested": true,
            }),
        ))
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
