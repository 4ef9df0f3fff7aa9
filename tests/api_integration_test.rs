// API integration tests that verify HTTP endpoints
// Tests the Axum router with real HTTP requests against an in-memory session store

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use datalogger_converter::api::{create_router, AppState};
use datalogger_converter::conversion::{convert, Converter};
use datalogger_converter::session::SessionStore;
use http_body_util::BodyExt; // For `.collect()`
use serde_json::Value;
use tower::ServiceExt; // For `oneshot`

/// Helper to create a test app sharing the given session store
fn create_test_app(sessions: SessionStore) -> axum::Router {
    let state = AppState {
        converter: Converter::default(),
        sessions,
        items_per_page: 30,
        max_upload_bytes: 1024 * 1024,
    };
    create_router(state)
}

async fn body_text(response: axum::response::Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(SessionStore::default());

    let response = app.oneshot(get("/api/v1/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_get_conversion_not_found() {
    let app = create_test_app(SessionStore::default());

    let response = app.oneshot(get("/api/v1/conversions/999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"], "Session 999 not found");
}

#[tokio::test]
async fn test_report_not_found() {
    let app = create_test_app(SessionStore::default());

    let response = app
        .oneshot(get("/api/v1/conversions/7/report"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_empty_body_is_rejected() {
    let app = create_test_app(SessionStore::default());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/conversions?filename=leituras.xlsx")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "Uploaded file is empty");
}

#[tokio::test]
async fn test_upload_garbage_is_rejected() {
    let sessions = SessionStore::default();
    let app = create_test_app(sessions.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/conversions?filename=leituras.xlsx")
                .body(Body::from("this is not a spreadsheet"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to open workbook"));
    assert!(sessions.is_empty().await);
}

#[tokio::test]
async fn test_upload_unknown_mode_is_rejected() {
    let app = create_test_app(SessionStore::default());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/conversions?mode=pdf_mode")
                .body(Body::from("bytes"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "Unknown reading mode: pdf_mode");
}

#[tokio::test]
async fn test_get_conversion_json() {
    let sessions = SessionStore::default();
    let table = convert(&common::specific_format_sheet()).unwrap();
    let session = sessions
        .insert(Some("leituras.xlsx".to_string()), table)
        .await;
    let app = create_test_app(sessions);

    let response = app
        .oneshot(get(&format!("/api/v1/conversions/{}", session.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["id"], session.id);
    assert_eq!(json["source_name"], "leituras.xlsx");
    assert_eq!(json["table"]["format"], "specific_format");
    assert_eq!(json["table"]["rows"].as_array().unwrap().len(), 2);
    assert_eq!(json["table"]["rows"][0]["Data"], "24/03/2025");
    assert_eq!(json["table"]["rows"][0]["Temperatura Máxima (°C)"], 25.3);
}

#[tokio::test]
async fn test_get_conversion_table_html() {
    let sessions = SessionStore::default();
    let table = convert(&common::report_mode_sheet()).unwrap();
    let session = sessions.insert(None, table).await;
    let app = create_test_app(sessions);

    let response = app
        .oneshot(get(&format!("/api/v1/conversions/{}/table", session.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let html = body_text(response).await;
    assert!(html.contains("table table-striped table-bordered"));
    assert!(html.contains("<td>24/03/2025</td>"));
}

#[tokio::test]
async fn test_get_conversion_report_with_metadata() {
    let sessions = SessionStore::default();
    let table = convert(&common::daily_sheet(31)).unwrap();
    let session = sessions.insert(None, table).await;
    let app = create_test_app(sessions);

    let response = app
        .oneshot(get(&format!(
            "/api/v1/conversions/{}/report?study_number=E-42&approval_status=Reprovado",
            session.id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("E-42"));
    assert!(html.contains("Reprovado"));
    assert!(html.contains("FOR.2.031"));
    assert!(html.contains("<td>2 / 2</td>"));
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let sessions = SessionStore::default();
    let first = sessions
        .insert(None, convert(&common::report_mode_sheet()).unwrap())
        .await;
    let second = sessions
        .insert(None, convert(&common::daily_sheet(3)).unwrap())
        .await;
    let app = create_test_app(sessions);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/v1/conversions/{}", first.id)))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["table"]["format"], "report_mode");

    let response = app
        .oneshot(get(&format!("/api/v1/conversions/{}", second.id)))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["table"]["format"], "current_mode");
    assert_eq!(json["table"]["rows"].as_array().unwrap().len(), 3);
}
