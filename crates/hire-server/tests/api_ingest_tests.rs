//! HTTP tests for the upload endpoint
//!
//! The router is built exactly as in `main`, with the in-memory store in
//! place of PostgreSQL.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use hire_common::types::TableKind;
use hire_server::{
    api::{self, AppState},
    config::Config,
    ingest::{IngestionService, MemoryStore, StoreError},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use common::{departments_csv, jobs_csv};

const BOUNDARY: &str = "hire-test-boundary";
const UPLOAD_URI: &str = "/api/v1/ingest/upload";

fn app_with(store: Arc<MemoryStore>, config: &Config) -> Router {
    let state = AppState {
        db: None,
        ingest: IngestionService::new(store, config.ingest.settings()),
    };
    api::create_router(state, config)
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.ingest.diagnostics_enabled = false;
    config
}

fn app(store: Arc<MemoryStore>) -> Router {
    app_with(store, &test_config())
}

/// Build a multipart body; `table` and `file` are omitted when `None`
fn multipart_body(table: Option<&str>, file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(table) = table {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"type\"\r\n\r\n{table}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: text/csv\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(table: Option<&str>, file: Option<(&str, &[u8])>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(UPLOAD_URI)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(table, file)))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

// ============================================================================
// Successful Uploads
// ============================================================================

#[tokio::test]
async fn test_upload_departments() {
    let store = Arc::new(MemoryStore::new());
    let csv = departments_csv(5);

    let (status, json) = send(
        app(store.clone()),
        upload_request(Some("departments"), Some(("departments.csv", csv.as_bytes()))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["table"], "departments");
    assert_eq!(json["inserted"], 5);
    assert_eq!(json["invalid_rows"], 0);
    assert_eq!(json["duplicates"], 0);
    assert!(json["message"].as_str().unwrap().contains("Inserted 5"));
    assert!(json.get("summary").is_none());
    assert_eq!(store.count(TableKind::Departments), 5);
}

#[tokio::test]
async fn test_upload_with_rejections_includes_summary() {
    let store = Arc::new(MemoryStore::new());
    let router = app(store.clone());

    let (status, _) = send(
        router.clone(),
        upload_request(Some("departments"), Some(("d.csv", departments_csv(1).as_bytes()))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        router.clone(),
        upload_request(Some("jobs"), Some(("j.csv", jobs_csv(1).as_bytes()))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let csv = "id,name,datetime,department_id,job_id\n\
               1,Ana,2021-02-01T10:00:00Z,1,1\n\
               2,Luis,2021-05-01T10:00:00Z,9,1\n\
               3,,2021-05-01T10:00:00Z,1,1\n";
    let (status, json) = send(
        router,
        upload_request(Some("hired_employees"), Some(("hired.csv", csv.as_bytes()))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["inserted"], 1);
    assert_eq!(json["invalid_rows"], 1);

    let summary = &json["summary"];
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["rejected_fk"], 1);
    assert_eq!(summary["other_errors"], 0);
    let rejected = summary["rejected_rows"].as_array().unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0]["id"], 2);
    assert_eq!(rejected[0]["department_id"], 9);
    assert!(rejected[0]["error"]
        .as_str()
        .unwrap()
        .contains("foreign key"));
}

#[tokio::test]
async fn test_upload_extension_is_case_insensitive() {
    let (status, json) = send(
        app(Arc::new(MemoryStore::new())),
        upload_request(Some("jobs"), Some(("JOBS.CSV", jobs_csv(2).as_bytes()))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["table"], "jobs");
}

#[tokio::test]
async fn test_upload_table_name_is_exact() {
    let (status, json) = send(
        app(Arc::new(MemoryStore::new())),
        upload_request(Some("Jobs"), Some(("jobs.csv", jobs_csv(2).as_bytes()))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_TABLE_KIND");
}

// ============================================================================
// Rejected Uploads
// ============================================================================

#[tokio::test]
async fn test_upload_invalid_file_type() {
    let (status, json) = send(
        app(Arc::new(MemoryStore::new())),
        upload_request(Some("departments"), Some(("departments.txt", b"some text data".as_slice()))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "INVALID_FILE_TYPE");
}

#[tokio::test]
async fn test_upload_invalid_table_type() {
    let (status, json) = send(
        app(Arc::new(MemoryStore::new())),
        upload_request(Some("invalid_table"), Some(("random_file.csv", b"id,name\n1,Test\n".as_slice()))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_TABLE_KIND");
}

#[tokio::test]
async fn test_upload_missing_fields() {
    let router = app(Arc::new(MemoryStore::new()));

    let (status, json) = send(router.clone(), upload_request(Some("jobs"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");

    let (status, json) = send(router, upload_request(None, Some(("jobs.csv", b"id,job\n1,A\n".as_slice())))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_upload_empty_file() {
    let (status, json) = send(
        app(Arc::new(MemoryStore::new())),
        upload_request(Some("jobs"), Some(("jobs.csv", b"".as_slice()))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "EMPTY_FILE");
}

#[tokio::test]
async fn test_upload_schema_mismatch_lists_columns() {
    let (status, json) = send(
        app(Arc::new(MemoryStore::new())),
        upload_request(Some("departments"), Some(("departments.csv", b"id,name\n1,Test\n".as_slice()))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "SCHEMA_MISMATCH");
    assert_eq!(
        json["error"]["details"]["expected"],
        serde_json::json!(["id", "department"])
    );
    assert_eq!(
        json["error"]["details"]["received"],
        serde_json::json!(["id", "name"])
    );
}

#[tokio::test]
async fn test_upload_batch_too_large() {
    let mut config = test_config();
    config.ingest.max_batch_size = 3;
    let store = Arc::new(MemoryStore::new());

    let (status, json) = send(
        app_with(store.clone(), &config),
        upload_request(Some("jobs"), Some(("jobs.csv", jobs_csv(4).as_bytes()))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BATCH_TOO_LARGE");
    assert_eq!(json["error"]["details"]["received"], 4);
    assert_eq!(json["error"]["details"]["limit"], 3);
    assert_eq!(store.count(TableKind::Jobs), 0);
}

#[tokio::test]
async fn test_upload_storage_failure_is_generic_500() {
    let store = Arc::new(MemoryStore::new());
    store.set_unavailable(Some("connection refused at 10.0.0.5".to_string()));

    let (status, json) = send(
        app(store),
        upload_request(Some("jobs"), Some(("jobs.csv", jobs_csv(2).as_bytes()))),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
    assert!(!json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("10.0.0.5"));
}

#[tokio::test]
async fn test_upload_row_storage_error_is_not_fatal() {
    let store = Arc::new(MemoryStore::new());
    store.fail_insert(TableKind::Jobs, 1, StoreError::Database("deadlock detected".to_string()));

    let (status, json) = send(
        app(store),
        upload_request(Some("jobs"), Some(("jobs.csv", jobs_csv(2).as_bytes()))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["inserted"], 1);
    assert_eq!(json["summary"]["other_errors"], 1);
}

#[tokio::test]
async fn test_upload_over_body_limit() {
    let mut config = test_config();
    config.ingest.max_upload_bytes = 64;

    let (status, _) = send(
        app_with(Arc::new(MemoryStore::new()), &config),
        upload_request(Some("jobs"), Some(("jobs.csv", jobs_csv(50).as_bytes()))),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

// ============================================================================
// Server Routes
// ============================================================================

#[tokio::test]
async fn test_health_without_database() {
    let (status, json) = send(
        app(Arc::new(MemoryStore::new())),
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["database"], "skipped");
}

#[tokio::test]
async fn test_reports_unavailable_without_database() {
    let (status, json) = send(
        app(Arc::new(MemoryStore::new())),
        Request::builder()
            .uri("/api/v1/reports/hired-by-quarter")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}
