//! PostgreSQL integration tests for the ingestion store and the reports
//!
//! These tests require Docker to be running. Run with:
//!
//! ```bash
//! cargo test --test pg_store_tests -- --ignored --nocapture
//! ```

mod common;

use std::sync::Arc;

use axum::{body::Body, http::Request, http::StatusCode};
use chrono::{TimeZone, Utc};
use hire_common::types::{Department, HiredEmployee, Job, Record, TableKind};
use hire_server::{
    api::{self, AppState},
    config::Config,
    features::reports::{
        queries::{above_mean, hired_by_quarter},
        AboveMeanQuery, DepartmentHires, HiredByQuarterQuery, QuarterRow,
    },
    ingest::{IngestSettings, IngestStore, IngestionService, PgIngestStore, Source, StoreError},
};
use serde_json::Value;
use serial_test::serial;
use tower::ServiceExt;

use common::{departments_csv, hired_csv, init_test_tracing, jobs_csv, TestPostgres};

fn hire(id: i32, month: u32, department_id: i32, job_id: i32) -> Record {
    Record::HiredEmployee(HiredEmployee {
        id,
        name: format!("Employee {id}"),
        hired_at: Utc.with_ymd_and_hms(2021, month, 15, 9, 0, 0).unwrap(),
        department_id,
        job_id,
    })
}

async fn seed(store: &PgIngestStore) {
    for (id, name) in [(1, "Staff"), (2, "Supply Chain"), (3, "Legal")] {
        store
            .insert_record(&Record::Department(Department {
                id,
                name: name.to_string(),
            }))
            .await
            .unwrap();
    }
    for (id, title) in [(1, "Manager"), (2, "Recruiter")] {
        store
            .insert_record(&Record::Job(Job {
                id,
                title: title.to_string(),
            }))
            .await
            .unwrap();
    }
}

// ============================================================================
// Store
// ============================================================================

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_insert_and_lookup_existing_ids() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let store = PgIngestStore::new(pg.pool_clone());
    seed(&store).await;

    let existing = store
        .existing_ids(TableKind::Departments, &[1, 3, 7, 9_999_999_999])
        .await
        .unwrap();

    let mut ids: Vec<_> = existing.into_iter().collect();
    ids.sort();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_constraint_violations_are_classified() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let store = PgIngestStore::new(pg.pool_clone());
    seed(&store).await;

    let err = store.insert_record(&hire(1, 3, 42, 1)).await.unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
    assert!(err.to_string().contains("foreign key"));

    store.insert_record(&hire(1, 3, 1, 1)).await.unwrap();
    let err = store.insert_record(&hire(1, 3, 1, 1)).await.unwrap_err();
    assert!(matches!(err, StoreError::UniqueViolation(_)));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hired_employees")
        .fetch_one(pg.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_batch_with_fk_errors_commits_valid_rows() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let service = IngestionService::new(
        Arc::new(PgIngestStore::new(pg.pool_clone())),
        IngestSettings::default(),
    );

    service
        .insert_batch(Source::Csv(departments_csv(3).into_bytes()), TableKind::Departments)
        .await
        .unwrap();
    service
        .insert_batch(Source::Csv(jobs_csv(3).into_bytes()), TableKind::Jobs)
        .await
        .unwrap();

    // Department 4 does not exist, so every fourth hire is rejected
    let result = service
        .insert_batch(
            Source::Csv(hired_csv(40, 4, 3).into_bytes()),
            TableKind::HiredEmployees,
        )
        .await
        .unwrap();

    assert_eq!(result.total, 40);
    assert_eq!(result.rejected_fk, 10);
    assert_eq!(result.inserted, 30);
    assert_eq!(
        result.inserted + result.invalid_rows + result.duplicates + result.rejected_fk + result.other_errors,
        result.total
    );

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hired_employees")
        .fetch_one(pg.pool())
        .await
        .unwrap();
    assert_eq!(count, 30);

    // Second load of the same file only finds duplicates and the same rejections
    let again = service
        .insert_batch(
            Source::Csv(hired_csv(40, 4, 3).into_bytes()),
            TableKind::HiredEmployees,
        )
        .await
        .unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.duplicates, 30);
    assert_eq!(again.rejected_fk, 10);
}

// ============================================================================
// Reports
// ============================================================================

async fn seed_hires(store: &PgIngestStore) {
    seed(store).await;
    let hires = [
        // Staff: 4 hires, spread over quarters
        hire(1, 1, 1, 1),
        hire(2, 2, 1, 1),
        hire(3, 5, 1, 2),
        hire(4, 11, 1, 2),
        // Supply Chain: 1 hire
        hire(5, 8, 2, 1),
        // Legal: 1 hire
        hire(6, 3, 3, 2),
    ];
    for record in &hires {
        store.insert_record(record).await.unwrap();
    }

    // Outside the reported year
    store
        .insert_record(&Record::HiredEmployee(HiredEmployee {
            id: 100,
            name: "Earlier".to_string(),
            hired_at: Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap(),
            department_id: 2,
            job_id: 1,
        }))
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_hired_by_quarter_report() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    seed_hires(&PgIngestStore::new(pg.pool_clone())).await;

    let response = hired_by_quarter::handle(pg.pool_clone(), HiredByQuarterQuery::default())
        .await
        .unwrap();

    let row = |department: &str, job: &str, q: [i64; 4]| QuarterRow {
        department: department.to_string(),
        job: job.to_string(),
        q1: q[0],
        q2: q[1],
        q3: q[2],
        q4: q[3],
    };

    assert_eq!(
        response.rows,
        vec![
            row("Legal", "Recruiter", [1, 0, 0, 0]),
            row("Staff", "Manager", [2, 0, 0, 0]),
            row("Staff", "Recruiter", [0, 1, 0, 1]),
            row("Supply Chain", "Manager", [0, 0, 1, 0]),
        ]
    );
    assert_eq!(response.total, 4);

    let earlier = hired_by_quarter::handle(
        pg.pool_clone(),
        HiredByQuarterQuery { year: Some(2020) },
    )
    .await
    .unwrap();
    assert_eq!(earlier.total, 1);
    assert_eq!(earlier.rows[0].q2, 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_above_mean_report() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    seed_hires(&PgIngestStore::new(pg.pool_clone())).await;

    let response = above_mean::handle(pg.pool_clone(), AboveMeanQuery::default())
        .await
        .unwrap();

    // Mean over departments with hires in 2021 is 2
    assert_eq!(
        response.rows,
        vec![DepartmentHires {
            id: 1,
            department: "Staff".to_string(),
            hired: 4,
        }]
    );

    let empty = above_mean::handle(pg.pool_clone(), AboveMeanQuery { year: Some(1999) })
        .await
        .unwrap();
    assert!(empty.rows.is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_report_routes_with_database() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let store = Arc::new(PgIngestStore::new(pg.pool_clone()));
    seed_hires(&store).await;

    let mut config = Config::default();
    config.ingest.diagnostics_enabled = false;
    let state = AppState {
        db: Some(pg.pool_clone()),
        ingest: IngestionService::new(store, config.ingest.settings()),
    };
    let app = api::create_router(state, &config);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/reports/above-mean?year=2021")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["meta"]["year"], 2021);
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["rows"][0]["department"], "Staff");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/reports/hired-by-quarter?year=3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
