//! Report API routes
//!
//! - `GET /api/v1/reports/hired-by-quarter?year=2021` - Hires per department and job by quarter
//! - `GET /api/v1/reports/above-mean?year=2021` - Departments hiring above the yearly mean

use crate::api::response::{ApiResponse, ErrorResponse};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;
use sqlx::PgPool;

use super::queries::{
    AboveMeanError, AboveMeanQuery, HiredByQuarterError, HiredByQuarterQuery, ReportYearError,
};

pub fn reports_routes() -> Router<PgPool> {
    Router::new()
        .route("/hired-by-quarter", get(hired_by_quarter))
        .route("/above-mean", get(above_mean))
}

/// Hires per department and job for one year, split into quarters
///
/// # Response
///
/// - `200 OK` - Rows ordered by department, then job
/// - `400 Bad Request` - Year out of range
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool))]
async fn hired_by_quarter(
    State(pool): State<PgPool>,
    Query(query): Query<HiredByQuarterQuery>,
) -> Result<Response, ReportApiError> {
    let year = query.year();
    let response = super::queries::hired_by_quarter::handle(pool, query).await?;

    Ok(ApiResponse::new(response)
        .with_meta(json!({ "year": year }))
        .into_response())
}

/// Departments whose hires in the year exceed the mean per department
///
/// # Response
///
/// - `200 OK` - Rows ordered by hires, descending
/// - `400 Bad Request` - Year out of range
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool))]
async fn above_mean(
    State(pool): State<PgPool>,
    Query(query): Query<AboveMeanQuery>,
) -> Result<Response, ReportApiError> {
    let year = query.year();
    let response = super::queries::above_mean::handle(pool, query).await?;

    Ok(ApiResponse::new(response)
        .with_meta(json!({ "year": year }))
        .into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
enum ReportApiError {
    Year(ReportYearError),
    Database(sqlx::Error),
}

impl From<HiredByQuarterError> for ReportApiError {
    fn from(err: HiredByQuarterError) -> Self {
        match err {
            HiredByQuarterError::Year(e) => Self::Year(e),
            HiredByQuarterError::Database(e) => Self::Database(e),
        }
    }
}

impl From<AboveMeanError> for ReportApiError {
    fn from(err: AboveMeanError) -> Self {
        match err {
            AboveMeanError::Year(e) => Self::Year(e),
            AboveMeanError::Database(e) => Self::Database(e),
        }
    }
}

impl IntoResponse for ReportApiError {
    fn into_response(self) -> Response {
        match self {
            ReportApiError::Year(e) => {
                ErrorResponse::new("VALIDATION_ERROR", e.to_string())
                    .into_response_with(StatusCode::BAD_REQUEST)
            },
            ReportApiError::Database(e) => {
                tracing::error!("Database error while running report: {:?}", e);
                ErrorResponse::new("INTERNAL_ERROR", "A database error occurred")
                    .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
            },
        }
    }
}
