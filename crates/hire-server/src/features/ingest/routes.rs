//! Ingestion API routes
//!
//! - `POST /api/v1/ingest/upload` - Multipart upload with fields `type` and `file`

use crate::api::response::ErrorResponse;
use crate::ingest::{IngestError, IngestionService};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;

use super::commands::{UploadCsvCommand, UploadCsvError};

pub fn ingest_routes() -> Router<IngestionService> {
    Router::new().route("/upload", post(upload_csv))
}

/// Ingest an uploaded CSV file
///
/// # Endpoint
///
/// `POST /api/v1/ingest/upload` (multipart/form-data)
///
/// - `type` - `departments`, `jobs` or `hired_employees`
/// - `file` - the CSV file
///
/// # Response
///
/// - `200 OK` - Batch processed, possibly with rejected rows in `summary`
/// - `400 Bad Request` - Unusable upload (see error `code`)
/// - `500 Internal Server Error` - Storage failure
#[tracing::instrument(skip(service, multipart))]
async fn upload_csv(
    State(service): State<IngestionService>,
    mut multipart: Multipart,
) -> Result<Response, IngestApiError> {
    let mut command = UploadCsvCommand::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "type" => command.table = Some(field.text().await?),
            "file" => {
                command.filename = field.file_name().map(str::to_string);
                command.content = Some(field.bytes().await?.to_vec());
            },
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let response = super::commands::upload::handle(service, command).await?;

    Ok((StatusCode::OK, Json(response)).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
enum IngestApiError {
    Multipart(MultipartError),
    Upload(UploadCsvError),
}

impl From<MultipartError> for IngestApiError {
    fn from(err: MultipartError) -> Self {
        Self::Multipart(err)
    }
}

impl From<UploadCsvError> for IngestApiError {
    fn from(err: UploadCsvError) -> Self {
        Self::Upload(err)
    }
}

impl IntoResponse for IngestApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            IngestApiError::Multipart(e) => {
                let status = e.status();
                let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    "PAYLOAD_TOO_LARGE"
                } else {
                    "BAD_REQUEST"
                };
                (status, ErrorResponse::new(code, e.body_text()))
            },
            IngestApiError::Upload(e) => upload_error(e),
        };

        error.into_response_with(status)
    }
}

fn upload_error(err: UploadCsvError) -> (StatusCode, ErrorResponse) {
    let message = err.to_string();
    match err {
        UploadCsvError::FileRequired | UploadCsvError::TableRequired => {
            bad_request("BAD_REQUEST", message)
        },
        UploadCsvError::InvalidFileType(_) => bad_request("INVALID_FILE_TYPE", message),
        UploadCsvError::Ingest(e) => ingest_error(e, message),
    }
}

fn bad_request(code: &str, message: String) -> (StatusCode, ErrorResponse) {
    (StatusCode::BAD_REQUEST, ErrorResponse::new(code, message))
}

fn ingest_error(err: IngestError, message: String) -> (StatusCode, ErrorResponse) {
    match err {
        IngestError::UnsupportedTableKind(_) => bad_request("INVALID_TABLE_KIND", message),
        IngestError::EmptySource | IngestError::EmptyBatch => bad_request("EMPTY_FILE", message),
        IngestError::MalformedSource(_) => bad_request("MALFORMED_CSV", message),
        IngestError::SchemaMismatch {
            expected, received, ..
        } => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("SCHEMA_MISMATCH", message)
                .with_details(json!({ "expected": expected, "received": received })),
        ),
        IngestError::BatchTooLarge { received, limit } => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("BATCH_TOO_LARGE", message)
                .with_details(json!({ "received": received, "limit": limit })),
        ),
        IngestError::Io(ref e) => {
            tracing::error!("IO error during ingestion: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("INTERNAL_ERROR", "An IO error occurred"),
            )
        },
        IngestError::Storage(ref e) => {
            tracing::error!("Storage error during ingestion: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("INTERNAL_ERROR", "A database error occurred"),
            )
        },
    }
}
