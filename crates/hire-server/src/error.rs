//! Server-level errors: database setup and unmatched routes
//!
//! Ingestion and report failures have their own error enums next to the
//! routes that map them.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::response::ErrorResponse;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound(message) => {
                ErrorResponse::new("NOT_FOUND", message).into_response_with(StatusCode::NOT_FOUND)
            },
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                internal_error()
            },
            AppError::Migration(ref e) => {
                tracing::error!("Migration error: {:?}", e);
                internal_error()
            },
        }
    }
}

fn internal_error() -> Response {
    ErrorResponse::new("INTERNAL_ERROR", "A database error occurred")
        .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
}
