pub mod response;

use crate::config::Config;
use crate::db;
use crate::error::AppError;
use crate::features;
use crate::ingest::IngestionService;
use crate::middleware;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use tower_http::compression::CompressionLayer;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// `None` when the server runs with `DATABASE_SKIP=true`
    pub db: Option<PgPool>,
    pub ingest: IngestionService,
}

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState, config: &Config) -> Router {
    let feature_state = features::FeatureState {
        ingest: state.ingest.clone(),
        db: state.db.clone(),
    };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .with_state(state)
        .nest("/api/v1", features::router(feature_state))
        .fallback(not_found)
        // Apply layers from innermost to outermost
        .layer(DefaultBodyLimit::max(config.ingest.max_upload_bytes))
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Hiring Data Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> Response {
    let Some(pool) = state.db.as_ref() else {
        return (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "database": "skipped" })),
        )
            .into_response();
    };

    match db::health_check(pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "database": "connected" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "database": "unreachable" })),
            )
                .into_response()
        },
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("No route matches this path".to_string())
}
