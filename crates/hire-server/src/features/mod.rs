//! Feature modules implementing the hiring data API
//!
//! Each feature is a vertical slice with its own commands or queries and
//! routes.
//!
//! # Features
//!
//! - **ingest**: CSV upload into `departments`, `jobs` and `hired_employees`
//! - **reports**: Read-only aggregate queries over ingested hires
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `commands/` - Write operations
//! - `queries/` - Read operations
//! - `routes.rs` - HTTP route definitions

pub mod ingest;
pub mod reports;

use axum::Router;

use crate::ingest::IngestionService;

/// Shared state for all feature routes
#[derive(Clone, Debug)]
pub struct FeatureState {
    /// Ingestion pipeline bound to the configured store
    pub ingest: IngestionService,
    /// PostgreSQL pool; `None` when the server runs without a database
    pub db: Option<sqlx::PgPool>,
}

/// Creates the API router with all feature routes mounted
///
/// - `/ingest` - CSV uploads
/// - `/reports` - Aggregate queries (only with a database)
pub fn router(state: FeatureState) -> Router<()> {
    let router = Router::new().nest(
        "/ingest",
        ingest::ingest_routes().with_state(state.ingest.clone()),
    );

    match state.db {
        Some(db) => router.nest("/reports", reports::reports_routes().with_state(db)),
        None => router,
    }
}
