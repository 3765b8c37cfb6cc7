//! Hiring Data Server Library
//!
//! Loads CSV exports of departments, jobs and hired employees into
//! PostgreSQL and answers aggregate questions about the hires.
//!
//! # Overview
//!
//! - **Ingestion**: [`ingest`] validates, de-duplicates and inserts a CSV batch,
//!   rejecting only the rows that break a constraint
//! - **API Endpoints**: [`features`] exposes the upload endpoint and the reports
//! - **Database Management**: PostgreSQL integration with SQLx
//! - **Configuration**: Environment-based configuration management
//! - **Middleware**: CORS and request logging
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hire_common::types::TableKind;
//! use hire_server::ingest::{IngestSettings, IngestionService, MemoryStore, Source};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = IngestionService::new(Arc::new(MemoryStore::new()), IngestSettings::default());
//!     let result = service
//!         .insert_batch(Source::Csv(b"id,job\n1,Analyst\n".to_vec()), TableKind::Jobs)
//!         .await?;
//!     println!("{}", result.message);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;

// Re-export commonly used types
pub use error::{AppError, AppResult};
