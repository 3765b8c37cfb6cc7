//! Storage seam for the ingestion pipeline
//!
//! The pipeline only ever asks two things of storage: which of a set of ids
//! already exist, and to insert one record in its own unit of work.

use std::collections::HashSet;

use async_trait::async_trait;
use hire_common::types::{Record, TableKind};
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgIngestStore;

/// Storage failures, classified by how the inserter reacts to them
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("insert or update on table violates foreign key constraint: {0}")]
    ForeignKeyViolation(String),

    #[error("duplicate key value violates unique constraint: {0}")]
    UniqueViolation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                StoreError::ForeignKeyViolation(db_err.message().to_string())
            },
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation(db_err.message().to_string())
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            },
            other => StoreError::Database(other.to_string()),
        }
    }
}

#[async_trait]
pub trait IngestStore: Send + Sync {
    /// Subset of `ids` that already exist in the table for `kind`
    async fn existing_ids(&self, kind: TableKind, ids: &[i64]) -> Result<HashSet<i64>, StoreError>;

    /// Insert one record as a single unit of work.
    ///
    /// On any error nothing from this call is left in storage.
    async fn insert_record(&self, record: &Record) -> Result<(), StoreError>;
}
