//! Batch-level ingestion errors
//!
//! Only problems that abort a whole batch are errors. Per-row problems are
//! counted and reported in the [`BatchResult`](super::BatchResult).

use hire_common::{types::TableKind, HireError};
use thiserror::Error;

use super::store::StoreError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported table kind '{0}'. Must be one of: departments, jobs, hired_employees")]
    UnsupportedTableKind(String),

    #[error(
        "Columns for {table} do not match. Expected: [{}], received: [{}]",
        expected.join(", "),
        received.join(", ")
    )]
    SchemaMismatch {
        table: TableKind,
        expected: Vec<String>,
        received: Vec<String>,
    },

    #[error("The CSV file is empty or contains no data rows")]
    EmptySource,

    #[error("Failed to read CSV: {0}")]
    MalformedSource(String),

    #[error("The file contains no valid rows. It must contain at least 1 record")]
    EmptyBatch,

    #[error("Batch too large: received {received} rows, the maximum allowed is {limit}")]
    BatchTooLarge { received: usize, limit: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl IngestError {
    /// Whether the caller sent something unusable, as opposed to a server-side failure
    pub fn is_client_error(&self) -> bool {
        !matches!(self, IngestError::Io(_) | IngestError::Storage(_))
    }
}

impl From<HireError> for IngestError {
    fn from(err: HireError) -> Self {
        match err {
            HireError::UnsupportedTableKind(kind) => IngestError::UnsupportedTableKind(kind),
            HireError::Io(e) => IngestError::Io(e),
            HireError::Config(msg) => IngestError::MalformedSource(msg),
        }
    }
}

/// Parse a table kind string coming from a request or the command line
pub fn parse_table_kind(raw: &str) -> Result<TableKind, IngestError> {
    Ok(raw.parse::<TableKind>()?)
}
