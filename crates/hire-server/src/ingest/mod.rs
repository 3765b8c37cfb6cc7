//! Batch ingestion of CSV files into `departments`, `jobs` and `hired_employees`
//!
//! # Pipeline
//!
//! 1. [`validator`] parses the CSV, checks the header and types every row
//! 2. [`inserter::check_batch_size`] refuses empty and oversized batches
//! 3. [`dedup`] drops ids that already exist or repeat within the file
//! 4. [`inserter`] writes the remaining rows one transaction at a time
//!
//! [`service::IngestionService`] wraps the whole sequence in one call and
//! returns a [`BatchResult`]. Rows that are left out along the way are sent to
//! a [`diagnostics::DiagnosticSink`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hire_common::types::TableKind;
//! use hire_server::ingest::{IngestSettings, IngestionService, MemoryStore, Source};
//!
//! let service = IngestionService::new(Arc::new(MemoryStore::new()), IngestSettings::default());
//! let result = service
//!     .insert_batch(Source::Csv(b"id,department\n1,Sales\n".to_vec()), TableKind::Departments)
//!     .await?;
//! assert_eq!(result.inserted, 1);
//! ```

pub mod decoder;
pub mod dedup;
pub mod diagnostics;
pub mod error;
pub mod inserter;
pub mod service;
pub mod store;
pub mod types;
pub mod validator;

pub use diagnostics::{Channel, CsvFileSink, DiagnosticReport, DiagnosticSink, MemorySink, NullSink};
pub use error::{parse_table_kind, IngestError};
pub use service::{insert_batch, IngestionService};
pub use store::{IngestStore, MemoryStore, PgIngestStore, StoreError};
pub use types::{
    BatchResult, CandidateRow, IngestSettings, Reconciled, RejectedRow, Source,
    StorageErrorPolicy, Validated, MAX_BATCH_SIZE,
};
