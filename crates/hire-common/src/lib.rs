//! Hiring Data Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging setup and error handling for the hiring data
//! ingestion workspace.
//!
//! # Overview
//!
//! - **Types**: the three ingestible table kinds and their typed records
//! - **Error Handling**: common error and result types
//! - **Logging**: `tracing` subscriber configuration shared by all binaries
//!
//! # Example
//!
//! ```no_run
//! use hire_common::types::TableKind;
//!
//! fn columns(kind: &str) -> hire_common::Result<&'static [&'static str]> {
//!     let kind: TableKind = kind.parse()?;
//!     Ok(kind.expected_columns())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{HireError, Result};
