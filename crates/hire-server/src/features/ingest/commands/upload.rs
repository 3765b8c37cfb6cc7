//! Upload CSV command
//!
//! Ingests one uploaded CSV file into the table named by the request.
//!
//! # Architecture
//!
//! - Command: the multipart fields, checked by `validate()`
//! - Handler: parses the table kind and hands the bytes to the ingestion service

use serde::{Deserialize, Serialize};

use crate::ingest::{
    parse_table_kind, BatchResult, IngestError, IngestionService, RejectedRow, Source,
};

/// Command to ingest an uploaded CSV file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadCsvCommand {
    /// Target table: `departments`, `jobs` or `hired_employees`
    pub table: Option<String>,

    /// Client-side file name; must end in `.csv`
    pub filename: Option<String>,

    #[serde(skip)]
    pub content: Option<Vec<u8>>,
}

/// Totals included when some rows were not inserted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSummary {
    pub total: usize,
    pub inserted: usize,
    pub rejected_fk: usize,
    pub duplicates: usize,
    pub invalid_rows: usize,
    pub other_errors: usize,
    pub rejected_rows: Vec<RejectedRow>,
}

/// Response from ingesting a CSV file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadCsvResponse {
    pub table: String,
    pub inserted: usize,
    pub invalid_rows: usize,
    pub duplicates: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<UploadSummary>,
}

impl From<BatchResult> for UploadCsvResponse {
    fn from(result: BatchResult) -> Self {
        let summary = result.has_issues().then(|| UploadSummary {
            total: result.total,
            inserted: result.inserted,
            rejected_fk: result.rejected_fk,
            duplicates: result.duplicates,
            invalid_rows: result.invalid_rows,
            other_errors: result.other_errors,
            rejected_rows: result.rejected_rows.clone(),
        });

        Self {
            table: result.table.to_string(),
            inserted: result.inserted,
            invalid_rows: result.invalid_rows,
            duplicates: result.duplicates,
            message: result.message,
            summary,
        }
    }
}

/// Errors that can occur when uploading a CSV file
#[derive(Debug, thiserror::Error)]
pub enum UploadCsvError {
    #[error("Missing form field 'file'")]
    FileRequired,

    #[error("Missing form field 'type'")]
    TableRequired,

    #[error("Only CSV files (.csv) are allowed, got '{0}'")]
    InvalidFileType(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl UploadCsvCommand {
    /// Validates the command parameters
    ///
    /// The file type is checked before the table kind, so a non-CSV upload
    /// is reported as such whatever the `type` field says.
    pub fn validate(&self) -> Result<(), UploadCsvError> {
        if self.content.is_none() {
            return Err(UploadCsvError::FileRequired);
        }

        let filename = self.filename.as_deref().unwrap_or_default();
        if !filename.to_lowercase().ends_with(".csv") {
            return Err(UploadCsvError::InvalidFileType(filename.to_string()));
        }

        let table = self.table.as_deref().ok_or(UploadCsvError::TableRequired)?;
        parse_table_kind(table)?;

        Ok(())
    }
}

/// Handler function for CSV uploads
#[tracing::instrument(
    skip(service, command),
    fields(table = ?command.table, filename = ?command.filename)
)]
pub async fn handle(
    service: IngestionService,
    command: UploadCsvCommand,
) -> Result<UploadCsvResponse, UploadCsvError> {
    command.validate()?;

    let kind = parse_table_kind(command.table.as_deref().unwrap_or_default())?;
    let content = command.content.unwrap_or_default();

    tracing::info!(bytes = content.len(), "Ingesting uploaded CSV");

    let result = service.insert_batch(Source::Csv(content), kind).await?;

    tracing::info!(
        batch_id = %result.batch_id,
        inserted = result.inserted,
        "CSV upload ingested"
    );

    Ok(UploadCsvResponse::from(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(table: Option<&str>, filename: Option<&str>) -> UploadCsvCommand {
        UploadCsvCommand {
            table: table.map(str::to_string),
            filename: filename.map(str::to_string),
            content: Some(b"id,job\n1,Analyst\n".to_vec()),
        }
    }

    #[test]
    fn test_validation_success() {
        assert!(command(Some("jobs"), Some("jobs.csv")).validate().is_ok());
        assert!(command(Some("jobs"), Some("JOBS.CSV")).validate().is_ok());
    }

    #[test]
    fn test_validation_missing_file() {
        let mut cmd = command(Some("jobs"), Some("jobs.csv"));
        cmd.content = None;
        assert!(matches!(cmd.validate(), Err(UploadCsvError::FileRequired)));
    }

    #[test]
    fn test_validation_file_type_checked_first() {
        let cmd = command(Some("employees"), Some("jobs.xlsx"));
        assert!(matches!(cmd.validate(), Err(UploadCsvError::InvalidFileType(ref f)) if f == "jobs.xlsx"));
    }

    #[test]
    fn test_validation_unknown_table() {
        let cmd = command(Some("employees"), Some("jobs.csv"));
        assert!(matches!(
            cmd.validate(),
            Err(UploadCsvError::Ingest(IngestError::UnsupportedTableKind(_)))
        ));
    }

    #[test]
    fn test_validation_missing_table() {
        let cmd = command(None, Some("jobs.csv"));
        assert!(matches!(cmd.validate(), Err(UploadCsvError::TableRequired)));
    }
}
