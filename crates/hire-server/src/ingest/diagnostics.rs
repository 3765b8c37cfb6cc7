//! Side-channel output for rows that were left out of storage
//!
//! A sink lives for exactly one ingestion call. Failing to write a
//! diagnostic never fails the batch.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::PathBuf;

use hire_common::types::TableKind;
use uuid::Uuid;

use super::types::CandidateRow;

/// Failure classes, each written to its own file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Invalid,
    Duplicates,
    DuplicatesInFile,
    ForeignKeyErrors,
    StorageErrors,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Invalid => "invalid",
            Channel::Duplicates => "duplicates",
            Channel::DuplicatesInFile => "duplicates_infile",
            Channel::ForeignKeyErrors => "foreign_key_errors",
            Channel::StorageErrors => "storage_errors",
        }
    }
}

/// A group of rows for one channel; the last cell of every row is the error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticReport {
    pub channel: Channel,
    pub table: TableKind,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DiagnosticReport {
    pub fn new(channel: Channel, table: TableKind) -> Self {
        let mut columns: Vec<String> =
            table.expected_columns().iter().map(|c| c.to_string()).collect();
        columns.push("error".to_string());

        Self {
            channel,
            table,
            columns,
            rows: Vec::new(),
        }
    }

    /// Add a raw row as it appeared in the source
    pub fn push_cells(&mut self, mut cells: Vec<String>, error: impl Into<String>) {
        let width = self.table.expected_columns().len();
        if cells.len() < width {
            cells.resize(width, String::new());
        }
        cells.push(error.into());
        self.rows.push(cells);
    }

    pub fn push_row(&mut self, row: &CandidateRow, error: impl Into<String>) {
        self.push_cells(row.cells(), error);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `<channel>_<table_kind>`
    pub fn stem(&self) -> String {
        format!("{}_{}", self.channel.as_str(), self.table)
    }
}

pub trait DiagnosticSink: Send {
    fn write(&mut self, report: DiagnosticReport);
}

// ============================================================================
// Sinks
// ============================================================================

/// Discards every report
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn write(&mut self, _report: DiagnosticReport) {}
}

/// Keeps reports in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub reports: Vec<DiagnosticReport>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows written to `channel`, across reports
    pub fn rows(&self, channel: Channel) -> Vec<&Vec<String>> {
        self.reports
            .iter()
            .filter(|r| r.channel == channel)
            .flat_map(|r| r.rows.iter())
            .collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn write(&mut self, report: DiagnosticReport) {
        if !report.is_empty() {
            self.reports.push(report);
        }
    }
}

/// Writes one CSV file per channel into a directory, named
/// `<channel>_<table_kind>_<batch_id>.csv`
///
/// Writes are synchronous `std::fs` calls. Inside the runtime, buffer the
/// batch in a [`MemorySink`] and hand the reports to [`flush_to_dir`].
#[derive(Debug)]
pub struct CsvFileSink {
    dir: PathBuf,
    batch_id: Uuid,
    written: HashSet<PathBuf>,
}

impl CsvFileSink {
    pub fn new(dir: impl Into<PathBuf>, batch_id: Uuid) -> Self {
        Self {
            dir: dir.into(),
            batch_id,
            written: HashSet::new(),
        }
    }

    pub fn path_for(&self, report: &DiagnosticReport) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", report.stem(), self.batch_id))
    }

    /// Files created so far by this sink
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.written.iter().cloned().collect();
        files.sort();
        files
    }

    fn try_write(&mut self, report: &DiagnosticReport) -> Result<PathBuf, csv::Error> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path_for(report);
        let is_new = !self.written.contains(&path);
        let file = OpenOptions::new()
            .create(true)
            .append(!is_new)
            .write(true)
            .truncate(is_new)
            .open(&path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(file);

        if is_new {
            writer.write_record(&report.columns)?;
        }
        for row in &report.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        self.written.insert(path.clone());
        Ok(path)
    }
}

impl DiagnosticSink for CsvFileSink {
    fn write(&mut self, report: DiagnosticReport) {
        if report.is_empty() {
            return;
        }

        match self.try_write(&report) {
            Ok(path) => tracing::info!(
                path = %path.display(),
                rows = report.rows.len(),
                channel = report.channel.as_str(),
                "Diagnostic rows written"
            ),
            Err(e) => tracing::warn!(
                dir = %self.dir.display(),
                channel = report.channel.as_str(),
                error = %e,
                "Failed to write diagnostic file"
            ),
        }
    }
}

/// Write buffered reports into `dir` on the blocking thread pool and return
/// the files created. Failures are logged, never returned.
pub async fn flush_to_dir(
    dir: PathBuf,
    batch_id: Uuid,
    reports: Vec<DiagnosticReport>,
) -> Vec<PathBuf> {
    if reports.iter().all(DiagnosticReport::is_empty) {
        return Vec::new();
    }

    let task = tokio::task::spawn_blocking(move || {
        let mut sink = CsvFileSink::new(dir, batch_id);
        for report in reports {
            sink.write(report);
        }
        sink.files()
    });

    match task.await {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!(batch_id = %batch_id, error = %e, "Diagnostic writer task failed");
            Vec::new()
        },
    }
}
