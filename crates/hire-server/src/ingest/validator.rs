//! Row validator
//!
//! Parses a CSV source, checks its header against the expected schema for the
//! table kind and splits data rows into typed candidates and invalid rows.
//! Structural problems abort with an [`IngestError`]; per-row problems are
//! only counted and sent to the `invalid` diagnostic channel.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use hire_common::types::TableKind;

use super::diagnostics::{Channel, DiagnosticReport, DiagnosticSink};
use super::error::IngestError;
use super::types::{CandidateRow, Validated};

/// Cell values treated as missing, in addition to blank cells
pub const NULL_TOKENS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

// ============================================================================
// Raw Table
// ============================================================================

/// One data line of the source, cells untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the source
    pub line: u64,
    pub cells: Vec<String>,
}

/// A parsed but unvalidated CSV source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Parse CSV bytes with a header line.
    ///
    /// Blank lines are skipped and rows may have any number of cells; the
    /// width check happens per row during validation.
    pub fn from_csv(bytes: &[u8]) -> Result<Self, IngestError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| IngestError::MalformedSource(e.to_string()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(IngestError::EmptySource);
        }

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|e| IngestError::MalformedSource(e.to_string()))?;
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(index as u64 + 2);
            rows.push(RawRow {
                line,
                cells: record.iter().map(str::to_string).collect(),
            });
        }

        Ok(Self { headers, rows })
    }
}

// ============================================================================
// Cell Parsing
// ============================================================================

/// Whether a cell counts as missing
pub fn is_null(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || NULL_TOKENS.contains(&cell)
}

/// Parse an integer cell; `"12.0"` is accepted as `12`
pub fn parse_integer(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    if let Ok(value) = cell.parse::<i64>() {
        return Some(value);
    }

    let value = cell.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// Parse an ISO-8601 timestamp; values without an offset are taken as UTC
pub fn parse_timestamp(cell: &str) -> Option<DateTime<Utc>> {
    let cell = cell.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(cell) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(cell, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(ts.with_timezone(&Utc));
    }
    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(cell, format) {
            return Some(ts.and_utc());
        }
    }

    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

struct RowReader<'a> {
    columns: &'static [&'static str],
    cells: &'a [String],
    issues: Vec<String>,
}

impl<'a> RowReader<'a> {
    fn new(kind: TableKind, cells: &'a [String]) -> Self {
        Self {
            columns: kind.expected_columns(),
            cells,
            issues: Vec::new(),
        }
    }

    fn raw(&mut self, index: usize) -> Option<&'a str> {
        let column = self.columns[index];
        let cells: &'a [String] = self.cells;
        match cells.get(index).map(String::as_str) {
            Some(cell) if !is_null(cell) => Some(cell),
            _ => {
                self.issues.push(format!("missing required field: {column}"));
                None
            },
        }
    }

    fn text(&mut self, index: usize) -> Option<String> {
        self.raw(index).map(|cell| cell.trim().to_string())
    }

    fn integer(&mut self, index: usize) -> Option<i64> {
        let cell = self.raw(index)?;
        let parsed = parse_integer(cell);
        if parsed.is_none() {
            self.issues.push(format!(
                "invalid integer in column '{}': '{}'",
                self.columns[index], cell
            ));
        }
        parsed
    }

    fn timestamp(&mut self, index: usize) -> Option<DateTime<Utc>> {
        let cell = self.raw(index)?;
        let parsed = parse_timestamp(cell);
        if parsed.is_none() {
            self.issues.push(format!(
                "invalid datetime in column '{}': '{}'",
                self.columns[index], cell
            ));
        }
        parsed
    }

    fn finish(self, row: Option<CandidateRow>) -> Result<CandidateRow, String> {
        match row {
            Some(row) if self.issues.is_empty() => Ok(row),
            _ => Err(self.issues.join("; ")),
        }
    }
}

/// Validate the cells of one data row
pub fn parse_row(kind: TableKind, cells: &[String]) -> Result<CandidateRow, String> {
    let width = kind.expected_columns().len();
    if cells.len() > width {
        return Err(format!(
            "unexpected number of fields: expected {}, found {}",
            width,
            cells.len()
        ));
    }

    let mut reader = RowReader::new(kind, cells);
    let row = match kind {
        TableKind::Departments => {
            let id = reader.integer(0);
            let department = reader.text(1);
            id.zip(department)
                .map(|(id, department)| CandidateRow::Departments { id, department })
        },
        TableKind::Jobs => {
            let id = reader.integer(0);
            let job = reader.text(1);
            id.zip(job).map(|(id, job)| CandidateRow::Jobs { id, job })
        },
        TableKind::HiredEmployees => {
            let id = reader.integer(0);
            let name = reader.text(1);
            let datetime = reader.timestamp(2);
            let department_id = reader.integer(3);
            let job_id = reader.integer(4);
            match (id, name, datetime, department_id, job_id) {
                (Some(id), Some(name), Some(datetime), Some(department_id), Some(job_id)) => {
                    Some(CandidateRow::HiredEmployees {
                        id,
                        name,
                        datetime,
                        department_id,
                        job_id,
                    })
                },
                _ => None,
            }
        },
    };

    reader.finish(row)
}

// ============================================================================
// Validation
// ============================================================================

/// Check the header and split rows into candidates and invalid rows
#[tracing::instrument(skip(raw, sink), fields(table = %kind, rows = raw.rows.len()))]
pub fn validate(
    raw: &RawTable,
    kind: TableKind,
    sink: &mut dyn DiagnosticSink,
) -> Result<Validated, IngestError> {
    let expected = kind.expected_columns();
    if raw.headers.iter().map(String::as_str).ne(expected.iter().copied()) {
        return Err(IngestError::SchemaMismatch {
            table: kind,
            expected: expected.iter().map(|c| c.to_string()).collect(),
            received: raw.headers.clone(),
        });
    }

    // Rows with only null cells (`,,,,`) are not data and are not counted
    let data_rows: Vec<&RawRow> = raw
        .rows
        .iter()
        .filter(|row| !row.cells.iter().all(|cell| is_null(cell)))
        .collect();
    let skipped = raw.rows.len() - data_rows.len();
    if skipped > 0 {
        tracing::debug!(skipped, "Skipped rows with only null cells");
    }

    if data_rows.is_empty() {
        return Err(IngestError::EmptySource);
    }

    let mut rows = Vec::with_capacity(data_rows.len());
    let mut report = DiagnosticReport::new(Channel::Invalid, kind);

    for raw_row in &data_rows {
        match parse_row(kind, &raw_row.cells) {
            Ok(row) => rows.push(row),
            Err(reason) => {
                tracing::debug!(line = raw_row.line, %reason, "Invalid row");
                report.push_cells(raw_row.cells.clone(), reason);
            },
        }
    }

    let invalid_rows = report.rows.len();
    if invalid_rows > 0 {
        tracing::warn!(invalid_rows, "Rows failed validation");
        sink.write(report);
    }

    Ok(Validated {
        rows,
        invalid_rows,
        total: data_rows.len(),
    })
}
