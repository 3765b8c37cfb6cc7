//! Data carried between the stages of a batch ingestion

use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use hire_common::types::TableKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Default upper bound on the number of validated rows in one batch.
pub const MAX_BATCH_SIZE: usize = 2000;

// ============================================================================
// Candidate Rows
// ============================================================================

/// A row that passed structural validation, with every cell typed.
///
/// Integer cells are kept as `i64` here; range checks against the storage
/// column types happen in the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum CandidateRow {
    Departments {
        id: i64,
        department: String,
    },
    Jobs {
        id: i64,
        job: String,
    },
    HiredEmployees {
        id: i64,
        name: String,
        datetime: DateTime<Utc>,
        department_id: i64,
        job_id: i64,
    },
}

impl CandidateRow {
    pub fn id(&self) -> i64 {
        match self {
            CandidateRow::Departments { id, .. }
            | CandidateRow::Jobs { id, .. }
            | CandidateRow::HiredEmployees { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> TableKind {
        match self {
            CandidateRow::Departments { .. } => TableKind::Departments,
            CandidateRow::Jobs { .. } => TableKind::Jobs,
            CandidateRow::HiredEmployees { .. } => TableKind::HiredEmployees,
        }
    }

    /// Cell values in CSV column order, as written to diagnostic files
    pub fn cells(&self) -> Vec<String> {
        match self {
            CandidateRow::Departments { id, department } => {
                vec![id.to_string(), department.clone()]
            },
            CandidateRow::Jobs { id, job } => vec![id.to_string(), job.clone()],
            CandidateRow::HiredEmployees {
                id,
                name,
                datetime,
                department_id,
                job_id,
            } => vec![
                id.to_string(),
                name.clone(),
                format_timestamp(datetime),
                department_id.to_string(),
                job_id.to_string(),
            ],
        }
    }

    /// Column name to value map, used for `rejected_rows` in results
    pub fn to_json_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            CandidateRow::Departments { id, department } => {
                map.insert("id".into(), Value::from(*id));
                map.insert("department".into(), Value::from(department.clone()));
            },
            CandidateRow::Jobs { id, job } => {
                map.insert("id".into(), Value::from(*id));
                map.insert("job".into(), Value::from(job.clone()));
            },
            CandidateRow::HiredEmployees {
                id,
                name,
                datetime,
                department_id,
                job_id,
            } => {
                map.insert("id".into(), Value::from(*id));
                map.insert("name".into(), Value::from(name.clone()));
                map.insert("datetime".into(), Value::from(format_timestamp(datetime)));
                map.insert("department_id".into(), Value::from(*department_id));
                map.insert("job_id".into(), Value::from(*job_id));
            },
        }
        map
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

// ============================================================================
// Stage Outputs
// ============================================================================

/// Output of the row validator
#[derive(Debug, Clone, Default)]
pub struct Validated {
    pub rows: Vec<CandidateRow>,
    pub invalid_rows: usize,
    /// Number of data rows in the source
    pub total: usize,
}

/// Output of the duplicate detector
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    /// Rows left to insert, in source order
    pub rows: Vec<CandidateRow>,
    /// Rows whose id already exists in storage
    pub cross_batch: usize,
    /// Extra occurrences of ids repeated within the batch
    pub in_file: usize,
}

impl Reconciled {
    pub fn duplicates(&self) -> usize {
        self.cross_batch + self.in_file
    }
}

/// A row that reached the inserter but was not stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRow {
    #[serde(flatten)]
    pub row: Map<String, Value>,
    pub error: String,
}

impl RejectedRow {
    pub fn new(row: &CandidateRow, error: impl Into<String>) -> Self {
        Self {
            row: row.to_json_map(),
            error: error.into(),
        }
    }
}

// ============================================================================
// Batch Result
// ============================================================================

/// Summary of one ingestion call
///
/// `inserted + invalid_rows + duplicates + rejected_fk + other_errors == total`
/// holds for every result the pipeline returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: Uuid,
    pub table: TableKind,
    pub total: usize,
    pub inserted: usize,
    pub invalid_rows: usize,
    pub duplicates: usize,
    pub rejected_fk: usize,
    pub rejected_rows: Vec<RejectedRow>,
    pub other_errors: usize,
    pub message: String,
}

impl BatchResult {
    /// Whether any row was left out of storage
    pub fn has_issues(&self) -> bool {
        self.rejected_fk > 0 || self.invalid_rows > 0 || self.duplicates > 0 || self.other_errors > 0
    }

    pub(crate) fn summary_message(
        table: TableKind,
        inserted: usize,
        invalid_rows: usize,
        duplicates: usize,
        rejected_fk: usize,
        other_errors: usize,
    ) -> String {
        let mut message = format!(
            "Inserted {inserted}, {invalid_rows} invalid, {duplicates} duplicates, \
             {rejected_fk} rejected by FK in {table}"
        );
        if other_errors > 0 {
            message.push_str(&format!(", {other_errors} storage errors"));
        }
        message
    }
}

// ============================================================================
// Settings
// ============================================================================

/// What to do with rows that fail on a storage error other than a
/// constraint violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageErrorPolicy {
    /// Count them in `other_errors`
    #[default]
    Separate,
    /// Add them to `rejected_rows` and count them in `rejected_fk`
    Reject,
}

impl std::str::FromStr for StorageErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "separate" => Ok(StorageErrorPolicy::Separate),
            "reject" => Ok(StorageErrorPolicy::Reject),
            other => Err(format!(
                "Invalid storage error policy '{}'. Must be one of: separate, reject",
                other
            )),
        }
    }
}

/// Tunables for an ingestion service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSettings {
    pub max_batch_size: usize,
    pub storage_error_policy: StorageErrorPolicy,
    /// Directory for diagnostic CSV files; `None` disables them
    pub diagnostics_dir: Option<PathBuf>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
            storage_error_policy: StorageErrorPolicy::default(),
            diagnostics_dir: None,
        }
    }
}

// ============================================================================
// Source
// ============================================================================

/// Where the rows of a batch come from
#[derive(Debug, Clone)]
pub enum Source {
    /// Raw CSV bytes, e.g. an uploaded file
    Csv(Vec<u8>),
    /// A CSV file on disk
    Path(PathBuf),
    /// Rows that were already parsed by the caller
    Rows(Vec<CandidateRow>),
}
