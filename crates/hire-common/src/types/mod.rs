//! Domain types shared by the ingestion core, the HTTP layer and the CLI

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HireError;

// ============================================================================
// Column Widths
// ============================================================================

/// Maximum length of `departments.department`.
pub const DEPARTMENT_NAME_MAX_LEN: usize = 100;

/// Maximum length of `jobs.job`.
pub const JOB_TITLE_MAX_LEN: usize = 100;

/// Maximum length of `hired_employees.name`.
pub const EMPLOYEE_NAME_MAX_LEN: usize = 150;

// ============================================================================
// Table Kinds
// ============================================================================

/// The three tables a CSV upload can target.
///
/// Every schema, decoder and storage decision in the pipeline is made by
/// matching on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Departments,
    Jobs,
    HiredEmployees,
}

impl TableKind {
    /// All supported kinds, in dependency order (parents first).
    pub const ALL: [TableKind; 3] = [
        TableKind::Departments,
        TableKind::Jobs,
        TableKind::HiredEmployees,
    ];

    /// Table name as used in URLs, CSV uploads and SQL
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Departments => "departments",
            TableKind::Jobs => "jobs",
            TableKind::HiredEmployees => "hired_employees",
        }
    }

    /// Exact, ordered CSV header expected for this kind
    pub fn expected_columns(&self) -> &'static [&'static str] {
        match self {
            TableKind::Departments => &["id", "department"],
            TableKind::Jobs => &["id", "job"],
            TableKind::HiredEmployees => &["id", "name", "datetime", "department_id", "job_id"],
        }
    }
}

impl std::str::FromStr for TableKind {
    type Err = HireError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "departments" => Ok(TableKind::Departments),
            "jobs" => Ok(TableKind::Jobs),
            "hired_employees" => Ok(TableKind::HiredEmployees),
            other => Err(HireError::UnsupportedTableKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Records
// ============================================================================

/// A row of the `departments` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: i32,
    /// Stored in the `department` column
    pub name: String,
}

/// A row of the `jobs` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: i32,
    /// Stored in the `job` column
    pub title: String,
}

/// A row of the `hired_employees` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiredEmployee {
    pub id: i32,
    pub name: String,
    /// Stored in the `datetime` column
    pub hired_at: DateTime<Utc>,
    pub department_id: i32,
    pub job_id: i32,
}

/// A typed record ready to be written to storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum Record {
    Department(Department),
    Job(Job),
    HiredEmployee(HiredEmployee),
}

impl Record {
    /// Primary key of the record
    pub fn id(&self) -> i32 {
        match self {
            Record::Department(d) => d.id,
            Record::Job(j) => j.id,
            Record::HiredEmployee(e) => e.id,
        }
    }

    /// Table this record belongs to
    pub fn kind(&self) -> TableKind {
        match self {
            Record::Department(_) => TableKind::Departments,
            Record::Job(_) => TableKind::Jobs,
            Record::HiredEmployee(_) => TableKind::HiredEmployees,
        }
    }
}
