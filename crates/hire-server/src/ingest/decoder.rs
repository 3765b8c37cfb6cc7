//! Conversion of candidate rows into storage records
//!
//! Candidates carry `i64` ids and unbounded text; storage columns are
//! `INTEGER` and fixed-width `VARCHAR`. Rows that do not fit are rejected
//! here instead of failing inside the database.

use hire_common::types::{
    Department, HiredEmployee, Job, Record, DEPARTMENT_NAME_MAX_LEN, EMPLOYEE_NAME_MAX_LEN,
    JOB_TITLE_MAX_LEN,
};
use thiserror::Error;

use super::types::CandidateRow;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("value {value} in column '{column}' is out of range for an integer column")]
    OutOfRange { column: &'static str, value: i64 },

    #[error("value in column '{column}' is {length} characters long, the limit is {limit}")]
    TooLong {
        column: &'static str,
        length: usize,
        limit: usize,
    },

    #[error("column '{0}' is blank")]
    Blank(&'static str),
}

fn int_column(column: &'static str, value: i64) -> Result<i32, DecodeError> {
    i32::try_from(value).map_err(|_| DecodeError::OutOfRange { column, value })
}

fn text_column(column: &'static str, value: &str, limit: usize) -> Result<String, DecodeError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DecodeError::Blank(column));
    }

    let length = value.chars().count();
    if length > limit {
        return Err(DecodeError::TooLong {
            column,
            length,
            limit,
        });
    }
    Ok(value.to_string())
}

pub fn decode(row: &CandidateRow) -> Result<Record, DecodeError> {
    match row {
        CandidateRow::Departments { id, department } => Ok(Record::Department(Department {
            id: int_column("id", *id)?,
            name: text_column("department", department, DEPARTMENT_NAME_MAX_LEN)?,
        })),
        CandidateRow::Jobs { id, job } => Ok(Record::Job(Job {
            id: int_column("id", *id)?,
            title: text_column("job", job, JOB_TITLE_MAX_LEN)?,
        })),
        CandidateRow::HiredEmployees {
            id,
            name,
            datetime,
            department_id,
            job_id,
        } => Ok(Record::HiredEmployee(HiredEmployee {
            id: int_column("id", *id)?,
            name: text_column("name", name, EMPLOYEE_NAME_MAX_LEN)?,
            hired_at: *datetime,
            department_id: int_column("department_id", *department_id)?,
            job_id: int_column("job_id", *job_id)?,
        })),
    }
}
