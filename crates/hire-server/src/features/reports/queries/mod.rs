pub mod above_mean;
pub mod hired_by_quarter;

pub use above_mean::{AboveMeanError, AboveMeanQuery, AboveMeanResponse, DepartmentHires};
pub use hired_by_quarter::{
    HiredByQuarterError, HiredByQuarterQuery, HiredByQuarterResponse, QuarterRow,
};

/// Year reported when the request does not name one
pub const DEFAULT_REPORT_YEAR: i32 = 2021;

pub const MIN_REPORT_YEAR: i32 = 1900;
pub const MAX_REPORT_YEAR: i32 = 2100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportYearError {
    #[error("Year {0} is out of range. Must be between 1900 and 2100")]
    OutOfRange(i32),
}

pub fn validate_year(year: i32) -> Result<(), ReportYearError> {
    if (MIN_REPORT_YEAR..=MAX_REPORT_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(ReportYearError::OutOfRange(year))
    }
}
