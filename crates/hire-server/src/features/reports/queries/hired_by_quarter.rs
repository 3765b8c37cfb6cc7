//! Hires per department and job, split by quarter

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::{validate_year, ReportYearError, DEFAULT_REPORT_YEAR};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HiredByQuarterQuery {
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuarterRow {
    pub department: String,
    pub job: String,
    pub q1: i64,
    pub q2: i64,
    pub q3: i64,
    pub q4: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiredByQuarterResponse {
    pub rows: Vec<QuarterRow>,
    pub total: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum HiredByQuarterError {
    #[error(transparent)]
    Year(#[from] ReportYearError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl HiredByQuarterQuery {
    pub fn year(&self) -> i32 {
        self.year.unwrap_or(DEFAULT_REPORT_YEAR)
    }

    pub fn validate(&self) -> Result<(), HiredByQuarterError> {
        validate_year(self.year())?;
        Ok(())
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: HiredByQuarterQuery,
) -> Result<HiredByQuarterResponse, HiredByQuarterError> {
    query.validate()?;

    let rows = sqlx::query_as::<_, QuarterRow>(
        r#"
        SELECT
            d.department AS department,
            j.job AS job,
            COUNT(*) FILTER (WHERE EXTRACT(QUARTER FROM e.datetime AT TIME ZONE 'UTC') = 1) AS q1,
            COUNT(*) FILTER (WHERE EXTRACT(QUARTER FROM e.datetime AT TIME ZONE 'UTC') = 2) AS q2,
            COUNT(*) FILTER (WHERE EXTRACT(QUARTER FROM e.datetime AT TIME ZONE 'UTC') = 3) AS q3,
            COUNT(*) FILTER (WHERE EXTRACT(QUARTER FROM e.datetime AT TIME ZONE 'UTC') = 4) AS q4
        FROM hired_employees e
        JOIN departments d ON e.department_id = d.id
        JOIN jobs j ON e.job_id = j.id
        WHERE EXTRACT(YEAR FROM e.datetime AT TIME ZONE 'UTC') = $1
        GROUP BY d.department, j.job
        ORDER BY d.department ASC, j.job ASC
        "#,
    )
    .bind(query.year())
    .fetch_all(&pool)
    .await?;

    tracing::debug!(rows = rows.len(), "Hired-by-quarter report computed");

    Ok(HiredByQuarterResponse {
        total: rows.len(),
        rows,
    })
}
