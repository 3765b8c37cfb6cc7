//! Departments that hired more than the mean in a year

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::{validate_year, ReportYearError, DEFAULT_REPORT_YEAR};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AboveMeanQuery {
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DepartmentHires {
    pub id: i32,
    pub department: String,
    pub hired: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboveMeanResponse {
    pub rows: Vec<DepartmentHires>,
    pub total: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum AboveMeanError {
    #[error(transparent)]
    Year(#[from] ReportYearError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AboveMeanQuery {
    pub fn year(&self) -> i32 {
        self.year.unwrap_or(DEFAULT_REPORT_YEAR)
    }

    pub fn validate(&self) -> Result<(), AboveMeanError> {
        validate_year(self.year())?;
        Ok(())
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: AboveMeanQuery) -> Result<AboveMeanResponse, AboveMeanError> {
    query.validate()?;

    // The mean is taken over departments with at least one hire in the year.
    let rows = sqlx::query_as::<_, DepartmentHires>(
        r#"
        WITH per_department AS (
            SELECT department_id, COUNT(*) AS hired
            FROM hired_employees
            WHERE EXTRACT(YEAR FROM datetime AT TIME ZONE 'UTC') = $1
            GROUP BY department_id
        )
        SELECT d.id AS id, d.department AS department, p.hired AS hired
        FROM per_department p
        JOIN departments d ON d.id = p.department_id
        WHERE p.hired > (SELECT AVG(hired) FROM per_department)
        ORDER BY p.hired DESC, d.id ASC
        "#,
    )
    .bind(query.year())
    .fetch_all(&pool)
    .await?;

    tracing::debug!(rows = rows.len(), "Above-mean report computed");

    Ok(AboveMeanResponse {
        total: rows.len(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_year() {
        let query = AboveMeanQuery { year: Some(2022) };
        assert_eq!(query.year(), 2022);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_year_out_of_range() {
        let query = AboveMeanQuery { year: Some(2101) };
        assert!(query.validate().is_err());
    }
}
