//! PostgreSQL-backed ingestion store

use std::collections::HashSet;

use async_trait::async_trait;
use hire_common::types::{Record, TableKind};
use sqlx::PgPool;

use super::{IngestStore, StoreError};

#[derive(Debug, Clone)]
pub struct PgIngestStore {
    pool: PgPool,
}

impl PgIngestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn existing_ids_sql(kind: TableKind) -> &'static str {
    match kind {
        TableKind::Departments => "SELECT id FROM departments WHERE id = ANY($1)",
        TableKind::Jobs => "SELECT id FROM jobs WHERE id = ANY($1)",
        TableKind::HiredEmployees => "SELECT id FROM hired_employees WHERE id = ANY($1)",
    }
}

async fn execute_insert(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    record: &Record,
) -> Result<(), sqlx::Error> {
    match record {
        Record::Department(d) => {
            sqlx::query("INSERT INTO departments (id, department) VALUES ($1, $2)")
                .bind(d.id)
                .bind(&d.name)
                .execute(&mut **tx)
                .await?;
        },
        Record::Job(j) => {
            sqlx::query("INSERT INTO jobs (id, job) VALUES ($1, $2)")
                .bind(j.id)
                .bind(&j.title)
                .execute(&mut **tx)
                .await?;
        },
        Record::HiredEmployee(e) => {
            sqlx::query(
                r#"
                INSERT INTO hired_employees (id, name, datetime, department_id, job_id)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(e.id)
            .bind(&e.name)
            .bind(e.hired_at)
            .bind(e.department_id)
            .bind(e.job_id)
            .execute(&mut **tx)
            .await?;
        },
    }
    Ok(())
}

#[async_trait]
impl IngestStore for PgIngestStore {
    #[tracing::instrument(skip(self, ids), fields(table = %kind, ids = ids.len()))]
    async fn existing_ids(&self, kind: TableKind, ids: &[i64]) -> Result<HashSet<i64>, StoreError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        // Ids outside the INTEGER range cannot exist in the table.
        let candidates: Vec<i32> = ids.iter().filter_map(|id| i32::try_from(*id).ok()).collect();

        let rows: Vec<(i32,)> = sqlx::query_as(existing_ids_sql(kind))
            .bind(&candidates)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(id,)| i64::from(id)).collect())
    }

    async fn insert_record(&self, record: &Record) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        match execute_insert(&mut tx, record).await {
            Ok(()) => {
                // Deferred constraints surface at commit time.
                tx.commit().await?;
                Ok(())
            },
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(
                        table = %record.kind(),
                        id = record.id(),
                        error = %rollback_err,
                        "Rollback failed; connection will be discarded"
                    );
                }
                Err(StoreError::from(e))
            },
        }
    }
}
