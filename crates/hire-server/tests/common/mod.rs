//! Common test utilities for hire-server integration tests
//!
//! - PostgreSQL container with migrations applied (testcontainers)
//! - Deterministic CSV fixtures for the three tables
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestPostgres;
//!
//! #[tokio::test]
//! #[ignore = "requires Docker"]
//! async fn test_with_postgres() {
//!     let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
//!     sqlx::query("SELECT 1").execute(pg.pool()).await.expect("Query failed");
//! }
//! ```

#![allow(dead_code)]

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::fmt::Write as _;
use std::time::Duration;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::{debug, info};

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

/// PostgreSQL container with the hiring schema migrated
pub struct TestPostgres {
    container: ContainerAsync<Postgres>,
    pool: PgPool,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string =
            format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);
        debug!("PostgreSQL connection: {}", connection_string);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&connection_string)
            .await
            .context("Failed to connect to PostgreSQL")?;

        // The migrations are located relative to the crate root
        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self { container, pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn pool_clone(&self) -> PgPool {
        self.pool.clone()
    }

    pub fn container(&self) -> &ContainerAsync<Postgres> {
        &self.container
    }
}

/// Initialize tracing for tests
///
/// Safe to call more than once.
pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,hire_server=debug,sqlx=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}

// ============================================================================
// CSV Fixtures
// ============================================================================

/// `id,department` rows `Dept_1..=Dept_n`
pub fn departments_csv(rows: usize) -> String {
    let mut csv = String::from("id,department\n");
    for i in 1..=rows {
        let _ = writeln!(csv, "{i},Dept_{i}");
    }
    csv
}

/// `id,job` rows `Job_1..=Job_n`
pub fn jobs_csv(rows: usize) -> String {
    let mut csv = String::from("id,job\n");
    for i in 1..=rows {
        let _ = writeln!(csv, "{i},Job_{i}");
    }
    csv
}

/// Valid hires spread over 2021, referencing departments `1..=departments`
/// and jobs `1..=jobs`
pub fn hired_csv(rows: usize, departments: usize, jobs: usize) -> String {
    let mut csv = String::from("id,name,datetime,department_id,job_id\n");
    for i in 1..=rows {
        let month = (i % 12) + 1;
        let day = (i % 28) + 1;
        let _ = writeln!(
            csv,
            "{i},Employee {i},2021-{month:02}-{day:02}T{:02}:{:02}:00Z,{},{}",
            i % 24,
            i % 60,
            (i % departments) + 1,
            (i % jobs) + 1,
        );
    }
    csv
}
