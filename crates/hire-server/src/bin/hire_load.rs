//! Load one CSV file into the database from the command line
//!
//! Runs the same ingestion pipeline as `POST /api/v1/ingest/upload`.
//!
//! Usage:
//!   hire-load --table departments data/departments.csv
//!   hire-load --table hired_employees data/hired_employees.csv --diagnostics-dir logs

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hire_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use hire_common::types::TableKind;
use tracing::{error, info};

use hire_server::{
    config::Config,
    db,
    ingest::{BatchResult, IngestionService, PgIngestStore, Source},
};

/// Load a departments, jobs or hired_employees CSV file
#[derive(Parser, Debug)]
#[command(name = "hire-load")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Target table: departments, jobs or hired_employees
    #[arg(short, long)]
    table: TableKind,

    /// CSV file with a header line
    file: PathBuf,

    /// Write rejected rows as CSV files into this directory
    #[arg(long, env = "INGEST_DIAGNOSTICS_DIR")]
    diagnostics_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_file_prefix("hire-load")
        .build();

    // CLI should work without logging
    let _guard = init_logging(&log_config).ok().flatten();

    match run(cli).await {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!(error = %e, "Failed to serialize result");
                process::exit(1);
            },
        },
        Err(e) => {
            error!(error = %e, "Load failed");
            eprintln!("Error: {:#}", e);
            process::exit(1);
        },
    }
}

async fn run(cli: Cli) -> Result<BatchResult> {
    let config = Config::load().context("Failed to load config")?;

    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to database")?;
    db::run_migrations(&pool).await?;

    let mut settings = config.ingest.settings();
    if cli.diagnostics_dir.is_some() {
        settings.diagnostics_dir = cli.diagnostics_dir;
    }

    let service = IngestionService::new(Arc::new(PgIngestStore::new(pool)), settings);

    info!(table = %cli.table, file = %cli.file.display(), "Loading CSV file");
    let result = service
        .insert_batch(Source::Path(cli.file), cli.table)
        .await?;

    info!(batch_id = %result.batch_id, "{}", result.message);
    Ok(result)
}
