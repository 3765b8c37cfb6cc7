//! Hiring Data Server - Main entry point

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use hire_common::logging::{init_logging, LogConfig};
use tokio::signal;
use tracing::info;

use hire_server::{
    api::{self, AppState},
    config::Config,
    db,
    ingest::{IngestStore, IngestionService, MemoryStore, PgIngestStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("hire-server")
        .filter_directives("hire_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Hiring Data Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let (db_pool, store): (_, Arc<dyn IngestStore>) = if config.database.skip {
        tracing::warn!("DATABASE_SKIP is set - ingested rows are kept in memory and reports are disabled");
        (None, Arc::new(MemoryStore::new()))
    } else {
        let pool = db::create_pool(&config.database).await?;
        db::run_migrations(&pool).await?;
        (Some(pool.clone()), Arc::new(PgIngestStore::new(pool)))
    };

    let settings = config.ingest.settings();
    info!(
        max_batch_size = settings.max_batch_size,
        storage_error_policy = ?settings.storage_error_policy,
        diagnostics_dir = ?settings.diagnostics_dir,
        "Ingestion service ready"
    );

    let state = AppState {
        db: db_pool,
        ingest: IngestionService::new(store, settings),
    };

    let app = api::create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
