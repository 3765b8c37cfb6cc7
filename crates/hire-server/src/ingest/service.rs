//! Ingestion service
//!
//! Runs one batch through validation, the batch-size check, duplicate
//! detection and insertion. Structural errors stop the batch before any row
//! is written; row-level problems are only reported.

use std::sync::Arc;

use hire_common::types::TableKind;
use uuid::Uuid;

use super::dedup::reconcile;
use super::diagnostics::{self, Channel, DiagnosticReport, DiagnosticSink, MemorySink, NullSink};
use super::error::IngestError;
use super::inserter::{check_batch_size, insert, BatchContext};
use super::store::IngestStore;
use super::types::{BatchResult, IngestSettings, Source, Validated};
use super::validator::{validate, RawTable};

/// Entry point used by the HTTP layer and the CLI loader
#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn IngestStore>,
    settings: IngestSettings,
}

impl std::fmt::Debug for IngestionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl IngestionService {
    pub fn new(store: Arc<dyn IngestStore>, settings: IngestSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn IngestStore> {
        &self.store
    }

    /// Ingest a batch, writing diagnostics where the settings say
    pub async fn insert_batch(
        &self,
        source: Source,
        kind: TableKind,
    ) -> Result<BatchResult, IngestError> {
        let batch_id = Uuid::new_v4();
        let Some(dir) = self.settings.diagnostics_dir.clone() else {
            return run_batch(
                self.store.as_ref(),
                source,
                kind,
                &self.settings,
                batch_id,
                &mut NullSink,
            )
            .await;
        };

        // Files are written once the batch is done, off the async workers
        let mut buffer = MemorySink::new();
        let result = run_batch(
            self.store.as_ref(),
            source,
            kind,
            &self.settings,
            batch_id,
            &mut buffer,
        )
        .await;
        diagnostics::flush_to_dir(dir, batch_id, buffer.reports).await;
        result
    }

    /// Ingest a batch, sending diagnostics to `sink`
    pub async fn insert_batch_with_sink(
        &self,
        source: Source,
        kind: TableKind,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<BatchResult, IngestError> {
        run_batch(
            self.store.as_ref(),
            source,
            kind,
            &self.settings,
            Uuid::new_v4(),
            sink,
        )
        .await
    }
}

/// Ingest a batch against `store` without constructing a service
pub async fn insert_batch(
    store: &dyn IngestStore,
    source: Source,
    kind: TableKind,
    settings: &IngestSettings,
    sink: &mut dyn DiagnosticSink,
) -> Result<BatchResult, IngestError> {
    run_batch(store, source, kind, settings, Uuid::new_v4(), sink).await
}

#[tracing::instrument(
    name = "ingest_batch",
    skip_all,
    fields(batch_id = %batch_id, table = %kind)
)]
async fn run_batch(
    store: &dyn IngestStore,
    source: Source,
    kind: TableKind,
    settings: &IngestSettings,
    batch_id: Uuid,
    sink: &mut dyn DiagnosticSink,
) -> Result<BatchResult, IngestError> {
    let validated = match source {
        Source::Csv(bytes) => validate(&RawTable::from_csv(&bytes)?, kind, sink)?,
        Source::Path(path) => {
            tracing::info!(path = %path.display(), "Reading CSV file");
            let bytes = tokio::fs::read(&path).await?;
            validate(&RawTable::from_csv(&bytes)?, kind, sink)?
        },
        Source::Rows(rows) => {
            let total = rows.len();
            let mut report = DiagnosticReport::new(Channel::Invalid, kind);
            let mut kept = Vec::with_capacity(total);
            for row in rows {
                if row.kind() == kind {
                    kept.push(row);
                } else {
                    report.push_row(&row, format!("row belongs to {}, not {}", row.kind(), kind));
                }
            }
            let invalid_rows = report.rows.len();
            sink.write(report);
            Validated {
                rows: kept,
                invalid_rows,
                total,
            }
        },
    };

    tracing::info!(
        total = validated.total,
        valid = validated.rows.len(),
        invalid_rows = validated.invalid_rows,
        "Validation finished"
    );

    if let Err(e) = check_batch_size(validated.rows.len(), settings.max_batch_size) {
        tracing::warn!(error = %e, "Batch refused");
        return Err(e);
    }

    let context = BatchContext {
        batch_id,
        table: kind,
        total: validated.total,
        invalid_rows: validated.invalid_rows,
        policy: settings.storage_error_policy,
    };

    let reconciled = reconcile(store, validated.rows, kind, sink).await?;
    Ok(insert(store, reconciled, context, sink).await)
}
