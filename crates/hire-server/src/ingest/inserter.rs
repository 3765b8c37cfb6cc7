//! Batch inserter
//!
//! Writes reconciled rows one record at a time, each in its own unit of
//! work, so a constraint violation only costs the offending row.

use hire_common::types::TableKind;
use uuid::Uuid;

use super::decoder::decode;
use super::diagnostics::{Channel, DiagnosticReport, DiagnosticSink};
use super::error::IngestError;
use super::store::{IngestStore, StoreError};
use super::types::{BatchResult, Reconciled, RejectedRow, StorageErrorPolicy};

/// Reject empty and oversized batches before any storage access
pub fn check_batch_size(received: usize, limit: usize) -> Result<(), IngestError> {
    if received == 0 {
        return Err(IngestError::EmptyBatch);
    }
    if received > limit {
        return Err(IngestError::BatchTooLarge { received, limit });
    }
    Ok(())
}

/// Batch-wide facts the inserter reports but does not compute
#[derive(Debug, Clone, Copy)]
pub struct BatchContext {
    pub batch_id: Uuid,
    pub table: TableKind,
    pub total: usize,
    pub invalid_rows: usize,
    pub policy: StorageErrorPolicy,
}

#[tracing::instrument(
    skip(store, reconciled, context, sink),
    fields(table = %context.table, rows = reconciled.rows.len())
)]
pub async fn insert(
    store: &dyn IngestStore,
    reconciled: Reconciled,
    context: BatchContext,
    sink: &mut dyn DiagnosticSink,
) -> BatchResult {
    let table = context.table;
    let mut inserted = 0;
    let mut duplicates = reconciled.duplicates();
    let mut other_errors = 0;
    let mut rejected_rows = Vec::new();

    let mut rejected_report = DiagnosticReport::new(Channel::ForeignKeyErrors, table);
    let mut duplicate_report = DiagnosticReport::new(Channel::Duplicates, table);
    let mut storage_report = DiagnosticReport::new(Channel::StorageErrors, table);

    for row in &reconciled.rows {
        let record = match decode(row) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(id = row.id(), error = %e, "Row rejected before insert");
                rejected_report.push_row(row, e.to_string());
                rejected_rows.push(RejectedRow::new(row, e.to_string()));
                continue;
            },
        };

        match store.insert_record(&record).await {
            Ok(()) => inserted += 1,
            Err(e @ StoreError::ForeignKeyViolation(_)) => {
                tracing::debug!(id = row.id(), error = %e, "Row rejected by foreign key");
                rejected_report.push_row(row, e.to_string());
                rejected_rows.push(RejectedRow::new(row, e.to_string()));
            },
            Err(e @ StoreError::UniqueViolation(_)) => {
                tracing::debug!(id = row.id(), error = %e, "Row inserted concurrently by another batch");
                duplicates += 1;
                duplicate_report.push_row(row, e.to_string());
            },
            Err(e) => {
                tracing::error!(id = row.id(), error = %e, "Storage error while inserting row");
                storage_report.push_row(row, e.to_string());
                match context.policy {
                    StorageErrorPolicy::Separate => other_errors += 1,
                    StorageErrorPolicy::Reject => {
                        rejected_rows.push(RejectedRow::new(row, e.to_string()))
                    },
                }
            },
        }
    }

    sink.write(rejected_report);
    sink.write(duplicate_report);
    sink.write(storage_report);

    let rejected_fk = rejected_rows.len();
    let message = BatchResult::summary_message(
        table,
        inserted,
        context.invalid_rows,
        duplicates,
        rejected_fk,
        other_errors,
    );

    tracing::info!(
        batch_id = %context.batch_id,
        inserted,
        invalid_rows = context.invalid_rows,
        duplicates,
        rejected_fk,
        other_errors,
        "{}",
        message
    );

    BatchResult {
        batch_id: context.batch_id,
        table,
        total: context.total,
        inserted,
        invalid_rows: context.invalid_rows,
        duplicates,
        rejected_fk,
        rejected_rows,
        other_errors,
        message,
    }
}
