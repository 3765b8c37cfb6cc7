//! Duplicate detection
//!
//! Rows whose id already exists in storage are dropped first. Among the
//! survivors, the first occurrence of a repeated id is kept and the extra
//! occurrences are dropped.

use std::collections::{HashMap, HashSet};

use hire_common::types::TableKind;

use super::diagnostics::{Channel, DiagnosticReport, DiagnosticSink};
use super::error::IngestError;
use super::store::IngestStore;
use super::types::{CandidateRow, Reconciled};

#[tracing::instrument(skip(store, rows, sink), fields(table = %kind, rows = rows.len()))]
pub async fn reconcile(
    store: &dyn IngestStore,
    rows: Vec<CandidateRow>,
    kind: TableKind,
    sink: &mut dyn DiagnosticSink,
) -> Result<Reconciled, IngestError> {
    let ids: Vec<i64> = rows.iter().map(CandidateRow::id).collect();
    let existing = store.existing_ids(kind, &ids).await?;

    // Cross-batch
    let mut report = DiagnosticReport::new(Channel::Duplicates, kind);
    let mut survivors = Vec::with_capacity(rows.len());
    for row in rows {
        if existing.contains(&row.id()) {
            report.push_row(&row, format!("id {} already exists in {}", row.id(), kind));
        } else {
            survivors.push(row);
        }
    }
    let cross_batch = report.rows.len();
    sink.write(report);

    // Intra-batch
    let mut occurrences: HashMap<i64, usize> = HashMap::new();
    for row in &survivors {
        *occurrences.entry(row.id()).or_default() += 1;
    }

    let mut report = DiagnosticReport::new(Channel::DuplicatesInFile, kind);
    let mut kept = Vec::with_capacity(survivors.len());
    let mut seen = HashSet::new();
    let mut in_file = 0;
    for row in survivors {
        let count = occurrences.get(&row.id()).copied().unwrap_or(0);
        if count > 1 {
            report.push_row(&row, format!("id {} appears {} times in the file", row.id(), count));
        }
        if seen.insert(row.id()) {
            kept.push(row);
        } else {
            in_file += 1;
        }
    }
    sink.write(report);

    if cross_batch > 0 || in_file > 0 {
        tracing::info!(cross_batch, in_file, "Duplicate rows removed");
    }

    Ok(Reconciled {
        rows: kept,
        cross_batch,
        in_file,
    })
}
