//! Import orchestration
//!
//! parse once → reconcile the whole batch → walk records again in input
//! order, persisting each eligible one.

use crate::error::Result;
use crate::parser::read_records;
use crate::reconcile::Reconciliation;
use crate::record::{ImportRecord, RawRecord};
use crate::writer::{persist_record, DerivedState, WriteOutcome};
use serde::Serialize;
use sqlx::SqlitePool;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Caller-supplied knobs for one run
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Do everything except write
    pub dry_run: bool,
    /// Stop after this many records
    pub limit: Option<usize>,
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Records walked in the persistence pass
    pub processed: usize,
    /// New events inserted
    pub created_events: usize,
    /// Ineligible records plus duplicate fingerprints
    pub skipped_events: usize,
    /// Records rejected because their copy history is invalid
    pub excluded_errors: usize,
    /// Distinct invalid copies
    pub invalid_copies: usize,
    /// Distinct books with a BORROW tally
    pub books_tallied: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Done. processed={}, created_events={}, skipped_events={}, excluded_errors={}, invalid_copies={}, books_tallied={}",
            self.processed,
            self.created_events,
            self.skipped_events,
            self.excluded_errors,
            self.invalid_copies,
            self.books_tallied
        )
    }
}

/// Import a file
pub async fn import_file(
    pool: &SqlitePool,
    path: &Path,
    options: &ImportOptions,
) -> Result<ImportSummary> {
    info!(path = %path.display(), dry_run = options.dry_run, "Starting import");

    let records = read_records(path).await?;
    info!(records = records.len(), "Loaded records");

    run_import(pool, &records, options).await
}

/// Import already-parsed records
///
/// A storage error aborts the run; records committed before it stay.
pub async fn run_import(
    pool: &SqlitePool,
    records: &[RawRecord],
    options: &ImportOptions,
) -> Result<ImportSummary> {
    let reconciliation = Reconciliation::from_records(records);

    if !reconciliation.invalid_copies().is_empty() {
        warn!(
            invalid_copies = reconciliation.invalid_copies().len(),
            "Copies with consecutive same-kind events will be excluded"
        );
    }
    info!(
        books_tallied = reconciliation.books_tallied(),
        copies = reconciliation.copies_seen(),
        "Reconciliation complete"
    );

    let mut summary = ImportSummary {
        invalid_copies: reconciliation.invalid_copies().len(),
        books_tallied: reconciliation.books_tallied(),
        ..Default::default()
    };

    for (index, raw) in records.iter().enumerate() {
        if options.limit.is_some_and(|limit| summary.processed >= limit) {
            debug!(limit = ?options.limit, "Record limit reached");
            break;
        }
        summary.processed += 1;

        let identity = match raw.extract_identity() {
            Ok(identity) => identity,
            Err(e) => {
                debug!(record = index, error = %e, "Skipping record");
                summary.skipped_events += 1;
                continue;
            }
        };

        if reconciliation.is_invalid(&identity.call_number) {
            debug!(record = index, copy = %identity.call_number, "Excluding record of invalid copy");
            summary.excluded_errors += 1;
            continue;
        }

        let event = match raw.extract_event() {
            Ok(event) => event,
            Err(e) => {
                debug!(record = index, error = %e, "Skipping record");
                summary.skipped_events += 1;
                continue;
            }
        };

        if options.dry_run {
            continue;
        }

        let derived = DerivedState {
            total_borrowed: reconciliation.total_borrowed(&identity.book.unique_id),
            available: reconciliation.availability(&identity.call_number),
        };
        let record = ImportRecord { identity, event };

        match persist_record(pool, &record, derived).await? {
            WriteOutcome::Created => summary.created_events += 1,
            WriteOutcome::Duplicate => {
                debug!(record = index, copy = %record.copy_key(), "Event already imported");
                summary.skipped_events += 1;
            }
        }
    }

    info!(
        processed = summary.processed,
        created = summary.created_events,
        skipped = summary.skipped_events,
        excluded = summary.excluded_errors,
        "Import finished"
    );

    Ok(summary)
}
