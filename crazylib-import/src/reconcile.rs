//! Whole-batch reconciliation of copy histories
//!
//! Runs over every record before anything is written and produces:
//! - the chronological event history of each copy
//! - the BORROW tally of each book
//! - the set of copies whose history has two consecutive events of the
//!   same kind (invalid copies, excluded from persistence)
//! - the final availability of each copy
//!
//! The tally is taken in the same pass as the grouping, before invalid
//! copies are known, so borrows of an invalid copy still count toward its
//! book. Existing databases were built that way and the counts must match.

use crate::record::{RawRecord, RecordEvent};
use crazylib_common::EventKind;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Chronologically sorted events of one copy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CopyHistory {
    events: Vec<RecordEvent>,
}

impl CopyHistory {
    /// Sort events by timestamp; equal timestamps keep input order
    pub fn from_events(mut events: Vec<RecordEvent>) -> Self {
        events.sort_by_key(|e| e.action_dt);
        Self { events }
    }

    pub fn events(&self) -> &[RecordEvent] {
        &self.events
    }

    /// True when no two neighbouring events share a kind
    pub fn is_alternating(&self) -> bool {
        !self.events.windows(2).any(|pair| pair[0].kind == pair[1].kind)
    }

    /// Availability after the most recent event; a copy without events is available
    pub fn available(&self) -> bool {
        self.events
            .last()
            .map_or(true, |last| last.kind.leaves_available())
    }
}

/// Aggregates for one import run
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    histories: BTreeMap<String, CopyHistory>,
    availability: HashMap<String, bool>,
    borrow_counts: HashMap<String, i64>,
    invalid_copies: BTreeSet<String>,
}

impl Reconciliation {
    /// Analyze a batch of records
    ///
    /// Records without a call number, with an unknown kind or without a
    /// usable timestamp are ignored here. This never fails.
    pub fn from_records(records: &[RawRecord]) -> Self {
        let mut grouped: BTreeMap<String, Vec<RecordEvent>> = BTreeMap::new();
        let mut borrow_counts: HashMap<String, i64> = HashMap::new();

        for record in records {
            let Some(copy_key) = record.copy_key() else {
                continue;
            };
            let Ok(event) = record.extract_event() else {
                continue;
            };

            if event.kind == EventKind::Borrow {
                if let Some(book_key) = record.book_key() {
                    *borrow_counts.entry(book_key).or_insert(0) += 1;
                }
            }

            grouped.entry(copy_key).or_default().push(event);
        }

        let mut histories = BTreeMap::new();
        let mut availability = HashMap::new();
        let mut invalid_copies = BTreeSet::new();

        for (copy_key, events) in grouped {
            let history = CopyHistory::from_events(events);

            if !history.is_alternating() {
                debug!(
                    copy = %copy_key,
                    events = history.events().len(),
                    "Copy history has consecutive same-kind events"
                );
                invalid_copies.insert(copy_key.clone());
            }

            availability.insert(copy_key.clone(), history.available());
            histories.insert(copy_key, history);
        }

        Self {
            histories,
            availability,
            borrow_counts,
            invalid_copies,
        }
    }

    /// Copy has two consecutive same-kind events
    pub fn is_invalid(&self, copy_key: &str) -> bool {
        self.invalid_copies.contains(copy_key)
    }

    /// Final availability; copies never seen are available
    pub fn availability(&self, copy_key: &str) -> bool {
        self.availability.get(copy_key).copied().unwrap_or(true)
    }

    /// BORROW tally of a book across all of its copies
    pub fn total_borrowed(&self, book_key: &str) -> i64 {
        self.borrow_counts.get(book_key).copied().unwrap_or(0)
    }

    pub fn history(&self, copy_key: &str) -> Option<&CopyHistory> {
        self.histories.get(copy_key)
    }

    pub fn invalid_copies(&self) -> &BTreeSet<String> {
        &self.invalid_copies
    }

    /// Number of distinct books with at least one BORROW
    pub fn books_tallied(&self) -> usize {
        self.borrow_counts.len()
    }

    /// Number of distinct copies with at least one usable event
    pub fn copies_seen(&self) -> usize {
        self.histories.len()
    }
}
