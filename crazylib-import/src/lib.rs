//! Batch importer for historical borrow/release logs
//!
//! Reads a JSON, JSON-array or JSON Lines file of log records, reconciles
//! per-copy histories over the whole batch, then writes customers, books,
//! copies and events idempotently.

pub mod error;
pub mod orchestrator;
pub mod parser;
pub mod reconcile;
pub mod record;
pub mod timestamp;
pub mod writer;

pub use error::{ExtractError, ImportError, Result};
pub use orchestrator::{import_file, run_import, ImportOptions, ImportSummary};
pub use parser::{parse_records, read_records};
pub use reconcile::Reconciliation;
pub use record::RawRecord;
