//! Error types for crazylib-import
//!
//! Two tiers:
//! - [`ImportError`] is fatal and aborts the whole run.
//! - [`ExtractError`] describes a single unusable record. The orchestrator
//!   counts it as skipped and moves on; it never aborts a batch.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal import failure
#[derive(Debug, Error)]
pub enum ImportError {
    /// Input path does not exist
    #[error("File not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Input is not valid JSON / JSON Lines
    #[error("Invalid JSON at {location}: {message}")]
    MalformedInput { location: String, message: String },

    /// Input could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage failure; the cause is reported verbatim
    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error(transparent)]
    Common(#[from] crazylib_common::Error),
}

/// Why a single record cannot be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// A key field is absent or blank after trimming
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    /// `Type` is neither borrow nor release
    #[error("unknown event type: {0:?}")]
    UnknownEventKind(String),

    /// `ActionDateTime` is absent or matches no accepted format
    #[error("unparsable timestamp: {0:?}")]
    UnparsableTimestamp(String),
}

pub type Result<T> = std::result::Result<T, ImportError>;
