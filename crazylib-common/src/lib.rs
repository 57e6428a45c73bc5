//! # crazylib common library
//!
//! Shared code for the crazylib services:
//! - Database schema and connection setup
//! - Entity models (customers, books, copies, library events)
//! - Event kinds and the import fingerprint
//! - Configuration loading
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod event;

pub use error::{Error, Result};
pub use event::{fingerprint, EventKind};
