//! Database operations for the circulation service

pub mod circulation;

pub use circulation::*;
