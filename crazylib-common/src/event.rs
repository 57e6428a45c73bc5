//! Library event kinds and the import fingerprint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Kind of a circulation event
///
/// Stored as `BORROW` / `RELEASE` in the `library_events.event_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum EventKind {
    Borrow,
    Release,
}

impl EventKind {
    /// Database / wire label
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Borrow => "BORROW",
            EventKind::Release => "RELEASE",
        }
    }

    /// Parse a loosely written label (`"borrow"`, `" Release "`, ...)
    ///
    /// Matching is case-insensitive after trimming. Anything else is `None`.
    pub fn from_label(value: &str) -> Option<Self> {
        let v = value.trim();
        if v.eq_ignore_ascii_case("borrow") {
            Some(EventKind::Borrow)
        } else if v.eq_ignore_ascii_case("release") {
            Some(EventKind::Release)
        } else {
            None
        }
    }

    /// Availability of a copy right after this event
    pub fn leaves_available(&self) -> bool {
        matches!(self, EventKind::Release)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic natural key of an imported event
///
/// SHA-256 hex digest of `KIND|timestamp|passport|call_number`, with the
/// timestamp rendered in UTC as `YYYY-MM-DD HH:MM:SS[.fff]+00:00`; the
/// fraction appears only when the instant has one. The same
/// source record always yields the same fingerprint, which is what makes
/// re-importing a log a no-op for events.
pub fn fingerprint(
    kind: EventKind,
    action_dt: &DateTime<Utc>,
    passport: &str,
    call_number: &str,
) -> String {
    let material = format!(
        "{}|{}|{}|{}",
        kind.as_str(),
        action_dt.format("%Y-%m-%d %H:%M:%S%.f%:z"),
        passport,
        call_number
    );
    format!("{:x}", Sha256::digest(material.as_bytes()))
}
