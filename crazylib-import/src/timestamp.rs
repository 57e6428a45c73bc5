//! Lenient timestamp parsing for log records
//!
//! Formats are tried in order: ISO-8601 with an offset, date-time without an
//! offset (`T` or space separated), bare date. Values without an offset are
//! taken as UTC. Anything else yields `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a log timestamp
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    // chrono's %z does not take a bare `Z`
    let with_offset = match value.strip_suffix(['Z', 'z']) {
        Some(stripped) => format!("{}+00:00", stripped),
        None => value.to_string(),
    };
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&with_offset, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_iso_with_zulu() {
        assert_eq!(parse_timestamp("2024-01-01T10:00:00Z"), Some(utc(2024, 1, 1, 10, 0, 0)));
    }

    #[test]
    fn test_iso_with_offset_is_normalized_to_utc() {
        assert_eq!(
            parse_timestamp("2024-01-01T12:30:00+02:00"),
            Some(utc(2024, 1, 1, 10, 30, 0))
        );
        assert_eq!(
            parse_timestamp("2024-01-01T12:30:00+0200"),
            Some(utc(2024, 1, 1, 10, 30, 0))
        );
    }

    #[test]
    fn test_space_separated_without_offset() {
        assert_eq!(parse_timestamp("2024-03-05 08:15:30"), Some(utc(2024, 3, 5, 8, 15, 30)));
        assert_eq!(
            parse_timestamp("2024-03-05 08:15:30.250"),
            Some(utc(2024, 3, 5, 8, 15, 30) + chrono::Duration::milliseconds(250))
        );
    }

    #[test]
    fn test_iso_without_offset() {
        assert_eq!(parse_timestamp("2024-03-05T08:15:30"), Some(utc(2024, 3, 5, 8, 15, 30)));
    }

    #[test]
    fn test_bare_date_is_midnight() {
        assert_eq!(parse_timestamp("2024-03-05"), Some(utc(2024, 3, 5, 0, 0, 0)));
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
        assert_eq!(parse_timestamp("05/03/2024"), None);
    }
}
