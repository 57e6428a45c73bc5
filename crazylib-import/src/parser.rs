//! Batch input parsing
//!
//! Accepts three layouts, detected from the first non-blank character:
//! - JSON array of records (`[...]`); non-object elements are ignored
//! - a single JSON object (`{...}`); anything after it is malformed
//! - JSON Lines, one document per line, blank lines skipped
//!
//! The whole input is materialized because the orchestrator walks it twice.

use crate::error::{ImportError, Result};
use crate::record::RawRecord;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Read and parse an input file
pub async fn read_records(path: &Path) -> Result<Vec<RawRecord>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ImportError::SourceNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let records = parse_records(&content)?;
    debug!(path = %path.display(), records = records.len(), "Parsed input file");
    Ok(records)
}

/// Parse input text into raw records
pub fn parse_records(content: &str) -> Result<Vec<RawRecord>> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        parse_document(content)
    } else {
        parse_lines(content)
    }
}

fn parse_document(content: &str) -> Result<Vec<RawRecord>> {
    let document: Value = serde_json::from_str(content).map_err(|e| ImportError::MalformedInput {
        location: format!("line {}, column {}", e.line(), e.column()),
        message: e.to_string(),
    })?;

    match document {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter(Value::is_object)
            .map(RawRecord::from_value)
            .collect()),
        Value::Object(map) => Ok(vec![RawRecord::from_value(Value::Object(map))]),
        other => Err(ImportError::MalformedInput {
            location: "line 1".to_string(),
            message: format!("unsupported JSON root type: {}", json_type_name(&other)),
        }),
    }
}

fn parse_lines(content: &str) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let location = || format!("line {}", index + 1);

        let value: Value = serde_json::from_str(line).map_err(|e| ImportError::MalformedInput {
            location: location(),
            message: e.to_string(),
        })?;

        if !value.is_object() {
            return Err(ImportError::MalformedInput {
                location: location(),
                message: format!("expected a JSON object, found {}", json_type_name(&value)),
            });
        }

        records.push(RawRecord::from_value(value));
    }

    Ok(records)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_nothing() {
        assert!(parse_records("").unwrap().is_empty());
        assert!(parse_records("  \n\t\n").unwrap().is_empty());
    }

    #[test]
    fn test_array_keeps_only_objects() {
        let records = parse_records(r#"[{"Type": "BORROW"}, 42, "x", null, {"Type": "RELEASE"}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind.as_deref(), Some("BORROW"));
        assert_eq!(records[1].kind.as_deref(), Some("RELEASE"));
    }

    #[test]
    fn test_single_object() {
        let records = parse_records(r#"  {"Type": "borrow"}  "#).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_objects_back_to_back_are_malformed() {
        let input = "{\"Type\": \"BORROW\"}\n{\"Type\": \"RELEASE\"}\n";
        let err = parse_records(input).unwrap_err();
        match err {
            ImportError::MalformedInput { location, .. } => {
                assert!(location.starts_with("line 2"), "unexpected location {}", location)
            }
            other => panic!("expected MalformedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_scalar_root_is_malformed() {
        // A quoted first line selects line mode; the string is not a record
        let err = parse_records("\"just text\"\n").unwrap_err();
        assert!(matches!(err, ImportError::MalformedInput { .. }));
    }

    #[test]
    fn test_malformed_document_reports_position() {
        let err = parse_records("[{\"Type\": \"BORROW\"},\n {\"Type\": }]").unwrap_err();
        match err {
            ImportError::MalformedInput { location, .. } => {
                assert!(location.starts_with("line 2"), "unexpected location {}", location)
            }
            other => panic!("expected MalformedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        // Line numbers count blank lines too
        let input = "\n\"not an object\"\n{broken";
        let err = parse_records(input).unwrap_err();
        match err {
            ImportError::MalformedInput { location, .. } => assert_eq!(location, "line 2"),
            other => panic!("expected MalformedInput, got {:?}", other),
        }

        let input = "{\"Type\": \"BORROW\"}\n{broken";
        let err = parse_records(input).unwrap_err();
        match err {
            ImportError::MalformedInput { location, .. } => {
                assert!(location.starts_with("line 2"), "unexpected location {}", location)
            }
            other => panic!("expected MalformedInput, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_source_not_found() {
        let err = read_records(Path::new("/nonexistent/crazylib/logs.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::SourceNotFound(_)));
    }
}
