//! Decoding of the linter's `github-annotation` JSON output.

use serde::Deserialize;

use crate::error::ParseError;
use crate::types::{DiagnosticRecord, Severity};

/// Output format requested from the linter.
pub(crate) const OUTPUT_FORMAT: &str = "github-annotation";

/// One issue object. Field names are the linter's contract; anything else
/// it emits (`file`, `title`, `annotation_level`) is ignored.
#[derive(Debug, Deserialize)]
struct RawIssue {
    line: u32,
    start_column: u32,
    end_column: u32,
    message: String,
}

impl RawIssue {
    fn into_record(self) -> DiagnosticRecord {
        DiagnosticRecord {
            line: self.line,
            start_column: self.start_column,
            end_column: self.end_column,
            message: self.message,
            severity: Severity::Warning,
        }
    }
}

/// Parse the complete output of one linter run.
///
/// All-or-nothing: a single malformed issue fails the whole parse, so the
/// host never shows a partial list as if it were complete.
pub fn parse(raw: &str) -> Result<Vec<DiagnosticRecord>, ParseError> {
    let items: Vec<serde_json::Value> = serde_json::from_str(raw.trim()).map_err(ParseError::Json)?;

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<RawIssue>(item)
                .map(RawIssue::into_record)
                .map_err(|source| ParseError::MalformedRecord { index, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_annotation_output() {
        let raw = serde_json::json!([
            {
                "file": "stdin",
                "line": 1,
                "start_column": 8,
                "end_column": 9,
                "title": "SQLFluff",
                "message": "AM04: Query produces an unknown number of result columns.",
                "annotation_level": "notice"
            },
            {
                "file": "stdin",
                "line": 3,
                "start_column": 1,
                "end_column": 7,
                "title": "SQLFluff",
                "message": "CP01: Keywords must be consistently upper case.",
                "annotation_level": "notice"
            }
        ])
        .to_string();

        let records = parse(&raw).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            DiagnosticRecord {
                line: 1,
                start_column: 8,
                end_column: 9,
                message: "AM04: Query produces an unknown number of result columns.".to_string(),
                severity: Severity::Warning,
            }
        );
        assert_eq!(records[1].line, 3);
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse("[]\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_preserves_order() {
        let raw = r#"[
            {"line": 9, "start_column": 1, "end_column": 2, "message": "late"},
            {"line": 1, "start_column": 1, "end_column": 2, "message": "early"}
        ]"#;
        let records = parse(raw).unwrap();
        assert_eq!(records[0].message, "late");
        assert_eq!(records[1].message, "early");
    }

    #[test]
    fn test_missing_message_fails_whole_parse() {
        let raw = r#"[
            {"line": 1, "start_column": 1, "end_column": 2, "message": "ok"},
            {"line": 2, "start_column": 1, "end_column": 2}
        ]"#;
        match parse(raw) {
            Err(ParseError::MalformedRecord { index, source }) => {
                assert_eq!(index, 1);
                assert!(source.to_string().contains("message"));
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_field_type_is_malformed() {
        let raw = r#"[{"line": "one", "start_column": 1, "end_column": 2, "message": "m"}]"#;
        assert!(matches!(
            parse(raw),
            Err(ParseError::MalformedRecord { index: 0, .. })
        ));
    }

    #[test]
    fn test_negative_column_is_malformed() {
        let raw = r#"[{"line": 1, "start_column": -1, "end_column": 2, "message": "m"}]"#;
        assert!(matches!(
            parse(raw),
            Err(ParseError::MalformedRecord { index: 0, .. })
        ));
    }

    #[test]
    fn test_non_array_is_json_error() {
        assert!(matches!(parse(""), Err(ParseError::Json(_))));
        assert!(matches!(
            parse(r#"{"line": 1}"#),
            Err(ParseError::Json(_))
        ));
        assert!(matches!(parse("[{\"line\": 1,"), Err(ParseError::Json(_))));
    }
}
