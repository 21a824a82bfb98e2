//! Line/column to host offset mapping.
//!
//! The linter reports 1-indexed lines and 1-indexed character columns. The
//! host addresses text in a [`PositionEncoding`] unit. Out-of-range
//! coordinates clamp to the nearest valid position so one bad record can't
//! sink the whole check.

use crate::types::{Diagnostic, DiagnosticRecord, PositionEncoding, TextRange};

/// Line-start table over one buffer snapshot.
///
/// Built in one pass; resolving a position only walks its own line.
pub struct LineIndex<'a> {
    text: &'a str,
    /// Byte offset of the first byte of each line.
    line_starts: Vec<usize>,
    /// The same line starts, in the host's unit.
    host_line_starts: Vec<usize>,
    encoding: PositionEncoding,
}

/// Length of `text` in `encoding` units.
fn measure(text: &str, encoding: PositionEncoding) -> usize {
    match encoding {
        PositionEncoding::Utf8 => text.len(),
        PositionEncoding::Utf16 => text.encode_utf16().count(),
        PositionEncoding::Char => text.chars().count(),
    }
}

impl<'a> LineIndex<'a> {
    #[must_use]
    pub fn new(text: &'a str, encoding: PositionEncoding) -> Self {
        let mut line_starts = vec![0];
        let mut host_line_starts = vec![0];
        let mut host = 0;
        for line in text.split_inclusive('\n') {
            if !line.ends_with('\n') {
                break;
            }
            host += measure(line, encoding);
            line_starts.push(line_starts[line_starts.len() - 1] + line.len());
            host_line_starts.push(host);
        }
        Self {
            text,
            line_starts,
            host_line_starts,
            encoding,
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Length of the whole buffer in the host's unit.
    #[must_use]
    pub fn len(&self) -> usize {
        self.host_offset(self.text.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Byte span of a line's content, excluding its `\n` or `\r\n`.
    fn line_content(&self, line_idx: usize) -> (usize, usize) {
        let start = self.line_starts[line_idx];
        let mut end = self
            .line_starts
            .get(line_idx + 1)
            .map_or(self.text.len(), |next| next - 1);
        if end > start && self.text.as_bytes()[end - 1] == b'\r' {
            end -= 1;
        }
        (start, end)
    }

    /// Byte offset of `(line, column)`, both 1-indexed, clamped into the buffer.
    fn byte_offset(&self, line: u32, column: u32) -> usize {
        let line_idx = (line.max(1) - 1) as usize;
        if line_idx >= self.line_count() {
            return self.text.len();
        }

        let (start, end) = self.line_content(line_idx);
        let skip = (column.max(1) - 1) as usize;
        self.text[start..end]
            .char_indices()
            .nth(skip)
            .map_or(end, |(i, _)| start + i)
    }

    fn host_offset(&self, byte_offset: usize) -> usize {
        // line_starts[0] == 0, so the partition point is at least 1.
        let line_idx = self.line_starts.partition_point(|&start| start <= byte_offset) - 1;
        let start = self.line_starts[line_idx];
        self.host_line_starts[line_idx] + measure(&self.text[start..byte_offset], self.encoding)
    }

    /// Resolve a 1-indexed `(line, column)` to an offset in the host's unit.
    #[must_use]
    pub fn resolve(&self, line: u32, column: u32) -> usize {
        self.host_offset(self.byte_offset(line, column))
    }

    /// Half-open range covering a record's columns on its line.
    #[must_use]
    pub fn range(&self, record: &DiagnosticRecord) -> TextRange {
        let start = self.resolve(record.line, record.start_column);
        let end = self.resolve(record.line, record.end_column).max(start);
        TextRange { start, end }
    }
}

/// Resolve a single coordinate without keeping an index around.
#[must_use]
pub fn resolve(text: &str, line: u32, column: u32, encoding: PositionEncoding) -> usize {
    LineIndex::new(text, encoding).resolve(line, column)
}

/// Map parsed records onto the buffer they were produced from.
#[must_use]
pub fn to_diagnostics(
    text: &str,
    encoding: PositionEncoding,
    records: Vec<DiagnosticRecord>,
) -> Vec<Diagnostic> {
    let index = LineIndex::new(text, encoding);
    records
        .into_iter()
        .map(|record| {
            let range = index.range(&record);
            if record.line as usize > index.line_count() {
                tracing::debug!(
                    line = record.line,
                    lines = index.line_count(),
                    "Diagnostic past end of buffer, clamped"
                );
            }
            Diagnostic::new(
                range,
                record.severity,
                record.message,
                record.line,
                record.start_column,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    fn record(line: u32, start_column: u32, end_column: u32) -> DiagnosticRecord {
        DiagnosticRecord {
            line,
            start_column,
            end_column,
            message: "msg".to_string(),
            severity: Severity::Warning,
        }
    }

    #[test]
    fn test_star_in_select() {
        let text = "SELECT * FROM t";
        let index = LineIndex::new(text, PositionEncoding::Char);
        let range = index.range(&record(1, 8, 9));
        assert_eq!(range, TextRange { start: 7, end: 8 });
        assert_eq!(&text[range.start..range.end], "*");
    }

    #[test]
    fn test_second_line() {
        let text = "SELECT a\nFROM t\n";
        let index = LineIndex::new(text, PositionEncoding::Utf8);
        assert_eq!(index.line_count(), 3);
        let range = index.range(&record(2, 6, 7));
        assert_eq!(&text[range.start..range.end], "t");
    }

    #[test]
    fn test_crlf_terminator_not_addressable() {
        let text = "SELECT a\r\nFROM t";
        let index = LineIndex::new(text, PositionEncoding::Utf8);
        // Column far past the end of line 1 stops before "\r\n".
        assert_eq!(index.resolve(1, 50), 8);
        assert_eq!(index.resolve(2, 1), 10);
    }

    #[test]
    fn test_line_past_end_clamps_to_buffer_end() {
        let text = "SELECT 1";
        let index = LineIndex::new(text, PositionEncoding::Char);
        let range = index.range(&record(40, 1, 3));
        assert_eq!(range, TextRange { start: 8, end: 8 });
    }

    #[test]
    fn test_zero_line_and_column_clamp_to_start() {
        let index = LineIndex::new("SELECT 1", PositionEncoding::Char);
        assert_eq!(index.resolve(0, 0), 0);
    }

    #[test]
    fn test_inverted_columns_yield_empty_range() {
        let index = LineIndex::new("SELECT 1", PositionEncoding::Char);
        let range = index.range(&record(1, 5, 2));
        assert!(range.is_empty());
        assert_eq!(range.start, 4);
    }

    #[test]
    fn test_multibyte_offsets_per_encoding() {
        // 'é' is 2 bytes / 1 UTF-16 unit, '😀' is 4 bytes / 2 UTF-16 units.
        let text = "SELECT 'é😀', x";
        let x_col = 14; // 1-indexed character column of 'x'
        assert_eq!(text.chars().nth(x_col as usize - 1), Some('x'));

        assert_eq!(resolve(text, 1, x_col, PositionEncoding::Char), 13);
        assert_eq!(resolve(text, 1, x_col, PositionEncoding::Utf16), 14);
        let byte = resolve(text, 1, x_col, PositionEncoding::Utf8);
        assert_eq!(&text[byte..], "x");
    }

    #[test]
    fn test_line_relative_offsets_match_full_prefix() {
        let text = "SELECT é,\r\n  'ünï😀'\n\nFROM t -- 😀😀\nx";
        for encoding in [
            PositionEncoding::Utf8,
            PositionEncoding::Utf16,
            PositionEncoding::Char,
        ] {
            let index = LineIndex::new(text, encoding);
            for (byte, _) in text.char_indices().chain([(text.len(), ' ')]) {
                assert_eq!(
                    index.host_offset(byte),
                    measure(&text[..byte], encoding),
                    "{encoding:?} at byte {byte}"
                );
            }
            assert_eq!(index.len(), measure(text, encoding));
        }
    }

    #[test]
    fn test_trailing_newline_starts_empty_line() {
        let text = "SELECT 😀\n";
        let index = LineIndex::new(text, PositionEncoding::Utf16);
        assert_eq!(index.line_count(), 2);
        assert_eq!(index.resolve(2, 1), 10);
        assert_eq!(index.resolve(2, 9), 10);
    }

    #[test]
    fn test_empty_buffer() {
        let index = LineIndex::new("", PositionEncoding::Char);
        assert!(index.is_empty());
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.range(&record(1, 1, 5)), TextRange { start: 0, end: 0 });
    }

    #[test]
    fn test_ranges_stay_within_buffer() {
        let text = "SELECT é\nFROM ünïcode\r\n\nWHERE 😀 = 1";
        for encoding in [
            PositionEncoding::Utf8,
            PositionEncoding::Utf16,
            PositionEncoding::Char,
        ] {
            let index = LineIndex::new(text, encoding);
            let len = index.len();
            for line in 0..8 {
                for start in 0..20 {
                    for end in 0..20 {
                        let range = index.range(&record(line, start, end));
                        assert!(range.start <= range.end, "{encoding:?} {line}:{start}-{end}");
                        assert!(range.end <= len, "{encoding:?} {line}:{start}-{end}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_to_diagnostics_keeps_order_and_message() {
        let text = "SELECT *\nFROM t";
        let records = vec![
            DiagnosticRecord {
                message: "second".to_string(),
                ..record(2, 1, 5)
            },
            DiagnosticRecord {
                message: "first".to_string(),
                ..record(1, 8, 9)
            },
        ];
        let diags = to_diagnostics(text, PositionEncoding::Char, records);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].message(), "second");
        assert_eq!(diags[0].range(), TextRange { start: 9, end: 13 });
        assert_eq!(diags[1].message(), "first");
        assert_eq!(diags[1].line(), 1);
        assert_eq!(diags[1].column(), 8);
    }
}
