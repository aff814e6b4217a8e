use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use serde_json::error::Category;

/// A block-tree loading error with source location information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
    pub severity: Severity,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn error(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        ParseError {
            message: message.into(),
            span,
            file_id,
            severity: Severity::Error,
            notes: Vec::new(),
        }
    }

    /// Wrap a serde_json failure, pointing at the line and column it reports.
    pub fn from_json(error: &serde_json::Error, source: &str, file_id: usize) -> Self {
        let offset = line_column_to_offset(source, error.line(), error.column());
        let end = (offset + 1).min(source.len()).max(offset);
        let parse_error = ParseError::error(strip_position(error), offset..end, file_id);
        match error.classify() {
            Category::Data => parse_error.with_note(NODE_SHAPE_NOTE),
            Category::Eof => parse_error.with_note("the input ends before the JSON value is complete"),
            Category::Syntax | Category::Io => parse_error,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(self.severity)
            .with_message(&self.message)
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

pub(crate) const NODE_SHAPE_NOTE: &str = "each block must look like \
{\"name\": string|null, \"attrs\": {...}, \"innerBlocks\": [...], \"innerHTML\": string}";

/// serde_json appends " at line L column C" to its messages; the span already says that.
fn strip_position(error: &serde_json::Error) -> String {
    let message = error.to_string();
    match message.rfind(" at line ") {
        Some(pos) => message[..pos].to_string(),
        None => message,
    }
}

/// Convert serde_json's 1-based line and column into a byte offset.
/// Line 0 means the error has no position; it maps to the start of the input.
fn line_column_to_offset(source: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(source.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_follow_lines() {
        let source = "[\n  {\"name\": 3}\n]";
        assert_eq!(line_column_to_offset(source, 1, 1), 0);
        assert_eq!(line_column_to_offset(source, 2, 3), 4);
        assert_eq!(line_column_to_offset(source, 0, 0), 0);
        assert_eq!(line_column_to_offset(source, 9, 9), source.len());
    }

    #[test]
    fn json_errors_drop_position_suffix() {
        let source = "[1,";
        let err = serde_json::from_str::<serde_json::Value>(source).unwrap_err();
        let parse_error = ParseError::from_json(&err, source, 0);
        assert!(!parse_error.message.contains("at line"));
        assert!(parse_error.span.start <= source.len());
        assert_eq!(parse_error.notes.len(), 1);
    }
}
