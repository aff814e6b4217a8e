pub mod error;

pub use error::ParseError;

use serde_json::Value;

use crate::block::{BlockNode, json_type_name};
use crate::record::StructuredRecord;

/// Loads a block tree serialized as JSON, the value shape produced by the
/// content markup parser.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the source into the top-level block sequence.
    pub fn parse(&self) -> Result<Vec<BlockNode>, Vec<ParseError>> {
        let source = self.source.trim_start_matches('\u{feff}');
        let offset = self.source.len() - source.len();
        let fail = |error: serde_json::Error| {
            let mut parse_error = ParseError::from_json(&error, source, self.file_id);
            parse_error.span = parse_error.span.start + offset..parse_error.span.end + offset;
            vec![parse_error]
        };

        let value: Value = serde_json::from_str(source).map_err(&fail)?;
        if !value.is_array() {
            return Err(vec![
                ParseError::error(
                    format!("expected an array of blocks, got {}", json_type_name(&value)),
                    offset..self.source.len(),
                    self.file_id,
                )
                .with_note(error::NODE_SHAPE_NOTE),
            ]);
        }

        // Re-read from text so shape errors carry a position.
        serde_json::from_str(source).map_err(&fail)
    }

    /// Parse the source as a structured record (a flat JSON object).
    pub fn parse_record(&self) -> Result<StructuredRecord, Vec<ParseError>> {
        let value: Value = serde_json::from_str(&self.source)
            .map_err(|error| vec![ParseError::from_json(&error, &self.source, self.file_id)])?;
        match value {
            Value::Object(map) => Ok(StructuredRecord::from(map)),
            other => Err(vec![
                ParseError::error(
                    format!("expected a record object, got {}", json_type_name(&other)),
                    0..self.source.len(),
                    self.file_id,
                )
                .with_note("a record maps field names to values, e.g. {\"company_name\": \"ACME\"}"),
            ]),
        }
    }
}
