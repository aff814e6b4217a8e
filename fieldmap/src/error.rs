use blocktree::parser::ParseError;
use thiserror::Error;

use crate::orchestrator::ContentId;

/// Failures at the orchestrator's external boundaries.
/// The tree transformations themselves never fail.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("content item {0} not found")]
    ContentNotFound(ContentId),

    #[error("cannot parse blocks of {source_name}: {}", join_messages(.errors))]
    Parse {
        source_name: String,
        errors: Vec<ParseError>,
    },
}

impl ResolveError {
    pub fn parse(source_name: impl Into<String>, errors: Vec<ParseError>) -> Self {
        ResolveError::Parse {
            source_name: source_name.into(),
            errors,
        }
    }
}

fn join_messages(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|error| error.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
