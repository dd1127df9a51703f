//! Parser boundary and the parse error record published to the editor.

use dbml::{Database, ParseError, Parser};
use serde::{Deserialize, Serialize};

use crate::selection::TokenRange;

/// Annotation kind used for every parser failure.
pub const PARSE_ERROR_KIND: &str = "error";

/// Text → schema conversion consumed by the sync pipeline.
pub trait SchemaParser {
    /// Parse `text` written in `format`.
    ///
    /// # Errors
    ///
    /// Returns the first syntax or reference error with its 1-based location.
    fn parse(&self, text: &str, format: &str) -> Result<Database, ParseError>;
}

impl SchemaParser for Parser {
    fn parse(&self, text: &str, format: &str) -> Result<Database, ParseError> {
        Parser::parse(self, text, format)
    }
}

/// The single active parse error, located with 0-based positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseErrorRecord {
    pub location: TokenRange,
    pub kind: String,
    pub message: String,
}

impl From<&ParseError> for ParseErrorRecord {
    fn from(err: &ParseError) -> Self {
        Self {
            location: TokenRange::from_span(err.location),
            kind: PARSE_ERROR_KIND.to_owned(),
            message: err.message.clone(),
        }
    }
}
