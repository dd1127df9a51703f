//! Parse failure type.

use crate::ast::Span;

/// Broad category of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Token stream does not match the grammar.
    Syntax,
    /// A string literal runs to end of input.
    UnterminatedString,
    /// A block comment runs to end of input.
    UnterminatedComment,
    /// Two tables, aliases or groups share a name.
    DuplicateName,
    /// A ref or group names a table that is not defined.
    UnknownTable,
    /// A ref names a column its table does not have.
    UnknownField,
    /// A table is listed in more than one group.
    AlreadyGrouped,
    /// The requested source format is not DBML.
    UnsupportedFormat,
}

/// A failed parse, carrying the 1-based span of the offending text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at {location}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub location: Span,
}

impl ParseError {
    #[must_use]
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, location: Span) -> Self {
        Self { kind, message: message.into(), location }
    }

    pub(crate) fn syntax(message: impl Into<String>, location: Span) -> Self {
        Self::new(ParseErrorKind::Syntax, message, location)
    }
}
