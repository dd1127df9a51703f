//! DBML schema parser and normalizer.
//!
//! Turns DBML source text into a [`Database`] whose `schemas[0]` carries the
//! tables, table groups and relationships a diagram is drawn from. Every
//! diagram-producing entity keeps the 1-based source span it was parsed from
//! so callers can link shapes back to the text.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`ast`] | Schema object types and source locations |
//! | [`lexer`] | Tokenizer with line/column tracking |
//! | [`parse`] | Recursive descent parser and reference checks |
//! | [`error`] | [`ParseError`] with the failing location |
//!
//! Normalization (id assignment and name resolution) lives on
//! [`Database::normalize`].

pub mod ast;
pub mod error;
pub mod lexer;
mod normalize;
pub mod parse;

pub use ast::{
    Database, Field, FieldSettings, GroupMember, Location, Ref, RefEndpoint, Relation, Schema, Span, Table,
    TableGroup,
};
pub use error::{ParseError, ParseErrorKind};
pub use parse::Parser;

/// The only source format this crate understands.
pub const FORMAT_DBML: &str = "dbml";
