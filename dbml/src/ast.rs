//! Schema object types for parsed DBML.

use std::fmt;

use serde::Serialize;

/// A 1-based line/column position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    #[must_use]
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A half-open source range; `end` points one column past the last character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: Location,
    pub end: Location,
}

impl Span {
    #[must_use]
    pub fn new(start: Location, end: Location) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn to(self, other: Span) -> Span {
        Span { start: self.start.min(other.start), end: self.end.max(other.end) }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.start.line, self.start.column)
    }
}

/// A parsed DBML document.
///
/// DBML files describe a single logical schema; everything lands in
/// `schemas[0]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Database {
    pub schemas: Vec<Schema>,
}

impl Database {
    /// The schema a diagram is drawn from.
    #[must_use]
    pub fn schema(&self) -> Option<&Schema> {
        self.schemas.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub name: String,
    pub tables: Vec<Table>,
    pub table_groups: Vec<TableGroup>,
    pub refs: Vec<Ref>,
}

impl Schema {
    #[must_use]
    pub fn table(&self, id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn table_group(&self, id: &str) -> Option<&TableGroup> {
        self.table_groups.iter().find(|g| g.id == id)
    }

    #[must_use]
    pub fn reference(&self, id: &str) -> Option<&Ref> {
        self.refs.iter().find(|r| r.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    /// Stable identifier; empty until [`Database::normalize`] runs.
    pub id: String,
    /// Table name, schema-qualified unless the schema is `public`.
    pub name: String,
    pub alias: Option<String>,
    pub note: Option<String>,
    pub fields: Vec<Field>,
    /// Whole `Table ... { ... }` definition.
    pub token: Span,
    pub name_token: Span,
}

impl Table {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    pub field_type: String,
    pub settings: FieldSettings,
    pub token: Span,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSettings {
    pub pk: bool,
    pub not_null: bool,
    pub unique: bool,
    pub increment: bool,
    pub note: Option<String>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableGroup {
    pub id: String,
    pub name: String,
    pub members: Vec<GroupMember>,
    /// Member table ids, filled by [`Database::normalize`].
    pub table_ids: Vec<String>,
    pub token: Span,
    pub name_token: Span,
}

/// A table name listed inside a `TableGroup` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMember {
    pub name: String,
    pub token: Span,
}

/// Cardinality of one side of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    One,
    Many,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ref {
    pub id: String,
    pub name: Option<String>,
    pub endpoints: Vec<RefEndpoint>,
    /// `Ref` statement, or the `ref:` setting of an inline reference.
    pub token: Span,
}

impl Ref {
    /// The DBML operator that joins the two endpoints.
    #[must_use]
    pub fn operator(&self) -> &'static str {
        match (self.endpoints.first().map(|e| e.relation), self.endpoints.get(1).map(|e| e.relation)) {
            (Some(Relation::One), Some(Relation::Many)) => "<",
            (Some(Relation::Many), Some(Relation::One)) => ">",
            (Some(Relation::Many), Some(Relation::Many)) => "<>",
            _ => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefEndpoint {
    /// Table name as written, possibly an alias.
    pub table_name: String,
    /// Resolved table id, filled by [`Database::normalize`].
    pub table_id: String,
    pub fields: Vec<String>,
    pub relation: Relation,
    pub token: Span,
}
