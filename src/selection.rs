//! Selection bridge between source-text token ranges and diagram elements.
//!
//! Text positions here are 0-based `{row, col}` pairs; ranges are half-open.
//! The parser reports 1-based spans, converted once by [`TokenRange::from_span`].

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;

use std::cmp::Reverse;
use std::collections::BTreeSet;

use dbml::{Schema, Span};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A 0-based position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TokenPos {
    pub row: usize,
    pub col: usize,
}

impl TokenPos {
    #[must_use]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Half-open source range: `start` is the first character, `end` one past the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TokenRange {
    pub start: TokenPos,
    pub end: TokenPos,
}

impl TokenRange {
    #[must_use]
    pub fn new(start: TokenPos, end: TokenPos) -> Self {
        Self { start, end }
    }

    /// Empty range at `pos`, as produced by a bare cursor.
    #[must_use]
    pub fn caret(pos: TokenPos) -> Self {
        Self { start: pos, end: pos }
    }

    /// Convert a 1-based parser span.
    #[must_use]
    pub fn from_span(span: Span) -> Self {
        let pos = |l: dbml::Location| TokenPos::new(l.line.saturating_sub(1), l.column.saturating_sub(1));
        Self { start: pos(span.start), end: pos(span.end) }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether a cursor at `pos` touches this range. Both ends count, so a
    /// cursor just after the last character still selects the element.
    #[must_use]
    pub fn contains(&self, pos: TokenPos) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// Whether two ranges share at least one character; an empty `other`
    /// falls back to [`TokenRange::contains`].
    #[must_use]
    pub fn overlaps(&self, other: &TokenRange) -> bool {
        if other.is_empty() {
            return self.contains(other.start);
        }
        self.start < other.end && other.start < self.end
    }
}

/// A clickable diagram element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ElementRef {
    Table { table_id: String },
    Field { table_id: String, field: String },
    TableGroup { group_id: String },
    Ref { ref_id: String },
}

impl ElementRef {
    #[must_use]
    pub fn table(id: &str) -> Self {
        Self::Table { table_id: id.to_owned() }
    }

    #[must_use]
    pub fn field(table_id: &str, field: &str) -> Self {
        Self::Field { table_id: table_id.to_owned(), field: field.to_owned() }
    }

    #[must_use]
    pub fn table_group(id: &str) -> Self {
        Self::TableGroup { group_id: id.to_owned() }
    }

    #[must_use]
    pub fn reference(id: &str) -> Self {
        Self::Ref { ref_id: id.to_owned() }
    }
}

/// The source range that defines `element`, if it still exists in `schema`.
#[must_use]
pub fn element_range(schema: &Schema, element: &ElementRef) -> Option<TokenRange> {
    let span = match element {
        ElementRef::Table { table_id } => schema.table(table_id)?.token,
        ElementRef::Field { table_id, field } => schema.table(table_id)?.field(field)?.token,
        ElementRef::TableGroup { group_id } => schema.table_group(group_id)?.token,
        ElementRef::Ref { ref_id } => schema.reference(ref_id)?.token,
    };
    Some(TokenRange::from_span(span))
}

fn all_elements(schema: &Schema) -> impl Iterator<Item = (ElementRef, TokenRange)> + '_ {
    let tables = schema.tables.iter().flat_map(|t| {
        std::iter::once((ElementRef::table(&t.id), TokenRange::from_span(t.token))).chain(
            t.fields.iter().map(|f| (ElementRef::field(&t.id, &f.name), TokenRange::from_span(f.token))),
        )
    });
    let groups = schema
        .table_groups
        .iter()
        .map(|g| (ElementRef::table_group(&g.id), TokenRange::from_span(g.token)));
    let refs = schema.refs.iter().map(|r| (ElementRef::reference(&r.id), TokenRange::from_span(r.token)));
    tables.chain(groups).chain(refs)
}

/// Elements whose defining range overlaps `range` (cursor → diagram).
#[must_use]
pub fn token_range_to_elements(schema: &Schema, range: &TokenRange) -> BTreeSet<ElementRef> {
    all_elements(schema)
        .filter(|(_, r)| r.overlaps(range))
        .map(|(element, _)| element)
        .collect()
}

/// The innermost element covering `pos`: the covering range that starts last,
/// ties broken by the one that ends first.
#[must_use]
pub fn innermost_element_at(schema: &Schema, pos: TokenPos) -> Option<ElementRef> {
    all_elements(schema)
        .filter(|(_, r)| r.contains(pos))
        .max_by_key(|(_, r)| (r.start, Reverse(r.end)))
        .map(|(element, _)| element)
}

/// Active selection state: one editor marker and one diagram highlight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionBridge {
    /// Editor marker and the element whose range it shows.
    marker: Option<(ElementRef, TokenRange)>,
    highlight: Option<ElementRef>,
}

impl SelectionBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagram → editor. Replaces the active marker and highlight with
    /// `element` and returns the range the editor should highlight.
    ///
    /// An element that no longer resolves leaves the selection as it was.
    pub fn select_element(&mut self, schema: &Schema, element: &ElementRef) -> Option<TokenRange> {
        let Some(range) = element_range(schema, element) else {
            debug!(?element, "selection: element has no source range");
            return None;
        };
        self.marker = Some((element.clone(), range));
        self.highlight = Some(element.clone());
        Some(range)
    }

    /// Editor → diagram. Replaces the highlight with the innermost element
    /// under the cursor, or clears it when the cursor is outside every element.
    pub fn highlight_at_cursor(&mut self, schema: &Schema, pos: TokenPos) -> Option<&ElementRef> {
        self.highlight = innermost_element_at(schema, pos);
        self.highlight.as_ref()
    }

    /// Drop the marker and the highlight.
    pub fn clear(&mut self) {
        self.marker = None;
        self.highlight = None;
    }

    /// Drop state that refers to elements missing from `schema`. A surviving
    /// marker follows its element to the element's current range.
    pub fn retain_valid(&mut self, schema: &Schema) {
        if let Some((element, range)) = &mut self.marker {
            match element_range(schema, element) {
                Some(current) => *range = current,
                None => {
                    debug!(?element, "selection: marker target removed");
                    self.marker = None;
                }
            }
        }
        if let Some(element) = &self.highlight
            && element_range(schema, element).is_none()
        {
            debug!(?element, "selection: highlight target removed");
            self.highlight = None;
        }
    }

    #[must_use]
    pub fn marker(&self) -> Option<TokenRange> {
        self.marker.as_ref().map(|(_, range)| *range)
    }

    #[must_use]
    pub fn highlight(&self) -> Option<&ElementRef> {
        self.highlight.as_ref()
    }

    #[must_use]
    pub fn is_highlighted(&self, element: &ElementRef) -> bool {
        self.highlight.as_ref() == Some(element)
    }
}
