//! Entity layout registry: per-entity geometry for tables, groups and refs.
//!
//! This module defines the layout record types (`BoxGeometry`,
//! `RefGeometry`, `LayoutRecord`) and the store that owns them
//! (`LayoutRegistry`). Records are created lazily: the first `get` of an id
//! inserts the default placeholder and every later `get` returns the stored
//! record. Records are only removed by schema reconciliation.
//!
//! Maps are ordered by id so iteration, and therefore auto-layout, is
//! deterministic.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use std::collections::BTreeMap;

use dbml::Schema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consts::{DEFAULT_TABLE_HEIGHT, DEFAULT_TABLE_WIDTH};
use crate::viewport::Point;

/// The kind of a diagram entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Table,
    TableGroup,
    Ref,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Table, EntityKind::TableGroup, EntityKind::Ref];
}

/// Axis-aligned box in diagram space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for BoxGeometry {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, width: DEFAULT_TABLE_WIDTH, height: DEFAULT_TABLE_HEIGHT }
    }
}

impl BoxGeometry {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// All four components are finite and the size is non-negative.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height].iter().all(|v| v.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Whether `other` lies entirely inside `self` (edges may touch).
    #[must_use]
    pub fn encloses(&self, other: &BoxGeometry) -> bool {
        other.x >= self.x && other.y >= self.y && other.right() <= self.right() && other.bottom() <= self.bottom()
    }

    /// Whether the interiors overlap; boxes that only share an edge do not.
    #[must_use]
    pub fn overlaps(&self, other: &BoxGeometry) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }

    #[must_use]
    pub fn union(&self, other: &BoxGeometry) -> BoxGeometry {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        BoxGeometry { x, y, width: self.right().max(other.right()) - x, height: self.bottom().max(other.bottom()) - y }
    }
}

/// The table (and column set) one end of a relationship attaches to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAnchor {
    pub table_id: String,
    pub fields: Vec<String>,
}

/// Routing for a relationship line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefGeometry {
    pub endpoints: Vec<EntityAnchor>,
    pub vertices: Vec<Point>,
    /// `true` while routing is computed by layout rather than dragged by the user.
    pub auto: bool,
}

impl Default for RefGeometry {
    fn default() -> Self {
        Self { endpoints: Vec::new(), vertices: Vec::new(), auto: true }
    }
}

/// Geometry stored for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayoutRecord {
    Box(BoxGeometry),
    Ref(RefGeometry),
}

impl LayoutRecord {
    /// Placeholder record created on first access.
    #[must_use]
    pub fn default_for(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Table | EntityKind::TableGroup => Self::Box(BoxGeometry::default()),
            EntityKind::Ref => Self::Ref(RefGeometry::default()),
        }
    }

    #[must_use]
    pub fn fits(&self, kind: EntityKind) -> bool {
        matches!(
            (self, kind),
            (Self::Box(_), EntityKind::Table | EntityKind::TableGroup) | (Self::Ref(_), EntityKind::Ref)
        )
    }

    #[must_use]
    pub fn as_box(&self) -> Option<&BoxGeometry> {
        match self {
            Self::Box(b) => Some(b),
            Self::Ref(_) => None,
        }
    }

    #[must_use]
    pub fn as_ref_geometry(&self) -> Option<&RefGeometry> {
        match self {
            Self::Ref(r) => Some(r),
            Self::Box(_) => None,
        }
    }
}

/// Lazily populated layout store for one diagram.
#[derive(Debug, Clone, Default)]
pub struct LayoutRegistry {
    tables: BTreeMap<String, LayoutRecord>,
    table_groups: BTreeMap<String, LayoutRecord>,
    refs: BTreeMap<String, LayoutRecord>,
}

impl LayoutRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, kind: EntityKind) -> &BTreeMap<String, LayoutRecord> {
        match kind {
            EntityKind::Table => &self.tables,
            EntityKind::TableGroup => &self.table_groups,
            EntityKind::Ref => &self.refs,
        }
    }

    fn map_mut(&mut self, kind: EntityKind) -> &mut BTreeMap<String, LayoutRecord> {
        match kind {
            EntityKind::Table => &mut self.tables,
            EntityKind::TableGroup => &mut self.table_groups,
            EntityKind::Ref => &mut self.refs,
        }
    }

    /// Get the record for `id`, inserting the default placeholder if absent.
    pub fn get(&mut self, kind: EntityKind, id: &str) -> &LayoutRecord {
        let map = self.map_mut(kind);
        if !map.contains_key(id) {
            map.insert(id.to_owned(), LayoutRecord::default_for(kind));
        }
        &map[id]
    }

    /// Replace the record for `id` unconditionally.
    ///
    /// A record of the wrong shape for `kind` is a caller bug; it is logged and
    /// dropped so the registry never holds a mismatched record.
    pub fn set(&mut self, kind: EntityKind, id: &str, record: LayoutRecord) {
        if !record.fits(kind) {
            warn!(?kind, id, "registry: record shape does not match entity kind");
            return;
        }
        self.map_mut(kind).insert(id.to_owned(), record);
    }

    /// Delete the record for `id`, returning it if present.
    pub fn remove(&mut self, kind: EntityKind, id: &str) -> Option<LayoutRecord> {
        self.map_mut(kind).remove(id)
    }

    /// Read a record without creating it.
    #[must_use]
    pub fn peek(&self, kind: EntityKind, id: &str) -> Option<&LayoutRecord> {
        self.map(kind).get(id)
    }

    #[must_use]
    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        self.map(kind).contains_key(id)
    }

    /// Ids of one kind in ascending order.
    #[must_use]
    pub fn ids(&self, kind: EntityKind) -> Vec<String> {
        self.map(kind).keys().cloned().collect()
    }

    /// Box records of one kind in id order. Empty for [`EntityKind::Ref`].
    pub fn boxes(&self, kind: EntityKind) -> impl Iterator<Item = (&str, &BoxGeometry)> {
        self.map(kind)
            .iter()
            .filter_map(|(id, record)| record.as_box().map(|b| (id.as_str(), b)))
    }

    /// Ref records in id order.
    pub fn ref_geometries(&self) -> impl Iterator<Item = (&str, &RefGeometry)> {
        self.refs
            .iter()
            .filter_map(|(id, record)| record.as_ref_geometry().map(|r| (id.as_str(), r)))
    }

    // --- Typed get-or-create ---

    pub fn table(&mut self, id: &str) -> BoxGeometry {
        self.get(EntityKind::Table, id).as_box().copied().unwrap_or_default()
    }

    pub fn table_group(&mut self, id: &str) -> BoxGeometry {
        self.get(EntityKind::TableGroup, id).as_box().copied().unwrap_or_default()
    }

    pub fn reference(&mut self, id: &str) -> RefGeometry {
        self.get(EntityKind::Ref, id).as_ref_geometry().cloned().unwrap_or_default()
    }

    pub fn set_table(&mut self, id: &str, geometry: BoxGeometry) {
        self.set(EntityKind::Table, id, LayoutRecord::Box(geometry));
    }

    pub fn set_table_group(&mut self, id: &str, geometry: BoxGeometry) {
        self.set(EntityKind::TableGroup, id, LayoutRecord::Box(geometry));
    }

    pub fn set_reference(&mut self, id: &str, geometry: RefGeometry) {
        self.set(EntityKind::Ref, id, LayoutRecord::Ref(geometry));
    }

    /// Touch every entity of `schema` so each has a record.
    ///
    /// Existing records keep their geometry. A ref whose anchors changed
    /// under the same id (a named ref retargeted in the text) gets the new
    /// anchors and falls back to automatic routing.
    pub fn load_schema(&mut self, schema: &Schema) {
        for group in &schema.table_groups {
            self.get(EntityKind::TableGroup, &group.id);
        }
        for table in &schema.tables {
            self.get(EntityKind::Table, &table.id);
        }
        for reference in &schema.refs {
            let anchors: Vec<EntityAnchor> = reference
                .endpoints
                .iter()
                .map(|e| EntityAnchor { table_id: e.table_id.clone(), fields: e.fields.clone() })
                .collect();
            let current = self.reference(&reference.id);
            if current.endpoints != anchors {
                self.set_reference(&reference.id, RefGeometry { endpoints: anchors, vertices: Vec::new(), auto: true });
            }
        }
    }

    /// Number of records across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len() + self.table_groups.len() + self.refs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
