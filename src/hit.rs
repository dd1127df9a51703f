#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use dbml::Schema;

use crate::consts::{FIELD_ROW_HEIGHT, REF_HIT_SLOP_PX, TABLE_HEADER_HEIGHT};
use crate::registry::{EntityKind, LayoutRegistry};
use crate::selection::ElementRef;
use crate::viewport::{Point, Viewport};

/// Find the element under `world_pt`.
///
/// Relationship lines win over boxes (they are drawn on top), then tables
/// (a point on a column row yields that field), then table groups. Later
/// declarations are drawn above earlier ones and are checked first.
#[must_use]
pub fn hit_test(world_pt: Point, registry: &LayoutRegistry, schema: &Schema, viewport: &Viewport) -> Option<ElementRef> {
    let slop = viewport.screen_dist_to_diagram(REF_HIT_SLOP_PX);
    for reference in schema.refs.iter().rev() {
        let Some(geometry) = registry.peek(EntityKind::Ref, &reference.id).and_then(|r| r.as_ref_geometry()) else {
            continue;
        };
        let near = geometry
            .vertices
            .windows(2)
            .any(|seg| distance_to_segment(world_pt, seg[0], seg[1]) <= slop);
        if near {
            return Some(ElementRef::reference(&reference.id));
        }
    }

    for table in schema.tables.iter().rev() {
        let Some(b) = registry.peek(EntityKind::Table, &table.id).and_then(|r| r.as_box()) else {
            continue;
        };
        if !b.contains(world_pt) {
            continue;
        }
        let below_header = world_pt.y - b.y - TABLE_HEADER_HEIGHT;
        if below_header >= 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let row = (below_header / FIELD_ROW_HEIGHT).floor() as usize;
            if let Some(field) = table.fields.get(row) {
                return Some(ElementRef::field(&table.id, &field.name));
            }
        }
        return Some(ElementRef::table(&table.id));
    }

    schema
        .table_groups
        .iter()
        .rev()
        .find(|g| {
            registry
                .peek(EntityKind::TableGroup, &g.id)
                .and_then(|r| r.as_box())
                .is_some_and(|b| b.contains(world_pt))
        })
        .map(|g| ElementRef::table_group(&g.id))
}

/// Shortest distance from `p` to the segment from `a` to `b`.
#[must_use]
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 { (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0) } else { 0.0 };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}
