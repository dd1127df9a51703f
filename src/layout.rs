//! Layout algorithms: auto-layout, relationship routing and scale-to-fit.
//!
//! Auto-layout is a deterministic grid packer. Members of a table group are
//! packed into a square-ish sub-grid wrapped by the group box; each group and
//! each ungrouped table then forms one cluster, and clusters are shelf-packed
//! into an outer square-ish grid. Iteration order is id order, so the same
//! registry always produces the same placement.

#[cfg(test)]
#[path = "layout_test.rs"]
mod layout_test;

use std::collections::{BTreeMap, BTreeSet};

use dbml::Schema;
use tracing::{debug, info};

use crate::consts::{
    CLUSTER_GAP, DEFAULT_TABLE_HEIGHT, DEFAULT_TABLE_WIDTH, GROUP_HEADER_HEIGHT, GROUP_PADDING, SELF_REF_LOOP,
    TABLE_GAP,
};
use crate::registry::{BoxGeometry, EntityKind, LayoutRegistry, RefGeometry};
use crate::viewport::{Point, Viewport};

/// Group id → member table ids, in declaration order.
pub type GroupMembers = BTreeMap<String, Vec<String>>;

/// Collect table-group membership from a normalized schema.
#[must_use]
pub fn group_memberships(schema: &Schema) -> GroupMembers {
    schema
        .table_groups
        .iter()
        .map(|g| (g.id.clone(), g.table_ids.clone()))
        .collect()
}

/// A top-level unit placed by the outer grid.
struct Cluster {
    group: Option<String>,
    /// Member (or lone table) offsets relative to the cluster origin.
    tables: Vec<(String, BoxGeometry)>,
    width: f64,
    height: f64,
}

/// Place every table and table group in `registry` without overlap and
/// re-route automatic relationships.
///
/// Groups listed in `groups` that have no record yet are created. A table
/// listed under more than one group is placed with the first.
pub fn auto_layout(registry: &mut LayoutRegistry, groups: &GroupMembers) {
    let mut group_ids: BTreeSet<String> = registry.ids(EntityKind::TableGroup).into_iter().collect();
    group_ids.extend(groups.keys().cloned());

    let mut placed: BTreeSet<String> = BTreeSet::new();
    let mut clusters = Vec::new();

    for group_id in &group_ids {
        let mut members = Vec::new();
        for table_id in groups.get(group_id).into_iter().flatten() {
            if placed.insert(table_id.clone()) {
                members.push((table_id.clone(), sanitized_size(registry.table(table_id))));
            }
        }
        clusters.push(pack_group(group_id, members));
    }

    for table_id in registry.ids(EntityKind::Table) {
        if placed.contains(&table_id) {
            continue;
        }
        let size = sanitized_size(registry.table(&table_id));
        clusters.push(Cluster {
            group: None,
            tables: vec![(table_id, BoxGeometry::new(0.0, 0.0, size.width, size.height))],
            width: size.width,
            height: size.height,
        });
    }

    let cluster_count = clusters.len();
    let origins = shelf_pack(&clusters);
    for (cluster, origin) in clusters.into_iter().zip(origins) {
        if let Some(group_id) = &cluster.group {
            registry.set_table_group(group_id, BoxGeometry::new(origin.x, origin.y, cluster.width, cluster.height));
        }
        for (table_id, rel) in cluster.tables {
            registry.set_table(&table_id, BoxGeometry::new(origin.x + rel.x, origin.y + rel.y, rel.width, rel.height));
        }
    }

    let routed = route_refs(registry);
    info!(clusters = cluster_count, routed, "layout: auto-layout applied");
}

/// Replace a degenerate size with the placeholder default.
fn sanitized_size(geometry: BoxGeometry) -> BoxGeometry {
    let width = if geometry.width.is_finite() && geometry.width > 0.0 { geometry.width } else { DEFAULT_TABLE_WIDTH };
    let height =
        if geometry.height.is_finite() && geometry.height > 0.0 { geometry.height } else { DEFAULT_TABLE_HEIGHT };
    BoxGeometry::new(0.0, 0.0, width, height)
}

/// Number of columns for a square-ish grid of `n` items.
fn grid_columns(n: usize) -> usize {
    let mut cols = 1;
    while cols * cols < n {
        cols += 1;
    }
    cols
}

fn pack_group(group_id: &str, members: Vec<(String, BoxGeometry)>) -> Cluster {
    if members.is_empty() {
        return Cluster {
            group: Some(group_id.to_owned()),
            tables: Vec::new(),
            width: DEFAULT_TABLE_WIDTH,
            height: GROUP_HEADER_HEIGHT + 2.0 * GROUP_PADDING,
        };
    }

    let cols = grid_columns(members.len());
    let cell_width = members.iter().map(|(_, b)| b.width).fold(0.0, f64::max);

    let mut tables = Vec::with_capacity(members.len());
    let mut y = GROUP_HEADER_HEIGHT + GROUP_PADDING;
    for row in members.chunks(cols) {
        let row_height = row.iter().map(|(_, b)| b.height).fold(0.0, f64::max);
        let mut x = GROUP_PADDING;
        for (table_id, size) in row {
            tables.push((table_id.clone(), BoxGeometry::new(x, y, size.width, size.height)));
            x += cell_width + TABLE_GAP;
        }
        y += row_height + TABLE_GAP;
    }

    // Matches the extent `wrap_group` computes for the same members.
    let width = tables.iter().map(|(_, b)| b.right()).fold(0.0, f64::max) + GROUP_PADDING;
    let height = tables.iter().map(|(_, b)| b.bottom()).fold(0.0, f64::max) + GROUP_PADDING;
    Cluster { group: Some(group_id.to_owned()), tables, width, height }
}

/// Origins for each cluster, row by row in a square-ish outer grid.
fn shelf_pack(clusters: &[Cluster]) -> Vec<Point> {
    let cols = grid_columns(clusters.len());
    let mut origins = Vec::with_capacity(clusters.len());
    let mut y = 0.0;
    for row in clusters.chunks(cols) {
        let mut x = 0.0;
        let mut row_height: f64 = 0.0;
        for cluster in row {
            origins.push(Point::new(x, y));
            x += cluster.width + CLUSTER_GAP;
            row_height = row_height.max(cluster.height);
        }
        y += row_height + CLUSTER_GAP;
    }
    origins
}

/// Recompute vertices for every automatically routed relationship.
///
/// Returns the number of refs routed. Refs the user has shaped (`auto ==
/// false`) and refs whose tables have no record are left alone.
pub fn route_refs(registry: &mut LayoutRegistry) -> usize {
    let mut updates = Vec::new();
    for (id, geometry) in registry.ref_geometries() {
        if !geometry.auto {
            continue;
        }
        let (Some(from), Some(to)) = (geometry.endpoints.first(), geometry.endpoints.get(1)) else {
            continue;
        };
        let from_box = registry.peek(EntityKind::Table, &from.table_id).and_then(|r| r.as_box());
        let to_box = registry.peek(EntityKind::Table, &to.table_id).and_then(|r| r.as_box());
        let (Some(a), Some(b)) = (from_box, to_box) else {
            debug!(ref_id = id, "layout: ref endpoint table has no geometry");
            continue;
        };
        let vertices = if from.table_id == to.table_id { self_loop(a) } else { route_between(a, b) };
        updates.push((id.to_owned(), RefGeometry { endpoints: geometry.endpoints.clone(), vertices, auto: true }));
    }

    let count = updates.len();
    for (id, geometry) in updates {
        registry.set_reference(&id, geometry);
    }
    count
}

fn self_loop(b: &BoxGeometry) -> Vec<Point> {
    let c = b.center();
    let spread = b.height / 4.0;
    let out = b.right() + SELF_REF_LOOP;
    vec![
        Point::new(b.right(), c.y - spread),
        Point::new(out, c.y - spread),
        Point::new(out, c.y + spread),
        Point::new(b.right(), c.y + spread),
    ]
}

/// Connect the facing sides of two boxes. Aligned midpoints give a straight
/// segment; otherwise the route bends halfway between the sides.
fn route_between(a: &BoxGeometry, b: &BoxGeometry) -> Vec<Point> {
    let (ca, cb) = (a.center(), b.center());

    if a.right() <= b.x || b.right() <= a.x {
        let (sx, ex) = if a.right() <= b.x { (a.right(), b.x) } else { (a.x, b.right()) };
        let start = Point::new(sx, ca.y);
        let end = Point::new(ex, cb.y);
        if (start.y - end.y).abs() < f64::EPSILON {
            return vec![start, end];
        }
        let mx = (sx + ex) / 2.0;
        return vec![start, Point::new(mx, start.y), Point::new(mx, end.y), end];
    }

    if a.bottom() <= b.y || b.bottom() <= a.y {
        let (sy, ey) = if a.bottom() <= b.y { (a.bottom(), b.y) } else { (a.y, b.bottom()) };
        let start = Point::new(ca.x, sy);
        let end = Point::new(cb.x, ey);
        if (start.x - end.x).abs() < f64::EPSILON {
            return vec![start, end];
        }
        let my = (sy + ey) / 2.0;
        return vec![start, Point::new(start.x, my), Point::new(end.x, my), end];
    }

    vec![ca, cb]
}

/// Union of every table and table-group box, or `None` when there are none.
#[must_use]
pub fn content_bounds(registry: &LayoutRegistry) -> Option<BoxGeometry> {
    registry
        .boxes(EntityKind::Table)
        .chain(registry.boxes(EntityKind::TableGroup))
        .map(|(_, b)| *b)
        .filter(BoxGeometry::is_valid)
        .reduce(|acc, b| acc.union(&b))
}

/// Fit all content into the viewport with `margin` (a fraction of each
/// viewport dimension) left free on every side, centred.
///
/// Returns `false` and leaves the viewport untouched when there is nothing
/// to fit or the viewport has no area.
pub fn scale_to_fit(viewport: &mut Viewport, registry: &LayoutRegistry, margin: f64, min_zoom: f64, max_zoom: f64) -> bool {
    let (width, height) = viewport.size();
    if width <= 0.0 || height <= 0.0 || !(min_zoom > 0.0 && min_zoom <= max_zoom) {
        return false;
    }
    let Some(bounds) = content_bounds(registry) else {
        return false;
    };

    let margin = margin.clamp(0.0, 0.49);
    let avail_w = width * (1.0 - 2.0 * margin);
    let avail_h = height * (1.0 - 2.0 * margin);
    let zoom_x = if bounds.width > 0.0 { avail_w / bounds.width } else { f64::INFINITY };
    let zoom_y = if bounds.height > 0.0 { avail_h / bounds.height } else { f64::INFINITY };
    let mut zoom = zoom_x.min(zoom_y);
    if !zoom.is_finite() {
        zoom = 1.0;
    }
    let zoom = zoom.clamp(min_zoom, max_zoom);

    let center = bounds.center();
    let screen_center = viewport.center_screen();
    viewport.set_view(zoom, Point::new(screen_center.x - center.x * zoom, screen_center.y - center.y * zoom));
    info!(zoom, "layout: scaled to fit");
    true
}

/// Resize a group box to wrap its members' current boxes with padding and
/// the title band. Returns `false` when no member has geometry.
pub fn wrap_group(registry: &mut LayoutRegistry, group_id: &str, members: &[String]) -> bool {
    let bounds = members
        .iter()
        .filter_map(|id| registry.peek(EntityKind::Table, id).and_then(|r| r.as_box()).copied())
        .reduce(|acc, b| acc.union(&b));
    let Some(b) = bounds else {
        return false;
    };
    registry.set_table_group(
        group_id,
        BoxGeometry::new(
            b.x - GROUP_PADDING,
            b.y - GROUP_PADDING - GROUP_HEADER_HEIGHT,
            b.width + 2.0 * GROUP_PADDING,
            b.height + 2.0 * GROUP_PADDING + GROUP_HEADER_HEIGHT,
        ),
    );
    true
}
