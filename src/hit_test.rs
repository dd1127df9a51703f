use dbml::Parser;

use super::*;
use crate::layout::{auto_layout, group_memberships};
use crate::registry::BoxGeometry;

const SOURCE: &str = "Table users {
  id int [pk]
  name text
}
Table posts {
  id int
  user_id int [ref: > users.id]
}
TableGroup blog {
  users
}
";

fn fixture() -> (Schema, LayoutRegistry) {
    let mut db = Parser::new().parse(SOURCE, "dbml").unwrap();
    db.normalize();
    let schema = db.schemas.remove(0);
    let mut reg = LayoutRegistry::new();
    reg.load_schema(&schema);
    reg.set_table("users", BoxGeometry::new(0.0, 0.0, 200.0, 88.0));
    reg.set_table("posts", BoxGeometry::new(400.0, 0.0, 200.0, 88.0));
    reg.set_table_group("blog", BoxGeometry::new(-20.0, -40.0, 240.0, 160.0));
    crate::layout::route_refs(&mut reg);
    (schema, reg)
}

// =============================================================
// distance_to_segment
// =============================================================

#[test]
fn distance_to_segment_interior_and_ends() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(10.0, 0.0);
    assert!((distance_to_segment(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-12);
    assert!((distance_to_segment(Point::new(-4.0, 3.0), a, b) - 5.0).abs() < 1e-12);
    assert!((distance_to_segment(Point::new(13.0, 4.0), a, b) - 5.0).abs() < 1e-12);
}

#[test]
fn distance_to_degenerate_segment_is_point_distance() {
    let a = Point::new(1.0, 1.0);
    assert!((distance_to_segment(Point::new(4.0, 5.0), a, a) - 5.0).abs() < 1e-12);
}

// =============================================================
// hit_test
// =============================================================

#[test]
fn header_hits_table() {
    let (schema, reg) = fixture();
    let vp = Viewport::new();
    assert_eq!(hit_test(Point::new(450.0, 10.0), &reg, &schema, &vp), Some(ElementRef::table("posts")));
}

#[test]
fn column_rows_hit_fields() {
    let (schema, reg) = fixture();
    let vp = Viewport::new();
    assert_eq!(hit_test(Point::new(50.0, 40.0), &reg, &schema, &vp), Some(ElementRef::field("users", "id")));
    assert_eq!(hit_test(Point::new(50.0, 70.0), &reg, &schema, &vp), Some(ElementRef::field("users", "name")));
}

#[test]
fn ref_line_wins_within_slop() {
    let (schema, reg) = fixture();
    let vp = Viewport::new();
    let ref_id = schema.refs[0].id.clone();
    // Route runs along y = 44 between x = 200 and x = 400.
    assert_eq!(hit_test(Point::new(300.0, 48.0), &reg, &schema, &vp), Some(ElementRef::reference(&ref_id)));
    assert_eq!(hit_test(Point::new(300.0, 60.0), &reg, &schema, &vp), None);
}

#[test]
fn slop_shrinks_when_zoomed_in() {
    let (schema, reg) = fixture();
    let mut vp = Viewport::new();
    vp.set_zoom(2.0);
    assert_eq!(hit_test(Point::new(300.0, 48.0), &reg, &schema, &vp), None);
    assert!(hit_test(Point::new(300.0, 46.0), &reg, &schema, &vp).is_some());
}

#[test]
fn group_border_hits_group() {
    let (schema, reg) = fixture();
    let vp = Viewport::new();
    assert_eq!(hit_test(Point::new(-10.0, -30.0), &reg, &schema, &vp), Some(ElementRef::table_group("blog")));
}

#[test]
fn empty_space_hits_nothing() {
    let (schema, reg) = fixture();
    let vp = Viewport::new();
    assert_eq!(hit_test(Point::new(1_000.0, 1_000.0), &reg, &schema, &vp), None);
}

#[test]
fn hit_after_auto_layout_finds_every_table() {
    let (schema, mut reg) = fixture();
    auto_layout(&mut reg, &group_memberships(&schema));
    let vp = Viewport::new();
    for table in &schema.tables {
        let b = reg.table(&table.id);
        let header = Point::new(b.x + 5.0, b.y + 5.0);
        assert_eq!(hit_test(header, &reg, &schema, &vp), Some(ElementRef::table(&table.id)));
    }
}
