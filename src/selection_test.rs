use dbml::{Location, Parser};

use super::*;

const SOURCE: &str = "Table users {
  id int [pk]
  name varchar
}
Table posts {
  user_id int [ref: > users.id]
}
Ref R1: posts.user_id > users.id
Ref R2: users.id < posts.user_id
TableGroup core {
  users
}
";

fn schema() -> Schema {
    let mut db = Parser::new().parse(SOURCE, "dbml").unwrap();
    db.normalize();
    db.schemas.remove(0)
}

fn pos(row: usize, col: usize) -> TokenPos {
    TokenPos::new(row, col)
}

// --- TokenRange ---

#[test]
fn from_span_converts_to_zero_based() {
    let span = Span::new(Location::new(2, 3), Location::new(2, 14));
    assert_eq!(TokenRange::from_span(span), TokenRange::new(pos(1, 2), pos(1, 13)));
}

#[test]
fn overlaps_is_half_open_for_ranges() {
    let a = TokenRange::new(pos(0, 0), pos(0, 5));
    assert!(a.overlaps(&TokenRange::new(pos(0, 4), pos(0, 9))));
    assert!(!a.overlaps(&TokenRange::new(pos(0, 5), pos(0, 9))));
    assert!(a.overlaps(&TokenRange::caret(pos(0, 5))));
    assert!(!a.overlaps(&TokenRange::caret(pos(0, 6))));
}

// --- Lookups ---

#[test]
fn element_ranges_come_from_parser_spans() {
    let s = schema();
    assert_eq!(element_range(&s, &ElementRef::table("users")), Some(TokenRange::new(pos(0, 0), pos(3, 1))));
    assert_eq!(element_range(&s, &ElementRef::field("users", "id")), Some(TokenRange::new(pos(1, 2), pos(1, 13))));
    assert_eq!(element_range(&s, &ElementRef::reference("R1")), Some(TokenRange::new(pos(7, 0), pos(7, 32))));
    assert_eq!(element_range(&s, &ElementRef::table("missing")), None);
    assert_eq!(element_range(&s, &ElementRef::field("users", "missing")), None);
}

#[test]
fn token_range_to_elements_finds_overlaps() {
    let s = schema();
    let found = token_range_to_elements(&s, &TokenRange::new(pos(0, 0), pos(1, 5)));
    let expected: BTreeSet<ElementRef> = [ElementRef::table("users"), ElementRef::field("users", "id")].into();
    assert_eq!(found, expected);
}

#[test]
fn caret_at_closing_brace_selects_table() {
    let s = schema();
    let found = token_range_to_elements(&s, &TokenRange::caret(pos(3, 1)));
    assert!(found.contains(&ElementRef::table("users")));
    assert!(!found.contains(&ElementRef::table("posts")));
}

#[test]
fn innermost_prefers_field_over_table() {
    let s = schema();
    assert_eq!(innermost_element_at(&s, pos(1, 3)), Some(ElementRef::field("users", "id")));
    assert_eq!(innermost_element_at(&s, pos(0, 2)), Some(ElementRef::table("users")));
}

#[test]
fn innermost_prefers_inline_ref_over_field() {
    let s = schema();
    let inline_id = s.refs[0].id.clone();
    assert_eq!(innermost_element_at(&s, pos(5, 16)), Some(ElementRef::reference(&inline_id)));
    assert_eq!(innermost_element_at(&s, pos(5, 4)), Some(ElementRef::field("posts", "user_id")));
}

// --- Bridge ---

#[test]
fn select_element_sets_marker_and_highlight() {
    let s = schema();
    let mut bridge = SelectionBridge::new();
    let range = bridge.select_element(&s, &ElementRef::reference("R1"));
    assert_eq!(range, Some(TokenRange::new(pos(7, 0), pos(7, 32))));
    assert_eq!(bridge.marker(), range);
    assert!(bridge.is_highlighted(&ElementRef::reference("R1")));
}

#[test]
fn selecting_second_element_replaces_first() {
    let s = schema();
    let mut bridge = SelectionBridge::new();
    bridge.select_element(&s, &ElementRef::reference("R1"));
    let r2 = bridge.select_element(&s, &ElementRef::reference("R2"));
    assert!(!bridge.is_highlighted(&ElementRef::reference("R1")));
    assert!(bridge.is_highlighted(&ElementRef::reference("R2")));
    assert_eq!(bridge.marker(), r2);
    assert_eq!(bridge.marker().map(|r| r.start.row), Some(8));
}

#[test]
fn selecting_unknown_element_keeps_previous_selection() {
    let s = schema();
    let mut bridge = SelectionBridge::new();
    bridge.select_element(&s, &ElementRef::table("posts"));
    assert_eq!(bridge.select_element(&s, &ElementRef::table("ghost")), None);
    assert!(bridge.is_highlighted(&ElementRef::table("posts")));
}

#[test]
fn highlight_at_cursor_replaces_and_clears() {
    let s = schema();
    let mut bridge = SelectionBridge::new();
    assert_eq!(bridge.highlight_at_cursor(&s, pos(10, 3)), Some(&ElementRef::table_group("core")));
    assert_eq!(bridge.highlight_at_cursor(&s, pos(1, 3)), Some(&ElementRef::field("users", "id")));
    assert_eq!(bridge.highlight_at_cursor(&s, pos(40, 0)), None);
    assert!(bridge.highlight().is_none());
}

#[test]
fn retain_valid_drops_vanished_highlight() {
    let s = schema();
    let mut bridge = SelectionBridge::new();
    bridge.select_element(&s, &ElementRef::table("posts"));

    let mut db = Parser::new().parse("Table users {\n  id int\n}\n", "dbml").unwrap();
    db.normalize();
    bridge.retain_valid(&db.schemas[0]);
    assert!(bridge.highlight().is_none());
    assert!(bridge.marker().is_none());
}

#[test]
fn retain_valid_drops_marker_after_cursor_moved_away() {
    let s = schema();
    let mut bridge = SelectionBridge::new();
    bridge.select_element(&s, &ElementRef::table("posts"));
    bridge.highlight_at_cursor(&s, pos(40, 0));
    assert!(bridge.highlight().is_none());
    assert_eq!(bridge.marker(), Some(TokenRange::new(pos(4, 0), pos(6, 1))));

    let mut db = Parser::new().parse("Table users {\n  id int\n}\n", "dbml").unwrap();
    db.normalize();
    bridge.retain_valid(&db.schemas[0]);
    assert!(bridge.marker().is_none());
}

#[test]
fn retain_valid_moves_marker_with_surviving_element() {
    let s = schema();
    let mut bridge = SelectionBridge::new();
    bridge.select_element(&s, &ElementRef::table("posts"));
    bridge.highlight_at_cursor(&s, pos(1, 3));

    let mut db = Parser::new().parse("Table posts {\n  id int\n}\n", "dbml").unwrap();
    db.normalize();
    bridge.retain_valid(&db.schemas[0]);
    assert_eq!(bridge.marker(), Some(TokenRange::new(pos(0, 0), pos(2, 1))));
    assert!(bridge.highlight().is_none());
}
