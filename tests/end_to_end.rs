//! End-to-end flows through the public engine API.
#![allow(clippy::float_cmp)]

use std::cell::Cell;

use dbdiagram::input::{Button, Modifiers};
use dbdiagram::{
    Action, BoxGeometry, DiagramConfig, DiagramView, ElementRef, EntityKind, Point, SchemaParser, TokenPos,
};
use dbml::{Database, Location, ParseError, ParseErrorKind, Parser, Span};

const SHOP: &str = "Table customers {
  id int [pk]
  email varchar
}
Table orders {
  id int [pk]
  customer_id int [ref: > customers.id]
  placed_at timestamp
}
Table products {
  id int [pk]
  name varchar
}
Table order_items {
  order_id int
  product_id int
}
Ref items_order: order_items.order_id > orders.id
Ref items_product: order_items.product_id > products.id
TableGroup sales {
  orders
  order_items
}
";

fn shop_view() -> DiagramView<Parser> {
    let mut view = DiagramView::new(Parser::new(), DiagramConfig::default());
    view.set_viewport_size(1024.0, 768.0);
    view.on_content_changed(SHOP, 0);
    view.flush();
    view.apply_auto_layout();
    view
}

fn table_box<P: SchemaParser>(view: &DiagramView<P>, id: &str) -> BoxGeometry {
    *view.registry().peek(EntityKind::Table, id).and_then(|r| r.as_box()).unwrap()
}

fn group_box<P: SchemaParser>(view: &DiagramView<P>, id: &str) -> BoxGeometry {
    *view.registry().peek(EntityKind::TableGroup, id).and_then(|r| r.as_box()).unwrap()
}

/// Wraps the real parser and counts calls.
struct CountingParser {
    calls: Cell<usize>,
}

impl SchemaParser for CountingParser {
    fn parse(&self, text: &str, format: &str) -> Result<Database, ParseError> {
        self.calls.set(self.calls.get() + 1);
        Parser::new().parse(text, format)
    }
}

/// Rejects everything at a fixed location.
struct RejectingParser;

impl SchemaParser for RejectingParser {
    fn parse(&self, _text: &str, _format: &str) -> Result<Database, ParseError> {
        Err(ParseError::new(
            ParseErrorKind::Syntax,
            "unexpected token",
            Span::new(Location::new(3, 5), Location::new(3, 9)),
        ))
    }
}

#[test]
fn load_layout_and_fit_whole_schema() {
    let mut view = shop_view();
    assert_eq!(view.apply_scale_to_fit(), vec![Action::RenderNeeded]);

    let frame = view.render_frame();
    assert!(frame.loaded);
    assert_eq!(frame.tables.len(), 4);
    assert_eq!(frame.table_groups.len(), 1);
    assert_eq!(frame.refs.len(), 3);

    let group = &frame.table_groups[0].geometry;
    for member in ["orders", "order_items"] {
        let table = frame.tables.iter().find(|t| t.id == member).unwrap();
        assert!(group.encloses(&table.geometry), "{member} escapes its group");
    }
    for (i, a) in frame.tables.iter().enumerate() {
        for b in &frame.tables[i + 1..] {
            assert!(!a.geometry.overlaps(&b.geometry), "{} overlaps {}", a.id, b.id);
        }
        assert!(a.screen.x >= 0.0 && a.screen.right() <= 1024.0);
        assert!(a.screen.y >= 0.0 && a.screen.bottom() <= 768.0);
    }
    for reference in &frame.refs {
        assert!(reference.geometry.vertices.len() >= 2, "{} is not routed", reference.id);
    }
}

#[test]
fn editing_preserves_placed_tables_and_drops_removed_ones() {
    let mut view = shop_view();
    let customers = table_box(&view, "customers");
    let grab = view.viewport().diagram_to_screen(Point::new(customers.x + 10.0, customers.y + 10.0));
    let drop = Point::new(grab.x + 200.0, grab.y + 300.0);
    view.on_pointer_down(grab, Button::Primary, Modifiers::default());
    view.on_pointer_move(drop, Modifiers::default());
    view.on_pointer_up(drop, Button::Primary, Modifiers::default());
    let placed = table_box(&view, "customers");
    assert_ne!((placed.x, placed.y), (customers.x, customers.y));

    let without_products = SHOP
        .replace("Table products {\n  id int [pk]\n  name varchar\n}\n", "")
        .replace("Ref items_product: order_items.product_id > products.id\n", "");
    view.on_content_changed(&without_products, 1_000);
    assert_eq!(view.poll(1_500).len(), 3);

    assert_eq!(table_box(&view, "customers"), placed);
    assert!(!view.registry().contains(EntityKind::Table, "products"));
    assert!(!view.registry().contains(EntityKind::Ref, "items_product"));
    assert!(view.registry().contains(EntityKind::Ref, "items_order"));
}

#[test]
fn burst_of_edits_parses_final_text_once() {
    let parser = CountingParser { calls: Cell::new(0) };
    let mut view = DiagramView::new(parser, DiagramConfig::default());
    view.on_content_changed("Table e1 {\n  id int\n}\n", 0);
    view.on_content_changed("Table e2 {\n  id int\n}\n", 100);
    view.on_content_changed("Table e3 {\n  id int\n}\n", 200);
    assert!(view.poll(600).is_empty());
    assert_eq!(view.poll(700).len(), 3);

    assert_eq!(view.sync().parser().calls.get(), 1);
    let schema = view.schema().unwrap();
    assert_eq!(schema.tables.len(), 1);
    assert_eq!(schema.tables[0].name, "e3");
}

#[test]
fn parse_error_round_trip_to_editor() {
    let mut view = DiagramView::new(RejectingParser, DiagramConfig::default());
    view.on_content_changed("anything", 0);
    let actions = view.flush();
    let [Action::PublishParseError(Some(record))] = actions.as_slice() else {
        panic!("unexpected actions: {actions:?}");
    };
    assert_eq!(record.kind, "error");
    assert_eq!(record.message, "unexpected token");
    assert_eq!((record.location.start.row, record.location.start.col), (2, 4));
    assert_eq!((record.location.end.row, record.location.end.col), (2, 8));
    assert!(!view.render_frame().loaded);
}

#[test]
fn click_and_cursor_round_trip() {
    let mut view = shop_view();

    let orders = table_box(&view, "orders");
    let row = Point::new(orders.x + 20.0, orders.y + 32.0 + 28.0 + 5.0);
    let screen = view.viewport().diagram_to_screen(row);
    assert_eq!(view.element_at(screen), Some(ElementRef::field("orders", "customer_id")));

    let actions = view.on_double_click(screen);
    let Some(Action::HighlightTokenRange(range)) = actions.first() else {
        panic!("no highlight in {actions:?}");
    };
    assert_eq!(range.start.row, 6);

    view.on_cursor_moved(TokenPos::new(11, 3));
    let frame = view.render_frame();
    let products = frame.tables.iter().find(|t| t.id == "products").unwrap();
    assert_eq!(products.highlighted_field.as_deref(), Some("name"));
}

#[test]
fn dragging_a_grouped_table_grows_its_group() {
    let mut view = shop_view();
    let before = group_box(&view, "sales");
    let items = table_box(&view, "order_items");
    let grab = view.viewport().diagram_to_screen(Point::new(items.x + 10.0, items.y + 10.0));
    let drop = Point::new(grab.x + 400.0, grab.y + 300.0);

    view.on_pointer_down(grab, Button::Primary, Modifiers::default());
    view.on_pointer_move(drop, Modifiers::default());
    view.on_pointer_up(drop, Button::Primary, Modifiers::default());

    let group = group_box(&view, "sales");
    let items = table_box(&view, "order_items");
    assert!(group.encloses(&items));
    assert!(group.width > before.width || group.height > before.height);
}

#[test]
fn actions_serialize_with_type_tags() {
    let mut view = shop_view();
    let actions = view.select_element(&ElementRef::table("customers"));
    let json = serde_json::to_value(&actions).unwrap();
    assert_eq!(json[0]["type"], "highlightTokenRange");
    assert_eq!(json[0]["data"]["start"]["row"], 0);
    assert_eq!(json[1]["type"], "renderNeeded");

    let frame = serde_json::to_value(view.render_frame()).unwrap();
    assert_eq!(frame["loaded"], true);
    assert_eq!(frame["tables"].as_array().map(Vec::len), Some(4));
}
