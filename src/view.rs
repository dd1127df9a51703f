//! Diagram view: the single owner of one open diagram's state.
//!
//! `DiagramView` ties together the viewport, the layout registry, the
//! selection bridge and the sync pipeline. Every handler mutates through
//! `&mut self` and returns the [`Action`]s the host must apply to the editor
//! and the renderer; nothing is pushed to observers.

#[cfg(test)]
#[path = "view_test.rs"]
mod view_test;

use dbml::Schema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DiagramConfig;
use crate::consts::{FIELD_ROW_HEIGHT, TABLE_HEADER_HEIGHT, WHEEL_ZOOM_SENSITIVITY};
use crate::hit::hit_test;
use crate::input::{Button, Gesture, Modifiers, WheelDelta};
use crate::layout::{self, group_memberships};
use crate::registry::{BoxGeometry, EntityKind, LayoutRegistry, RefGeometry};
use crate::schema::{ParseErrorRecord, SchemaParser};
use crate::selection::{ElementRef, SelectionBridge, TokenPos, TokenRange};
use crate::sync::{SchemaSync, SyncOutcome};
use crate::viewport::{Matrix, Point, Viewport};

/// Actions returned from handlers for the host to process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Action {
    /// Move the editor selection marker to this range.
    HighlightTokenRange(TokenRange),
    /// Remove every editor annotation.
    ClearAnnotations,
    /// Replace the editor's parse error annotation; `None` clears it.
    PublishParseError(Option<ParseErrorRecord>),
    RenderNeeded,
}

/// Hover tooltip state. At most one is shown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tooltip {
    pub x: f64,
    pub y: f64,
    pub show: bool,
    pub target: Option<ElementRef>,
    pub width: f64,
    pub height: f64,
}

/// One table or table group as the renderer should draw it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxFrame {
    pub id: String,
    pub name: String,
    pub geometry: BoxGeometry,
    /// `geometry` mapped to screen pixels.
    pub screen: BoxGeometry,
    pub highlighted: bool,
    /// Highlighted column, when the highlight is on a field of this table.
    pub highlighted_field: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefFrame {
    pub id: String,
    pub operator: &'static str,
    pub geometry: RefGeometry,
    pub screen_vertices: Vec<Point>,
    pub highlighted: bool,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    pub loaded: bool,
    pub zoom_percent: i64,
    pub zoom_min_percent: u32,
    pub zoom_max_percent: u32,
    pub zoom_step_percent: u32,
    pub pan: Point,
    pub ctm: Matrix,
    pub grid_size: f64,
    pub sub_grid_size: f64,
    pub table_groups: Vec<BoxFrame>,
    pub tables: Vec<BoxFrame>,
    pub refs: Vec<RefFrame>,
    pub error: Option<ParseErrorRecord>,
    pub tooltip: Tooltip,
}

pub struct DiagramView<P> {
    config: DiagramConfig,
    viewport: Viewport,
    registry: LayoutRegistry,
    selection: SelectionBridge,
    sync: SchemaSync<P>,
    tooltip: Tooltip,
    gesture: Gesture,
    loaded: bool,
}

impl<P: SchemaParser> DiagramView<P> {
    #[must_use]
    pub fn new(parser: P, config: DiagramConfig) -> Self {
        let sync = SchemaSync::new(parser, config.source_format.clone(), config.debounce_ms);
        Self {
            config,
            viewport: Viewport::new(),
            registry: LayoutRegistry::new(),
            selection: SelectionBridge::new(),
            sync,
            tooltip: Tooltip::default(),
            gesture: Gesture::Idle,
            loaded: false,
        }
    }

    // --- Editor side ---

    /// Record new editor text; the parse runs once the text has been quiet
    /// for the debounce period. Returns whether a parse was scheduled.
    pub fn on_content_changed(&mut self, text: &str, now_ms: u64) -> bool {
        self.sync.on_content_changed(text, now_ms)
    }

    /// When the pending parse is due, if one is pending.
    #[must_use]
    pub fn sync_deadline(&self) -> Option<u64> {
        self.sync.deadline()
    }

    /// Run the pending parse if it is due.
    pub fn poll(&mut self, now_ms: u64) -> Vec<Action> {
        match self.sync.poll(now_ms, &mut self.registry) {
            Some(outcome) => self.apply_outcome(outcome),
            None => Vec::new(),
        }
    }

    /// Parse the current text now.
    pub fn flush(&mut self) -> Vec<Action> {
        let outcome = self.sync.flush(&mut self.registry);
        self.apply_outcome(outcome)
    }

    fn apply_outcome(&mut self, outcome: SyncOutcome) -> Vec<Action> {
        match outcome {
            SyncOutcome::Loaded { .. } => {
                if let Some(schema) = self.sync.schema() {
                    fit_table_heights(&mut self.registry, schema);
                    for (group_id, members) in group_memberships(schema) {
                        layout::wrap_group(&mut self.registry, &group_id, &members);
                    }
                    self.selection.retain_valid(schema);
                }
                layout::route_refs(&mut self.registry);
                self.loaded = true;
                vec![Action::ClearAnnotations, Action::PublishParseError(None), Action::RenderNeeded]
            }
            SyncOutcome::Failed(record) => vec![Action::PublishParseError(Some(record))],
        }
    }

    /// Editor cursor moved: highlight the innermost element under it.
    pub fn on_cursor_moved(&mut self, pos: TokenPos) -> Vec<Action> {
        let Some(schema) = self.sync.schema() else {
            return Vec::new();
        };
        let before = self.selection.highlight().cloned();
        let after = self.selection.highlight_at_cursor(schema, pos).cloned();
        if before == after { Vec::new() } else { vec![Action::RenderNeeded] }
    }

    // --- Canvas side ---

    /// Diagram element clicked: select it and move the editor marker to its
    /// source range.
    pub fn select_element(&mut self, element: &ElementRef) -> Vec<Action> {
        let Some(schema) = self.sync.schema() else {
            return Vec::new();
        };
        match self.selection.select_element(schema, element) {
            Some(range) => vec![Action::HighlightTokenRange(range), Action::RenderNeeded],
            None => Vec::new(),
        }
    }

    /// Element under a screen point, if any.
    #[must_use]
    pub fn element_at(&self, screen_pt: Point) -> Option<ElementRef> {
        let schema = self.sync.schema()?;
        hit_test(self.viewport.screen_to_diagram(screen_pt), &self.registry, schema, &self.viewport)
    }

    /// Double-click: locate the element under the pointer in the editor.
    pub fn on_double_click(&mut self, screen_pt: Point) -> Vec<Action> {
        match self.element_at(screen_pt) {
            Some(element) => self.select_element(&element),
            None => Vec::new(),
        }
    }

    /// Update the viewport size from the host (CSS pixels).
    pub fn set_viewport_size(&mut self, width: f64, height: f64) -> Vec<Action> {
        self.viewport.set_size(width, height);
        vec![Action::RenderNeeded]
    }

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        self.gesture = match button {
            Button::Middle => Gesture::Panning { last_screen: screen_pt },
            Button::Secondary => Gesture::Idle,
            Button::Primary => match self.element_at(screen_pt) {
                Some(ElementRef::Table { table_id } | ElementRef::Field { table_id, .. }) => {
                    let world = self.viewport.screen_to_diagram(screen_pt);
                    let origin = self.registry.table(&table_id);
                    Gesture::DraggingTable { table_id, grab_offset: Point::new(world.x - origin.x, world.y - origin.y) }
                }
                _ => Gesture::Panning { last_screen: screen_pt },
            },
        };
        debug!(gesture = ?self.gesture, "view: pointer down");
        Vec::new()
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        match self.gesture.clone() {
            Gesture::Idle => Vec::new(),
            Gesture::Panning { last_screen } => {
                self.viewport.pan_by(screen_pt.x - last_screen.x, screen_pt.y - last_screen.y);
                self.gesture = Gesture::Panning { last_screen: screen_pt };
                vec![Action::RenderNeeded]
            }
            Gesture::DraggingTable { table_id, grab_offset } => {
                let world = self.viewport.screen_to_diagram(screen_pt);
                let current = self.registry.table(&table_id);
                let grid = self.config.grid;
                let moved = BoxGeometry::new(
                    grid.snap(world.x - grab_offset.x),
                    grid.snap(world.y - grab_offset.y),
                    current.width,
                    current.height,
                );
                if moved == current {
                    return Vec::new();
                }
                self.registry.set_table(&table_id, moved);
                self.rewrap_groups_of(&table_id);
                layout::route_refs(&mut self.registry);
                vec![Action::RenderNeeded]
            }
        }
    }

    pub fn on_pointer_up(&mut self, _screen_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if let Gesture::DraggingTable { table_id, .. } = &self.gesture {
            let placed = self.registry.table(table_id);
            info!(table_id = %table_id, x = placed.x, y = placed.y, "view: table moved");
        }
        self.gesture = Gesture::Idle;
        Vec::new()
    }

    /// Plain wheel zooms about the cursor; shift-wheel pans.
    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.shift {
            self.viewport.pan_by(-delta.dx, -delta.dy);
            return vec![Action::RenderNeeded];
        }
        let (min, max) = self.config.zoom_bounds();
        let zoom = (self.viewport.zoom() * (-delta.dy * WHEEL_ZOOM_SENSITIVITY).exp()).clamp(min, max);
        if (zoom - self.viewport.zoom()).abs() < f64::EPSILON {
            return Vec::new();
        }
        self.viewport.zoom_at(screen_pt, zoom);
        vec![Action::RenderNeeded]
    }

    fn rewrap_groups_of(&mut self, table_id: &str) {
        let Some(schema) = self.sync.schema() else {
            return;
        };
        for group in schema.table_groups.iter().filter(|g| g.table_ids.iter().any(|id| id == table_id)) {
            layout::wrap_group(&mut self.registry, &group.id, &group.table_ids);
        }
    }

    // --- Toolbar ---

    /// Re-place every entity and re-route automatic relationships.
    pub fn apply_auto_layout(&mut self) -> Vec<Action> {
        let Some(schema) = self.sync.schema() else {
            return Vec::new();
        };
        layout::auto_layout(&mut self.registry, &group_memberships(schema));
        vec![Action::RenderNeeded]
    }

    /// Fit the whole diagram into the viewport.
    pub fn apply_scale_to_fit(&mut self) -> Vec<Action> {
        let (min, max) = self.config.zoom_bounds();
        if layout::scale_to_fit(&mut self.viewport, &self.registry, self.config.fit_margin, min, max) {
            vec![Action::RenderNeeded]
        } else {
            Vec::new()
        }
    }

    /// Zoom control input: clamp to the bounds, round to the step and zoom
    /// about the viewport centre.
    pub fn set_zoom_percent(&mut self, percent: i64) -> Vec<Action> {
        let percent = self.config.clamp_zoom_percent(percent);
        self.viewport.zoom_at(self.viewport.center_screen(), f64::from(percent) / 100.0);
        vec![Action::RenderNeeded]
    }

    // --- Tooltip ---

    pub fn show_tooltip(&mut self, target: ElementRef, x: f64, y: f64, width: f64, height: f64) -> Vec<Action> {
        self.tooltip = Tooltip { x, y, show: true, target: Some(target), width, height };
        vec![Action::RenderNeeded]
    }

    pub fn hide_tooltip(&mut self) -> Vec<Action> {
        if !self.tooltip.show {
            return Vec::new();
        }
        self.tooltip = Tooltip::default();
        vec![Action::RenderNeeded]
    }

    // --- Queries ---

    #[must_use]
    pub fn config(&self) -> &DiagramConfig {
        &self.config
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[cfg(test)]
    pub(crate) fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    #[must_use]
    pub fn registry(&self) -> &LayoutRegistry {
        &self.registry
    }

    #[cfg(test)]
    pub(crate) fn registry_mut(&mut self) -> &mut LayoutRegistry {
        &mut self.registry
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionBridge {
        &self.selection
    }

    #[must_use]
    pub fn sync(&self) -> &SchemaSync<P> {
        &self.sync
    }

    #[must_use]
    pub fn schema(&self) -> Option<&Schema> {
        self.sync.schema()
    }

    #[must_use]
    pub fn error(&self) -> Option<&ParseErrorRecord> {
        self.sync.error()
    }

    #[must_use]
    pub fn tooltip(&self) -> &Tooltip {
        &self.tooltip
    }

    #[must_use]
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// `false` until the first successful parse.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    // --- Render ---

    /// Snapshot of everything the renderer draws. Empty before the first load.
    #[must_use]
    pub fn render_frame(&self) -> RenderFrame {
        let mut frame = RenderFrame {
            loaded: self.loaded,
            zoom_percent: self.viewport.zoom_percent(),
            zoom_min_percent: self.config.zoom_min_percent,
            zoom_max_percent: self.config.zoom_max_percent,
            zoom_step_percent: self.config.zoom_step_percent,
            pan: self.viewport.pan(),
            ctm: self.viewport.ctm(),
            grid_size: self.config.grid.size,
            sub_grid_size: self.config.grid.sub_grid_size(),
            table_groups: Vec::new(),
            tables: Vec::new(),
            refs: Vec::new(),
            error: self.sync.error().cloned(),
            tooltip: self.tooltip.clone(),
        };
        let Some(schema) = self.sync.schema().filter(|_| self.loaded) else {
            return frame;
        };
        let highlight = self.selection.highlight();

        for group in &schema.table_groups {
            let element = ElementRef::table_group(&group.id);
            if let Some(b) = self.box_frame(EntityKind::TableGroup, &group.id, &group.name, &element) {
                frame.table_groups.push(b);
            }
        }
        for table in &schema.tables {
            let element = ElementRef::table(&table.id);
            if let Some(mut b) = self.box_frame(EntityKind::Table, &table.id, &table.name, &element) {
                if let Some(ElementRef::Field { table_id, field }) = highlight
                    && *table_id == table.id
                {
                    b.highlighted_field = Some(field.clone());
                }
                frame.tables.push(b);
            }
        }
        for reference in &schema.refs {
            let Some(geometry) = self.registry.peek(EntityKind::Ref, &reference.id).and_then(|r| r.as_ref_geometry())
            else {
                continue;
            };
            frame.refs.push(RefFrame {
                id: reference.id.clone(),
                operator: reference.operator(),
                geometry: geometry.clone(),
                screen_vertices: geometry.vertices.iter().map(|v| self.viewport.diagram_to_screen(*v)).collect(),
                highlighted: self.selection.is_highlighted(&ElementRef::reference(&reference.id)),
            });
        }
        frame
    }

    fn box_frame(&self, kind: EntityKind, id: &str, name: &str, element: &ElementRef) -> Option<BoxFrame> {
        let geometry = *self.registry.peek(kind, id)?.as_box()?;
        let top_left = self.viewport.diagram_to_screen(Point::new(geometry.x, geometry.y));
        let zoom = self.viewport.zoom();
        Some(BoxFrame {
            id: id.to_owned(),
            name: name.to_owned(),
            geometry,
            screen: BoxGeometry::new(top_left.x, top_left.y, geometry.width * zoom, geometry.height * zoom),
            highlighted: self.selection.is_highlighted(element),
            highlighted_field: None,
        })
    }
}

/// Size every table's height to its header plus one row per column.
fn fit_table_heights(registry: &mut LayoutRegistry, schema: &Schema) {
    for table in &schema.tables {
        let mut geometry = registry.table(&table.id);
        #[allow(clippy::cast_precision_loss)]
        let height = TABLE_HEADER_HEIGHT + FIELD_ROW_HEIGHT * table.fields.len() as f64;
        if (geometry.height - height).abs() > f64::EPSILON {
            geometry.height = height;
            registry.set_table(&table.id, geometry);
        }
    }
}
