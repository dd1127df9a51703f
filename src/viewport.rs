//! Pan/zoom viewport and the diagram ↔ screen affine transform.
//!
//! The forward matrix (`ctm`) and its inverse are cached and always rewritten
//! together inside `&mut self` methods, so a reader never sees one updated
//! without the other.

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A point in either screen or diagram space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A 2×3 affine matrix `[a, b, c, d, e, f]`:
/// `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
pub type Matrix = [f64; 6];

pub const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Apply an affine matrix to a point.
#[must_use]
pub fn apply(m: &Matrix, p: Point) -> Point {
    Point { x: m[0] * p.x + m[2] * p.y + m[4], y: m[1] * p.x + m[3] * p.y + m[5] }
}

/// Invert an affine matrix. Returns `None` when it is singular or non-finite.
#[must_use]
pub fn invert(m: &Matrix) -> Option<Matrix> {
    let [a, b, c, d, e, f] = *m;
    let det = a * d - b * c;
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    let inv = [d / det, -b / det, -c / det, a / det, (c * f - d * e) / det, (b * e - a * f) / det];
    inv.iter().all(|v| v.is_finite()).then_some(inv)
}

/// Viewport state for one diagram view.
///
/// `pan` is the screen position (CSS pixels) of the diagram origin and `zoom`
/// the scale factor (1.0 = 100%). No zoom bounds are assumed here; callers
/// clamp user input.
#[derive(Debug, Clone)]
pub struct Viewport {
    zoom: f64,
    pan: Point,
    ctm: Matrix,
    inverse_ctm: Matrix,
    width: f64,
    height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { zoom: 1.0, pan: Point::default(), ctm: IDENTITY, inverse_ctm: IDENTITY, width: 0.0, height: 0.0 }
    }
}

impl Viewport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub fn pan(&self) -> Point {
        self.pan
    }

    /// Diagram → screen matrix.
    #[must_use]
    pub fn ctm(&self) -> Matrix {
        self.ctm
    }

    /// Screen → diagram matrix.
    #[must_use]
    pub fn inverse_ctm(&self) -> Matrix {
        self.inverse_ctm
    }

    /// Viewport size in screen pixels as `(width, height)`.
    #[must_use]
    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Zoom as a whole percentage for the zoom control.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn zoom_percent(&self) -> i64 {
        (self.zoom * 100.0).round() as i64
    }

    /// Replace the zoom factor. Non-positive or non-finite values are ignored.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.set_view(zoom, self.pan);
    }

    /// Replace the pan offset. Non-finite values are ignored.
    pub fn set_pan(&mut self, pan: Point) {
        self.set_view(self.zoom, pan);
    }

    /// Replace zoom and pan together.
    pub fn set_view(&mut self, zoom: f64, pan: Point) {
        if !(zoom.is_finite() && zoom > 0.0) || !pan.is_finite() {
            warn!(zoom, pan_x = pan.x, pan_y = pan.y, "viewport: rejected non-finite view");
            return;
        }
        let ctm = [zoom, 0.0, 0.0, zoom, pan.x, pan.y];
        let Some(inverse_ctm) = invert(&ctm) else {
            warn!(zoom, "viewport: singular transform");
            return;
        };
        self.zoom = zoom;
        self.pan = pan;
        self.ctm = ctm;
        self.inverse_ctm = inverse_ctm;
    }

    /// Shift the view by a screen-space delta (drag panning).
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.set_pan(Point::new(self.pan.x + dx, self.pan.y + dy));
    }

    /// Change zoom while keeping the diagram point under `screen` fixed.
    pub fn zoom_at(&mut self, screen: Point, zoom: f64) {
        let anchor = self.screen_to_diagram(screen);
        let pan = Point::new(screen.x - anchor.x * zoom, screen.y - anchor.y * zoom);
        self.set_view(zoom, pan);
    }

    /// Update the viewport size from the host (CSS pixels).
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = if width.is_finite() { width.max(0.0) } else { 0.0 };
        self.height = if height.is_finite() { height.max(0.0) } else { 0.0 };
    }

    /// Screen-space centre of the viewport.
    #[must_use]
    pub fn center_screen(&self) -> Point {
        Point::new(self.width * 0.5, self.height * 0.5)
    }

    #[must_use]
    pub fn screen_to_diagram(&self, screen: Point) -> Point {
        apply(&self.inverse_ctm, screen)
    }

    #[must_use]
    pub fn diagram_to_screen(&self, diagram: Point) -> Point {
        apply(&self.ctm, diagram)
    }

    /// Convert a screen-space distance (pixels) to a diagram-space distance.
    #[must_use]
    pub fn screen_dist_to_diagram(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }
}
