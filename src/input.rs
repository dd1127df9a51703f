//! Input model: modifier keys, mouse buttons, wheel deltas and the gesture
//! state machine.
//!
//! `Gesture` is the active drag being tracked between pointer-down and
//! pointer-up, carrying what the view needs to compute incremental deltas.

use serde::{Deserialize, Serialize};

use crate::viewport::Point;

/// Keyboard modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button; always pans.
    Middle,
    Secondary,
}

/// Wheel / trackpad scroll delta in pixels (positive `dy` = down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelDelta {
    pub dx: f64,
    pub dy: f64,
}

/// Active pointer gesture.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Dragging empty canvas (or with the middle button) to pan.
    Panning {
        /// Screen position of the previous pointer event.
        last_screen: Point,
    },
    /// Moving a table.
    DraggingTable {
        table_id: String,
        /// Diagram-space offset from the table origin to the grab point.
        grab_offset: Point,
    },
}

impl Gesture {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
