//! Interactive DBML diagram engine.
//!
//! The engine keeps a textual schema and its entity-relationship diagram in
//! step. Editor text is re-parsed after a quiet period, each table, table
//! group and relationship keeps a layout record across re-parses, and
//! selection flows both ways: clicking a diagram element highlights its
//! source, moving the editor cursor highlights the element under it. The
//! host owns the editor widget and the drawing surface; it feeds events into
//! [`view::DiagramView`] and applies the [`view::Action`]s that come back.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`view`] | Top-level [`view::DiagramView`], actions and render frames |
//! | [`sync`] | Debounced parse pipeline and its tokio driver |
//! | [`schema`] | Parser seam and parse error records |
//! | [`registry`] | Per-entity layout records keyed by kind and id |
//! | [`layout`] | Auto-layout, relationship routing and scale-to-fit |
//! | [`selection`] | Token ranges and the editor/diagram selection bridge |
//! | [`viewport`] | Pan/zoom transform and coordinate conversions |
//! | [`input`] | Input event types and the gesture state machine |
//! | [`hit`] | Hit-testing against tables, fields, groups and refs |
//! | [`config`] | Environment-driven configuration |
//! | [`consts`] | Shared numeric constants (box sizes, gaps, hit slop) |

pub mod config;
pub mod consts;
pub mod hit;
pub mod input;
pub mod layout;
pub mod registry;
pub mod schema;
pub mod selection;
pub mod sync;
pub mod view;
pub mod viewport;

pub use config::{ConfigError, DiagramConfig};
pub use registry::{BoxGeometry, EntityKind, LayoutRegistry, RefGeometry};
pub use schema::{ParseErrorRecord, SchemaParser};
pub use selection::{ElementRef, TokenPos, TokenRange};
pub use view::{Action, DiagramView, RenderFrame};
pub use viewport::{Point, Viewport};
