//! Shared numeric constants for the diagram engine.

// ── Entity geometry ─────────────────────────────────────────────

/// Width of a freshly created table or table group placeholder.
pub const DEFAULT_TABLE_WIDTH: f64 = 200.0;

/// Height of a freshly created placeholder; one header row.
pub const DEFAULT_TABLE_HEIGHT: f64 = 32.0;

/// Height of a table's name header.
pub const TABLE_HEADER_HEIGHT: f64 = 32.0;

/// Height of one column row below the header.
pub const FIELD_ROW_HEIGHT: f64 = 28.0;

// ── Auto-layout ─────────────────────────────────────────────────

/// Gap between neighbouring tables inside a cluster.
pub const TABLE_GAP: f64 = 60.0;

/// Gap between top-level clusters (groups and loose tables).
pub const CLUSTER_GAP: f64 = 100.0;

/// Inset between a table group's border and its member tables.
pub const GROUP_PADDING: f64 = 20.0;

/// Title band at the top of a table group.
pub const GROUP_HEADER_HEIGHT: f64 = 32.0;

/// How far a self-referencing relationship loops out from its table.
pub const SELF_REF_LOOP: f64 = 30.0;

// ── Interaction ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels around relationship lines.
pub const REF_HIT_SLOP_PX: f64 = 6.0;

/// Zoom factor change per wheel pixel (`factor = exp(-dy * k)`).
pub const WHEEL_ZOOM_SENSITIVITY: f64 = 0.0015;
