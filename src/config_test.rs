#![allow(clippy::float_cmp)]

use std::collections::HashMap;

use super::*;

fn config_from(pairs: &[(&str, &str)]) -> Result<DiagramConfig, ConfigError> {
    let env: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    DiagramConfig::from_lookup(|key| env.get(key).cloned())
}

#[test]
fn empty_lookup_yields_defaults() {
    let cfg = config_from(&[]).unwrap();
    assert_eq!(cfg, DiagramConfig::default());
    assert_eq!(cfg.zoom_min_percent, 10);
    assert_eq!(cfg.zoom_max_percent, 200);
    assert_eq!(cfg.debounce_ms, 500);
    assert_eq!(cfg.fit_margin, 0.05);
    assert_eq!(cfg.grid, Grid { size: 100.0, divisions: 10, snap: 5.0 });
    assert_eq!(cfg.source_format, "dbml");
}

#[test]
fn overrides_are_parsed() {
    let cfg = config_from(&[
        ("DIAGRAM_ZOOM_MIN_PERCENT", "25"),
        ("DIAGRAM_ZOOM_MAX_PERCENT", " 400 "),
        ("DIAGRAM_ZOOM_STEP_PERCENT", "5"),
        ("DIAGRAM_DEBOUNCE_MS", "250"),
        ("DIAGRAM_FIT_MARGIN", "0.1"),
        ("DIAGRAM_GRID_SIZE", "80"),
        ("DIAGRAM_GRID_DIVISIONS", "4"),
        ("DIAGRAM_GRID_SNAP", "10"),
    ])
    .unwrap();
    assert_eq!(cfg.zoom_min_percent, 25);
    assert_eq!(cfg.zoom_max_percent, 400);
    assert_eq!(cfg.zoom_step_percent, 5);
    assert_eq!(cfg.debounce_ms, 250);
    assert_eq!(cfg.fit_margin, 0.1);
    assert_eq!(cfg.grid.sub_grid_size(), 20.0);
    assert_eq!(cfg.grid.snap, 10.0);
}

#[test]
fn unparsable_value_falls_back_to_default() {
    let cfg = config_from(&[("DIAGRAM_DEBOUNCE_MS", "soon"), ("DIAGRAM_ZOOM_MAX_PERCENT", "-3")]).unwrap();
    assert_eq!(cfg.debounce_ms, DEFAULT_DEBOUNCE_MS);
    assert_eq!(cfg.zoom_max_percent, DEFAULT_ZOOM_MAX_PERCENT);
}

#[test]
fn inverted_zoom_range_is_rejected() {
    let err = config_from(&[("DIAGRAM_ZOOM_MIN_PERCENT", "300")]).unwrap_err();
    assert_eq!(err, ConfigError::ZoomRange { min: 300, max: 200 });
}

#[test]
fn zero_debounce_is_rejected() {
    let err = config_from(&[("DIAGRAM_DEBOUNCE_MS", "0")]).unwrap_err();
    assert_eq!(err, ConfigError::NotPositive { key: "DIAGRAM_DEBOUNCE_MS" });
}

#[test]
fn margin_of_half_or_more_is_rejected() {
    assert!(matches!(config_from(&[("DIAGRAM_FIT_MARGIN", "0.5")]), Err(ConfigError::FitMargin(_))));
}

#[test]
fn blank_format_is_rejected() {
    assert_eq!(config_from(&[("DIAGRAM_SOURCE_FORMAT", "  ")]).unwrap_err(), ConfigError::EmptyFormat);
}

#[test]
fn zoom_bounds_are_fractions() {
    assert_eq!(DiagramConfig::default().zoom_bounds(), (0.1, 2.0));
}

#[test]
fn clamp_zoom_percent_applies_bounds_and_step() {
    let mut cfg = DiagramConfig::default();
    assert_eq!(cfg.clamp_zoom_percent(5), 10);
    assert_eq!(cfg.clamp_zoom_percent(144), 144);
    assert_eq!(cfg.clamp_zoom_percent(900), 200);
    cfg.zoom_step_percent = 10;
    assert_eq!(cfg.clamp_zoom_percent(144), 140);
    assert_eq!(cfg.clamp_zoom_percent(145), 150);
}

#[test]
fn clamp_zoom_percent_saturates_at_extremes() {
    let mut cfg = DiagramConfig::default();
    cfg.zoom_step_percent = 2;
    assert_eq!(cfg.clamp_zoom_percent(i64::MAX), 200);
    assert_eq!(cfg.clamp_zoom_percent(i64::MIN), 10);
    cfg.zoom_step_percent = 3;
    assert_eq!(cfg.clamp_zoom_percent(i64::MAX), 200);
    assert_eq!(cfg.clamp_zoom_percent(i64::MIN), 10);
}

#[test]
fn grid_snap_rounds_to_nearest_multiple() {
    let grid = Grid::default();
    assert_eq!(grid.snap(12.4), 10.0);
    assert_eq!(grid.snap(12.5), 15.0);
    assert_eq!(grid.snap(-7.6), -10.0);
    let off = Grid { snap: 0.0, ..Grid::default() };
    assert_eq!(off.snap(12.4), 12.4);
}
