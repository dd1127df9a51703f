//! Diagram configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use tracing::warn;

pub const DEFAULT_ZOOM_MIN_PERCENT: u32 = 10;
pub const DEFAULT_ZOOM_MAX_PERCENT: u32 = 200;
pub const DEFAULT_ZOOM_STEP_PERCENT: u32 = 1;
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_FIT_MARGIN: f64 = 0.05;
pub const DEFAULT_GRID_SIZE: f64 = 100.0;
pub const DEFAULT_GRID_DIVISIONS: u32 = 10;
pub const DEFAULT_GRID_SNAP: f64 = 5.0;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("zoom range is empty: min {min}% must be below max {max}%")]
    ZoomRange { min: u32, max: u32 },
    #[error("{key} must be positive")]
    NotPositive { key: &'static str },
    #[error("fit margin {0} must be in [0, 0.5)")]
    FitMargin(f64),
    #[error("source format must not be empty")]
    EmptyFormat,
}

/// Background grid drawn behind the diagram; drags snap to `snap`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub size: f64,
    pub divisions: u32,
    pub snap: f64,
}

impl Default for Grid {
    fn default() -> Self {
        Self { size: DEFAULT_GRID_SIZE, divisions: DEFAULT_GRID_DIVISIONS, snap: DEFAULT_GRID_SNAP }
    }
}

impl Grid {
    #[must_use]
    pub fn sub_grid_size(&self) -> f64 {
        self.size / f64::from(self.divisions.max(1))
    }

    /// Round `value` to the nearest snap multiple.
    #[must_use]
    pub fn snap(&self, value: f64) -> f64 {
        if self.snap > 0.0 { (value / self.snap).round() * self.snap } else { value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramConfig {
    pub zoom_min_percent: u32,
    pub zoom_max_percent: u32,
    pub zoom_step_percent: u32,
    pub debounce_ms: u64,
    pub fit_margin: f64,
    pub grid: Grid,
    pub source_format: String,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            zoom_min_percent: DEFAULT_ZOOM_MIN_PERCENT,
            zoom_max_percent: DEFAULT_ZOOM_MAX_PERCENT,
            zoom_step_percent: DEFAULT_ZOOM_STEP_PERCENT,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            fit_margin: DEFAULT_FIT_MARGIN,
            grid: Grid::default(),
            source_format: dbml::FORMAT_DBML.to_owned(),
        }
    }
}

impl DiagramConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `DIAGRAM_ZOOM_MIN_PERCENT`: default 10
    /// - `DIAGRAM_ZOOM_MAX_PERCENT`: default 200
    /// - `DIAGRAM_ZOOM_STEP_PERCENT`: default 1
    /// - `DIAGRAM_DEBOUNCE_MS`: default 500
    /// - `DIAGRAM_FIT_MARGIN`: default 0.05
    /// - `DIAGRAM_GRID_SIZE` / `DIAGRAM_GRID_DIVISIONS` / `DIAGRAM_GRID_SNAP`: 100 / 10 / 5
    /// - `DIAGRAM_SOURCE_FORMAT`: default `dbml`
    ///
    /// # Errors
    ///
    /// Returns an error when the values parse but contradict each other.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(v) => Some(v),
            Err(_) => None,
        })
    }

    /// Build config from an arbitrary key lookup. Unparsable values fall back
    /// to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the resulting config fails [`DiagramConfig::validate`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            zoom_min_percent: lookup_parse(&lookup, "DIAGRAM_ZOOM_MIN_PERCENT", DEFAULT_ZOOM_MIN_PERCENT),
            zoom_max_percent: lookup_parse(&lookup, "DIAGRAM_ZOOM_MAX_PERCENT", DEFAULT_ZOOM_MAX_PERCENT),
            zoom_step_percent: lookup_parse(&lookup, "DIAGRAM_ZOOM_STEP_PERCENT", DEFAULT_ZOOM_STEP_PERCENT),
            debounce_ms: lookup_parse(&lookup, "DIAGRAM_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS),
            fit_margin: lookup_parse(&lookup, "DIAGRAM_FIT_MARGIN", DEFAULT_FIT_MARGIN),
            grid: Grid {
                size: lookup_parse(&lookup, "DIAGRAM_GRID_SIZE", DEFAULT_GRID_SIZE),
                divisions: lookup_parse(&lookup, "DIAGRAM_GRID_DIVISIONS", DEFAULT_GRID_DIVISIONS),
                snap: lookup_parse(&lookup, "DIAGRAM_GRID_SNAP", DEFAULT_GRID_SNAP),
            },
            source_format: lookup("DIAGRAM_SOURCE_FORMAT").unwrap_or_else(|| dbml::FORMAT_DBML.to_owned()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zoom_min_percent == 0 {
            return Err(ConfigError::NotPositive { key: "DIAGRAM_ZOOM_MIN_PERCENT" });
        }
        if self.zoom_min_percent >= self.zoom_max_percent {
            return Err(ConfigError::ZoomRange { min: self.zoom_min_percent, max: self.zoom_max_percent });
        }
        if self.zoom_step_percent == 0 {
            return Err(ConfigError::NotPositive { key: "DIAGRAM_ZOOM_STEP_PERCENT" });
        }
        if self.debounce_ms == 0 {
            return Err(ConfigError::NotPositive { key: "DIAGRAM_DEBOUNCE_MS" });
        }
        if !(self.fit_margin.is_finite() && (0.0..0.5).contains(&self.fit_margin)) {
            return Err(ConfigError::FitMargin(self.fit_margin));
        }
        if !(self.grid.size.is_finite() && self.grid.size > 0.0) || self.grid.divisions == 0 {
            return Err(ConfigError::NotPositive { key: "DIAGRAM_GRID_SIZE" });
        }
        if !(self.grid.snap.is_finite() && self.grid.snap >= 0.0) {
            return Err(ConfigError::NotPositive { key: "DIAGRAM_GRID_SNAP" });
        }
        if self.source_format.trim().is_empty() {
            return Err(ConfigError::EmptyFormat);
        }
        Ok(())
    }

    /// Zoom bounds as scale factors `(min, max)`.
    #[must_use]
    pub fn zoom_bounds(&self) -> (f64, f64) {
        (f64::from(self.zoom_min_percent) / 100.0, f64::from(self.zoom_max_percent) / 100.0)
    }

    /// Clamp a requested zoom percentage to the bounds and round it to the step.
    #[must_use]
    pub fn clamp_zoom_percent(&self, percent: i64) -> u32 {
        let step = i64::from(self.zoom_step_percent.max(1));
        let stepped = percent.saturating_add(step / 2).div_euclid(step).saturating_mul(step);
        let clamped = stepped.clamp(i64::from(self.zoom_min_percent), i64::from(self.zoom_max_percent));
        u32::try_from(clamped).unwrap_or(self.zoom_min_percent)
    }
}

fn lookup_parse<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, raw = %raw, "config: unparsable value; using default");
            default
        }
    }
}
