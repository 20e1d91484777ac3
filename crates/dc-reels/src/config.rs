//! Game settings and grid configuration

use std::path::{Path, PathBuf};

use dc_core::{
    ConfigError, ConfigResult, MAX_COLUMNS, MIN_COLUMNS, VISIBLE_SLOTS, rows_for_columns,
};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Items per column range
pub const MIN_ITEMS_PER_COLUMN: u32 = VISIBLE_SLOTS as u32;
pub const MAX_ITEMS_PER_COLUMN: u32 = 20;

/// Largest explicit symbol restriction (0 means "use all")
pub const MAX_SYMBOLS_TO_USE: u32 = 8;

/// Spin intensity must be strictly above this
pub const MIN_SPIN_INTENSITY: f64 = 0.01;
pub const MAX_SPIN_INTENSITY: f64 = 10.0;

/// Simulation duration range (seconds)
pub const MIN_SIMULATION_SECONDS: f64 = 0.5;
pub const MAX_SIMULATION_SECONDS: f64 = 30.0;

pub const MAX_STEP_JITTER_MS: u64 = 1000;

/// Validated reel grid shape. Rows are always derived from columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    columns: u32,
    items_per_column: u32,
    symbols_to_use: u32,
}

impl GridConfig {
    pub fn new(columns: u32, items_per_column: u32, symbols_to_use: u32) -> ConfigResult<Self> {
        if !(MIN_COLUMNS..=MAX_COLUMNS).contains(&columns) {
            return Err(ConfigError::Columns(columns));
        }
        if !(MIN_ITEMS_PER_COLUMN..=MAX_ITEMS_PER_COLUMN).contains(&items_per_column) {
            return Err(ConfigError::ItemsPerColumn(items_per_column));
        }
        if symbols_to_use > MAX_SYMBOLS_TO_USE {
            return Err(ConfigError::SymbolsToUse(symbols_to_use));
        }
        Ok(Self {
            columns,
            items_per_column,
            symbols_to_use,
        })
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        rows_for_columns(self.columns)
    }

    pub fn items_per_column(&self) -> u32 {
        self.items_per_column
    }

    pub fn symbols_to_use(&self) -> u32 {
        self.symbols_to_use
    }

    /// Copy with a different reel window length
    pub fn with_items_per_column(self, items_per_column: u32) -> ConfigResult<Self> {
        Self::new(self.columns, items_per_column, self.symbols_to_use)
    }

    /// Reel indices per layout row
    pub fn layout(&self) -> GridLayout {
        GridLayout::for_columns(self.columns as usize)
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 3,
            items_per_column: 6,
            symbols_to_use: 0,
        }
    }
}

/// Placement of reels on one or two rows.
///
/// Two-row grids put `ceil(columns / 2)` reels on top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    pub rows: Vec<Vec<usize>>,
}

impl GridLayout {
    pub fn for_columns(columns: usize) -> Self {
        if rows_for_columns(columns as u32) == 1 {
            return Self {
                rows: vec![(0..columns).collect()],
            };
        }
        let top = columns.div_ceil(2);
        Self {
            rows: vec![(0..top).collect(), (top..columns).collect()],
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// User-facing settings, validated before reaching the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Number of reels (1–10)
    pub columns: u32,
    /// Symbols drawn from the pool (0 = all, else 1–8)
    pub symbols_to_use: u32,
    /// Spin speed multiplier; step duration is 200 ms divided by this
    pub spin_intensity: f64,
    /// Time before the cutoff (seconds)
    pub simulation_seconds: f64,
    /// Window length of each reel (3–20)
    pub items_per_column: u32,
    /// Random extra time added to each step (ms)
    pub step_jitter_ms: u64,
    /// Where symbol images are loaded from
    pub images_directory: PathBuf,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            columns: 3,
            symbols_to_use: 0,
            spin_intensity: 1.0,
            simulation_seconds: 3.0,
            items_per_column: 6,
            step_jitter_ms: 0,
            images_directory: PathBuf::from("images"),
        }
    }
}

impl GameSettings {
    /// Check every field range
    pub fn validate(&self) -> ConfigResult<()> {
        self.grid_config()?;

        // NaN fails both comparisons and is rejected
        if !(self.spin_intensity > MIN_SPIN_INTENSITY && self.spin_intensity <= MAX_SPIN_INTENSITY)
        {
            return Err(ConfigError::SpinIntensity(self.spin_intensity));
        }
        if !(self.simulation_seconds >= MIN_SIMULATION_SECONDS
            && self.simulation_seconds <= MAX_SIMULATION_SECONDS)
        {
            return Err(ConfigError::SimulationSeconds(self.simulation_seconds));
        }
        if self.step_jitter_ms > MAX_STEP_JITTER_MS {
            return Err(ConfigError::StepJitter(self.step_jitter_ms));
        }
        Ok(())
    }

    pub fn grid_config(&self) -> ConfigResult<GridConfig> {
        GridConfig::new(self.columns, self.items_per_column, self.symbols_to_use)
    }

    /// Load and validate from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let settings: Self = match ext.as_str() {
            "json" => serde_json::from_str(&text)?,
            "yaml" | "yml" => serde_yml::from_str(&text)?,
            other => return Err(SettingsError::UnsupportedFormat(other.to_string())),
        };
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
