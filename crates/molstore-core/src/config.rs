use crate::editors::EditMode;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

const DEFAULT_SPATIAL_CELL_SIZE: f64 = 5.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Spatial cell size must be a positive finite number, got {0}")]
    InvalidCellSize(f64),
}

/// Per-entity settings fixed at creation time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    /// Edge length in Å of the buckets used by the spatial organizer.
    pub spatial_cell_size: f64,
    /// Mode used by `edit_xcs` / `edit_ics` when no mode is given.
    pub default_edit_mode: EditMode,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            spatial_cell_size: DEFAULT_SPATIAL_CELL_SIZE,
            default_edit_mode: EditMode::Unbuffered,
        }
    }
}

impl EntityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.spatial_cell_size.is_finite() && self.spatial_cell_size > 0.0) {
            return Err(ConfigError::InvalidCellSize(self.spatial_cell_size));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct EntityConfigBuilder {
    spatial_cell_size: Option<f64>,
    default_edit_mode: Option<EditMode>,
}

impl EntityConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spatial_cell_size(mut self, size: f64) -> Self {
        self.spatial_cell_size = Some(size);
        self
    }
    pub fn default_edit_mode(mut self, mode: EditMode) -> Self {
        self.default_edit_mode = Some(mode);
        self
    }

    /// Builds the configuration, filling unset fields with defaults.
    pub fn build(self) -> Result<EntityConfig, ConfigError> {
        let defaults = EntityConfig::default();
        let config = EntityConfig {
            spatial_cell_size: self
                .spatial_cell_size
                .unwrap_or(defaults.spatial_cell_size),
            default_edit_mode: self
                .default_edit_mode
                .unwrap_or(defaults.default_edit_mode),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Reads an [`EntityConfig`] from a TOML file. Missing keys take their
/// default values.
pub fn load_config(path: &Path) -> Result<EntityConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    let config: EntityConfig = toml::from_str(&content).map_err(|e| ConfigError::Toml {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}
