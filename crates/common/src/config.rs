//! Simulation configuration.
//!
//! Loaded from JSON; every field has a default so a partial file only
//! overrides what it names.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from loading or validating a [`SimConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for the headless simulation and its collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Eye height the player is pinned to every frame.
    pub player_height: f32,
    /// Planar collision radius of the player.
    pub player_radius: f32,
    /// Walking speed in units per second.
    pub player_speed: f32,
    /// Edge length of one maze cell (walls are square in plan).
    pub wall_thickness: f32,
    pub wall_height: f32,
    /// Upper bound on a single frame's `dt`, in seconds.
    pub max_frame_step: f32,
    pub start_position: Vec3,
    /// Maze layout, row-major by z then x. `0` is air, `1` is wall.
    pub grid: Vec<Vec<u8>>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            player_height: 1.6,
            player_radius: 0.3,
            player_speed: 3.0,
            wall_thickness: 2.0,
            wall_height: 5.0,
            max_frame_step: 0.05,
            start_position: Vec3::new(2.0, 1.6, 2.0),
            grid: vec![
                vec![1, 1, 1, 1, 1, 1, 1],
                vec![1, 0, 0, 0, 1, 0, 1],
                vec![1, 0, 1, 0, 1, 0, 1],
                vec![1, 0, 1, 0, 0, 0, 1],
                vec![1, 0, 1, 1, 1, 0, 1],
                vec![1, 0, 0, 0, 0, 0, 1],
                vec![1, 1, 1, 1, 1, 1, 1],
            ],
        }
    }
}

impl SimConfig {
    /// Read and validate a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.player_radius <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "player_radius must be positive, got {}",
                self.player_radius
            )));
        }
        if self.wall_thickness <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "wall_thickness must be positive, got {}",
                self.wall_thickness
            )));
        }
        if self.max_frame_step <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_frame_step must be positive, got {}",
                self.max_frame_step
            )));
        }
        let width = match self.grid.first() {
            Some(row) if !row.is_empty() => row.len(),
            _ => return Err(ConfigError::Invalid("grid is empty".into())),
        };
        if let Some(z) = self.grid.iter().position(|row| row.len() != width) {
            return Err(ConfigError::Invalid(format!(
                "grid row {z} has {} cells, expected {width}",
                self.grid[z].len()
            )));
        }
        Ok(())
    }
}
