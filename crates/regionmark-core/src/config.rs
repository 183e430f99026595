//! Engine tuning parameters.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Default lower zoom bound.
pub const DEFAULT_MIN_SCALE: f64 = 0.1;
/// Default upper zoom bound.
pub const DEFAULT_MAX_SCALE: f64 = 5.0;
/// Default multiplicative step per wheel notch.
pub const DEFAULT_ZOOM_FACTOR: f64 = 1.1;

/// Configuration for an [`Engine`](crate::engine::Engine).
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum viewport scale.
    pub min_scale: f64,
    /// Maximum viewport scale.
    pub max_scale: f64,
    /// Scale multiplier applied per zoom step.
    pub zoom_factor: f64,
    /// Minimum shape size during resize, in image pixels (`min_resize_size * scale` on screen).
    pub min_resize_size: f64,
    /// Handle hit radius in screen pixels.
    pub handle_hit_tolerance: f64,
    /// Maximum pointer travel (screen pixels) for a press+release to count as a click.
    pub click_tolerance: f64,
    /// Number of undo snapshots kept for the marker collection.
    pub undo_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            zoom_factor: DEFAULT_ZOOM_FACTOR,
            min_resize_size: 5.0,
            handle_hit_tolerance: 8.0,
            click_tolerance: 3.0,
            undo_limit: 50,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a config from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config to JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the config for values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "min_scale must be positive, got {}",
                self.min_scale
            )));
        }
        if self.max_scale < self.min_scale {
            return Err(ConfigError::Invalid(format!(
                "max_scale ({}) is below min_scale ({})",
                self.max_scale, self.min_scale
            )));
        }
        if !(self.zoom_factor > 1.0) {
            return Err(ConfigError::Invalid(format!(
                "zoom_factor must be greater than 1, got {}",
                self.zoom_factor
            )));
        }
        if self.min_resize_size < 0.0
            || self.handle_hit_tolerance < 0.0
            || self.click_tolerance < 0.0
        {
            return Err(ConfigError::Invalid(
                "sizes and tolerances must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
