//! View configuration
//!
//! Settings for proximity browsing, layout spacing and the display
//! mode. All structs are serde round-trippable so the host application
//! can persist them; `validate` rejects out-of-range values before they
//! reach the algorithms.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::models::DisplayMode;

/// Largest accepted proximity depth; windows beyond this defeat the
/// point of proximity browsing
pub const MAX_PROXIMITY_DEPTH: u32 = 32;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("proximity depth {0} exceeds maximum {MAX_PROXIMITY_DEPTH}")]
    DepthOutOfRange(u32),

    #[error("visibility threshold must be at least 1")]
    ZeroThreshold,

    #[error("layout spacing must be positive, got {0}")]
    NonPositiveSpacing(f32),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Proximity browsing settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityConfig {
    pub enabled: bool,
    /// How many successor levels stay visible around the anchor set
    pub children_depth: u32,
    /// How many predecessor levels stay visible around the anchor set
    pub parents_depth: u32,
    /// Visibility deltas larger than this need caller confirmation
    pub visibility_threshold: usize,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            children_depth: 2,
            parents_depth: 2,
            visibility_threshold: 300,
        }
    }
}

impl ProximityConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.children_depth > MAX_PROXIMITY_DEPTH {
            return Err(ConfigError::DepthOutOfRange(self.children_depth));
        }
        if self.parents_depth > MAX_PROXIMITY_DEPTH {
            return Err(ConfigError::DepthOutOfRange(self.parents_depth));
        }
        if self.visibility_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        Ok(())
    }
}

/// Spacing hints passed to the layout engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub horizontal_spacing: f32,
    pub vertical_spacing: f32,
    pub default_node_width: f32,
    pub default_node_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_spacing: 80.0,
            vertical_spacing: 60.0,
            default_node_width: 120.0,
            default_node_height: 40.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        for value in [
            self.horizontal_spacing,
            self.vertical_spacing,
            self.default_node_width,
            self.default_node_height,
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositiveSpacing(value));
            }
        }
        Ok(())
    }
}

/// Complete view configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DiffViewConfig {
    pub display_mode: DisplayMode,
    pub proximity: ProximityConfig,
    pub layout: LayoutConfig,
}

impl DiffViewConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.proximity.validate()?;
        self.layout.validate()?;
        Ok(())
    }
}
