//! Renderer configuration
//!
//! All tunable constants of the renderer in one serializable structure.
//! Defaults reproduce the values the pipelines were designed around; a TOML
//! file can override any subset of them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("can't read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this structure
    #[error("can't parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value the renderer cannot work with
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Top-level renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Output surface width in pixels
    pub screen_width: u32,
    /// Output surface height in pixels
    pub screen_height: u32,

    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near clipping plane distance
    pub near_clip: f32,
    /// Far clipping plane distance
    pub far_clip: f32,

    /// Exponential fog density used by fog-enabled shader variants
    pub fog_density: f32,

    /// Distance beyond chunk/quadrant bounds at which they stay visible
    pub visibility_distance: f32,

    /// Power of the single point light, drives the light volume radius
    pub point_light_power: f32,

    /// Glitter material alpha, x and y components
    pub glitter_material_alpha: [f32; 2],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            screen_width: 1280,
            screen_height: 720,
            fov_degrees: 45.0,
            near_clip: 0.5,
            far_clip: 125.0,
            fog_density: 0.04,
            visibility_distance: 60.0,
            point_light_power: 50.0,
            glitter_material_alpha: [0.1, 0.1],
        }
    }
}

impl RendererConfig {
    /// Load a configuration from a TOML file, filling omitted fields
    /// with defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Aspect ratio of the output surface
    pub fn screen_ratio(&self) -> f32 {
        self.screen_width as f32 / self.screen_height as f32
    }

    /// Check value ranges the pipelines rely on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(ConfigError::Invalid(
                "screen dimensions must be non-zero".to_string(),
            ));
        }
        if self.near_clip <= 0.0 || self.far_clip <= self.near_clip {
            return Err(ConfigError::Invalid(
                "clip planes must satisfy 0 < near < far".to_string(),
            ));
        }
        if self.visibility_distance < 0.0 {
            return Err(ConfigError::Invalid(
                "visibility distance must be non-negative".to_string(),
            ));
        }
        if self.point_light_power <= 0.0 {
            return Err(ConfigError::Invalid(
                "point light power must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RendererConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let config: RendererConfig =
            toml::from_str("screen_width = 1920\nscreen_height = 1080\nfog_density = 0.1")
                .expect("valid TOML");

        assert_eq!(config.screen_width, 1920);
        assert_eq!(config.screen_height, 1080);
        assert!((config.fog_density - 0.1).abs() < f32::EPSILON);
        // Untouched fields keep defaults
        assert!((config.far_clip - 125.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_clip_planes_rejected() {
        let config = RendererConfig {
            near_clip: 10.0,
            far_clip: 5.0,
            ..RendererConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
