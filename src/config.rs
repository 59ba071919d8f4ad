//! Cloner configuration.
//!
//! Host-exposed parameter surface, loadable from human-readable RON
//! files. Defaults match the original tuning.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClonerConfig {
    /// Base scale applied to every instance of the template mesh
    pub template_scale: f32,

    /// How strongly the noise field modulates the instance scale.
    /// The effective scale is unclamped, so large values can mirror
    /// instances through zero.
    pub scale_by_noise: f32,

    /// Spatial frequency of the noise field
    pub noise_frequency: f32,

    /// Velocity of the noise field offset while simulating
    pub noise_motion: [f32; 3],

    /// Orientation blend in [0, 1]: 0 = tangent-aligned, 1 = normal-aligned
    pub normal_modifier: f32,
}

impl Default for ClonerConfig {
    fn default() -> Self {
        Self {
            template_scale: 0.05,
            scale_by_noise: 0.1,
            noise_frequency: 1.0,
            noise_motion: [0.0, 0.25, 0.0],
            normal_modifier: 0.125,
        }
    }
}

impl ClonerConfig {
    pub fn noise_motion_vec(&self) -> glam::Vec3 {
        glam::Vec3::from(self.noise_motion)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&text)?)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClonerConfig::default();
        assert_eq!(config.template_scale, 0.05);
        assert_eq!(config.scale_by_noise, 0.1);
        assert_eq!(config.noise_frequency, 1.0);
        assert_eq!(config.noise_motion, [0.0, 0.25, 0.0]);
        assert_eq!(config.normal_modifier, 0.125);
    }

    #[test]
    fn test_ron_round_trip() {
        let mut config = ClonerConfig::default();
        config.noise_frequency = 2.5;
        config.noise_motion = [0.1, 0.0, -0.3];

        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default()).unwrap();
        let parsed: ClonerConfig = ron::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
