//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! [data]
//! folder = "/data/maps/office"
//! pose_file = "pose.csv"
//! scan_extension = "pcd"
//!
//! [frame]
//! base_frame = "map"
//!
//! [selection]
//! initial_mode = "target"
//!
//! [markers]
//! namespace = "map_optimizer"
//! default_length = 0.5
//! width = 0.5
//! color = [0.0, 1.0, 0.0, 0.5]
//!
//! [handle]
//! name = "se2_controller"
//! description = "SE2 interactive controller"
//! scale = 10.0
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::io::messages::SelectionMode;
use crate::store::{LoaderConfig, MarkerStyle};

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: LoaderConfig,
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub markers: MarkerStyle,
    #[serde(default)]
    pub handle: HandleConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Frame label on every outgoing message.
    pub base_frame: String,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            base_frame: "map".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct SelectionConfig {
    /// Mode at startup.
    pub initial_mode: SelectionMode,
}

/// Interactive handle settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HandleConfig {
    /// Name the viewer knows the handle by; feedback for other names is ignored.
    pub name: String,
    pub description: String,
    /// Handle size in the viewer.
    pub scale: f32,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            name: "se2_controller".to_string(),
            description: "SE2 interactive controller".to_string(),
            scale: 10.0,
        }
    }
}

impl Config {
    /// Parse from TOML text and validate.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject values no viewer can render.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame.base_frame.trim().is_empty() {
            return Err(ConfigError::Invalid("frame.base_frame is empty".to_string()));
        }
        if self.handle.name.trim().is_empty() {
            return Err(ConfigError::Invalid("handle.name is empty".to_string()));
        }
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.markers.default_length) {
            return Err(ConfigError::Invalid(format!(
                "markers.default_length must be positive, got {}",
                self.markers.default_length
            )));
        }
        if !positive(self.markers.width) {
            return Err(ConfigError::Invalid(format!(
                "markers.width must be positive, got {}",
                self.markers.width
            )));
        }
        if !positive(self.handle.scale) {
            return Err(ConfigError::Invalid(format!(
                "handle.scale must be positive, got {}",
                self.handle.scale
            )));
        }
        if self.markers.color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(ConfigError::Invalid(
                "markers.color components must be in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}
