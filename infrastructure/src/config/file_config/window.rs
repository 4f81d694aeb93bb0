//! Window configuration from TOML (`[window]` section)

use super::ConfigValidationError;
use serde::{Deserialize, Serialize};

/// Raw window configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWindowConfig {
    /// Window title
    pub title: String,
    /// Client area width in pixels
    pub width: u32,
    /// Client area height in pixels
    pub height: u32,
}

impl Default for FileWindowConfig {
    fn default() -> Self {
        Self {
            title: "lua3d".to_string(),
            width: 800,
            height: 600,
        }
    }
}

impl FileWindowConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigValidationError::InvalidWindowSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}
