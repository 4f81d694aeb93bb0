//! Engine loop configuration from TOML (`[engine]` section)

use super::ConfigValidationError;
use lua3d_domain::Color;
use serde::{Deserialize, Serialize};

/// Raw engine configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    /// Close the headless window after this many presented frames
    pub max_frames: Option<u64>,
    /// Frame rate cap (uncapped when unset)
    pub target_fps: Option<u32>,
    /// Initial clear color as `[r, g, b, a]`
    pub clear_color: [f32; 4],
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        Self {
            max_frames: None,
            target_fps: None,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl FileEngineConfig {
    pub fn clear_color(&self) -> Color {
        let [r, g, b, a] = self.clear_color;
        Color::new(r, g, b, a)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.target_fps == Some(0) {
            return Err(ConfigValidationError::ZeroTargetFps);
        }
        if self.max_frames == Some(0) {
            return Err(ConfigValidationError::ZeroMaxFrames);
        }
        Ok(())
    }
}
