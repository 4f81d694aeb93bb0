//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into application settings
//! once validated.

mod engine;
mod logging;
mod scripting;
mod window;

pub use engine::FileEngineConfig;
pub use logging::FileLoggingConfig;
pub use scripting::FileScriptingConfig;
pub use window::FileWindowConfig;

use crate::scripting::HostOptions;
use lua3d_application::EngineSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("window size must be non-zero, got {width}x{height}")]
    InvalidWindowSize { width: u32, height: u32 },

    #[error("engine.target_fps cannot be 0")]
    ZeroTargetFps,

    #[error("engine.max_frames cannot be 0 (leave it unset to run until closed)")]
    ZeroMaxFrames,

    #[error("scripting.entry cannot be empty")]
    EmptyEntry,

    #[error("scripting.module_extensions cannot be empty")]
    NoModuleExtensions,

    #[error("invalid module extension '{0}' (write it without a leading dot)")]
    InvalidModuleExtension(String),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Window settings
    pub window: FileWindowConfig,
    /// Entry script and module resolution
    pub scripting: FileScriptingConfig,
    /// Engine loop settings
    pub engine: FileEngineConfig,
    /// Log file settings
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the configuration, reporting the first problem found.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.window.validate()?;
        self.scripting.validate()?;
        self.engine.validate()?;
        Ok(())
    }

    /// Engine loop settings for the application layer.
    pub fn to_engine_settings(&self) -> EngineSettings {
        EngineSettings::new(&self.window.title, self.window.width, self.window.height)
            .with_target_fps(self.engine.target_fps)
            .with_clear_color(self.engine.clear_color())
    }

    /// VM options for the scripting host.
    pub fn to_host_options(&self) -> HostOptions {
        HostOptions {
            sandbox: self.scripting.sandbox,
            module_extensions: self.scripting.module_extensions.clone(),
        }
    }

    /// Render the effective configuration as TOML (for `--show-config`).
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
