//! Configuration file loading for lua3d
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `LUA3D_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./lua3d.toml` or `./.lua3d.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/lua3d/config.toml`
//! 5. Default values
//!
//! Command-line flags are applied on top by the binary.

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileEngineConfig, FileLoggingConfig, FileScriptingConfig,
    FileWindowConfig,
};
pub use loader::{ConfigError, ConfigLoader};
