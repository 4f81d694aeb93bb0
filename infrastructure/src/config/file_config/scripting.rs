//! Scripting configuration from TOML (`[scripting]` section)

use super::ConfigValidationError;
use crate::scripting::DEFAULT_MODULE_EXTENSIONS;
use serde::{Deserialize, Serialize};

/// Raw scripting configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileScriptingConfig {
    /// Entry script, relative to the working directory
    pub entry: String,
    /// Extensions tried, in order, for `require` identifiers without one
    pub module_extensions: Vec<String>,
    /// Block C modules and file loaders that bypass the module cache
    pub sandbox: bool,
}

impl Default for FileScriptingConfig {
    fn default() -> Self {
        Self {
            entry: "main.lua".to_string(),
            module_extensions: DEFAULT_MODULE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            sandbox: true,
        }
    }
}

impl FileScriptingConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.entry.trim().is_empty() {
            return Err(ConfigValidationError::EmptyEntry);
        }
        if self.module_extensions.is_empty() {
            return Err(ConfigValidationError::NoModuleExtensions);
        }
        if let Some(bad) = self
            .module_extensions
            .iter()
            .find(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            return Err(ConfigValidationError::InvalidModuleExtension(bad.clone()));
        }
        Ok(())
    }
}
