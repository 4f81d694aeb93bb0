//! Scripting domain types
//!
//! Defines the capability kinds, input events and module identifiers shared
//! between the engine loop and the Lua scripting host. These types are
//! VM-agnostic; the actual Lua runtime lives in the infrastructure layer
//! behind `ScriptingHostPort`.

use serde::{Deserialize, Serialize};

/// A host feature area that can be published into the script namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Frame presentation, clear color, geometry and lighting.
    Rendering,
    /// Keyboard registration and dispatch.
    Input,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rendering => "rendering",
            Self::Input => "input",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a key went down or came back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
}

impl KeyAction {
    /// Name passed to Lua keyboard callbacks (`"press"` / `"release"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Press => "press",
            Self::Release => "release",
        }
    }
}

impl std::str::FromStr for KeyAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "press" => Ok(Self::Press),
            "release" => Ok(Self::Release),
            other => Err(format!("unknown key action: '{}'", other)),
        }
    }
}

impl std::fmt::Display for KeyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A keyboard event produced by the windowing collaborator.
///
/// Key names are normalized to lowercase so scripts can compare them
/// without caring about the platform's key naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    key: String,
    action: KeyAction,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, action: KeyAction) -> Self {
        Self {
            key: key.into().to_lowercase(),
            action,
        }
    }

    pub fn press(key: impl Into<String>) -> Self {
        Self::new(key, KeyAction::Press)
    }

    pub fn release(key: impl Into<String>) -> Self {
        Self::new(key, KeyAction::Release)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn action(&self) -> KeyAction {
        self.action
    }
}

/// How a `require` identifier should be interpreted.
///
/// Native module names are matched exactly against registered names;
/// everything else is a path relative to the requiring script.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleId {
    /// A module registered from a native export table (e.g. `"engine"`).
    Internal(String),
    /// A file-backed module, keyed by its resolved path.
    File(std::path::PathBuf),
}

impl ModuleId {
    /// Key under which the module is stored in the module cache.
    pub fn cache_key(&self) -> String {
        match self {
            Self::Internal(name) => name.clone(),
            Self::File(path) => path.to_string_lossy().into_owned(),
        }
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Internal(name) => write!(f, "{}", name),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}
