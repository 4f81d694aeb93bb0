//! Scripting host port — interface for the embedded script VM.
//!
//! This port abstracts the scripting host so that:
//! - The engine loop doesn't depend on mlua
//! - A no-op implementation (`NoScriptingHost`) is always available
//! - Tests can drive the loop with a fake host

use lua3d_domain::KeyEvent;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the scripting host.
///
/// `HostInit` is fatal for the process. Source, compile and load failures
/// are recoverable at the call site. Runtime, module and callback errors
/// leave the VM usable for subsequent calls.
#[derive(Error, Debug)]
pub enum ScriptHostError {
    #[error("failed to initialize script VM: {0}")]
    HostInit(String),

    #[error("failed to read script {}: {source}", path.display())]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compile {}: {message}", path.display())]
    Compile { path: PathBuf, message: String },

    #[error("failed to load {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    #[error("no script loaded")]
    NoScriptLoaded,

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("module '{identifier}' not found: {reason}")]
    ModuleNotFound { identifier: String, reason: String },

    #[error("module '{identifier}' failed: {message}")]
    ModuleExecution { identifier: String, message: String },

    #[error("circular require of module '{0}'")]
    CircularRequire(String),

    #[error("module '{0}' is already registered")]
    DuplicateModule(String),

    #[error("callback error: {0}")]
    Callback(String),
}

impl ScriptHostError {
    /// Whether the process must abort when this error is raised.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::HostInit(_))
    }
}

/// Port for the scripting host.
///
/// The engine loop interacts with the VM exclusively through this trait.
/// The infrastructure layer provides the real `LuaScriptingHost`.
pub trait ScriptingHostPort: Send {
    /// Read, compile and load a script without running it.
    ///
    /// On success the script becomes the current script for relative
    /// module resolution.
    fn load_script(&mut self, path: &Path) -> Result<(), ScriptHostError>;

    /// Run the most recently loaded script body.
    fn execute(&mut self) -> Result<(), ScriptHostError>;

    /// Forward a keyboard event to every script callback subscribed to it.
    ///
    /// Failing callbacks are logged and do not stop the dispatch.
    fn dispatch_key_event(&mut self, event: &KeyEvent);

    /// Run the per-frame script hook, if one is registered.
    fn run_pre_render(&mut self, delta_seconds: f64);

    /// Release every script-side reference held by the host.
    fn shutdown(&mut self);
}

/// No-op scripting host used when the engine runs without scripts.
pub struct NoScriptingHost;

impl ScriptingHostPort for NoScriptingHost {
    fn load_script(&mut self, _path: &Path) -> Result<(), ScriptHostError> {
        Ok(())
    }

    fn execute(&mut self) -> Result<(), ScriptHostError> {
        Ok(())
    }

    fn dispatch_key_event(&mut self, _event: &KeyEvent) {}

    fn run_pre_render(&mut self, _delta_seconds: f64) {}

    fn shutdown(&mut self) {}
}
