//! Application layer for lua3d
//!
//! This crate contains the engine loop use case, port definitions, and
//! application configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::EngineSettings;
pub use ports::{
    renderer::{RendererPort, SharedRenderer},
    scripting_host::{NoScriptingHost, ScriptHostError, ScriptingHostPort},
    windowing::{SharedWindow, WindowError, WindowingPort},
};
pub use use_cases::run_engine::{EngineError, EngineLoop, EngineReport};
