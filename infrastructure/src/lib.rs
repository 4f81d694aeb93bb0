//! Infrastructure layer for lua3d
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the mlua-backed scripting host with its
//! capability modules, headless window and renderer collaborators, and
//! configuration file loading.

pub mod config;
pub mod headless;
pub mod scripting;

// Re-export commonly used types
pub use config::{ConfigError, ConfigLoader, ConfigValidationError, FileConfig};
pub use headless::{CloseHandle, FrameCounter, FrameStats, HeadlessRenderer, HeadlessWindow};
pub use scripting::{
    CallbackHandle, CapabilityModule, HostOptions, InputModule, LuaScriptingHost,
    NativeExportTable, RenderModule,
};
