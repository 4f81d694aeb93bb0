//! Domain layer for lua3d
//!
//! This crate contains the engine's value types. It has no dependencies on
//! the Lua VM, windowing or rendering backends.
//!
//! # Core Concepts
//!
//! ## Capabilities
//!
//! Host feature areas (rendering, input) are published into the script
//! namespace as native modules that scripts reach through `require`.
//!
//! ## Engine lifecycle
//!
//! The engine loop moves through `Uninitialized -> Initialized -> Running -> Stopped`.

pub mod core;
pub mod render;
pub mod scripting;

// Re-export commonly used types
pub use core::engine_state::EngineState;
pub use render::{
    Color, Geometry, LightIndex, LightProperties, MAX_LIGHT_INDEX, RenderDataError, VERTEX_STRIDE,
};
pub use scripting::{Capability, KeyAction, KeyEvent, ModuleId};
