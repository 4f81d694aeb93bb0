//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod renderer;
pub mod scripting_host;
pub mod windowing;
