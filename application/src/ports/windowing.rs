//! Windowing port — window creation and event pumping.

use lua3d_domain::KeyEvent;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors from the windowing collaborator.
#[derive(Error, Debug)]
pub enum WindowError {
    #[error("invalid window size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("window creation failed: {0}")]
    Creation(String),
}

/// Port for the platform window.
pub trait WindowingPort: Send {
    /// Create the window.
    fn initialize(&mut self, title: &str, width: u32, height: u32) -> Result<(), WindowError>;

    /// Whether the window is still open.
    fn is_window_open(&self) -> bool;

    /// Process pending native messages and return the key events they produced.
    fn pump_messages(&mut self) -> Vec<KeyEvent>;
}

/// Window shared between the engine loop and the script-facing modules.
pub type SharedWindow = Arc<Mutex<dyn WindowingPort>>;
