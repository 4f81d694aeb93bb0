//! Headless windowing and rendering collaborators.
//!
//! No platform window or GPU is involved: the window stays open until it is
//! closed through its [`CloseHandle`] or the renderer has presented its
//! frame limit, and the renderer records what it was asked to do.

mod renderer;
mod window;

pub use renderer::{FrameStats, HeadlessRenderer};
pub use window::{CloseHandle, FrameCounter, HeadlessWindow};
