use lua3d_application::{WindowError, WindowingPort};
use lua3d_domain::KeyEvent;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::info;

/// Closes a [`HeadlessWindow`] from another thread.
#[derive(Debug, Clone, Default)]
pub struct CloseHandle(Arc<AtomicBool>);

impl CloseHandle {
    pub fn close(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Number of frames presented, shared between a renderer and a window.
#[derive(Debug, Clone, Default)]
pub struct FrameCounter(Arc<AtomicU64>);

impl FrameCounter {
    /// Record one presented frame and return the new total.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// A window with no surface.
///
/// Open from `initialize` until closed through its handle or until the
/// frame counter reaches the frame limit. The limit counts presented
/// frames, so it also ends loops a script drives itself through
/// `engine.present()`.
#[derive(Debug, Default)]
pub struct HeadlessWindow {
    title: String,
    size: (u32, u32),
    initialized: bool,
    closed: CloseHandle,
    max_frames: Option<u64>,
    frames: FrameCounter,
    pending: VecDeque<KeyEvent>,
}

impl HeadlessWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the window once `frames` reaches `max_frames`.
    ///
    /// Pass the counter the renderer advances on every presented frame.
    pub fn with_frame_limit(mut self, max_frames: Option<u64>, frames: FrameCounter) -> Self {
        self.max_frames = max_frames;
        self.frames = frames;
        self
    }

    pub fn close_handle(&self) -> CloseHandle {
        self.closed.clone()
    }

    /// Queue a key event for the next pump.
    pub fn push_key_event(&mut self, event: KeyEvent) {
        self.pending.push_back(event);
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    fn frame_limit_reached(&self) -> bool {
        self.max_frames.is_some_and(|max| self.frames.get() >= max)
    }
}

impl WindowingPort for HeadlessWindow {
    fn initialize(&mut self, title: &str, width: u32, height: u32) -> Result<(), WindowError> {
        if width == 0 || height == 0 {
            return Err(WindowError::InvalidSize { width, height });
        }
        self.title = title.to_string();
        self.size = (width, height);
        self.initialized = true;
        info!("Headless window '{}' opened ({}x{})", title, width, height);
        Ok(())
    }

    fn is_window_open(&self) -> bool {
        self.initialized && !self.closed.is_closed() && !self.frame_limit_reached()
    }

    fn pump_messages(&mut self) -> Vec<KeyEvent> {
        if !self.is_window_open() {
            return Vec::new();
        }
        self.pending.drain(..).collect()
    }
}
