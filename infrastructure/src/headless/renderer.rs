use lua3d_application::RendererPort;
use lua3d_domain::{Color, Geometry, LightIndex, LightProperties, MAX_LIGHT_INDEX};
use tracing::trace;

use super::window::FrameCounter;

/// What a [`HeadlessRenderer`] has been asked to do so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    pub frames_begun: u64,
    pub frames_ended: u64,
    pub clears: u64,
    pub clear_color: Color,
    pub draw_calls: u64,
    pub vertices_submitted: u64,
    /// Light slot states, indexed by light number.
    pub lights: Vec<Option<LightProperties>>,
    pub lighting_enabled: bool,
}

/// Renderer that records calls instead of drawing.
#[derive(Debug)]
pub struct HeadlessRenderer {
    stats: FrameStats,
    frames: FrameCounter,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self {
            stats: FrameStats {
                lights: vec![None; MAX_LIGHT_INDEX + 1],
                ..Default::default()
            },
            frames: FrameCounter::default(),
        }
    }

    /// Advance `frames` on every `end_frame`.
    pub fn with_frame_counter(mut self, frames: FrameCounter) -> Self {
        self.frames = frames;
        self
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererPort for HeadlessRenderer {
    fn begin_frame(&mut self) {
        self.stats.frames_begun += 1;
    }

    fn clear(&mut self) {
        self.stats.clears += 1;
    }

    fn end_frame(&mut self) {
        self.stats.frames_ended += 1;
        self.frames.advance();
        trace!(frame = self.stats.frames_ended, "Frame presented");
    }

    fn set_clear_color(&mut self, color: Color) {
        self.stats.clear_color = color;
    }

    fn draw_geometry(&mut self, geometry: Geometry) {
        self.stats.draw_calls += 1;
        self.stats.vertices_submitted += geometry.vertex_count() as u64;
    }

    fn set_light(&mut self, index: LightIndex, properties: LightProperties) {
        trace!(light = index.get(), "Light updated");
        self.stats.lights[index.get()] = Some(properties);
    }

    fn enable_lighting(&mut self, enabled: bool) {
        self.stats.lighting_enabled = enabled;
    }
}
