//! Renderer port — frame presentation and draw state.

use lua3d_domain::{Color, Geometry, LightIndex, LightProperties};
use std::sync::{Arc, Mutex};

/// Port for the rendering backend.
///
/// Calls are synchronous; any state they change is visible to the next call.
pub trait RendererPort: Send {
    fn begin_frame(&mut self);

    fn clear(&mut self);

    fn end_frame(&mut self);

    fn set_clear_color(&mut self, color: Color);

    /// Submit interleaved position/color triangles for the current frame.
    fn draw_geometry(&mut self, geometry: Geometry);

    fn set_light(&mut self, index: LightIndex, properties: LightProperties);

    fn enable_lighting(&mut self, enabled: bool);
}

/// Renderer shared between the engine loop and the script-facing modules.
pub type SharedRenderer = Arc<Mutex<dyn RendererPort>>;
