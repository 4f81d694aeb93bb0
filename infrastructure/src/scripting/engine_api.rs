//! `engine` module — rendering capability exposed to scripts.
//!
//! ```lua
//! local engine = require("engine")
//! engine.setClearColor(0.1, 0.1, 0.2)
//! engine.onPreRender(function(dt)
//!     engine.drawGeometry(triangle)
//! end)
//! while engine.isRunning() do
//!     engine.present()
//! end
//! ```

use lua3d_application::{SharedRenderer, SharedWindow};
use lua3d_domain::{Capability, Color, Geometry, LightIndex, LightProperties};
use mlua::prelude::*;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{trace, warn};

use super::callback_registry::{CallbackHandle, CallbackRegistry, dispatch};
use super::export_table::{CapabilityModule, NativeExportTable};

/// Delta time reported before the first tick.
pub const DEFAULT_DELTA_SECONDS: f64 = 1.0 / 60.0;

/// Rendering capability module.
///
/// Forwards draw state to the renderer and holds the single pre-render
/// hook, invoked once per tick with the tick's delta time.
pub struct RenderModule {
    renderer: SharedRenderer,
    window: SharedWindow,
    delta_seconds: Arc<Mutex<f64>>,
    pre_render: Arc<Mutex<CallbackRegistry>>,
}

impl RenderModule {
    pub fn new(renderer: SharedRenderer, window: SharedWindow) -> Self {
        Self {
            renderer,
            window,
            delta_seconds: Arc::new(Mutex::new(DEFAULT_DELTA_SECONDS)),
            pre_render: Arc::new(Mutex::new(CallbackRegistry::single("pre_render"))),
        }
    }

    /// Whether a pre-render hook is installed.
    pub fn has_pre_render_hook(&self) -> bool {
        self.pre_render
            .lock()
            .map(|registry| !registry.is_empty())
            .unwrap_or(false)
    }
}

fn lock<'a, T: ?Sized>(mutex: &'a Mutex<T>, what: &str) -> LuaResult<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| LuaError::external(format!("{} lock poisoned", what)))
}

fn light_properties(props: &LuaTable) -> LuaResult<LightProperties> {
    let properties = LightProperties {
        position: props.get("position")?,
        ambient: props.get("ambient")?,
        diffuse: props.get("diffuse")?,
        specular: props.get("specular")?,
        spot_direction: props.get("spotDirection")?,
        spot_exponent: props.get("spotExponent")?,
        spot_cutoff: props.get("spotCutoff")?,
        constant_attenuation: props.get("constantAttenuation")?,
        linear_attenuation: props.get("linearAttenuation")?,
        quadratic_attenuation: props.get("quadraticAttenuation")?,
    };
    properties.validate().map_err(LuaError::external)?;
    Ok(properties)
}

impl CapabilityModule for RenderModule {
    fn capability(&self) -> Capability {
        Capability::Rendering
    }

    fn module_name(&self) -> &'static str {
        "engine"
    }

    fn exports(&self) -> NativeExportTable {
        let renderer = self.renderer.clone();
        let set_clear_color = move |_: &Lua, (r, g, b, a): (f32, f32, f32, Option<f32>)| -> LuaResult<()> {
            let color = Color::new(r, g, b, a.unwrap_or(1.0));
            lock(&renderer, "renderer")?.set_clear_color(color);
            Ok(())
        };

        let delta = Arc::clone(&self.delta_seconds);
        let get_delta_time = move |_: &Lua, ()| -> LuaResult<f64> { Ok(*lock(&delta, "delta time")?) };

        let window = self.window.clone();
        let is_running =
            move |_: &Lua, ()| -> LuaResult<bool> { Ok(lock(&window, "window")?.is_window_open()) };

        let renderer = self.renderer.clone();
        let present = move |_: &Lua, ()| -> LuaResult<()> {
            let mut renderer = lock(&renderer, "renderer")?;
            renderer.begin_frame();
            renderer.clear();
            renderer.end_frame();
            Ok(())
        };

        let renderer = self.renderer.clone();
        let draw_geometry = move |_: &Lua, vertices: Vec<f32>| -> LuaResult<()> {
            let geometry = Geometry::new(vertices).map_err(LuaError::external)?;
            trace!(vertices = geometry.vertex_count(), "drawGeometry");
            lock(&renderer, "renderer")?.draw_geometry(geometry);
            Ok(())
        };

        let renderer = self.renderer.clone();
        let set_light = move |_: &Lua, (index, props): (i64, LuaTable)| -> LuaResult<()> {
            let index = LightIndex::new(index).map_err(LuaError::external)?;
            let properties = light_properties(&props)?;
            lock(&renderer, "renderer")?.set_light(index, properties);
            Ok(())
        };

        let renderer = self.renderer.clone();
        let enable_lighting = move |_: &Lua, enabled: bool| -> LuaResult<()> {
            lock(&renderer, "renderer")?.enable_lighting(enabled);
            Ok(())
        };

        let hooks = Arc::clone(&self.pre_render);
        let on_pre_render = move |lua: &Lua, callback: LuaFunction| -> LuaResult<u64> {
            let handle = lock(&hooks, "pre-render hook")?.register(lua, callback)?;
            Ok(handle.id())
        };

        let hooks = Arc::clone(&self.pre_render);
        let remove_pre_render = move |lua: &Lua, handle: u64| -> LuaResult<bool> {
            lock(&hooks, "pre-render hook")?.unregister(lua, CallbackHandle::from_id(handle))
        };

        NativeExportTable::new(self.module_name())
            .with_function("setClearColor", set_clear_color)
            .with_function("getDeltaTime", get_delta_time)
            .with_function("isRunning", is_running)
            .with_function("present", present)
            .with_function("drawGeometry", draw_geometry)
            .with_function("setLight", set_light)
            .with_function("enableLighting", enable_lighting)
            .with_function("onPreRender", on_pre_render)
            .with_function("removePreRender", remove_pre_render)
    }

    fn run_pre_render(&self, lua: &Lua, delta_seconds: f64) {
        match self.delta_seconds.lock() {
            Ok(mut delta) => *delta = delta_seconds,
            Err(_) => warn!("delta time lock poisoned"),
        }
        if let Err(e) = dispatch(&self.pre_render, lua, delta_seconds) {
            warn!("Pre-render dispatch failed: {}", e);
        }
    }

    fn release_callbacks(&self, lua: &Lua) {
        if let Ok(mut hooks) = self.pre_render.lock() {
            hooks.clear(lua);
        }
    }
}
