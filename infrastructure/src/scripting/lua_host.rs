//! Main Lua scripting host — owns the VM, the module cache and the
//! registered capability modules.
//!
//! `LuaScriptingHost` implements `ScriptingHostPort` from the application
//! layer, providing the concrete Lua 5.4 runtime backed by mlua.

use lua3d_application::{ScriptHostError, ScriptingHostPort, SharedRenderer, SharedWindow};
use lua3d_domain::KeyEvent;
use mlua::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::engine_api::RenderModule;
use super::export_table::{CapabilityModule, NativeExportTable};
use super::gui_api::InputModule;
use super::module_loader::{DEFAULT_MODULE_EXTENSIONS, ModuleLoader};
use super::sandbox::apply_sandbox;

/// VM setup options.
#[derive(Debug, Clone)]
pub struct HostOptions {
    /// Apply the sandbox (no C modules, no `dofile`/`loadfile`).
    pub sandbox: bool,
    /// Extensions tried for `require` identifiers written without one.
    pub module_extensions: Vec<String>,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            sandbox: true,
            module_extensions: DEFAULT_MODULE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// Lua 5.4 scripting host implementing `ScriptingHostPort`.
///
/// Owns the Lua VM exclusively. Capability modules reach the VM only
/// through the `&Lua` handed to their native functions and event hooks.
pub struct LuaScriptingHost {
    lua: Lua,
    loader: ModuleLoader,
    loaded: Option<LuaRegistryKey>,
    modules: Vec<Arc<dyn CapabilityModule>>,
}

impl LuaScriptingHost {
    /// Create the VM with the standard library and the host `require`.
    pub fn initialize(options: HostOptions) -> Result<Self, ScriptHostError> {
        let lua = Lua::new_with(LuaStdLib::ALL_SAFE, LuaOptions::default()).map_err(init_error)?;

        if options.sandbox {
            apply_sandbox(&lua).map_err(|e| {
                ScriptHostError::HostInit(format!("sandbox setup failed: {}", e))
            })?;
        }

        let loader = ModuleLoader::new(options.module_extensions);
        let require = loader.require_function(&lua).map_err(init_error)?;
        lua.globals().set("require", require).map_err(init_error)?;

        debug!(sandbox = options.sandbox, "Lua VM initialized");
        Ok(Self {
            lua,
            loader,
            loaded: None,
            modules: Vec::new(),
        })
    }

    /// Create a host with the `engine` and `gui` modules registered.
    pub fn with_standard_modules(
        options: HostOptions,
        renderer: SharedRenderer,
        window: SharedWindow,
    ) -> Result<Self, ScriptHostError> {
        let mut host = Self::initialize(options)?;
        host.register_internal_module(Arc::new(RenderModule::new(renderer, window)))?;
        host.register_internal_module(Arc::new(InputModule::new()))?;
        Ok(host)
    }

    /// The underlying VM.
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Read, compile and load a script; it becomes the current script.
    ///
    /// The body is not run until [`execute`](Self::execute).
    pub fn load_script(&mut self, path: &Path) -> Result<(), ScriptHostError> {
        let function = self.loader.compile(&self.lua, path)?;
        let key = self
            .lua
            .create_registry_value(function)
            .map_err(|e| ScriptHostError::Load {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if let Some(previous) = self.loaded.replace(key) {
            let _ = self.lua.remove_registry_value(previous);
        }
        self.loader.set_current_script(path)?;
        debug!("Loaded script {}", path.display());
        Ok(())
    }

    /// Run the most recently loaded script with no arguments.
    ///
    /// The loaded chunk is consumed. A runtime error is returned, and the
    /// VM stays usable.
    pub fn execute(&mut self) -> Result<(), ScriptHostError> {
        let key = self.loaded.take().ok_or(ScriptHostError::NoScriptLoaded)?;
        let function: LuaFunction = self
            .lua
            .registry_value(&key)
            .map_err(runtime_error)?;
        let _ = self.lua.remove_registry_value(key);

        function.call::<()>(()).map_err(runtime_error)
    }

    /// Load and run a file module relative to the current script, without caching.
    pub fn load_module(&self, module_path: &str) -> Result<LuaValue, ScriptHostError> {
        self.loader.load_module(&self.lua, module_path)
    }

    /// Return the cached export of a module, loading it on first use.
    pub fn load_and_cache_module(&self, identifier: &str) -> Result<LuaValue, ScriptHostError> {
        self.loader.load_and_cache_module(&self.lua, identifier)
    }

    /// Publish an export table as a read-only module under its name.
    pub fn register_export_table(&self, table: &NativeExportTable) -> Result<(), ScriptHostError> {
        let namespace = table.to_namespace(&self.lua).map_err(init_error)?;
        self.loader
            .register_internal(&self.lua, table.module_name(), namespace)
    }

    /// Publish a capability module and route host events to it.
    pub fn register_internal_module(
        &mut self,
        module: Arc<dyn CapabilityModule>,
    ) -> Result<(), ScriptHostError> {
        let table = module.exports();
        debug_assert_eq!(table.module_name(), module.module_name());
        self.register_export_table(&table)?;
        info!(
            capability = %module.capability(),
            exports = table.len(),
            "Registered module '{}'",
            module.module_name()
        );
        self.modules.push(module);
        Ok(())
    }

    pub fn is_module_cached(&self, identifier: &str) -> bool {
        self.loader.is_cached(identifier)
    }

    pub fn cached_modules(&self) -> Vec<String> {
        self.loader.cached_modules()
    }

    pub fn current_script(&self) -> Option<PathBuf> {
        self.loader.current_script()
    }

    /// Release every script reference held by the host and its modules.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        for module in self.modules.drain(..) {
            module.release_callbacks(&self.lua);
        }
        if let Some(key) = self.loaded.take() {
            let _ = self.lua.remove_registry_value(key);
        }
        self.loader.clear(&self.lua);
        self.lua.expire_registry_values();
    }
}

impl Drop for LuaScriptingHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl ScriptingHostPort for LuaScriptingHost {
    fn load_script(&mut self, path: &Path) -> Result<(), ScriptHostError> {
        LuaScriptingHost::load_script(self, path).inspect_err(|e| {
            error!("Failed to load script: {}", e);
        })
    }

    fn execute(&mut self) -> Result<(), ScriptHostError> {
        LuaScriptingHost::execute(self).inspect_err(|e| {
            warn!("Script execution failed: {}", e);
        })
    }

    fn dispatch_key_event(&mut self, event: &KeyEvent) {
        for module in &self.modules {
            module.dispatch_key_event(&self.lua, event);
        }
    }

    fn run_pre_render(&mut self, delta_seconds: f64) {
        for module in &self.modules {
            module.run_pre_render(&self.lua, delta_seconds);
        }
    }

    fn shutdown(&mut self) {
        LuaScriptingHost::shutdown(self);
    }
}

fn init_error(e: LuaError) -> ScriptHostError {
    ScriptHostError::HostInit(e.to_string())
}

/// `ScriptHostError::Runtime` adds its own prefix, so keep only the
/// script's message for plain runtime errors.
fn runtime_error(e: LuaError) -> ScriptHostError {
    match e {
        LuaError::RuntimeError(message) => ScriptHostError::Runtime(message),
        other => ScriptHostError::Runtime(other.to_string()),
    }
}
