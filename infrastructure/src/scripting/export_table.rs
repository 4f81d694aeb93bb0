//! Native export tables and the capability module protocol.
//!
//! A capability module describes its script surface as an ordered list of
//! `(name, native function)` pairs. The scripting host turns that list into
//! a read-only namespace table and caches it under the module name, so
//! scripts reach native modules through the same `require` as file modules:
//!
//! ```lua
//! local engine = require("engine")
//! engine.setClearColor(0.1, 0.1, 0.2)
//! ```

use lua3d_domain::{Capability, KeyEvent};
use mlua::prelude::*;
use mlua::{FromLuaMulti, IntoLuaMulti};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A host function callable from scripts.
///
/// Receives the raw call arguments and returns the values pushed back to
/// the caller. Argument validation is the function's own job.
pub type NativeFunction =
    Arc<dyn Fn(&Lua, LuaMultiValue) -> LuaResult<LuaMultiValue> + Send + Sync>;

/// One `(name, function)` entry of an export table.
#[derive(Clone)]
pub struct NativeExport {
    name: &'static str,
    function: NativeFunction,
}

impl NativeExport {
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Ordered, immutable description of a module's native surface.
#[derive(Clone)]
pub struct NativeExportTable {
    module_name: String,
    exports: Vec<NativeExport>,
}

/// Read-only view of a module's exports handed to scripts.
///
/// A userdata rather than a table, so neither `rawset` nor the values
/// returned by `pairs` give scripts a way to reach the backing table.
struct Namespace {
    name: String,
    exports: LuaTable,
}

impl LuaUserData for Namespace {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(LuaMetaMethod::Index, |_, this, key: LuaValue| {
            this.exports.raw_get::<LuaValue>(key)
        });

        methods.add_meta_method(
            LuaMetaMethod::NewIndex,
            |_, this, (key, _): (LuaValue, LuaValue)| -> LuaResult<()> {
                Err(LuaError::RuntimeError(format!(
                    "module '{}' is read-only (attempt to set '{}')",
                    this.name,
                    key.to_string()?
                )))
            },
        );

        // The iterator walks a snapshot, so the table itself never leaves Rust
        methods.add_meta_method(LuaMetaMethod::Pairs, |lua, this, ()| {
            let entries = this
                .exports
                .pairs::<LuaValue, LuaValue>()
                .collect::<LuaResult<Vec<_>>>()?;
            let cursor = AtomicUsize::new(0);
            let next = lua.create_function(move |_, ()| {
                let index = cursor.fetch_add(1, Ordering::Relaxed);
                Ok(entries
                    .get(index)
                    .cloned()
                    .unwrap_or((LuaValue::Nil, LuaValue::Nil)))
            })?;
            Ok((next, LuaValue::Nil, LuaValue::Nil))
        });

        methods.add_meta_method(LuaMetaMethod::Len, |_, this, ()| Ok(this.exports.raw_len()));

        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
            Ok(format!("module '{}'", this.name))
        });
    }
}

impl NativeExportTable {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            exports: Vec::new(),
        }
    }

    /// Append a typed native function.
    ///
    /// Arguments are converted from the script call before `function` runs;
    /// a conversion failure is raised to the script as an error naming the
    /// export.
    pub fn with_function<A, R, F>(mut self, name: &'static str, function: F) -> Self
    where
        A: FromLuaMulti,
        R: IntoLuaMulti,
        F: Fn(&Lua, A) -> LuaResult<R> + Send + Sync + 'static,
    {
        debug_assert!(
            self.exports.iter().all(|e| e.name != name),
            "duplicate export '{}' in module '{}'",
            name,
            self.module_name
        );
        let module = self.module_name.clone();
        let function: NativeFunction = Arc::new(move |lua: &Lua, args: LuaMultiValue| {
            let args = A::from_lua_multi(args, lua).map_err(|e| {
                LuaError::RuntimeError(format!("bad arguments to '{}.{}': {}", module, name, e))
            })?;
            function(lua, args)?.into_lua_multi(lua)
        });
        self.exports.push(NativeExport { name, function });
        self
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn exports(&self) -> &[NativeExport] {
        &self.exports
    }

    /// Export names in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.exports.iter().map(|e| e.name).collect()
    }

    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }

    /// Build the read-only namespace scripts receive from `require`.
    pub fn to_namespace(&self, lua: &Lua) -> LuaResult<LuaAnyUserData> {
        let exports = lua.create_table_with_capacity(0, self.exports.len())?;
        for export in &self.exports {
            let function = Arc::clone(&export.function);
            let lua_fn = lua.create_function(move |lua, args: LuaMultiValue| function(lua, args))?;
            exports.raw_set(export.name, lua_fn)?;
        }

        lua.create_userdata(Namespace {
            name: self.module_name.clone(),
            exports,
        })
    }
}

impl std::fmt::Debug for NativeExportTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeExportTable")
            .field("module_name", &self.module_name)
            .field("exports", &self.names())
            .finish()
    }
}

/// A host component that publishes a native module into the VM.
///
/// Besides its export table, a module may react to host events by invoking
/// script callbacks it has stored; the host forwards events to every
/// registered module.
pub trait CapabilityModule: Send + Sync {
    fn capability(&self) -> Capability;

    /// Name scripts pass to `require`.
    fn module_name(&self) -> &'static str;

    fn exports(&self) -> NativeExportTable;

    fn dispatch_key_event(&self, _lua: &Lua, _event: &KeyEvent) {}

    fn run_pre_render(&self, _lua: &Lua, _delta_seconds: f64) {}

    /// Drop every callback reference the module holds.
    fn release_callbacks(&self, _lua: &Lua) {}
}
