//! Script callback registry.
//!
//! Stores Lua callbacks as `LuaRegistryKey` references in registration
//! order. Every registration yields a `CallbackHandle` that scripts can
//! later pass back to unsubscribe.
//!
//! A registry is either multi-subscriber (keyboard callbacks: appended,
//! all invoked) or single-subscriber (per-frame hook: a new registration
//! replaces the previous one).
//!
//! Dispatch isolates failures: a callback that raises is logged and the
//! remaining callbacks still run.

use lua3d_application::ScriptHostError;
use mlua::prelude::*;
use mlua::IntoLuaMulti;
use std::sync::Mutex;
use tracing::{trace, warn};

/// Token identifying one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackHandle(u64);

impl CallbackHandle {
    pub fn from_id(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// How many callbacks a registry retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberMode {
    /// Every registration is kept, invoked in registration order.
    Multi,
    /// Only the latest registration is kept.
    Single,
}

/// Ordered storage of script callbacks for one event source.
pub struct CallbackRegistry {
    label: &'static str,
    mode: SubscriberMode,
    entries: Vec<(CallbackHandle, LuaRegistryKey)>,
    next_id: u64,
}

impl CallbackRegistry {
    pub fn new(label: &'static str, mode: SubscriberMode) -> Self {
        Self {
            label,
            mode,
            entries: Vec::new(),
            next_id: 1,
        }
    }

    pub fn multi(label: &'static str) -> Self {
        Self::new(label, SubscriberMode::Multi)
    }

    pub fn single(label: &'static str) -> Self {
        Self::new(label, SubscriberMode::Single)
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn mode(&self) -> SubscriberMode {
        self.mode
    }

    /// Store a callback, replacing the current one in single-subscriber mode.
    pub fn register(&mut self, lua: &Lua, callback: LuaFunction) -> LuaResult<CallbackHandle> {
        let key = lua.create_registry_value(callback)?;
        let handle = CallbackHandle(self.next_id);
        self.next_id += 1;

        if self.mode == SubscriberMode::Single {
            for (_, old) in self.entries.drain(..) {
                lua.remove_registry_value(old)?;
            }
        }
        self.entries.push((handle, key));
        trace!(registry = self.label, handle = handle.id(), "Registered callback");
        Ok(handle)
    }

    /// Remove a registration. Returns `false` if the handle is unknown.
    pub fn unregister(&mut self, lua: &Lua, handle: CallbackHandle) -> LuaResult<bool> {
        match self.entries.iter().position(|(h, _)| *h == handle) {
            Some(index) => {
                let (_, key) = self.entries.remove(index);
                lua.remove_registry_value(key)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn handles(&self) -> Vec<CallbackHandle> {
        self.entries.iter().map(|(h, _)| *h).collect()
    }

    /// Resolve every stored reference to its function, in registration order.
    pub fn snapshot(&self, lua: &Lua) -> LuaResult<Vec<(CallbackHandle, LuaFunction)>> {
        self.entries
            .iter()
            .map(|(handle, key)| Ok((*handle, lua.registry_value::<LuaFunction>(key)?)))
            .collect()
    }

    /// Release every stored reference.
    pub fn clear(&mut self, lua: &Lua) {
        for (handle, key) in self.entries.drain(..) {
            if let Err(e) = lua.remove_registry_value(key) {
                warn!(
                    registry = self.label,
                    handle = handle.id(),
                    "Failed to release callback: {}",
                    e
                );
            }
        }
    }
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub invoked: usize,
    pub failed: usize,
}

/// Invoke every callback in `registry` with `args`.
///
/// The registry lock is released before any callback runs, so callbacks
/// may register or unregister callbacks on the same registry. Changes take
/// effect on the next dispatch.
pub fn dispatch<A>(
    registry: &Mutex<CallbackRegistry>,
    lua: &Lua,
    args: A,
) -> Result<DispatchReport, ScriptHostError>
where
    A: IntoLuaMulti + Clone,
{
    let (label, callbacks) = {
        let registry = registry
            .lock()
            .map_err(|e| ScriptHostError::Callback(format!("callback registry lock poisoned: {}", e)))?;
        let callbacks = registry
            .snapshot(lua)
            .map_err(|e| ScriptHostError::Callback(e.to_string()))?;
        (registry.label(), callbacks)
    };

    let mut report = DispatchReport::default();
    for (handle, callback) in callbacks {
        report.invoked += 1;
        if let Err(e) = callback.call::<()>(args.clone()) {
            report.failed += 1;
            warn!(
                registry = label,
                handle = handle.id(),
                "Error in {} callback: {}",
                label,
                e
            );
        }
    }
    Ok(report)
}
