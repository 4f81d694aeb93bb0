//! `gui` module — keyboard input capability exposed to scripts.
//!
//! ```lua
//! local gui = require("gui")
//! local handle = gui.registerKeyboardCallback(function(key, action)
//!     if key == "escape" and action == "press" then ... end
//! end)
//! gui.unregisterKeyboardCallback(handle)
//! ```

use lua3d_domain::{Capability, KeyEvent};
use mlua::prelude::*;
use std::sync::{Arc, Mutex};
use tracing::{trace, warn};

use super::callback_registry::{CallbackHandle, CallbackRegistry, dispatch};
use super::export_table::{CapabilityModule, NativeExportTable};

/// Input capability module holding the keyboard callbacks.
pub struct InputModule {
    keyboard: Arc<Mutex<CallbackRegistry>>,
}

impl InputModule {
    pub fn new() -> Self {
        Self {
            keyboard: Arc::new(Mutex::new(CallbackRegistry::multi("keyboard"))),
        }
    }

    pub fn callback_count(&self) -> usize {
        self.keyboard.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Default for InputModule {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityModule for InputModule {
    fn capability(&self) -> Capability {
        Capability::Input
    }

    fn module_name(&self) -> &'static str {
        "gui"
    }

    fn exports(&self) -> NativeExportTable {
        let keyboard = Arc::clone(&self.keyboard);
        let register = move |lua: &Lua, callback: LuaFunction| -> LuaResult<u64> {
            let mut registry = keyboard
                .lock()
                .map_err(|_| LuaError::external("keyboard callback lock poisoned"))?;
            Ok(registry.register(lua, callback)?.id())
        };

        let keyboard = Arc::clone(&self.keyboard);
        let unregister = move |lua: &Lua, handle: u64| -> LuaResult<bool> {
            let mut registry = keyboard
                .lock()
                .map_err(|_| LuaError::external("keyboard callback lock poisoned"))?;
            registry.unregister(lua, CallbackHandle::from_id(handle))
        };

        let keyboard = Arc::clone(&self.keyboard);
        let count = move |_: &Lua, ()| -> LuaResult<usize> {
            keyboard
                .lock()
                .map(|registry| registry.len())
                .map_err(|_| LuaError::external("keyboard callback lock poisoned"))
        };

        NativeExportTable::new(self.module_name())
            .with_function("registerKeyboardCallback", register)
            .with_function("unregisterKeyboardCallback", unregister)
            .with_function("callbackCount", count)
    }

    fn dispatch_key_event(&self, lua: &Lua, event: &KeyEvent) {
        trace!(key = event.key(), action = %event.action(), "Dispatching key event");
        let args = (event.key().to_string(), event.action().as_str());
        match dispatch(&self.keyboard, lua, args) {
            Ok(report) if report.failed > 0 => {
                trace!(failed = report.failed, invoked = report.invoked, "Keyboard dispatch had failures");
            }
            Ok(_) => {}
            Err(e) => warn!("Keyboard dispatch failed: {}", e),
        }
    }

    fn release_callbacks(&self, lua: &Lua) {
        if let Ok(mut keyboard) = self.keyboard.lock() {
            keyboard.clear(lua);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Lua, InputModule) {
        let lua = Lua::new();
        let module = InputModule::new();
        let namespace = module.exports().to_namespace(&lua).unwrap();
        lua.globals().set("gui", namespace).unwrap();
        (lua, module)
    }

    #[test]
    fn test_callbacks_receive_key_and_action() {
        let (lua, module) = setup();
        lua.load(
            r#"
            _G.events = {}
            gui.registerKeyboardCallback(function(key, action)
                table.insert(_G.events, key .. ":" .. action)
            end)
            "#,
        )
        .exec()
        .unwrap();

        module.dispatch_key_event(&lua, &KeyEvent::press("W"));
        module.dispatch_key_event(&lua, &KeyEvent::release("w"));

        let events: String = lua.load("return table.concat(_G.events, ',')").eval().unwrap();
        assert_eq!(events, "w:press,w:release");
    }

    #[test]
    fn test_failing_callback_does_not_block_the_next() {
        let (lua, module) = setup();
        lua.load(
            r#"
            gui.registerKeyboardCallback(function(key, action)
                if action == "press" then error("first callback broke") end
            end)
            gui.registerKeyboardCallback(function(key, action)
                _G.second = key .. ":" .. action
            end)
            "#,
        )
        .exec()
        .unwrap();

        module.dispatch_key_event(&lua, &KeyEvent::press("space"));

        let second: String = lua.globals().get("second").unwrap();
        assert_eq!(second, "space:press");
        assert_eq!(module.callback_count(), 2);
    }

    #[test]
    fn test_register_returns_distinct_handles() {
        let (lua, module) = setup();
        let (a, b): (u64, u64) = lua
            .load(
                r#"
                return gui.registerKeyboardCallback(function() end),
                       gui.registerKeyboardCallback(function() end)
                "#,
            )
            .eval()
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(module.callback_count(), 2);
        let count: usize = lua.load("return gui.callbackCount()").eval().unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_register_requires_function() {
        let (lua, module) = setup();
        let result: (bool, String) = lua
            .load(
                r#"
                local ok, err = pcall(gui.registerKeyboardCallback, "not a function")
                return ok, tostring(err)
                "#,
            )
            .eval()
            .unwrap();
        assert!(!result.0);
        assert!(result.1.contains("gui.registerKeyboardCallback"));
        assert_eq!(module.callback_count(), 0);
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let (lua, module) = setup();
        lua.load(
            r#"
            _G.hits = 0
            _G.handle = gui.registerKeyboardCallback(function() _G.hits = _G.hits + 1 end)
            "#,
        )
        .exec()
        .unwrap();

        module.dispatch_key_event(&lua, &KeyEvent::press("a"));
        let (first, second): (bool, bool) = lua
            .load(
                r#"
                return gui.unregisterKeyboardCallback(_G.handle),
                       gui.unregisterKeyboardCallback(_G.handle)
                "#,
            )
            .eval()
            .unwrap();
        module.dispatch_key_event(&lua, &KeyEvent::press("a"));

        assert!(first);
        assert!(!second);
        assert_eq!(lua.globals().get::<i64>("hits").unwrap(), 1);
    }

    #[test]
    fn test_callback_may_unregister_itself() {
        let (lua, module) = setup();
        lua.load(
            r#"
            _G.count = 0
            local handle
            handle = gui.registerKeyboardCallback(function()
                _G.count = _G.count + 1
                gui.unregisterKeyboardCallback(handle)
            end)
            "#,
        )
        .exec()
        .unwrap();

        module.dispatch_key_event(&lua, &KeyEvent::press("q"));
        module.dispatch_key_event(&lua, &KeyEvent::press("q"));

        assert_eq!(lua.globals().get::<i64>("count").unwrap(), 1);
        assert_eq!(module.callback_count(), 0);
    }

    #[test]
    fn test_release_callbacks() {
        let (lua, module) = setup();
        lua.load("gui.registerKeyboardCallback(function() _G.called = true end)")
            .exec()
            .unwrap();
        module.release_callbacks(&lua);
        module.dispatch_key_event(&lua, &KeyEvent::press("a"));
        assert_eq!(module.callback_count(), 0);
        assert_eq!(lua.globals().get::<Option<bool>>("called").unwrap(), None);
    }
}
