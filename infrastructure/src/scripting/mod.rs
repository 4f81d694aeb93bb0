//! Lua scripting host
//!
//! Provides the `LuaScriptingHost` that implements `ScriptingHostPort`
//! from the application layer, backed by mlua (Lua 5.4).
//!
//! # Modules
//!
//! - `lua_host` — Main host struct tying everything together
//! - `module_loader` — `require` resolution and the module cache
//! - `export_table` — Native export tables and the capability module trait
//! - `callback_registry` — Script callback references with cancellation handles
//! - `sandbox` — C module blocking for safety
//! - `engine_api` — `engine` rendering module
//! - `gui_api` — `gui` input module

mod callback_registry;
mod engine_api;
mod export_table;
mod gui_api;
mod lua_host;
mod module_loader;
mod sandbox;

pub use callback_registry::{CallbackHandle, CallbackRegistry, DispatchReport, SubscriberMode};
pub use engine_api::{DEFAULT_DELTA_SECONDS, RenderModule};
pub use export_table::{CapabilityModule, NativeExport, NativeExportTable, NativeFunction};
pub use gui_api::InputModule;
pub use lua_host::{HostOptions, LuaScriptingHost};
pub use module_loader::{DEFAULT_MODULE_EXTENSIONS, ModuleLoader};
