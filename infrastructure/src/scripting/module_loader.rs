//! Module resolution, loading and caching behind the script-facing `require`.
//!
//! Identifiers are resolved in this order:
//!
//! 1. Exact match against the cache (native modules registered by name).
//! 2. A path relative to the directory of the *current* script, tried
//!    as-is and then, if it has no extension, with each configured
//!    extension appended.
//!
//! File modules are cached under their canonical path, so a module's body
//! runs at most once however it is reached. While a module body runs it is
//! the current script; the requirer's path is restored afterwards.

use lua3d_application::ScriptHostError;
use lua3d_domain::ModuleId;
use mlua::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

/// Extensions tried for identifiers written without one.
pub const DEFAULT_MODULE_EXTENSIONS: [&str; 2] = ["lua", "luau"];

#[derive(Default)]
struct ModuleState {
    current_script: Option<PathBuf>,
    cache: HashMap<String, LuaRegistryKey>,
    loading: HashSet<String>,
}

/// Shared handle to the module cache and resolver.
///
/// Cloning is cheap; the `require` function installed into the VM holds
/// its own clone.
#[derive(Clone)]
pub struct ModuleLoader {
    state: Arc<Mutex<ModuleState>>,
    extensions: Arc<Vec<String>>,
}

impl ModuleLoader {
    pub fn new(extensions: Vec<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ModuleState::default())),
            extensions: Arc::new(extensions),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ModuleState>, ScriptHostError> {
        self.state
            .lock()
            .map_err(|e| ScriptHostError::Runtime(format!("module state lock poisoned: {}", e)))
    }

    /// Read and compile a source file into a callable chunk.
    pub fn compile(&self, lua: &Lua, path: &Path) -> Result<LuaFunction, ScriptHostError> {
        let source =
            std::fs::read_to_string(path).map_err(|source| ScriptHostError::SourceNotFound {
                path: path.to_path_buf(),
                source,
            })?;

        lua.load(source.as_str())
            .set_name(format!("@{}", path.display()))
            .into_function()
            .map_err(|e| match e {
                LuaError::SyntaxError { message, .. } => ScriptHostError::Compile {
                    path: path.to_path_buf(),
                    message,
                },
                other => ScriptHostError::Load {
                    path: path.to_path_buf(),
                    message: other.to_string(),
                },
            })
    }

    pub fn current_script(&self) -> Option<PathBuf> {
        self.lock().ok().and_then(|state| state.current_script.clone())
    }

    pub fn set_current_script(&self, path: &Path) -> Result<(), ScriptHostError> {
        self.lock()?.current_script = Some(path.to_path_buf());
        Ok(())
    }

    /// Resolve a file identifier against the current script's directory.
    pub fn resolve(&self, identifier: &str) -> Result<PathBuf, ScriptHostError> {
        let not_found = |reason: String| ScriptHostError::ModuleNotFound {
            identifier: identifier.to_string(),
            reason,
        };

        let current = self
            .lock()?
            .current_script
            .clone()
            .ok_or_else(|| not_found("no script has been loaded to resolve against".into()))?;
        let base = current.parent().unwrap_or_else(|| Path::new(""));
        let candidate = base.join(identifier);

        if candidate.is_file() {
            return Ok(canonical(candidate));
        }
        if candidate.extension().is_none() {
            for ext in self.extensions.iter() {
                let with_ext = candidate.with_extension(ext);
                if with_ext.is_file() {
                    return Ok(canonical(with_ext));
                }
            }
            return Err(not_found(format!(
                "no file at {} (also tried extensions: {})",
                candidate.display(),
                self.extensions.join(", ")
            )));
        }
        Err(not_found(format!("no file at {}", candidate.display())))
    }

    /// Resolve, load and run a file module, returning its export value.
    ///
    /// Does not consult or fill the cache.
    pub fn load_module(&self, lua: &Lua, identifier: &str) -> Result<LuaValue, ScriptHostError> {
        let path = self.resolve(identifier)?;
        self.run_module(lua, identifier, &path)
    }

    /// Return the cached export of `identifier`, loading it on first use.
    pub fn load_and_cache_module(
        &self,
        lua: &Lua,
        identifier: &str,
    ) -> Result<LuaValue, ScriptHostError> {
        if let Some(value) = self.cached(lua, identifier)? {
            trace!(module = identifier, "Module cache hit");
            return Ok(value);
        }

        let path = self.resolve(identifier)?;
        let key = ModuleId::File(path.clone()).cache_key();
        if let Some(value) = self.cached(lua, &key)? {
            trace!(module = identifier, path = %path.display(), "Module cache hit");
            return Ok(value);
        }

        debug!(module = identifier, path = %path.display(), "Loading module");
        let value = self.run_module(lua, identifier, &path)?;
        self.store(lua, key, value.clone())?;
        Ok(value)
    }

    /// Cache a native module namespace under its name.
    pub fn register_internal(
        &self,
        lua: &Lua,
        name: &str,
        namespace: impl IntoLua,
    ) -> Result<(), ScriptHostError> {
        let key = ModuleId::Internal(name.to_string()).cache_key();
        let mut state = self.lock()?;
        if state.cache.contains_key(&key) {
            return Err(ScriptHostError::DuplicateModule(name.to_string()));
        }
        let registry_key = lua
            .create_registry_value(namespace)
            .map_err(|e| ScriptHostError::HostInit(e.to_string()))?;
        state.cache.insert(key, registry_key);
        Ok(())
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.lock()
            .map(|state| state.cache.contains_key(key))
            .unwrap_or(false)
    }

    /// Cache keys in sorted order.
    pub fn cached_modules(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .lock()
            .map(|state| state.cache.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Build the `require` function bound to this loader.
    ///
    /// Failures are raised as script errors, never returned as `nil`.
    pub fn require_function(&self, lua: &Lua) -> LuaResult<LuaFunction> {
        let loader = self.clone();
        lua.create_function(move |lua, identifier: LuaValue| {
            let identifier = match identifier {
                LuaValue::String(s) => s.to_str()?.to_string(),
                other => {
                    return Err(LuaError::external(format!(
                        "require expects a module name string, got {}",
                        other.type_name()
                    )));
                }
            };
            loader
                .load_and_cache_module(lua, &identifier)
                .map_err(LuaError::external)
        })
    }

    /// Drop every cache entry and forget the current script.
    pub fn clear(&self, lua: &Lua) {
        if let Ok(mut state) = self.lock() {
            for (_, key) in state.cache.drain() {
                let _ = lua.remove_registry_value(key);
            }
            state.loading.clear();
            state.current_script = None;
        }
    }

    fn cached(&self, lua: &Lua, key: &str) -> Result<Option<LuaValue>, ScriptHostError> {
        let state = self.lock()?;
        match state.cache.get(key) {
            Some(registry_key) => lua
                .registry_value::<LuaValue>(registry_key)
                .map(Some)
                .map_err(|e| ScriptHostError::Runtime(e.to_string())),
            None => Ok(None),
        }
    }

    fn store(&self, lua: &Lua, key: String, value: LuaValue) -> Result<(), ScriptHostError> {
        let mut state = self.lock()?;
        if state.cache.contains_key(&key) {
            return Ok(());
        }
        let registry_key = lua
            .create_registry_value(value)
            .map_err(|e| ScriptHostError::Runtime(e.to_string()))?;
        state.cache.insert(key, registry_key);
        Ok(())
    }

    fn run_module(
        &self,
        lua: &Lua,
        identifier: &str,
        path: &Path,
    ) -> Result<LuaValue, ScriptHostError> {
        let key = ModuleId::File(path.to_path_buf()).cache_key();
        let previous = {
            let mut state = self.lock()?;
            if !state.loading.insert(key.clone()) {
                return Err(ScriptHostError::CircularRequire(identifier.to_string()));
            }
            state.current_script.replace(path.to_path_buf())
        };

        let result = self.run_module_body(lua, identifier, path);

        let mut state = self.lock()?;
        state.loading.remove(&key);
        state.current_script = previous;
        result
    }

    fn run_module_body(
        &self,
        lua: &Lua,
        identifier: &str,
        path: &Path,
    ) -> Result<LuaValue, ScriptHostError> {
        let chunk = self
            .compile(lua, path)
            .map_err(|e| ScriptHostError::ModuleNotFound {
                identifier: identifier.to_string(),
                reason: e.to_string(),
            })?;

        let value = chunk
            .call::<LuaValue>(())
            .map_err(|e| ScriptHostError::ModuleExecution {
                identifier: identifier.to_string(),
                message: e.to_string(),
            })?;

        if matches!(value, LuaValue::Nil) {
            return Err(ScriptHostError::ModuleExecution {
                identifier: identifier.to_string(),
                message: "module returned no value".to_string(),
            });
        }
        Ok(value)
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new(
            DEFAULT_MODULE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        )
    }
}

fn canonical(path: PathBuf) -> PathBuf {
    std::fs::canonicalize(&path).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        lua: Lua,
        loader: ModuleLoader,
    }

    fn fixture(files: &[(&str, &str)]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        for (name, source) in files {
            let path = root.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, source).unwrap();
        }
        let lua = Lua::new();
        let loader = ModuleLoader::default();
        let require = loader.require_function(&lua).unwrap();
        lua.globals().set("require", require).unwrap();
        Fixture {
            _dir: dir,
            root,
            lua,
            loader,
        }
    }

    #[test]
    fn test_resolve_without_current_script_fails() {
        let f = fixture(&[("util.lua", "return {}")]);
        let err = f.loader.resolve("util").unwrap_err();
        assert!(matches!(err, ScriptHostError::ModuleNotFound { .. }));
        assert!(f.loader.load_module(&f.lua, "util").is_err());
    }

    #[test]
    fn test_resolve_relative_to_current_script() {
        let f = fixture(&[("main.lua", ""), ("util.lua", "return {}")]);
        f.loader.set_current_script(&f.root.join("main.lua")).unwrap();

        assert_eq!(f.loader.resolve("util").unwrap(), f.root.join("util.lua"));
        assert_eq!(
            f.loader.resolve("util.lua").unwrap(),
            f.root.join("util.lua")
        );
    }

    #[test]
    fn test_resolve_tries_extensions_in_order() {
        let f = fixture(&[
            ("main.lua", ""),
            ("both.lua", "return 1"),
            ("both.luau", "return 2"),
            ("only.luau", "return 3"),
        ]);
        f.loader.set_current_script(&f.root.join("main.lua")).unwrap();

        assert_eq!(f.loader.resolve("both").unwrap(), f.root.join("both.lua"));
        assert_eq!(f.loader.resolve("only").unwrap(), f.root.join("only.luau"));
    }

    #[test]
    fn test_exact_file_wins_over_extension() {
        let f = fixture(&[("main.lua", ""), ("data", "return 1"), ("data.lua", "return 2")]);
        f.loader.set_current_script(&f.root.join("main.lua")).unwrap();

        assert_eq!(f.loader.resolve("data").unwrap(), f.root.join("data"));
    }

    #[test]
    fn test_explicit_extension_is_not_rewritten() {
        let f = fixture(&[("main.lua", ""), ("conf.lua", "return 1")]);
        f.loader.set_current_script(&f.root.join("main.lua")).unwrap();

        let err = f.loader.resolve("conf.txt").unwrap_err();
        assert!(matches!(err, ScriptHostError::ModuleNotFound { .. }));
    }

    #[test]
    fn test_module_body_runs_once() {
        let f = fixture(&[
            ("main.lua", ""),
            (
                "counter.lua",
                "_G.runs = (_G.runs or 0) + 1 return { value = 42 }",
            ),
        ]);
        f.loader.set_current_script(&f.root.join("main.lua")).unwrap();

        let first = f.loader.load_and_cache_module(&f.lua, "counter").unwrap();
        let second = f.loader.load_and_cache_module(&f.lua, "counter").unwrap();
        let third = f.loader.load_and_cache_module(&f.lua, "counter.lua").unwrap();

        let runs: i64 = f.lua.globals().get("runs").unwrap();
        assert_eq!(runs, 1);
        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_load_module_bypasses_cache() {
        let f = fixture(&[
            ("main.lua", ""),
            ("counter.lua", "_G.runs = (_G.runs or 0) + 1 return {}"),
        ]);
        f.loader.set_current_script(&f.root.join("main.lua")).unwrap();

        f.loader.load_module(&f.lua, "counter").unwrap();
        f.loader.load_module(&f.lua, "counter").unwrap();

        let runs: i64 = f.lua.globals().get("runs").unwrap();
        assert_eq!(runs, 2);
        assert!(f.loader.cached_modules().is_empty());
    }

    #[test]
    fn test_nested_require_resolves_from_requiring_module() {
        let f = fixture(&[
            ("main.lua", ""),
            ("helper.lua", "return { where = 'root' }"),
            ("sub/helper.lua", "return { where = 'sub' }"),
            (
                "sub/entry.lua",
                "local h = require('helper') return { helper = h.where }",
            ),
            ("util.lua", "return { where = 'util' }"),
        ]);
        f.loader.set_current_script(&f.root.join("main.lua")).unwrap();

        let entry = f.loader.load_and_cache_module(&f.lua, "sub/entry").unwrap();
        let entry = match entry {
            LuaValue::Table(t) => t,
            other => panic!("expected table, got {:?}", other),
        };
        assert_eq!(entry.get::<String>("helper").unwrap(), "sub");

        // The requirer's script is current again after the nested load
        assert_eq!(f.loader.current_script(), Some(f.root.join("main.lua")));
        let util: LuaTable = f.lua.load("return require('util')").eval().unwrap();
        assert_eq!(util.get::<String>("where").unwrap(), "util");
    }

    #[test]
    fn test_circular_require_is_an_error() {
        let f = fixture(&[
            ("main.lua", ""),
            ("a.lua", "require('b') return {}"),
            ("b.lua", "require('a') return {}"),
        ]);
        f.loader.set_current_script(&f.root.join("main.lua")).unwrap();

        let err = f.loader.load_and_cache_module(&f.lua, "a").unwrap_err();
        assert!(matches!(err, ScriptHostError::ModuleExecution { .. }));
        assert!(err.to_string().contains("circular require"), "{}", err);
        assert!(f.loader.cached_modules().is_empty());
    }

    #[test]
    fn test_reentering_a_loading_module_reports_circular_require() {
        let f = fixture(&[("main.lua", ""), ("a.lua", "_G.reentry = check_reentry('a') return {}")]);
        f.loader.set_current_script(&f.root.join("main.lua")).unwrap();

        let loader = f.loader.clone();
        let check = f
            .lua
            .create_function(move |lua: &Lua, identifier: String| -> LuaResult<String> {
                Ok(match loader.load_module(lua, &identifier) {
                    Err(ScriptHostError::CircularRequire(name)) => format!("circular:{}", name),
                    Err(other) => format!("other:{}", other),
                    Ok(_) => "loaded".to_string(),
                })
            })
            .unwrap();
        f.lua.globals().set("check_reentry", check).unwrap();

        f.loader.load_and_cache_module(&f.lua, "a").unwrap();

        let reentry: String = f.lua.globals().get("reentry").unwrap();
        assert_eq!(reentry, "circular:a");
        assert_eq!(f.loader.current_script(), Some(f.root.join("main.lua")));
    }

    #[test]
    fn test_module_without_return_value_fails() {
        let f = fixture(&[("main.lua", ""), ("empty.lua", "local x = 1")]);
        f.loader.set_current_script(&f.root.join("main.lua")).unwrap();

        let err = f.loader.load_and_cache_module(&f.lua, "empty").unwrap_err();
        assert!(matches!(err, ScriptHostError::ModuleExecution { .. }));
        assert!(f.loader.cached_modules().is_empty());
    }

    #[test]
    fn test_module_errors_are_classified() {
        let f = fixture(&[
            ("main.lua", ""),
            ("broken.lua", "return {{{"),
            ("raises.lua", "error('nope')"),
        ]);
        f.loader.set_current_script(&f.root.join("main.lua")).unwrap();

        assert!(matches!(
            f.loader.load_and_cache_module(&f.lua, "missing"),
            Err(ScriptHostError::ModuleNotFound { .. })
        ));
        assert!(matches!(
            f.loader.load_and_cache_module(&f.lua, "broken"),
            Err(ScriptHostError::ModuleNotFound { .. })
        ));
        assert!(matches!(
            f.loader.load_and_cache_module(&f.lua, "raises"),
            Err(ScriptHostError::ModuleExecution { .. })
        ));
    }

    #[test]
    fn test_require_failure_is_catchable() {
        let f = fixture(&[("main.lua", "")]);
        f.loader.set_current_script(&f.root.join("main.lua")).unwrap();

        let (ok, msg): (bool, String) = f
            .lua
            .load("local ok, err = pcall(require, 'missing') return ok, tostring(err)")
            .eval()
            .unwrap();
        assert!(!ok);
        assert!(msg.contains("module 'missing' not found"), "{}", msg);
    }

    #[test]
    fn test_require_rejects_non_string() {
        let f = fixture(&[("main.lua", "")]);
        let (ok, msg): (bool, String) = f
            .lua
            .load("local ok, err = pcall(require, 42) return ok, tostring(err)")
            .eval()
            .unwrap();
        assert!(!ok);
        assert!(msg.contains("expects a module name string"), "{}", msg);
    }

    #[test]
    fn test_internal_module_takes_priority() {
        let f = fixture(&[("main.lua", ""), ("engine.lua", "return { file = true }")]);
        f.loader.set_current_script(&f.root.join("main.lua")).unwrap();

        let ns = f.lua.create_table().unwrap();
        ns.set("native", true).unwrap();
        f.loader.register_internal(&f.lua, "engine", ns).unwrap();

        let native: bool = f.lua.load("return require('engine').native").eval().unwrap();
        assert!(native);
    }

    #[test]
    fn test_duplicate_internal_module_rejected() {
        let f = fixture(&[]);
        let ns = f.lua.create_table().unwrap();
        f.loader.register_internal(&f.lua, "gui", ns.clone()).unwrap();

        let err = f.loader.register_internal(&f.lua, "gui", ns).unwrap_err();
        assert!(matches!(err, ScriptHostError::DuplicateModule(name) if name == "gui"));
    }

    #[test]
    fn test_clear_empties_cache() {
        let f = fixture(&[]);
        let ns = f.lua.create_table().unwrap();
        f.loader.register_internal(&f.lua, "gui", ns).unwrap();
        assert!(f.loader.is_cached("gui"));

        f.loader.clear(&f.lua);
        assert!(!f.loader.is_cached("gui"));
        assert_eq!(f.loader.current_script(), None);
    }
}
