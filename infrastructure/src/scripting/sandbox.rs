//! Lua sandbox — blocks C module loading and host-bypassing loaders.
//!
//! Entry scripts are trusted, but native extension modules are blocked to
//! prevent ABI incompatibility crashes, and file loaders that would bypass
//! the host's module cache are removed.

use mlua::prelude::*;

/// Apply sandbox restrictions to the Lua VM.
///
/// Currently blocks:
/// - `package.loadlib` — prevents loading arbitrary .so/.dll
/// - `package.cpath` / `package.path` — cleared, only the host resolves modules
/// - `dofile` / `loadfile` — scripts load other scripts through `require`
///
/// Standard library functions like `string`, `table`, `math` remain available.
pub fn apply_sandbox(lua: &Lua) -> LuaResult<()> {
    lua.load(
        r#"
        -- Block C module loading (ABI safety)
        if package then
            package.loadlib = nil
            package.cpath = ''
            package.path = ''
        end

        -- Module loading goes through the host cache
        dofile = nil
        loadfile = nil
    "#,
    )
    .set_name("=sandbox")
    .exec()
}
