//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for lua3d
#[derive(Parser, Debug)]
#[command(name = "lua3d")]
#[command(author, version, about = "Lua-scripted 3D engine host")]
#[command(long_about = r#"
lua3d runs a Lua 5.4 entry script inside a native engine loop.

Scripts reach the engine through `require`:
  require("engine")   rendering: present, drawGeometry, setLight, onPreRender, ...
  require("gui")      input: registerKeyboardCallback, unregisterKeyboardCallback
  require("util")     another script, resolved relative to the requiring file

Configuration files are loaded from (in priority order):
1. LUA3D_<SECTION>__<KEY>  Environment variables
2. --config <path>         Explicit config file
3. ./lua3d.toml            Project-level config
4. ~/.config/lua3d/config.toml   Global config

Example:
  lua3d
  lua3d scenes/cube.lua --max-frames 600
  lua3d --run main.lua -vv
"#)]
pub struct Cli {
    /// Entry script (defaults to `scripting.entry`, normally main.lua)
    pub script: Option<PathBuf>,

    /// Entry script; takes precedence over the positional argument
    #[arg(short, long, value_name = "SCRIPT")]
    pub run: Option<PathBuf>,

    /// Close the window after this many frames
    #[arg(long, value_name = "N")]
    pub max_frames: Option<u64>,

    /// Window title
    #[arg(long)]
    pub title: Option<String>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration sources and the effective configuration, then exit
    #[arg(long)]
    pub show_config: bool,
}

impl Cli {
    /// The entry script chosen on the command line, if any.
    pub fn entry_script(&self) -> Option<&PathBuf> {
        self.run.as_ref().or(self.script.as_ref())
    }

    /// Log filter directive for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace", // -vvv or more
        }
    }
}
