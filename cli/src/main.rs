//! CLI entrypoint for lua3d
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::Cli;
use lua3d_application::{
    EngineLoop, ScriptingHostPort, SharedRenderer, SharedWindow,
};
use lua3d_infrastructure::{
    ConfigLoader, FileConfig, FrameCounter, HeadlessRenderer, HeadlessWindow, LuaScriptingHost,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).context("failed to load configuration")?
    };
    apply_overrides(&mut config, &cli);
    config
        .validate()
        .context("invalid configuration after command-line overrides")?;

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        println!();
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let _log_guard = init_logging(&cli, config.logging.directory.as_deref())?;

    info!("Starting lua3d");

    let entry = cli
        .entry_script()
        .cloned()
        .unwrap_or_else(|| PathBuf::from(&config.scripting.entry));
    if !entry.is_file() {
        bail!("entry script not found: {}", entry.display());
    }

    // === Dependency Injection ===
    let frames = FrameCounter::default();
    let window = HeadlessWindow::new().with_frame_limit(config.engine.max_frames, frames.clone());
    let close = window.close_handle();
    let window: SharedWindow = Arc::new(Mutex::new(window));
    let renderer: SharedRenderer =
        Arc::new(Mutex::new(HeadlessRenderer::new().with_frame_counter(frames)));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, closing window");
            close.close();
        }
    });

    let settings = config.to_engine_settings();
    let host_options = config.to_host_options();

    // The VM runs on a single blocking thread for its whole lifetime
    let report = tokio::task::spawn_blocking(move || {
        let mut engine = EngineLoop::new(settings, window.clone(), renderer.clone());
        engine.initialize(move || {
            let host = LuaScriptingHost::with_standard_modules(host_options, renderer, window)?;
            Ok(Box::new(host) as Box<dyn ScriptingHostPort>)
        })?;
        engine.run(&entry)
    })
    .await
    .context("engine thread panicked")??;

    if let Some(e) = &report.script_error {
        warn!("Entry script ended with an error: {}", e);
    }
    info!(frames = report.frames, "Finished");

    Ok(())
}

fn apply_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(title) = &cli.title {
        config.window.title = title.clone();
    }
    if let Some(max_frames) = cli.max_frames {
        config.engine.max_frames = Some(max_frames);
    }
}

/// Initialize logging based on verbosity level, optionally mirrored to a
/// daily-rolling file. `RUST_LOG` takes precedence over `-v`/`-q`.
fn init_logging(cli: &Cli, directory: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));

    let (file_layer, guard) = match directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "lua3d.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}
