use std::path::Path;

use anyhow::{Context, Result};
use backdrop::{export_png, run_window, PhysicalSize};
use tracing_subscriber::EnvFilter;

use crate::cli::{RunArgs, SnapshotArgs};
use crate::config::{ConfigPaths, FileConfig};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Resolves the effective configuration from the file and, if given, run flags.
pub fn load_config(explicit: Option<&Path>, args: Option<&RunArgs>) -> Result<FileConfig> {
    let paths = ConfigPaths::discover()?;
    let mut config = FileConfig::load(&paths, explicit)?;
    if let Some(args) = args {
        config.apply_run_args(args);
    }
    Ok(config)
}

pub fn run(explicit: Option<&Path>, args: RunArgs) -> Result<()> {
    let config = load_config(explicit, Some(&args))?;
    let options = config
        .window_options()
        .context("invalid window configuration")?;
    tracing::info!(
        width = config.window.width,
        height = config.window.height,
        fullscreen = options.fullscreen,
        clock = ?options.canvas.clock,
        step = options.canvas.step,
        "starting shader backdrop"
    );
    run_window(options)
}

pub fn snapshot(explicit: Option<&Path>, args: SnapshotArgs) -> Result<()> {
    let config = load_config(explicit, None)?;
    let canvas = config
        .canvas_config()
        .context("invalid canvas configuration")?;
    let time = match args.time {
        Some(time) => time,
        None => (f64::from(canvas.initial_time) + args.frame as f64 * f64::from(canvas.step)) as f32,
    };
    let (width, height) = args.size;
    export_png(
        &args.output,
        PhysicalSize::new(width, height),
        time,
        &canvas.field,
    )?;
    println!("{}", args.output.display());
    Ok(())
}
