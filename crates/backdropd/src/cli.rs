use std::path::PathBuf;

use backdrop::{Antialiasing, ClockMode};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "backdropd",
    author,
    version,
    about = "Animated shader background",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Configuration file; defaults to `backdrop.toml` in the config directory.
    #[arg(long, global = true, env = "BACKDROP_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Flags for the default mode: a window with the animated background.
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Initial window size in logical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Open the window borderless fullscreen.
    #[arg(long)]
    pub fullscreen: bool,

    /// Window title.
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<Antialiasing>,

    /// How time advances: `stepped` (per frame) or `wall` (per 1/60 s).
    #[arg(long, value_name = "MODE", value_parser = parse_clock)]
    pub clock: Option<ClockMode>,

    /// Amount added to the time uniform on every frame.
    #[arg(long, value_name = "STEP")]
    pub step: Option<f32>,

    /// Value of the time uniform before the first frame.
    #[arg(long, value_name = "SECONDS")]
    pub initial_time: Option<f32>,

    /// Exit with an error instead of showing a static background when the GPU is unavailable.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render one frame on the CPU and write it as PNG.
    Snapshot(SnapshotArgs),
    /// Inspect configuration locations and effective values.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct SnapshotArgs {
    /// Output PNG path.
    #[arg(value_name = "PATH")]
    pub output: PathBuf,

    /// Image size in pixels.
    #[arg(
        long,
        value_name = "WIDTHxHEIGHT",
        value_parser = parse_size,
        default_value = "1280x720"
    )]
    pub size: (u32, u32),

    /// Explicit time uniform to render at.
    #[arg(long, value_name = "SECONDS", conflicts_with = "frame")]
    pub time: Option<f32>,

    /// Render the state after this many frames (`initial_time + frame × step`).
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub frame: u64,
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved configuration directory and file.
    Where,
    /// Print the effective configuration as TOML.
    Show,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{trimmed}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("size '{trimmed}' must be non-zero in both dimensions"));
    }
    Ok((width, height))
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(Antialiasing::Auto),
        "off" | "none" | "disable" | "disabled" | "0" => Ok(Antialiasing::Off),
        _ => {
            let samples: u32 = normalized.parse().map_err(|_| {
                format!("invalid anti-alias sample count '{trimmed}'; use auto/off or 2/4/8/16")
            })?;

            if samples == 1 {
                return Ok(Antialiasing::Off);
            }

            if !matches!(samples, 2 | 4 | 8 | 16) {
                return Err(format!(
                    "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
                ));
            }

            Ok(Antialiasing::Samples(samples))
        }
    }
}

pub fn parse_clock(value: &str) -> Result<ClockMode, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "stepped" | "step" | "frame" => Ok(ClockMode::Stepped),
        "wall" | "wallclock" | "wall-clock" => Ok(ClockMode::WallClock),
        other => Err(format!(
            "unknown clock mode '{other}' (expected stepped or wall)"
        )),
    }
}
