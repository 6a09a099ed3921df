mod cli;
mod config;
mod run;

use anyhow::Result;
use cli::{Command, ConfigAction};
use config::ConfigPaths;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();
    let explicit = cli.config.as_deref();

    match cli.command {
        Some(Command::Snapshot(args)) => run::snapshot(explicit, args),
        Some(Command::Config(config_cmd)) => match config_cmd.action {
            ConfigAction::Where => run_config_where(explicit),
            ConfigAction::Show => run_config_show(explicit),
        },
        None => run::run(explicit, cli.run),
    }
}

fn run_config_where(explicit: Option<&std::path::Path>) -> Result<()> {
    let paths = ConfigPaths::discover()?;
    let file = explicit
        .map(std::path::Path::to_path_buf)
        .unwrap_or_else(|| paths.config_file());
    println!("Configuration:");
    println!("  dir:   {}", paths.config_dir().display());
    println!(
        "  file:  {} ({})",
        file.display(),
        if file.exists() { "present" } else { "missing" }
    );
    Ok(())
}

fn run_config_show(explicit: Option<&std::path::Path>) -> Result<()> {
    let config = run::load_config(explicit, None)?;
    config.canvas_config()?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
