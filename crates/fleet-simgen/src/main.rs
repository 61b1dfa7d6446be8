//! ---
//! fleet_section: "03-cli"
//! fleet_subsection: "binary"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Fleet telemetry generator and replay CLI."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use fleet_common::{init_tracing, AppConfig, LoadedAppConfig};

mod generate;
mod replay;

const DEFAULT_CONFIG_CANDIDATES: [&str; 2] = ["fleet-sim.toml", "config/fleet-sim.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Generate and replay simulated fleet telemetry",
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to ./fleet-sim.toml or ./config/fleet-sim.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print version information and exit"
    )]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Synthesize trip event streams and the merged fleet dataset")]
    Generate(generate::GenerateArgs),
    #[command(about = "Step a simulated clock across a generated stream")]
    Replay(replay::ReplayArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("fleet-simgen {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let Some(command) = cli.command else {
        anyhow::bail!("no subcommand given; try `fleet-simgen generate` or `fleet-simgen replay`");
    };

    let loaded = load_config(cli.config.as_deref())?;
    init_tracing("fleet-simgen", &loaded.config.logging)?;
    if let Some(source) = &loaded.source {
        tracing::info!(config = %source.display(), "configuration loaded");
    }

    match command {
        Commands::Generate(args) => {
            let report = generate::run(&args, &loaded.config)?;
            if let Some(dataset) = &report.dataset {
                eprintln!(
                    "generated {} events in {} trip files -> {}",
                    report.events,
                    report.trip_files.len(),
                    dataset.display()
                );
            }
        }
        Commands::Replay(args) => {
            let metrics = replay::run(&args)?;
            tracing::info!(
                completed = metrics.completed,
                cancelled = metrics.cancelled,
                "replay finished"
            );
        }
    }
    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<LoadedAppConfig> {
    match explicit {
        Some(path) => Ok(LoadedAppConfig {
            config: AppConfig::from_path(path)?,
            source: Some(path.to_path_buf()),
        }),
        None => AppConfig::load_with_source(&DEFAULT_CONFIG_CANDIDATES),
    }
}
