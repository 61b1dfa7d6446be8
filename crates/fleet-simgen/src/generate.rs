//! ---
//! fleet_section: "03-cli"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Fleet telemetry generator and replay CLI."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use fleet_common::AppConfig;
use fleet_sim::assembly::write_events;
use fleet_sim::{plans_from_config, FleetGenerator, FleetRun};
use tracing::{info, warn};

pub const DATASET_FILE: &str = "fleet-events.json";

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Directory for per-trip files and the merged dataset
    #[arg(long, value_name = "DIR", conflicts_with = "output")]
    pub output_dir: Option<PathBuf>,

    /// Write only the merged dataset to this path ('-' for stdout)
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Fleet seed (overrides `simulation.random_seed`)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Generate only the named trips (repeatable)
    #[arg(long = "trip", value_name = "NAME")]
    pub trips: Vec<String>,

    /// Run trips on the blocking worker pool
    #[arg(long)]
    pub parallel: bool,

    /// Emit compact JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,
}

/// Files written by a generate run.
#[derive(Debug, Default)]
pub struct GenerateReport {
    pub trip_files: Vec<PathBuf>,
    pub dataset: Option<PathBuf>,
    pub events: usize,
}

pub fn trip_file_name(number: usize, name: &str) -> String {
    format!("trip_{number}_{name}.json")
}

pub fn run(args: &GenerateArgs, config: &AppConfig) -> Result<GenerateReport> {
    let seed = args.seed.unwrap_or(config.simulation.random_seed);
    let plans = plans_from_config(config).context("invalid trip plans")?;
    for name in &args.trips {
        if !plans.iter().any(|plan| &plan.name == name) {
            warn!(trip = %name, "requested trip is not defined; skipping");
        }
    }
    let mut generator = FleetGenerator::new(seed, plans);
    generator.retain_named(&args.trips);
    if generator.plans().is_empty() {
        bail!("no trips match {:?}", args.trips);
    }

    let fleet = if args.parallel || config.simulation.parallel {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start worker runtime")?;
        runtime.block_on(generator.generate_parallel())?
    } else {
        generator.generate()?
    };

    let pretty = config.output.pretty && !args.compact;
    match &args.output {
        Some(path) if path.as_os_str() == "-" => {
            let dataset = fleet.dataset(Utc::now());
            let mut stdout = io::stdout().lock();
            dataset.to_writer(&mut stdout, pretty)?;
            stdout.write_all(b"\n")?;
            Ok(GenerateReport {
                events: dataset.events.len(),
                ..GenerateReport::default()
            })
        }
        Some(path) => write_dataset(&fleet, path, pretty),
        None => {
            let directory = args
                .output_dir
                .clone()
                .unwrap_or_else(|| config.output.directory.clone());
            write_directory(&fleet, &directory, pretty)
        }
    }
}

fn write_dataset(fleet: &FleetRun, path: &Path, pretty: bool) -> Result<GenerateReport> {
    let dataset = fleet.dataset(Utc::now());
    dataset
        .write_to(path, pretty)
        .with_context(|| format!("failed to write dataset {}", path.display()))?;
    info!(path = %path.display(), events = dataset.events.len(), "dataset written");
    Ok(GenerateReport {
        trip_files: Vec::new(),
        dataset: Some(path.to_path_buf()),
        events: dataset.events.len(),
    })
}

fn write_directory(fleet: &FleetRun, directory: &Path, pretty: bool) -> Result<GenerateReport> {
    let mut trip_files = Vec::with_capacity(fleet.trips.len());
    for (index, trip) in fleet.trips.iter().enumerate() {
        let path = directory.join(trip_file_name(index + 1, &trip.plan.name));
        write_events(&path, &trip.stream.events, pretty)
            .with_context(|| format!("failed to write trip file {}", path.display()))?;
        info!(
            trip = %trip.plan.name,
            events = trip.stream.events.len(),
            cancelled = trip.stream.outcome.is_cancelled(),
            path = %path.display(),
            "trip written"
        );
        trip_files.push(path);
    }
    let mut report = write_dataset(fleet, &directory.join(DATASET_FILE), pretty)?;
    report.trip_files = trip_files;
    Ok(report)
}
