//! ---
//! fleet_section: "01-core-functionality"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Shared primitives and utilities for the simulator workspace."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_output_directory() -> PathBuf {
    PathBuf::from("target/fleet-data")
}

fn default_pretty() -> bool {
    true
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_simulation_seed() -> u64 {
    0xF1EE7u64
}

fn default_sample_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_scenario() -> String {
    "regional".to_owned()
}

/// Primary configuration object for the simulator.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub simulation: SimulationSettings,
    /// Named trips in generation order. Empty means "use the built-in fleet".
    #[serde(default)]
    pub trips: IndexMap<String, TripEntry>,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "FLEETSIM_CONFIG";

    /// Load configuration from disk, respecting the `FLEETSIM_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from the first existing candidate, falling back to defaults
    /// when nothing is found.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found, using defaults"
        );
        Ok(LoadedAppConfig {
            config: Self::default(),
            source: None,
        })
    }

    /// Parse and validate a configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        for (name, trip) in &self.trips {
            trip.validate(name)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the rolling JSON log. Disabled when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            pretty: default_pretty(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_simulation_seed")]
    pub random_seed: u64,
    #[serde(default)]
    pub parallel: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            random_seed: default_simulation_seed(),
            parallel: false,
        }
    }
}

/// Declarative description of a single trip.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripEntry {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_scenario")]
    pub scenario: String,
    pub vehicle_id: String,
    pub trip_id: String,
    pub device_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default = "default_sample_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub sample_interval: Duration,
    #[serde(default)]
    pub samples: Option<usize>,
    #[serde(default)]
    pub cancel_probability: f64,
    #[serde(default)]
    pub seed: Option<u64>,
    pub route: Vec<WaypointEntry>,
}

impl TripEntry {
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.route.len() < 2 {
            return Err(anyhow!(
                "trip '{}' must declare at least two route waypoints",
                name
            ));
        }
        if self.sample_interval.is_zero() {
            return Err(anyhow!(
                "trip '{}' sample_interval must be greater than zero",
                name
            ));
        }
        if !(0.0..=1.0).contains(&self.cancel_probability) {
            return Err(anyhow!(
                "trip '{}' cancel_probability {} outside 0.0..=1.0",
                name,
                self.cancel_probability
            ));
        }
        if matches!(self.samples, Some(samples) if samples < 2) {
            return Err(anyhow!("trip '{}' needs at least two samples", name));
        }
        for (field, value) in [
            ("vehicle_id", &self.vehicle_id),
            ("trip_id", &self.trip_id),
            ("device_id", &self.device_id),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("trip '{}' {} cannot be empty", name, field));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaypointEntry {
    #[serde(default)]
    pub label: Option<String>,
    pub lat: f64,
    pub lng: f64,
}
