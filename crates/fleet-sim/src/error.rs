//! ---
//! fleet_section: "02-simulation"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Telemetry synthesis engine and trip generators."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("route needs at least two points, got {points}")]
    RouteTooShort { points: usize },
    #[error("coordinate sequence is empty")]
    EmptyCoordinateSequence,
    #[error("{distances} cumulative distances for {points} points")]
    DistanceTableMismatch { points: usize, distances: usize },
    #[error("configuration value {field}={value} outside {min}..={max}")]
    InvalidConfigRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("invalid trip plan '{plan}': {reason}")]
    InvalidPlan { plan: String, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("trip worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
