//! ---
//! fleet_section: "01-core-functionality"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Shared primitives and utilities for the simulator workspace."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
//! Core shared primitives for the fleet simulator workspace.
//! This crate exposes configuration loading, logging bootstrap and the
//! simulated-clock helpers consumed by the engine and the CLI.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    AppConfig, LoadedAppConfig, LoggingConfig, OutputConfig, SimulationSettings, TripEntry,
    WaypointEntry,
};
pub use logging::{init_tracing, LogFormat};
