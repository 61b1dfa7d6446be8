//! ---
//! fleet_section: "02-simulation"
//! fleet_subsection: "01-bootstrap"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Telemetry synthesis module exports and shared types."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
//! Telemetry event synthesis for simulated fleet trips.
//!
//! A [`TripSynthesizer`] walks one trip's position samples and emits an
//! ordered [`FleetEvent`] stream. [`FleetGenerator`] runs a set of
//! [`TripPlan`]s and merges their streams; [`ReplayEngine`] steps a simulated
//! clock over the result.

pub mod assembly;
pub mod config;
pub mod error;
pub mod event;
pub mod fleet;
pub mod geo;
pub mod paired;
pub mod replay;
pub mod scenario;
pub mod state;
pub mod synth;

pub use assembly::{merge_streams, sort_chronologically, FleetDataset, TripSummary};
pub use config::SimulationConfig;
pub use error::{Result, SimError};
pub use event::{AmbientContext, EventKind, EventType, FleetEvent, TripIdentity};
pub use fleet::{FleetGenerator, FleetRun, GeneratedTrip};
pub use geo::{GeoPoint, Route};
pub use replay::{FleetMetrics, ReplayEngine, TripRuntime, TripStatus};
pub use scenario::{default_fleet, plans_from_config, ScenarioKind, TripPlan};
pub use state::{SignalQuality, TripPhysicalState};
pub use synth::{EventRates, TripOutcome, TripRequest, TripStream, TripSynthesizer};
