//! ---
//! fleet_section: "02-simulation"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Telemetry synthesis engine and trip generators."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
//! Ordering, merging and JSON persistence of generated streams.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::event::FleetEvent;
use crate::scenario::ScenarioKind;
use crate::synth::{TripOutcome, TripStream};

pub const DATASET_VERSION: &str = "1.0.0";
pub const GENERATOR_NAME: &str = concat!("fleet-sim ", env!("CARGO_PKG_VERSION"));

/// Stable sort by timestamp; equal timestamps keep their emission order.
pub fn sort_chronologically(events: &mut [FleetEvent]) {
    events.sort_by_key(|event| event.timestamp);
}

pub fn is_chronological(events: &[FleetEvent]) -> bool {
    events
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp)
}

/// Concatenate trip streams in the given order and sort the result.
pub fn merge_streams<'a, I>(streams: I) -> Vec<FleetEvent>
where
    I: IntoIterator<Item = &'a TripStream>,
{
    let mut merged: Vec<FleetEvent> = streams
        .into_iter()
        .flat_map(|stream| stream.events.iter().cloned())
        .collect();
    sort_chronologically(&mut merged);
    merged
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub trip_id: String,
    pub vehicle_id: String,
    pub device_id: String,
    pub name: String,
    pub description: Option<String>,
    pub scenario: ScenarioKind,
    pub planned_stops: Vec<String>,
    pub planned_distance_km: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub event_count: usize,
    pub outcome: TripOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub version: String,
    pub generator: String,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Default for DatasetMetadata {
    fn default() -> Self {
        Self {
            version: DATASET_VERSION.to_owned(),
            generator: GENERATOR_NAME.to_owned(),
            notes: Vec::new(),
        }
    }
}

/// Merged output of a fleet run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetDataset {
    pub generated_at: DateTime<Utc>,
    pub trips: Vec<TripSummary>,
    pub events: Vec<FleetEvent>,
    pub metadata: DatasetMetadata,
}

impl FleetDataset {
    pub fn write_to(&self, path: &Path, pretty: bool) -> Result<()> {
        write_json(path, self, pretty)?;
        debug!(
            path = %path.display(),
            trips = self.trips.len(),
            events = self.events.len(),
            "fleet dataset written"
        );
        Ok(())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_writer<W: Write>(&self, writer: W, pretty: bool) -> Result<()> {
        if pretty {
            serde_json::to_writer_pretty(writer, self)?;
        } else {
            serde_json::to_writer(writer, self)?;
        }
        Ok(())
    }
}

/// Write one trip's events as a JSON array.
pub fn write_events(path: &Path, events: &[FleetEvent], pretty: bool) -> Result<()> {
    write_json(path, &events, pretty)?;
    debug!(path = %path.display(), events = events.len(), "trip stream written");
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
