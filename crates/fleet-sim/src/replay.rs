//! ---
//! fleet_section: "02-simulation"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Telemetry synthesis engine and trip generators."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use strum::{AsRefStr, Display};

use crate::assembly::{sort_chronologically, FleetDataset};
use crate::event::{round1, EventKind, EventType, FleetEvent, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TripStatus {
    Scheduled,
    EnRoute,
    Stopped,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    fn after(self, event_type: EventType) -> Self {
        if self.is_terminal() {
            return self;
        }
        match event_type {
            EventType::TripStarted | EventType::VehicleMoving => Self::EnRoute,
            EventType::VehicleStopped => Self::Stopped,
            EventType::TripCompleted => Self::Completed,
            EventType::TripCancelled => Self::Cancelled,
            _ if self == Self::Scheduled => Self::EnRoute,
            _ => self,
        }
    }
}

/// Derived view of one trip at the replay clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripRuntime {
    pub trip_id: String,
    pub vehicle_id: String,
    pub status: TripStatus,
    pub events_processed: usize,
    pub last_event: Option<EventType>,
    pub last_position: Option<Position>,
    pub last_speed_kmh: f64,
    pub distance_travelled_km: f64,
    pub battery_level: Option<f64>,
    pub active_alerts: usize,
    #[serde(skip)]
    speed_total: f64,
    #[serde(skip)]
    speed_samples: usize,
}

impl TripRuntime {
    fn new(trip_id: &str, vehicle_id: &str) -> Self {
        Self {
            trip_id: trip_id.to_owned(),
            vehicle_id: vehicle_id.to_owned(),
            status: TripStatus::Scheduled,
            events_processed: 0,
            last_event: None,
            last_position: None,
            last_speed_kmh: 0.0,
            distance_travelled_km: 0.0,
            battery_level: None,
            active_alerts: 0,
            speed_total: 0.0,
            speed_samples: 0,
        }
    }

    pub fn average_speed_kmh(&self) -> f64 {
        if self.speed_samples == 0 {
            return 0.0;
        }
        round1(self.speed_total / self.speed_samples as f64)
    }

    fn apply(&mut self, event: &FleetEvent) {
        let event_type = event.event_type();
        self.events_processed += 1;
        self.last_event = Some(event_type);
        self.status = self.status.after(event_type);

        if let Some(context) = event.context() {
            self.last_position = Some(Position {
                lat: context.location.lat,
                lng: context.location.lng,
            });
            self.distance_travelled_km = context.distance_travelled_km;
            self.battery_level = Some(context.device.battery_level);
            if event_type == EventType::LocationPing {
                self.last_speed_kmh = context.movement.speed_kmh;
                self.speed_total += context.movement.speed_kmh;
                self.speed_samples += 1;
            }
        }

        match &event.kind {
            EventKind::TripStarted { location, .. } => self.last_position = Some(*location),
            EventKind::TripCompleted {
                location,
                total_distance_km,
                ..
            } => {
                self.last_position = Some(*location);
                self.distance_travelled_km = *total_distance_km;
                self.last_speed_kmh = 0.0;
            }
            EventKind::DeviceError { .. }
            | EventKind::SpeedViolation { .. }
            | EventKind::BatteryLow { .. }
            | EventKind::FuelLevelLow { .. } => self.active_alerts += 1,
            _ => {}
        }
    }
}

/// Fleet-wide counts at the replay clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetMetrics {
    pub scheduled: usize,
    pub active: usize,
    pub stopped: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub average_speed_kmh: f64,
    pub alerts: usize,
}

/// Simulated-clock cursor over a generated event stream.
#[derive(Debug, Default, Clone)]
pub struct ReplayEngine {
    events: Vec<FleetEvent>,
    cursor: usize,
    clock: Option<DateTime<Utc>>,
    trips: BTreeMap<String, TripRuntime>,
}

impl ReplayEngine {
    pub fn from_events(mut events: Vec<FleetEvent>) -> Self {
        sort_chronologically(&mut events);
        let mut engine = Self {
            events,
            ..Self::default()
        };
        engine.rewind();
        engine
    }

    /// Load either a bare JSON array of events or a full fleet dataset.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read event stream {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&contents)
            .with_context(|| format!("invalid JSON in {}", path.display()))?;
        let events = if value.is_array() {
            serde_json::from_value::<Vec<FleetEvent>>(value)
                .with_context(|| format!("invalid event array in {}", path.display()))?
        } else {
            serde_json::from_value::<FleetDataset>(value)
                .with_context(|| format!("invalid fleet dataset in {}", path.display()))?
                .events
        };
        Ok(Self::from_events(events))
    }

    pub fn events(&self) -> &[FleetEvent] {
        &self.events
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.events.first().map(|event| event.timestamp)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.events.last().map(|event| event.timestamp)
    }

    pub fn clock(&self) -> Option<DateTime<Utc>> {
        self.clock
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.events.len()
    }

    /// Back to before the first event; every trip returns to scheduled.
    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.clock = None;
        self.trips.clear();
        for event in &self.events {
            self.trips
                .entry(event.trip_id.clone())
                .or_insert_with(|| TripRuntime::new(&event.trip_id, &event.vehicle_id));
        }
    }

    /// Move the clock to `target`, clamped to the stream's span, and return
    /// the events applied by this step.
    pub fn step_to(&mut self, target: DateTime<Utc>) -> &[FleetEvent] {
        let (Some(first), Some(last)) = (self.start_time(), self.end_time()) else {
            return &[];
        };
        let target = target.clamp(first, last);
        if matches!(self.clock, Some(clock) if target < clock) {
            self.rewind();
        }

        let from = self.cursor;
        while let Some(event) = self.events.get(self.cursor) {
            if event.timestamp > target {
                break;
            }
            if let Some(runtime) = self.trips.get_mut(&event.trip_id) {
                runtime.apply(event);
            }
            self.cursor += 1;
        }
        self.clock = Some(target);
        &self.events[from..self.cursor]
    }

    /// Advance the clock by `step` from its current position (or the first event).
    pub fn step_by(&mut self, step: Duration) -> &[FleetEvent] {
        let Some(base) = self.clock.or_else(|| self.start_time()) else {
            return &[];
        };
        self.step_to(base + step)
    }

    pub fn trip(&self, trip_id: &str) -> Option<&TripRuntime> {
        self.trips.get(trip_id)
    }

    pub fn trips(&self) -> impl Iterator<Item = &TripRuntime> {
        self.trips.values()
    }

    pub fn metrics(&self) -> FleetMetrics {
        let mut metrics = FleetMetrics {
            scheduled: 0,
            active: 0,
            stopped: 0,
            completed: 0,
            cancelled: 0,
            average_speed_kmh: 0.0,
            alerts: 0,
        };
        let mut speed_total = 0.0;
        let mut speed_samples = 0;
        for runtime in self.trips.values() {
            match runtime.status {
                TripStatus::Scheduled => metrics.scheduled += 1,
                TripStatus::EnRoute => metrics.active += 1,
                TripStatus::Stopped => metrics.stopped += 1,
                TripStatus::Completed => metrics.completed += 1,
                TripStatus::Cancelled => metrics.cancelled += 1,
            }
            metrics.alerts += runtime.active_alerts;
            speed_total += runtime.speed_total;
            speed_samples += runtime.speed_samples;
        }
        if speed_samples > 0 {
            metrics.average_speed_kmh = round1(speed_total / speed_samples as f64);
        }
        metrics
    }
}
