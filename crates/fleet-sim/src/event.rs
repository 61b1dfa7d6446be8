//! ---
//! fleet_section: "02-simulation"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Telemetry synthesis engine and trip generators."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
//! Event records emitted by the synthesis loop.
//!
//! Every event serializes to a single flat JSON object: the common identity
//! fields, an `event_type` discriminant, and the type-specific payload. Loop
//! events additionally carry the [`AmbientContext`] of the sample that
//! produced them.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::state::{SignalQuality, TripPhysicalState};

pub const MOVING_SPEED_KMH: f64 = 1.0;

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Identifiers shared by every event of one trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripIdentity {
    pub vehicle_id: String,
    pub trip_id: String,
    pub device_id: String,
}

impl TripIdentity {
    pub fn new(
        vehicle_id: impl Into<String>,
        trip_id: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            trip_id: trip_id.into(),
            device_id: device_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl From<&GeoPoint> for Position {
    fn from(point: &GeoPoint) -> Self {
        Self {
            lat: point.lat,
            lng: point.lng,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub lat: f64,
    pub lng: f64,
    pub accuracy_meters: f64,
    pub altitude_meters: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub speed_kmh: f64,
    pub heading_degrees: f64,
    pub moving: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub battery_level: f64,
    pub charging: bool,
    pub signal_quality: SignalQuality,
}

/// Snapshot of the vehicle at the sample that produced an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbientContext {
    pub location: LocationFix,
    pub movement: Movement,
    pub distance_travelled_km: f64,
    /// Derived from GPS accuracy.
    pub signal_quality: SignalQuality,
    pub device: DeviceStatus,
    pub overspeed: bool,
}

impl AmbientContext {
    /// Capture the current state at `point`, drawing a GPS fix quality.
    pub fn capture<R: Rng + ?Sized>(
        state: &TripPhysicalState,
        point: &GeoPoint,
        heading_degrees: f64,
        rng: &mut R,
    ) -> Self {
        let accuracy_meters = round1(rng.gen_range(5.0..15.0));
        let altitude_meters = round1(rng.gen_range(10.0..110.0));
        Self {
            location: LocationFix {
                lat: point.lat,
                lng: point.lng,
                accuracy_meters,
                altitude_meters,
            },
            movement: Movement {
                speed_kmh: round1(state.speed_kmh),
                heading_degrees: round1(heading_degrees),
                moving: state.speed_kmh > MOVING_SPEED_KMH,
            },
            distance_travelled_km: round1(state.total_distance_km),
            signal_quality: SignalQuality::from_accuracy(accuracy_meters),
            device: DeviceStatus {
                battery_level: round1(state.battery_level),
                charging: state.battery_charging,
                signal_quality: state.signal_quality,
            },
            overspeed: state.overspeeding,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub odometer_km: u64,
    pub fuel_level_percent: f64,
    pub engine_hours: u64,
    pub coolant_temp_celsius: f64,
    pub oil_pressure_kpa: f64,
    pub battery_voltage: f64,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorSeverity {
    Warning,
    Error,
    Critical,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ViolationSeverity {
    Moderate,
    Severe,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CancellationReason {
    VehicleMalfunction,
    DriverEmergency,
    WeatherConditions,
    RoadClosure,
    MechanicalFailure,
}

impl CancellationReason {
    pub const ALL: [Self; 5] = [
        Self::VehicleMalfunction,
        Self::DriverEmergency,
        Self::WeatherConditions,
        Self::RoadClosure,
        Self::MechanicalFailure,
    ];
}

/// Discriminant of an event, usable without the payload.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    TripStarted,
    LocationPing,
    VehicleTelemetry,
    DeviceError,
    SpeedViolation,
    BatteryLow,
    FuelLevelLow,
    VehicleStopped,
    VehicleMoving,
    SignalLost,
    SignalRecovered,
    RefuelingStarted,
    RefuelingCompleted,
    TripCancelled,
    TripCompleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventKind {
    TripStarted {
        location: Position,
        planned_distance_km: u64,
        estimated_duration_hours: f64,
    },
    LocationPing {
        #[serde(flatten)]
        context: AmbientContext,
    },
    VehicleTelemetry {
        #[serde(flatten)]
        context: AmbientContext,
        telemetry: TelemetrySnapshot,
    },
    DeviceError {
        #[serde(flatten)]
        context: AmbientContext,
        error_type: String,
        error_code: String,
        error_message: String,
        severity: ErrorSeverity,
    },
    SpeedViolation {
        #[serde(flatten)]
        context: AmbientContext,
        speed_limit_kmh: u64,
        violation_amount_kmh: u64,
        severity: ViolationSeverity,
    },
    BatteryLow {
        #[serde(flatten)]
        context: AmbientContext,
        battery_level_percent: f64,
        threshold_percent: f64,
        estimated_remaining_hours: u64,
    },
    FuelLevelLow {
        #[serde(flatten)]
        context: AmbientContext,
        fuel_level_percent: f64,
        threshold_percent: f64,
        estimated_range_km: u64,
    },
    VehicleStopped {
        #[serde(flatten)]
        context: AmbientContext,
    },
    VehicleMoving {
        #[serde(flatten)]
        context: AmbientContext,
        stop_duration_minutes: u64,
    },
    SignalLost {
        #[serde(flatten)]
        context: AmbientContext,
    },
    SignalRecovered {
        #[serde(flatten)]
        context: AmbientContext,
        signal_lost_duration_seconds: u64,
        signal_quality_after_recovery: SignalQuality,
    },
    RefuelingStarted {
        #[serde(flatten)]
        context: AmbientContext,
    },
    RefuelingCompleted {
        #[serde(flatten)]
        context: AmbientContext,
        refuel_duration_minutes: u64,
        fuel_level_after_refuel: f64,
        fuel_added_percent: f64,
    },
    TripCancelled {
        #[serde(flatten)]
        context: AmbientContext,
        cancellation_reason: CancellationReason,
        distance_completed_km: f64,
        elapsed_time_minutes: u64,
    },
    TripCompleted {
        location: Position,
        total_distance_km: f64,
        total_duration_hours: f64,
        fuel_consumed_percent: f64,
    },
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::TripStarted { .. } => EventType::TripStarted,
            Self::LocationPing { .. } => EventType::LocationPing,
            Self::VehicleTelemetry { .. } => EventType::VehicleTelemetry,
            Self::DeviceError { .. } => EventType::DeviceError,
            Self::SpeedViolation { .. } => EventType::SpeedViolation,
            Self::BatteryLow { .. } => EventType::BatteryLow,
            Self::FuelLevelLow { .. } => EventType::FuelLevelLow,
            Self::VehicleStopped { .. } => EventType::VehicleStopped,
            Self::VehicleMoving { .. } => EventType::VehicleMoving,
            Self::SignalLost { .. } => EventType::SignalLost,
            Self::SignalRecovered { .. } => EventType::SignalRecovered,
            Self::RefuelingStarted { .. } => EventType::RefuelingStarted,
            Self::RefuelingCompleted { .. } => EventType::RefuelingCompleted,
            Self::TripCancelled { .. } => EventType::TripCancelled,
            Self::TripCompleted { .. } => EventType::TripCompleted,
        }
    }

    /// Ambient context for loop events; `None` for the lifecycle bookends.
    pub fn context(&self) -> Option<&AmbientContext> {
        match self {
            Self::TripStarted { .. } | Self::TripCompleted { .. } => None,
            Self::LocationPing { context }
            | Self::VehicleTelemetry { context, .. }
            | Self::DeviceError { context, .. }
            | Self::SpeedViolation { context, .. }
            | Self::BatteryLow { context, .. }
            | Self::FuelLevelLow { context, .. }
            | Self::VehicleStopped { context }
            | Self::VehicleMoving { context, .. }
            | Self::SignalLost { context }
            | Self::SignalRecovered { context, .. }
            | Self::RefuelingStarted { context }
            | Self::RefuelingCompleted { context, .. }
            | Self::TripCancelled { context, .. } => Some(context),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub vehicle_id: String,
    pub trip_id: String,
    pub device_id: String,
    #[serde(flatten)]
    pub kind: EventKind,
}

fn event_id<R: Rng + ?Sized>(rng: &mut R, identity: &TripIdentity) -> Uuid {
    let salt: [u8; 16] = rng.gen();
    let mut name = Vec::with_capacity(
        identity.vehicle_id.len() + identity.trip_id.len() + identity.device_id.len() + 19,
    );
    for part in [&identity.vehicle_id, &identity.trip_id, &identity.device_id] {
        name.extend_from_slice(part.as_bytes());
        name.push(b'/');
    }
    name.extend_from_slice(&salt);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, &name)
}

impl FleetEvent {
    /// Build an event whose id hashes the trip identity together with bytes
    /// drawn from the trip's own generator, so trips sharing a seed still
    /// get distinct ids.
    pub fn new<R: Rng + ?Sized>(
        rng: &mut R,
        identity: &TripIdentity,
        timestamp: DateTime<Utc>,
        kind: EventKind,
    ) -> Self {
        Self {
            event_id: event_id(rng, identity),
            timestamp,
            vehicle_id: identity.vehicle_id.clone(),
            trip_id: identity.trip_id.clone(),
            device_id: identity.device_id.clone(),
            kind,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    pub fn context(&self) -> Option<&AmbientContext> {
        self.kind.context()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::TripCompleted { .. } | EventKind::TripCancelled { .. }
        )
    }
}
