//! ---
//! fleet_section: "02-simulation"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Telemetry synthesis engine and trip generators."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
//! Single-pass event synthesis over a trip's position samples.

use chrono::{DateTime, Utc};
use fleet_common::time::{elapsed_hours, elapsed_minutes};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assembly::sort_chronologically;
use crate::config::SimulationConfig;
use crate::error::{Result, SimError};
use crate::event::{
    round1, AmbientContext, CancellationReason, ErrorSeverity, EventKind, FleetEvent, Position,
    TelemetrySnapshot, TripIdentity, ViolationSeverity,
};
use crate::geo::{check_coordinates, total_distance_km, GeoPoint};
use crate::paired::{emit_paired, DurationWindow};
use crate::state::{SignalQuality, TripPhysicalState};

pub const BATTERY_LOW_THRESHOLD: f64 = 10.0;
pub const FUEL_LOW_THRESHOLD: f64 = 15.0;
pub const REFUEL_TRIGGER_LEVEL: f64 = 20.0;
pub const SEVERE_VIOLATION_MARGIN_KMH: f64 = 20.0;

const STOP_WINDOW: (f64, f64) = (0.1, 0.9);
const SIGNAL_LOSS_WINDOW: (f64, f64) = (0.2, 0.8);
const REFUEL_WINDOW: (f64, f64) = (0.1, 0.9);
const CANCELLATION_SPAN: (f64, f64) = (0.2, 0.7);

const STOP_DURATION: DurationWindow = DurationWindow::seconds(5.0 * 60.0, 30.0 * 60.0);
const SIGNAL_LOSS_DURATION: DurationWindow = DurationWindow::seconds(30.0, 150.0);
const REFUEL_DURATION: DurationWindow = DurationWindow::seconds(8.0 * 60.0, 20.0 * 60.0);

const DEVICE_ERRORS: [(&str, &str, &str); 4] = [
    (
        "sensor_malfunction",
        "ERR_FUEL_SENSOR_003",
        "Fuel level sensor reading invalid",
    ),
    (
        "gps_signal_weak",
        "ERR_GPS_WEAK_001",
        "GPS signal strength below threshold",
    ),
    ("memory_low", "ERR_MEM_LOW_002", "Device memory usage critical"),
    (
        "temperature_high",
        "ERR_TEMP_HIGH_004",
        "Device temperature exceeds safe limits",
    ),
];

const ERROR_SEVERITIES: [ErrorSeverity; 3] = [
    ErrorSeverity::Warning,
    ErrorSeverity::Error,
    ErrorSeverity::Critical,
];

/// Per-sample probabilities of the optional events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventRates {
    pub vehicle_stop: f64,
    pub signal_loss: f64,
    pub refuel: f64,
    pub telemetry: f64,
    pub device_error: f64,
    /// Gate applied only while the vehicle is overspeeding.
    pub speed_violation: f64,
}

impl Default for EventRates {
    fn default() -> Self {
        Self {
            vehicle_stop: 0.0005,
            signal_loss: 0.0005,
            refuel: 0.001,
            telemetry: 0.0008,
            device_error: 0.0005,
            speed_violation: 0.05,
        }
    }
}

impl EventRates {
    /// No optional events at all: only pings and lifecycle events.
    pub fn quiet() -> Self {
        Self {
            vehicle_stop: 0.0,
            signal_loss: 0.0,
            refuel: 0.0,
            telemetry: 0.0,
            device_error: 0.0,
            speed_violation: 0.0,
        }
    }
}

fn chance<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    if probability.is_nan() {
        return rng.gen_bool(0.0);
    }
    rng.gen_bool(probability.clamp(0.0, 1.0))
}

/// Everything needed to synthesize one trip.
#[derive(Debug, Clone)]
pub struct TripRequest {
    pub identity: TripIdentity,
    pub coordinates: Vec<GeoPoint>,
    pub start_time: DateTime<Utc>,
    pub sample_interval_secs: f64,
    /// 1.0 forces cancellation, 0.0 disables it.
    pub cancel_probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TripOutcome {
    Completed,
    Cancelled {
        at_sample: usize,
        reason: CancellationReason,
    },
}

impl TripOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Chronologically ordered events of one trip.
#[derive(Debug, Clone)]
pub struct TripStream {
    pub events: Vec<FleetEvent>,
    pub outcome: TripOutcome,
    pub config: SimulationConfig,
}

impl TripStream {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.events.first().map(|event| event.timestamp)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.events.last().map(|event| event.timestamp)
    }
}

/// Owns the trip's generator; one synthesizer produces one trip.
#[derive(Debug)]
pub struct TripSynthesizer<R = StdRng> {
    rng: R,
    config: Option<SimulationConfig>,
    rates: EventRates,
}

impl TripSynthesizer<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> TripSynthesizer<R> {
    /// The trip configuration is sampled from `rng` when the run starts.
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            config: None,
            rates: EventRates::default(),
        }
    }

    /// Use a caller-supplied configuration instead of sampling one.
    pub fn with_config(config: SimulationConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            rng,
            config: Some(config),
            rates: EventRates::default(),
        })
    }

    pub fn with_rates(mut self, rates: EventRates) -> Self {
        self.rates = rates;
        self
    }

    pub fn run(mut self, request: &TripRequest) -> Result<TripStream> {
        check_coordinates(&request.coordinates)?;
        if !request.sample_interval_secs.is_finite() || request.sample_interval_secs <= 0.0 {
            return Err(SimError::InvalidPlan {
                plan: request.identity.trip_id.clone(),
                reason: format!(
                    "sample interval must be positive, got {}",
                    request.sample_interval_secs
                ),
            });
        }

        let config = match self.config.take() {
            Some(config) => config,
            None => SimulationConfig::sample(&mut self.rng),
        };
        let rng = &mut self.rng;
        let rates = self.rates;
        let identity = &request.identity;
        let points = &request.coordinates;
        let samples = points.len();

        let cancel_at = if chance(rng, request.cancel_probability) {
            let fraction = rng.gen_range(CANCELLATION_SPAN.0..CANCELLATION_SPAN.1);
            // never the final sample
            Some(((samples as f64 * fraction).floor() as usize).min(samples - 2))
        } else {
            None
        };

        info!(
            trip_id = %identity.trip_id,
            vehicle_id = %identity.vehicle_id,
            samples,
            interval_secs = request.sample_interval_secs,
            cancel_at,
            "synthesizing trip"
        );

        let mut state = TripPhysicalState::new(&config, request.start_time);
        let mut events = Vec::with_capacity(samples + samples / 10 + 2);
        events.push(FleetEvent::new(
            rng,
            identity,
            request.start_time,
            EventKind::TripStarted {
                location: Position::from(&points[0]),
                planned_distance_km: total_distance_km(points).round() as u64,
                estimated_duration_hours: round1(
                    samples as f64 * request.sample_interval_secs / 3600.0,
                ),
            },
        ));

        let mut outcome = TripOutcome::Completed;
        let mut previous: Option<&GeoPoint> = None;

        for (index, point) in points.iter().enumerate() {
            let step = state.advance(
                &config,
                previous,
                point,
                request.sample_interval_secs,
                rng,
            );
            previous = Some(point);
            let context = AmbientContext::capture(&state, point, step.heading_degrees, rng);
            events.push(FleetEvent::new(
                rng,
                identity,
                state.timestamp,
                EventKind::LocationPing {
                    context: context.clone(),
                },
            ));

            if cancel_at == Some(index) {
                let reason = CancellationReason::ALL[rng.gen_range(0..CancellationReason::ALL.len())];
                debug!(trip_id = %identity.trip_id, index, %reason, "trip cancelled");
                events.push(FleetEvent::new(
                    rng,
                    identity,
                    state.timestamp,
                    EventKind::TripCancelled {
                        context,
                        cancellation_reason: reason,
                        distance_completed_km: round1(state.total_distance_km),
                        elapsed_time_minutes: elapsed_minutes(
                            request.start_time,
                            state.timestamp,
                        ),
                    },
                ));
                outcome = TripOutcome::Cancelled {
                    at_sample: index,
                    reason,
                };
                break;
            }

            let position = index as f64;
            let within = |window: (f64, f64)| {
                position > samples as f64 * window.0 && position < samples as f64 * window.1
            };

            if within(STOP_WINDOW) && chance(rng, rates.vehicle_stop) {
                let emission = emit_paired(
                    rng,
                    identity,
                    &context,
                    state.timestamp,
                    STOP_DURATION,
                    |context| EventKind::VehicleStopped { context },
                    |context, secs| EventKind::VehicleMoving {
                        context,
                        stop_duration_minutes: (secs / 60.0).round() as u64,
                    },
                );
                state.timestamp = emission.resume_at;
                events.extend(emission.events);
            }

            if within(SIGNAL_LOSS_WINDOW) && chance(rng, rates.signal_loss) {
                let emission = emit_paired(
                    rng,
                    identity,
                    &context,
                    state.timestamp,
                    SIGNAL_LOSS_DURATION,
                    |context| EventKind::SignalLost { context },
                    |context, secs| EventKind::SignalRecovered {
                        context,
                        signal_lost_duration_seconds: secs.round() as u64,
                        signal_quality_after_recovery: SignalQuality::Fair,
                    },
                );
                state.timestamp = emission.resume_at;
                state.signal_quality = SignalQuality::Fair;
                events.extend(emission.events);
            }

            if state.fuel_level <= REFUEL_TRIGGER_LEVEL
                && within(REFUEL_WINDOW)
                && chance(rng, rates.refuel)
            {
                let before = state.fuel_level;
                let target = (before + rng.gen_range(60.0..80.0)).min(100.0);
                let emission = emit_paired(
                    rng,
                    identity,
                    &context,
                    state.timestamp,
                    REFUEL_DURATION,
                    |context| EventKind::RefuelingStarted { context },
                    |context, secs| EventKind::RefuelingCompleted {
                        context,
                        refuel_duration_minutes: (secs / 60.0).round() as u64,
                        fuel_level_after_refuel: round1(target),
                        fuel_added_percent: round1(target - before),
                    },
                );
                debug!(trip_id = %identity.trip_id, index, before, target, "vehicle refuelled");
                state.timestamp = emission.resume_at;
                state.apply_refuel(target);
                events.extend(emission.events);
            }

            if chance(rng, rates.telemetry) {
                let telemetry = TelemetrySnapshot {
                    odometer_km: (state.total_distance_km + rng.gen_range(100_000.0..150_000.0))
                        .round() as u64,
                    fuel_level_percent: round1(state.fuel_level),
                    engine_hours: rng.gen_range(8_000.0_f64..10_000.0).round() as u64,
                    coolant_temp_celsius: round1(rng.gen_range(85.0..95.0)),
                    oil_pressure_kpa: round1(rng.gen_range(280.0..310.0)),
                    battery_voltage: round1(rng.gen_range(12.5..14.0)),
                };
                events.push(FleetEvent::new(
                    rng,
                    identity,
                    state.timestamp,
                    EventKind::VehicleTelemetry {
                        context: context.clone(),
                        telemetry,
                    },
                ));
            }

            if chance(rng, rates.device_error) {
                let (error_type, error_code, error_message) =
                    DEVICE_ERRORS[rng.gen_range(0..DEVICE_ERRORS.len())];
                let severity = ERROR_SEVERITIES[rng.gen_range(0..ERROR_SEVERITIES.len())];
                events.push(FleetEvent::new(
                    rng,
                    identity,
                    state.timestamp,
                    EventKind::DeviceError {
                        context: context.clone(),
                        error_type: error_type.to_owned(),
                        error_code: error_code.to_owned(),
                        error_message: error_message.to_owned(),
                        severity,
                    },
                ));
            }

            if state.overspeeding && chance(rng, rates.speed_violation) {
                let limit = config.speed_limit_kmh;
                let severity = if state.speed_kmh > limit + SEVERE_VIOLATION_MARGIN_KMH {
                    ViolationSeverity::Severe
                } else {
                    ViolationSeverity::Moderate
                };
                events.push(FleetEvent::new(
                    rng,
                    identity,
                    state.timestamp,
                    EventKind::SpeedViolation {
                        context: context.clone(),
                        speed_limit_kmh: limit.round() as u64,
                        violation_amount_kmh: (state.speed_kmh - limit).round().max(0.0) as u64,
                        severity,
                    },
                ));
            }

            if state.take_battery_low(BATTERY_LOW_THRESHOLD) {
                events.push(FleetEvent::new(
                    rng,
                    identity,
                    state.timestamp,
                    EventKind::BatteryLow {
                        context: context.clone(),
                        battery_level_percent: round1(state.battery_level),
                        threshold_percent: BATTERY_LOW_THRESHOLD,
                        estimated_remaining_hours: (state.battery_level
                            / config.battery_drain_rate
                            / 100.0)
                            .round() as u64,
                    },
                ));
            }

            if state.take_fuel_low(FUEL_LOW_THRESHOLD) {
                let estimated_range_km =
                    config.estimated_range_km(state.fuel_level).round() as u64;
                events.push(FleetEvent::new(
                    rng,
                    identity,
                    state.timestamp,
                    EventKind::FuelLevelLow {
                        context,
                        fuel_level_percent: round1(state.fuel_level),
                        threshold_percent: FUEL_LOW_THRESHOLD,
                        estimated_range_km,
                    },
                ));
            }
        }

        if !outcome.is_cancelled() {
            let last = &points[samples - 1];
            events.push(FleetEvent::new(
                rng,
                identity,
                state.timestamp,
                EventKind::TripCompleted {
                    location: Position::from(last),
                    total_distance_km: round1(state.total_distance_km),
                    total_duration_hours: elapsed_hours(request.start_time, state.timestamp),
                    fuel_consumed_percent: round1(config.initial_fuel_level - state.fuel_level),
                },
            ));
        }

        sort_chronologically(&mut events);
        info!(
            trip_id = %identity.trip_id,
            events = events.len(),
            distance_km = round1(state.total_distance_km),
            cancelled = outcome.is_cancelled(),
            "trip synthesized"
        );

        Ok(TripStream {
            events,
            outcome,
            config,
        })
    }
}
