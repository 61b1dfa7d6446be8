//! ---
//! fleet_section: "02-simulation"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Telemetry synthesis engine and trip generators."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
//! Mutable per-trip physical state and its per-sample update rules.

use chrono::{DateTime, Utc};
use fleet_common::time::advance_secs;
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::config::SimulationConfig;
use crate::geo::{bearing_degrees, distance_km, GeoPoint};

/// Battery level at or below which charging may start.
pub const CHARGE_START_LEVEL: f64 = 10.0;
/// Chance per sample that a depleted device is put on charge.
pub const CHARGE_START_PROBABILITY: f64 = 0.1;
pub const CHARGE_RATE_MULTIPLIER: f64 = 3.0;
pub const FULL_BATTERY: f64 = 100.0;

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
pub enum SignalQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl SignalQuality {
    /// Category implied by a GPS accuracy radius in metres.
    pub fn from_accuracy(accuracy_meters: f64) -> Self {
        if accuracy_meters > 50.0 {
            Self::Poor
        } else if accuracy_meters > 20.0 {
            Self::Fair
        } else if accuracy_meters > 12.0 {
            Self::Good
        } else {
            Self::Excellent
        }
    }

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let all: Vec<Self> = Self::iter().collect();
        all[rng.gen_range(0..all.len())]
    }
}

/// Result of a single state update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub segment_distance_km: f64,
    pub elapsed_secs: f64,
    pub heading_degrees: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripPhysicalState {
    pub timestamp: DateTime<Utc>,
    pub total_distance_km: f64,
    pub speed_kmh: f64,
    pub fuel_level: f64,
    pub battery_level: f64,
    pub battery_charging: bool,
    pub charging_start_level: Option<f64>,
    pub signal_quality: SignalQuality,
    pub overspeeding: bool,
    pub battery_low_triggered: bool,
    pub fuel_low_triggered: bool,
}

impl TripPhysicalState {
    pub fn new(config: &SimulationConfig, start: DateTime<Utc>) -> Self {
        Self {
            timestamp: start,
            total_distance_km: 0.0,
            speed_kmh: config.initial_speed,
            fuel_level: config.initial_fuel_level,
            battery_level: config.initial_battery_level,
            battery_charging: false,
            charging_start_level: None,
            signal_quality: SignalQuality::Excellent,
            overspeeding: false,
            battery_low_triggered: false,
            fuel_low_triggered: false,
        }
    }

    /// Move the state forward to `current`, arriving from `previous`.
    ///
    /// The order is fixed: distance, speed random walk, clock, fuel burn,
    /// battery drain or charge, signal drift, overspeed flag, heading. The
    /// generator is consumed in the same order on every call so a seeded run
    /// is reproducible.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        config: &SimulationConfig,
        previous: Option<&GeoPoint>,
        current: &GeoPoint,
        nominal_interval_secs: f64,
        rng: &mut R,
    ) -> StepOutcome {
        let segment_distance_km = previous.map_or(0.0, |prev| distance_km(prev, current));
        self.total_distance_km += segment_distance_km;

        let step = (rng.gen::<f64>() - 0.5) * config.speed_variation;
        self.speed_kmh = (self.speed_kmh + step).clamp(config.min_speed, config.max_speed);

        let elapsed_secs = if segment_distance_km > 0.0 && self.speed_kmh > 0.0 {
            segment_distance_km / self.speed_kmh * 3600.0
        } else {
            nominal_interval_secs
        };
        self.timestamp = advance_secs(self.timestamp, elapsed_secs);

        self.fuel_level = (self.fuel_level - segment_distance_km * config.fuel_efficiency)
            .max(config.min_fuel_level);

        self.update_battery(config, rng);

        if rng.gen_bool(config.signal_change_probability.clamp(0.0, 1.0)) {
            self.signal_quality = SignalQuality::random(rng);
        }

        self.overspeeding = self.speed_kmh > config.overspeed_threshold_kmh();

        let heading_degrees = previous.map_or(0.0, |prev| bearing_degrees(prev, current));

        StepOutcome {
            segment_distance_km,
            elapsed_secs,
            heading_degrees,
        }
    }

    fn update_battery<R: Rng + ?Sized>(&mut self, config: &SimulationConfig, rng: &mut R) {
        if self.battery_charging {
            self.battery_level = (self.battery_level
                + config.battery_drain_rate * CHARGE_RATE_MULTIPLIER)
                .min(FULL_BATTERY);
            if self.battery_level >= FULL_BATTERY {
                self.battery_charging = false;
                self.charging_start_level = None;
                self.battery_low_triggered = false;
            }
            return;
        }

        self.battery_level =
            (self.battery_level - config.battery_drain_rate).max(config.min_battery_level);
        if self.battery_level <= CHARGE_START_LEVEL && rng.gen_bool(CHARGE_START_PROBABILITY) {
            self.battery_charging = true;
            self.charging_start_level = Some(self.battery_level);
        }
    }

    /// Fill the tank to `target` percent and re-arm the low-fuel alert.
    pub fn apply_refuel(&mut self, target: f64) {
        self.fuel_level = target.min(100.0);
        self.fuel_low_triggered = false;
    }

    /// True exactly once per discharge cycle while the battery sits at or
    /// below `threshold`.
    pub fn take_battery_low(&mut self, threshold: f64) -> bool {
        if self.battery_level <= threshold && !self.battery_low_triggered {
            self.battery_low_triggered = true;
            return true;
        }
        false
    }

    /// True exactly once between refuels while fuel sits at or below `threshold`.
    pub fn take_fuel_low(&mut self, threshold: f64) -> bool {
        if self.fuel_level <= threshold && !self.fuel_low_triggered {
            self.fuel_low_triggered = true;
            return true;
        }
        false
    }
}
