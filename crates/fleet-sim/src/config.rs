//! ---
//! fleet_section: "02-simulation"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Telemetry synthesis engine and trip generators."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use std::ops::Range;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

pub const INITIAL_FUEL_LEVEL: Range<f64> = 85.0..100.0;
pub const MIN_FUEL_LEVEL: Range<f64> = 3.0..10.0;
pub const FUEL_EFFICIENCY: Range<f64> = 0.08..0.16;
pub const INITIAL_BATTERY_LEVEL: Range<f64> = 90.0..100.0;
pub const MIN_BATTERY_LEVEL: Range<f64> = 2.0..8.0;
pub const BATTERY_DRAIN_RATE: Range<f64> = 0.0005..0.0015;
pub const INITIAL_SPEED: Range<f64> = 40.0..60.0;
pub const MIN_SPEED: Range<f64> = 15.0..25.0;
pub const MAX_SPEED: Range<f64> = 80.0..140.0;
pub const SPEED_VARIATION: Range<f64> = 5.0..15.0;
pub const SIGNAL_CHANGE_PROBABILITY: Range<f64> = 0.02..0.08;
pub const SPEED_LIMIT_KMH: Range<f64> = 80.0..120.0;
pub const SPEED_TOLERANCE: Range<f64> = 8.0..15.0;
pub const FUEL_TANK_CAPACITY_LITERS: Range<f64> = 60.0..140.0;

/// Per-trip vehicle and device parameters, fixed for the lifetime of a trip.
///
/// Fuel and battery levels are percentages. `fuel_efficiency` drains the fuel
/// level per kilometre and doubles as litres per kilometre for range
/// estimates; `battery_drain_rate` is the battery percentage lost per
/// position sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub initial_fuel_level: f64,
    pub min_fuel_level: f64,
    pub fuel_efficiency: f64,
    pub initial_battery_level: f64,
    pub min_battery_level: f64,
    pub battery_drain_rate: f64,
    pub initial_speed: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub speed_variation: f64,
    pub signal_change_probability: f64,
    pub speed_limit_kmh: f64,
    pub speed_tolerance: f64,
    pub fuel_tank_capacity_liters: f64,
}

impl SimulationConfig {
    /// Derive a fresh trip configuration from the trip's generator.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            initial_fuel_level: rng.gen_range(INITIAL_FUEL_LEVEL),
            min_fuel_level: rng.gen_range(MIN_FUEL_LEVEL),
            fuel_efficiency: rng.gen_range(FUEL_EFFICIENCY),
            initial_battery_level: rng.gen_range(INITIAL_BATTERY_LEVEL),
            min_battery_level: rng.gen_range(MIN_BATTERY_LEVEL),
            battery_drain_rate: rng.gen_range(BATTERY_DRAIN_RATE),
            initial_speed: rng.gen_range(INITIAL_SPEED),
            min_speed: rng.gen_range(MIN_SPEED),
            max_speed: rng.gen_range(MAX_SPEED),
            speed_variation: rng.gen_range(SPEED_VARIATION),
            signal_change_probability: rng.gen_range(SIGNAL_CHANGE_PROBABILITY),
            speed_limit_kmh: rng.gen_range(SPEED_LIMIT_KMH),
            speed_tolerance: rng.gen_range(SPEED_TOLERANCE),
            fuel_tank_capacity_liters: rng.gen_range(FUEL_TANK_CAPACITY_LITERS),
        }
    }

    /// Kilometres left on `fuel_level` percent of the tank.
    pub fn estimated_range_km(&self, fuel_level: f64) -> f64 {
        let litres = fuel_level / 100.0 * self.fuel_tank_capacity_liters;
        litres / self.fuel_efficiency
    }

    /// Check every field against its documented band (bounds inclusive).
    pub fn validate(&self) -> Result<()> {
        let bands = [
            ("initial_fuel_level", self.initial_fuel_level, INITIAL_FUEL_LEVEL),
            ("min_fuel_level", self.min_fuel_level, MIN_FUEL_LEVEL),
            ("fuel_efficiency", self.fuel_efficiency, FUEL_EFFICIENCY),
            (
                "initial_battery_level",
                self.initial_battery_level,
                INITIAL_BATTERY_LEVEL,
            ),
            ("min_battery_level", self.min_battery_level, MIN_BATTERY_LEVEL),
            ("battery_drain_rate", self.battery_drain_rate, BATTERY_DRAIN_RATE),
            ("initial_speed", self.initial_speed, INITIAL_SPEED),
            ("min_speed", self.min_speed, MIN_SPEED),
            ("max_speed", self.max_speed, MAX_SPEED),
            ("speed_variation", self.speed_variation, SPEED_VARIATION),
            (
                "signal_change_probability",
                self.signal_change_probability,
                SIGNAL_CHANGE_PROBABILITY,
            ),
            ("speed_limit_kmh", self.speed_limit_kmh, SPEED_LIMIT_KMH),
            ("speed_tolerance", self.speed_tolerance, SPEED_TOLERANCE),
            (
                "fuel_tank_capacity_liters",
                self.fuel_tank_capacity_liters,
                FUEL_TANK_CAPACITY_LITERS,
            ),
        ];
        for (field, value, band) in bands {
            if !(band.start..=band.end).contains(&value) {
                return Err(SimError::InvalidConfigRange {
                    field,
                    value,
                    min: band.start,
                    max: band.end,
                });
            }
        }
        Ok(())
    }

    /// Speed above which the vehicle counts as overspeeding.
    pub fn overspeed_threshold_kmh(&self) -> f64 {
        self.speed_limit_kmh + self.speed_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn sampled_configs_stay_within_bands() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let config = SimulationConfig::sample(&mut rng);
            config.validate().unwrap();
            assert!(config.min_speed < config.initial_speed);
            assert!(config.initial_speed < config.max_speed);
        }
    }

    #[test]
    fn same_seed_samples_same_config() {
        let a = SimulationConfig::sample(&mut StdRng::seed_from_u64(9));
        let b = SimulationConfig::sample(&mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn range_scales_with_tank_capacity() {
        let mut config = SimulationConfig::sample(&mut StdRng::seed_from_u64(4));
        config.fuel_efficiency = 0.1;
        config.fuel_tank_capacity_liters = 60.0;
        assert!((config.estimated_range_km(15.0) - 90.0).abs() < 1e-9);
        config.fuel_tank_capacity_liters = 120.0;
        assert!((config.estimated_range_km(15.0) - 180.0).abs() < 1e-9);
        assert_eq!(config.estimated_range_km(0.0), 0.0);
    }

    #[test]
    fn validate_names_offending_field() {
        let mut config = SimulationConfig::sample(&mut StdRng::seed_from_u64(1));
        config.fuel_efficiency = 0.5;
        match config.validate() {
            Err(SimError::InvalidConfigRange { field, value, .. }) => {
                assert_eq!(field, "fuel_efficiency");
                assert_eq!(value, 0.5);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_nan() {
        let mut config = SimulationConfig::sample(&mut StdRng::seed_from_u64(2));
        config.max_speed = f64::NAN;
        assert!(config.validate().is_err());
    }
}
