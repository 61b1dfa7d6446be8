//! ---
//! fleet_section: "02-simulation"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Telemetry synthesis engine and trip generators."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
//! Trip plans, scenario event profiles and the built-in five-trip fleet.

use std::time::Duration;

use chrono::{DateTime, Utc};
use fleet_common::{AppConfig, TripEntry};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::{Result, SimError};
use crate::event::TripIdentity;
use crate::geo::{GeoPoint, Route};
use crate::synth::{EventRates, TripRequest};

/// Average speed used to derive a sample count from route length.
pub const PLANNING_SPEED_KMH: f64 = 50.0;

/// 2025-11-03T00:00:00Z
const FLEET_DAY_EPOCH_SECS: i64 = 1_762_128_000;

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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ScenarioKind {
    LongHaul,
    Urban,
    Mountain,
    Technical,
    Regional,
}

impl ScenarioKind {
    /// Optional-event probabilities for trips of this kind.
    pub fn rates(self) -> EventRates {
        let base = EventRates::default();
        match self {
            Self::LongHaul => base,
            Self::Urban => EventRates {
                vehicle_stop: base.vehicle_stop * 4.0,
                ..base
            },
            Self::Mountain => EventRates {
                signal_loss: base.signal_loss * 4.0,
                ..base
            },
            Self::Technical => EventRates {
                device_error: 0.005,
                signal_loss: base.signal_loss * 6.0,
                telemetry: base.telemetry * 2.0,
                ..base
            },
            Self::Regional => EventRates {
                refuel: 0.005,
                telemetry: base.telemetry * 2.0,
                ..base
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripPlan {
    pub name: String,
    pub description: Option<String>,
    pub scenario: ScenarioKind,
    pub identity: TripIdentity,
    pub start_time: DateTime<Utc>,
    pub sample_interval: Duration,
    /// Derived from route length when unset.
    pub samples: Option<usize>,
    pub cancel_probability: f64,
    pub route: Vec<GeoPoint>,
    pub seed: Option<u64>,
}

impl TripPlan {
    pub fn from_entry(name: &str, entry: &TripEntry) -> Result<Self> {
        let scenario = entry
            .scenario
            .parse::<ScenarioKind>()
            .map_err(|_| invalid(name, format!("unknown scenario '{}'", entry.scenario)))?;
        let plan = Self {
            name: name.to_owned(),
            description: entry.description.clone(),
            scenario,
            identity: TripIdentity::new(&entry.vehicle_id, &entry.trip_id, &entry.device_id),
            start_time: entry.start_time,
            sample_interval: entry.sample_interval,
            samples: entry.samples,
            cancel_probability: entry.cancel_probability,
            route: entry
                .route
                .iter()
                .map(|waypoint| GeoPoint {
                    lat: waypoint.lat,
                    lng: waypoint.lng,
                    label: waypoint.label.clone(),
                })
                .collect(),
            seed: entry.seed,
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<()> {
        if self.route.len() < 2 {
            return Err(SimError::RouteTooShort {
                points: self.route.len(),
            });
        }
        if self.sample_interval.is_zero() {
            return Err(invalid(&self.name, "sample interval must be positive"));
        }
        if matches!(self.samples, Some(samples) if samples < 2) {
            return Err(invalid(&self.name, "at least two samples are required"));
        }
        if !(0.0..=1.0).contains(&self.cancel_probability) {
            return Err(invalid(
                &self.name,
                format!("cancel probability {} outside 0..=1", self.cancel_probability),
            ));
        }
        Ok(())
    }

    pub fn rates(&self) -> EventRates {
        self.scenario.rates()
    }

    pub fn planned_stops(&self) -> Vec<String> {
        self.route
            .iter()
            .filter_map(|point| point.label.clone())
            .collect()
    }

    /// Samples needed to cover `distance_km` at the planning speed, at least two.
    pub fn sample_count(&self, distance_km: f64) -> usize {
        if let Some(samples) = self.samples {
            return samples;
        }
        let km_per_sample = PLANNING_SPEED_KMH * self.sample_interval.as_secs_f64() / 3600.0;
        if km_per_sample <= 0.0 {
            return 2;
        }
        ((distance_km / km_per_sample).ceil() as usize).max(2)
    }

    /// Densify the route skeleton into a synthesis request.
    pub fn request(&self) -> Result<TripRequest> {
        self.validate()?;
        let route = Route::new(self.route.clone())?;
        let samples = self.sample_count(route.total_distance_km());
        Ok(TripRequest {
            identity: self.identity.clone(),
            coordinates: route.densify(samples)?,
            start_time: self.start_time,
            sample_interval_secs: self.sample_interval.as_secs_f64(),
            cancel_probability: self.cancel_probability,
        })
    }
}

fn invalid(plan: &str, reason: impl Into<String>) -> SimError {
    SimError::InvalidPlan {
        plan: plan.to_owned(),
        reason: reason.into(),
    }
}

/// Trips declared in configuration, or the built-in fleet when none are.
pub fn plans_from_config(config: &AppConfig) -> Result<Vec<TripPlan>> {
    if config.trips.is_empty() {
        return Ok(default_fleet());
    }
    config
        .trips
        .iter()
        .map(|(name, entry)| TripPlan::from_entry(name, entry))
        .collect()
}

fn fleet_day_at(hour: i64) -> DateTime<Utc> {
    // the default value is the Unix epoch
    DateTime::<Utc>::default() + chrono::Duration::seconds(FLEET_DAY_EPOCH_SECS + hour * 3600)
}

struct FleetTemplate {
    name: &'static str,
    description: &'static str,
    scenario: ScenarioKind,
    interval_secs: u64,
    cancel_probability: f64,
    route: &'static [(&'static str, f64, f64)],
}

const FLEET_TEMPLATES: [FleetTemplate; 5] = [
    FleetTemplate {
        name: "cross_country_long_haul",
        description: "Cross-country long haul from Seattle to Newark",
        scenario: ScenarioKind::LongHaul,
        interval_secs: 90,
        cancel_probability: 0.0,
        route: &[
            ("Seattle, WA", 47.6062, -122.3321),
            ("Boise, ID", 43.615, -116.2023),
            ("Cheyenne, WY", 41.1403, -104.8202),
            ("Kansas City, MO", 39.0997, -94.5786),
            ("Columbus, OH", 39.9612, -82.9988),
            ("Newark, NJ", 40.7357, -74.1724),
        ],
    },
    FleetTemplate {
        name: "urban_dense_delivery",
        description: "Dense delivery loop across New York boroughs",
        scenario: ScenarioKind::Urban,
        interval_secs: 25,
        cancel_probability: 0.0,
        route: &[
            ("Brooklyn, NY", 40.6782, -73.9442),
            ("Midtown Manhattan, NY", 40.7549, -73.984),
            ("Queens, NY", 40.7282, -73.7949),
            ("Bronx, NY", 40.8448, -73.8648),
            ("Staten Island, NY", 40.5795, -74.1502),
        ],
    },
    FleetTemplate {
        name: "mountain_route_cancelled",
        description: "Mountain route over Vail Pass, cancelled en route",
        scenario: ScenarioKind::Mountain,
        interval_secs: 45,
        cancel_probability: 1.0,
        route: &[
            ("Denver, CO", 39.7392, -104.9903),
            ("Georgetown, CO", 39.7061, -105.6972),
            ("Vail Pass, CO", 39.5339, -106.1555),
            ("Aspen, CO", 39.1911, -106.8175),
        ],
    },
    FleetTemplate {
        name: "southern_technical_issues",
        description: "Southern corridor with frequent device faults",
        scenario: ScenarioKind::Technical,
        interval_secs: 50,
        cancel_probability: 0.0,
        route: &[
            ("Dallas, TX", 32.7767, -96.797),
            ("Shreveport, LA", 32.5252, -93.7502),
            ("Jackson, MS", 32.2988, -90.1848),
            ("Montgomery, AL", 32.3792, -86.3077),
            ("Atlanta, GA", 33.749, -84.388),
            ("Savannah, GA", 32.0809, -81.0912),
        ],
    },
    FleetTemplate {
        name: "regional_logistics",
        description: "Midwest regional logistics run",
        scenario: ScenarioKind::Regional,
        interval_secs: 35,
        cancel_probability: 0.0,
        route: &[
            ("Chicago, IL", 41.8781, -87.6298),
            ("Milwaukee, WI", 43.0389, -87.9065),
            ("Madison, WI", 43.0731, -89.4012),
            ("Rockford, IL", 42.2711, -89.0937),
            ("Peoria, IL", 40.6936, -89.589),
            ("Springfield, IL", 39.7817, -89.6501),
            ("St. Louis, MO", 38.627, -90.1994),
        ],
    },
];

/// Five trips starting an hour apart on 2025-11-03 from 08:00 UTC.
pub fn default_fleet() -> Vec<TripPlan> {
    FLEET_TEMPLATES
        .iter()
        .enumerate()
        .map(|(index, template)| {
            let number = index + 1;
            let hour = 8 + index as i64;
            TripPlan {
                name: template.name.to_owned(),
                description: Some(template.description.to_owned()),
                scenario: template.scenario,
                identity: TripIdentity::new(
                    format!("VH_{number:03}"),
                    format!("trip_20251103_{hour:02}0000"),
                    format!("GPS_DEVICE_{number:03}"),
                ),
                start_time: fleet_day_at(hour),
                sample_interval: Duration::from_secs(template.interval_secs),
                samples: None,
                cancel_probability: template.cancel_probability,
                route: template
                    .route
                    .iter()
                    .map(|(label, lat, lng)| GeoPoint::labelled(*lat, *lng, *label))
                    .collect(),
                seed: None,
            }
        })
        .collect()
}
