//! ---
//! fleet_section: "02-simulation"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Telemetry synthesis engine and trip generators."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tracing::{info, info_span};

use crate::assembly::{merge_streams, DatasetMetadata, FleetDataset, TripSummary};
use crate::error::Result;
use crate::event::{round1, FleetEvent};
use crate::geo::total_distance_km;
use crate::scenario::{default_fleet, TripPlan};
use crate::synth::{TripStream, TripSynthesizer};

/// Generator seed for the trip at `index` when its plan does not pin one.
pub fn derive_trip_seed(fleet_seed: u64, index: usize) -> u64 {
    // splitmix64 finalizer
    let mut z = fleet_seed.wrapping_add((index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[derive(Debug, Clone)]
pub struct GeneratedTrip {
    pub plan: TripPlan,
    pub seed: u64,
    pub stream: TripStream,
}

impl GeneratedTrip {
    pub fn summary(&self) -> TripSummary {
        TripSummary {
            trip_id: self.plan.identity.trip_id.clone(),
            vehicle_id: self.plan.identity.vehicle_id.clone(),
            device_id: self.plan.identity.device_id.clone(),
            name: self.plan.name.clone(),
            description: self.plan.description.clone(),
            scenario: self.plan.scenario,
            planned_stops: self.plan.planned_stops(),
            planned_distance_km: round1(total_distance_km(&self.plan.route)),
            start_time: self.stream.start_time().unwrap_or(self.plan.start_time),
            end_time: self.stream.end_time().unwrap_or(self.plan.start_time),
            event_count: self.stream.events.len(),
            outcome: self.stream.outcome,
        }
    }
}

/// Generated trips in plan order.
#[derive(Debug, Clone)]
pub struct FleetRun {
    pub seed: u64,
    pub trips: Vec<GeneratedTrip>,
}

impl FleetRun {
    pub fn merged_events(&self) -> Vec<FleetEvent> {
        merge_streams(self.trips.iter().map(|trip| &trip.stream))
    }

    pub fn dataset(&self, generated_at: DateTime<Utc>) -> FleetDataset {
        let events = self.merged_events();
        let cancelled = self
            .trips
            .iter()
            .filter(|trip| trip.stream.outcome.is_cancelled())
            .count();
        FleetDataset {
            generated_at,
            trips: self.trips.iter().map(GeneratedTrip::summary).collect(),
            metadata: DatasetMetadata {
                notes: vec![
                    format!("fleet seed {}", self.seed),
                    format!(
                        "{} trips ({} cancelled), {} events",
                        self.trips.len(),
                        cancelled,
                        events.len()
                    ),
                ],
                ..DatasetMetadata::default()
            },
            events,
        }
    }
}

/// Runs every plan with its own generator and collects the streams.
#[derive(Debug, Clone)]
pub struct FleetGenerator {
    seed: u64,
    plans: Vec<TripPlan>,
}

impl FleetGenerator {
    pub fn new(seed: u64, plans: Vec<TripPlan>) -> Self {
        Self { seed, plans }
    }

    pub fn with_default_fleet(seed: u64) -> Self {
        Self::new(seed, default_fleet())
    }

    pub fn plans(&self) -> &[TripPlan] {
        &self.plans
    }

    /// Keep only the plans whose name is listed.
    pub fn retain_named(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        self.plans.retain(|plan| names.iter().any(|name| name == &plan.name));
    }

    pub fn generate(&self) -> Result<FleetRun> {
        let trips = self
            .plans
            .iter()
            .enumerate()
            .map(|(index, plan)| {
                let seed = plan.seed.unwrap_or_else(|| derive_trip_seed(self.seed, index));
                generate_trip(plan.clone(), seed)
            })
            .collect::<Result<Vec<_>>>()?;
        info!(trips = trips.len(), seed = self.seed, "fleet generated");
        Ok(FleetRun {
            seed: self.seed,
            trips,
        })
    }

    /// Same output as [`generate`](Self::generate), one blocking task per trip.
    pub async fn generate_parallel(&self) -> Result<FleetRun> {
        let mut workers = JoinSet::new();
        for (index, plan) in self.plans.iter().cloned().enumerate() {
            let seed = plan.seed.unwrap_or_else(|| derive_trip_seed(self.seed, index));
            workers.spawn_blocking(move || (index, generate_trip(plan, seed)));
        }

        let mut slots: Vec<Option<GeneratedTrip>> = vec![None; self.plans.len()];
        while let Some(joined) = workers.join_next().await {
            let (index, trip) = joined?;
            slots[index] = Some(trip?);
        }
        let trips: Vec<GeneratedTrip> = slots.into_iter().flatten().collect();
        info!(
            trips = trips.len(),
            seed = self.seed,
            "fleet generated on worker pool"
        );
        Ok(FleetRun {
            seed: self.seed,
            trips,
        })
    }
}

fn generate_trip(plan: TripPlan, seed: u64) -> Result<GeneratedTrip> {
    let span = info_span!("trip", name = %plan.name, seed);
    let _entered = span.enter();
    let request = plan.request()?;
    let stream = TripSynthesizer::seeded(seed)
        .with_rates(plan.rates())
        .run(&request)?;
    Ok(GeneratedTrip { plan, seed, stream })
}
