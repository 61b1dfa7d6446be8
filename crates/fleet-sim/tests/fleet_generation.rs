//! ---
//! fleet_section: "02-simulation"
//! fleet_subsection: "tests"
//! fleet_type: "test"
//! fleet_scope: "code"
//! fleet_description: "Integration tests for fleet generation, persistence and replay."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use std::collections::HashSet;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use fleet_sim::assembly::is_chronological;
use fleet_sim::{
    default_fleet, EventType, FleetDataset, FleetGenerator, ReplayEngine, TripStatus,
};
use tempfile::tempdir;

#[test]
fn default_fleet_has_one_cancelled_trip() -> Result<()> {
    let run = FleetGenerator::with_default_fleet(2025).generate()?;
    assert_eq!(run.trips.len(), 5);

    let cancelled: Vec<_> = run
        .trips
        .iter()
        .filter(|trip| trip.stream.outcome.is_cancelled())
        .map(|trip| trip.plan.name.as_str())
        .collect();
    assert_eq!(cancelled, ["mountain_route_cancelled"]);

    for trip in &run.trips {
        let events = &trip.stream.events;
        assert!(is_chronological(events));
        assert_eq!(events[0].event_type(), EventType::TripStarted);
        assert_eq!(events[0].timestamp, trip.plan.start_time);
        let terminal = events.iter().filter(|event| event.is_terminal()).count();
        assert_eq!(terminal, 1, "{}", trip.plan.name);
        assert!(events.iter().all(|e| e.trip_id == trip.plan.identity.trip_id));
    }

    let merged = run.merged_events();
    assert!(is_chronological(&merged));
    assert_eq!(
        merged.len(),
        run.trips.iter().map(|t| t.stream.events.len()).sum::<usize>()
    );
    Ok(())
}

#[test]
fn trips_sharing_a_seed_get_distinct_event_ids() -> Result<()> {
    let plans = default_fleet()
        .into_iter()
        .filter(|plan| {
            plan.name == "urban_dense_delivery" || plan.name == "mountain_route_cancelled"
        })
        .map(|mut plan| {
            plan.seed = Some(5);
            plan
        })
        .collect::<Vec<_>>();
    assert_eq!(plans.len(), 2);

    let merged = FleetGenerator::new(1, plans).generate()?.merged_events();
    let ids: HashSet<_> = merged.iter().map(|event| event.event_id).collect();
    assert_eq!(ids.len(), merged.len());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parallel_generation_matches_sequential() -> Result<()> {
    let generator = FleetGenerator::with_default_fleet(77);
    let sequential = generator.generate()?;
    let parallel = generator.generate_parallel().await?;
    let at = Utc.with_ymd_and_hms(2025, 11, 3, 0, 0, 0).unwrap();
    assert_eq!(
        serde_json::to_string(&sequential.dataset(at))?,
        serde_json::to_string(&parallel.dataset(at))?
    );
    Ok(())
}

#[test]
fn dataset_replays_to_final_statuses() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("fleet-events.json");
    let run = FleetGenerator::with_default_fleet(5).generate()?;
    let dataset = run.dataset(Utc::now());
    dataset.write_to(&path, false)?;

    let reloaded = FleetDataset::from_path(&path)?;
    assert_eq!(reloaded.trips.len(), 5);
    assert_eq!(reloaded.events.len(), dataset.events.len());

    let mut replay = ReplayEngine::from_path(&path)?;
    let start = replay.start_time().expect("non-empty dataset");
    assert_eq!(start, Utc.with_ymd_and_hms(2025, 11, 3, 8, 0, 0).unwrap());
    let first = replay.step_to(start).len();
    assert!(first >= 1);
    assert_eq!(replay.metrics().active, 1);
    assert_eq!(replay.metrics().scheduled, 4);

    let end = replay.end_time().expect("non-empty dataset");
    replay.step_to(end);
    let metrics = replay.metrics();
    assert_eq!(metrics.completed, 4);
    assert_eq!(metrics.cancelled, 1);
    assert_eq!(metrics.active + metrics.stopped + metrics.scheduled, 0);
    assert!(metrics.average_speed_kmh > 10.0);
    let mountain = replay
        .trip("trip_20251103_100000")
        .expect("mountain trip present");
    assert_eq!(mountain.status, TripStatus::Cancelled);
    Ok(())
}
