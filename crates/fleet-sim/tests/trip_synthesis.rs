//! ---
//! fleet_section: "02-simulation"
//! fleet_subsection: "tests"
//! fleet_type: "test"
//! fleet_scope: "code"
//! fleet_description: "Integration tests for single-trip synthesis."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use chrono::{TimeZone, Utc};
use fleet_sim::assembly::is_chronological;
use fleet_sim::event::{EventKind, ViolationSeverity};
use fleet_sim::geo::total_distance_km;
use fleet_sim::{
    EventRates, EventType, FleetEvent, GeoPoint, SimulationConfig, TripIdentity, TripOutcome,
    TripRequest, TripStream, TripSynthesizer,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn straight_route(points: usize, step_deg: f64) -> Vec<GeoPoint> {
    (0..points)
        .map(|i| GeoPoint::new(35.0, -100.0 + i as f64 * step_deg))
        .collect()
}

fn request(coordinates: Vec<GeoPoint>, cancel_probability: f64) -> TripRequest {
    TripRequest {
        identity: TripIdentity::new("VH_001", "trip_20251103_080000", "GPS_DEVICE_001"),
        coordinates,
        start_time: Utc.with_ymd_and_hms(2025, 11, 3, 8, 0, 0).unwrap(),
        sample_interval_secs: 30.0,
        cancel_probability,
    }
}

fn run(seed: u64, rates: EventRates, request: &TripRequest) -> TripStream {
    TripSynthesizer::seeded(seed)
        .with_rates(rates)
        .run(request)
        .unwrap()
}

fn run_with(
    seed: u64,
    config: SimulationConfig,
    rates: EventRates,
    request: &TripRequest,
) -> TripStream {
    TripSynthesizer::with_config(config, StdRng::seed_from_u64(seed))
        .unwrap()
        .with_rates(rates)
        .run(request)
        .unwrap()
}

fn sampled_config(seed: u64) -> SimulationConfig {
    SimulationConfig::sample(&mut StdRng::seed_from_u64(seed))
}

fn count(events: &[FleetEvent], event_type: EventType) -> usize {
    events
        .iter()
        .filter(|event| event.event_type() == event_type)
        .count()
}

#[test]
fn ten_point_route_produces_bookended_pings() {
    let coordinates = straight_route(10, 0.01);
    let expected_km = total_distance_km(&coordinates);
    let stream = run(42, EventRates::quiet(), &request(coordinates, 0.0));

    assert_eq!(count(&stream.events, EventType::TripStarted), 1);
    assert_eq!(count(&stream.events, EventType::LocationPing), 10);
    assert_eq!(count(&stream.events, EventType::TripCompleted), 1);
    assert_eq!(stream.outcome, TripOutcome::Completed);
    assert!(is_chronological(&stream.events));

    let Some(EventKind::TripCompleted {
        total_distance_km, ..
    }) = stream.events.last().map(|event| &event.kind)
    else {
        panic!("last event must complete the trip");
    };
    assert!((total_distance_km - expected_km).abs() <= 0.05);

    for event in &stream.events {
        assert_eq!(event.vehicle_id, "VH_001");
        assert_eq!(event.device_id, "GPS_DEVICE_001");
    }
}

#[test]
fn pings_carry_consistent_ambient_context() {
    let stream = run(7, EventRates::quiet(), &request(straight_route(25, 0.02), 0.0));
    let mut previous_distance = 0.0;
    for event in &stream.events {
        let Some(context) = event.context() else {
            continue;
        };
        assert!((5.0..=15.0).contains(&context.location.accuracy_meters));
        assert!((10.0..=110.0).contains(&context.location.altitude_meters));
        assert!((0.0..360.0).contains(&context.movement.heading_degrees));
        assert_eq!(context.movement.moving, context.movement.speed_kmh > 1.0);
        assert!(context.distance_travelled_km >= previous_distance);
        previous_distance = context.distance_travelled_km;
    }
    let ids: std::collections::HashSet<_> = stream.events.iter().map(|e| e.event_id).collect();
    assert_eq!(ids.len(), stream.events.len());
}

#[test]
fn forced_cancellation_truncates_the_stream() {
    let coordinates = straight_route(40, 0.01);
    let full = run(3, EventRates::quiet(), &request(coordinates.clone(), 0.0));
    let cancelled = run(3, EventRates::quiet(), &request(coordinates, 1.0));

    let TripOutcome::Cancelled { at_sample, .. } = cancelled.outcome else {
        panic!("cancellation was forced");
    };
    assert!((8..28).contains(&at_sample));
    assert_eq!(count(&cancelled.events, EventType::TripCancelled), 1);
    assert_eq!(count(&cancelled.events, EventType::TripCompleted), 0);
    assert_eq!(count(&cancelled.events, EventType::LocationPing), at_sample + 1);
    assert!(cancelled.events.len() < full.events.len());
    assert_eq!(
        cancelled.events.last().map(FleetEvent::event_type),
        Some(EventType::TripCancelled)
    );

    let Some(EventKind::TripCancelled {
        distance_completed_km,
        ..
    }) = cancelled.events.last().map(|event| &event.kind)
    else {
        panic!("last event must cancel the trip");
    };
    let travelled = total_distance_km(&straight_route(40, 0.01)[..=at_sample]);
    assert!((distance_completed_km - travelled).abs() <= 0.05);
}

#[test]
fn same_seed_gives_identical_json() {
    let req = request(straight_route(200, 0.01), 0.3);
    let rates = EventRates {
        vehicle_stop: 0.05,
        signal_loss: 0.05,
        telemetry: 0.1,
        device_error: 0.05,
        ..EventRates::default()
    };
    let a = serde_json::to_string(&run(99, rates, &req).events).unwrap();
    let b = serde_json::to_string(&run(99, rates, &req).events).unwrap();
    assert_eq!(a, b);
    let c = serde_json::to_string(&run(100, rates, &req).events).unwrap();
    assert_ne!(a, c);
}

#[test]
fn paired_events_are_adjacent_and_ordered() {
    let rates = EventRates {
        vehicle_stop: 1.0,
        signal_loss: 1.0,
        ..EventRates::quiet()
    };
    let stream = run(12, rates, &request(straight_route(30, 0.01), 0.0));
    assert!(count(&stream.events, EventType::VehicleStopped) > 0);
    assert!(count(&stream.events, EventType::SignalLost) > 0);
    assert!(is_chronological(&stream.events));

    for (index, event) in stream.events.iter().enumerate() {
        let expected_end = match event.event_type() {
            EventType::VehicleStopped => EventType::VehicleMoving,
            EventType::SignalLost => EventType::SignalRecovered,
            EventType::RefuelingStarted => EventType::RefuelingCompleted,
            _ => continue,
        };
        let end = &stream.events[index + 1];
        assert_eq!(end.event_type(), expected_end);
        assert!(end.timestamp > event.timestamp);
        match &end.kind {
            EventKind::VehicleMoving {
                stop_duration_minutes,
                ..
            } => assert!((5..=30).contains(stop_duration_minutes)),
            EventKind::SignalRecovered {
                signal_lost_duration_seconds,
                ..
            } => assert!((30..=150).contains(signal_lost_duration_seconds)),
            _ => {}
        }
    }
}

#[test]
fn fuel_alert_latches_until_refuel() {
    // ~1500 km across the plains
    let coordinates = straight_route(600, 0.0275);
    let rates = EventRates {
        refuel: 0.02,
        ..EventRates::quiet()
    };
    for seed in 0..10 {
        let stream = run(seed, rates, &request(coordinates.clone(), 0.0));
        let mut low_since_refuel = 0;
        let mut last_fuel_low: Option<f64> = None;
        for event in &stream.events {
            match &event.kind {
                EventKind::FuelLevelLow {
                    fuel_level_percent,
                    estimated_range_km,
                    ..
                } => {
                    low_since_refuel += 1;
                    assert!(low_since_refuel <= 1, "seed {seed}: repeated fuel alert");
                    assert!(*fuel_level_percent <= 15.0);
                    // 15% of a 140 l tank at 0.08 l/km
                    assert!(*estimated_range_km <= 263);
                    last_fuel_low = Some(*fuel_level_percent);
                }
                EventKind::RefuelingCompleted {
                    fuel_level_after_refuel,
                    fuel_added_percent,
                    ..
                } => {
                    assert!(*fuel_added_percent > 0.0);
                    assert!(*fuel_level_after_refuel <= 100.0);
                    if let Some(level) = last_fuel_low {
                        assert!(*fuel_level_after_refuel > level);
                    }
                    low_since_refuel = 0;
                }
                _ => {}
            }
        }
    }
}

#[test]
fn streams_round_trip_through_json() {
    let rates = EventRates {
        vehicle_stop: 0.1,
        signal_loss: 0.1,
        telemetry: 0.2,
        device_error: 0.2,
        speed_violation: 1.0,
        ..EventRates::default()
    };
    let stream = run(21, rates, &request(straight_route(80, 0.01), 0.5));
    let text = serde_json::to_string(&stream.events).unwrap();
    let parsed: Vec<FleetEvent> = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed.len(), stream.events.len());
    assert_eq!(
        serde_json::to_value(&parsed).unwrap(),
        serde_json::from_str::<serde_json::Value>(&text).unwrap()
    );
    for (before, after) in stream.events.iter().zip(&parsed) {
        assert_eq!(before.event_type(), after.event_type());
        assert_eq!(before.timestamp, after.timestamp);
    }
}

#[test]
fn fuel_range_grows_with_tank_capacity() {
    let coordinates = straight_route(600, 0.0275);
    let mut config = sampled_config(31);
    config.initial_fuel_level = 90.0;
    config.min_fuel_level = 5.0;
    config.fuel_efficiency = 0.12;

    let range_for = |tank: f64| {
        let mut config = config.clone();
        config.fuel_tank_capacity_liters = tank;
        let stream = run_with(8, config, EventRates::quiet(), &request(coordinates.clone(), 0.0));
        stream
            .events
            .iter()
            .find_map(|event| match &event.kind {
                EventKind::FuelLevelLow {
                    fuel_level_percent,
                    estimated_range_km,
                    ..
                } => Some((*fuel_level_percent, *estimated_range_km)),
                _ => None,
            })
            .expect("fuel runs low over 1500 km")
    };

    let (level_small, range_small) = range_for(60.0);
    let (level_large, range_large) = range_for(140.0);
    assert_eq!(level_small, level_large);
    let expected_small = level_small / 100.0 * 60.0 / 0.12;
    let expected_large = level_large / 100.0 * 140.0 / 0.12;
    assert!((range_small as f64 - expected_small).abs() <= 1.0);
    assert!((range_large as f64 - expected_large).abs() <= 1.0);
    assert!(range_large > range_small * 2);
}

#[test]
fn speed_violations_only_while_overspeeding() {
    let mut config = sampled_config(3);
    config.speed_limit_kmh = 80.0;
    config.speed_tolerance = 8.0;
    config.initial_speed = 60.0;
    config.min_speed = 25.0;
    config.max_speed = 140.0;
    config.speed_variation = 15.0;
    let rates = EventRates {
        speed_violation: 1.0,
        ..EventRates::quiet()
    };

    let (mut severe, mut moderate) = (0, 0);
    for seed in 0..3 {
        let stream = run_with(
            seed,
            config.clone(),
            rates,
            &request(straight_route(1500, 0.001), 0.0),
        );
        let overspeeding_pings = stream
            .events
            .iter()
            .filter(|event| event.event_type() == EventType::LocationPing)
            .filter(|event| event.context().is_some_and(|context| context.overspeed))
            .count();
        assert_eq!(
            count(&stream.events, EventType::SpeedViolation),
            overspeeding_pings
        );

        for event in &stream.events {
            let EventKind::SpeedViolation {
                context,
                speed_limit_kmh,
                violation_amount_kmh,
                severity,
            } = &event.kind
            else {
                continue;
            };
            let speed = context.movement.speed_kmh;
            assert!(context.overspeed);
            assert_eq!(*speed_limit_kmh, 80);
            assert!(speed >= 88.0, "violation at {speed} km/h");
            assert!((*violation_amount_kmh as f64 - (speed - 80.0)).abs() <= 0.6);
            match severity {
                ViolationSeverity::Severe => {
                    assert!(speed >= 100.0);
                    severe += 1;
                }
                ViolationSeverity::Moderate => {
                    assert!(speed <= 100.0);
                    moderate += 1;
                }
            }
        }
    }
    assert!(severe > 0 && moderate > 0);
}

#[test]
fn battery_low_fires_once_with_remaining_hours() {
    let mut config = sampled_config(17);
    config.initial_battery_level = 90.0;
    config.min_battery_level = 8.0;
    config.battery_drain_rate = 0.0015;
    // (90 - 10) / 0.0015 samples to reach the threshold
    let stream = run_with(
        4,
        config,
        EventRates::quiet(),
        &request(straight_route(54_000, 0.0001), 0.0),
    );

    let alerts: Vec<_> = stream
        .events
        .iter()
        .filter_map(|event| match &event.kind {
            EventKind::BatteryLow {
                context,
                battery_level_percent,
                threshold_percent,
                estimated_remaining_hours,
            } => Some((
                context,
                *battery_level_percent,
                *threshold_percent,
                *estimated_remaining_hours,
            )),
            _ => None,
        })
        .collect();
    assert_eq!(alerts.len(), 1);

    let (context, level, threshold, hours) = alerts[0];
    assert_eq!(threshold, 10.0);
    assert!(level <= 10.0 && level > 9.9);
    assert_eq!(context.device.battery_level, level);
    let expected = level / 0.0015 / 100.0;
    assert!((hours as f64 - expected).abs() <= 1.0, "{hours} vs {expected}");
}

#[test]
fn device_errors_keep_type_code_and_message_together() {
    let table = [
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
    let rates = EventRates {
        device_error: 1.0,
        ..EventRates::quiet()
    };
    let stream = run(13, rates, &request(straight_route(60, 0.01), 0.0));
    assert_eq!(count(&stream.events, EventType::DeviceError), 60);

    let mut seen = std::collections::HashSet::new();
    for event in &stream.events {
        if let EventKind::DeviceError {
            error_type,
            error_code,
            error_message,
            ..
        } = &event.kind
        {
            let entry = (error_type.as_str(), error_code.as_str(), error_message.as_str());
            assert!(table.contains(&entry), "unexpected pairing {entry:?}");
            seen.insert(entry.0);
        }
    }
    assert_eq!(seen.len(), table.len());
}

#[test]
fn telemetry_readings_stay_in_band() {
    let rates = EventRates {
        telemetry: 1.0,
        ..EventRates::quiet()
    };
    let stream = run(27, rates, &request(straight_route(40, 0.01), 0.0));
    assert_eq!(count(&stream.events, EventType::VehicleTelemetry), 40);

    for event in &stream.events {
        let EventKind::VehicleTelemetry { context, telemetry } = &event.kind else {
            continue;
        };
        let base = telemetry.odometer_km as f64 - context.distance_travelled_km;
        assert!((99_999.0..=150_001.0).contains(&base), "odometer base {base}");
        assert!((8_000..=10_000).contains(&telemetry.engine_hours));
        assert!((85.0..=95.0).contains(&telemetry.coolant_temp_celsius));
        assert!((280.0..=310.0).contains(&telemetry.oil_pressure_kpa));
        assert!((12.5..=14.0).contains(&telemetry.battery_voltage));
        assert!((0.0..=100.0).contains(&telemetry.fuel_level_percent));
    }
}
