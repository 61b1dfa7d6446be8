//! ---
//! fleet_section: "03-cli"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Fleet telemetry generator and replay CLI."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{ensure, Result};
use chrono::Duration;
use clap::Args;
use fleet_sim::{FleetMetrics, ReplayEngine};
use tracing::debug;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Trip file or fleet dataset produced by `generate`
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Simulated minutes advanced per step
    #[arg(long, default_value_t = 60)]
    pub step_minutes: u32,
}

pub fn run(args: &ReplayArgs) -> Result<FleetMetrics> {
    let mut engine = ReplayEngine::from_path(&args.input)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    replay_into(&mut engine, args.step_minutes, &mut out)
}

fn replay_into<W: Write>(
    engine: &mut ReplayEngine,
    step_minutes: u32,
    out: &mut W,
) -> Result<FleetMetrics> {
    ensure!(step_minutes > 0, "step-minutes must be greater than zero");
    let step = Duration::minutes(i64::from(step_minutes));

    while !engine.is_finished() {
        let applied = engine.step_by(step).len();
        let metrics = engine.metrics();
        let Some(clock) = engine.clock() else {
            break;
        };
        debug!(%clock, applied, "replay step");
        writeln!(
            out,
            "{} applied={:<5} active={} stopped={} completed={} cancelled={} avg_speed={:.1}km/h alerts={}",
            clock.to_rfc3339(),
            applied,
            metrics.active,
            metrics.stopped,
            metrics.completed,
            metrics.cancelled,
            metrics.average_speed_kmh,
            metrics.alerts
        )?;
    }

    for trip in engine.trips() {
        writeln!(
            out,
            "{} {} status={} events={} distance={:.1}km avg_speed={:.1}km/h alerts={}",
            trip.trip_id,
            trip.vehicle_id,
            trip.status,
            trip.events_processed,
            trip.distance_travelled_km,
            trip.average_speed_kmh(),
            trip.active_alerts
        )?;
    }
    Ok(engine.metrics())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_sim::FleetGenerator;
    use tempfile::tempdir;

    #[test]
    fn replays_a_generated_dataset() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("fleet-events.json");
        let mut generator = FleetGenerator::with_default_fleet(4);
        generator.retain_named(&[
            "urban_dense_delivery".to_owned(),
            "mountain_route_cancelled".to_owned(),
        ]);
        generator
            .generate()?
            .dataset(chrono::Utc::now())
            .write_to(&path, false)?;

        let mut engine = ReplayEngine::from_path(&path)?;
        let mut out = Vec::new();
        let metrics = replay_into(&mut engine, 30, &mut out)?;
        assert_eq!(metrics.completed, 1);
        assert_eq!(metrics.cancelled, 1);

        let text = String::from_utf8(out)?;
        assert!(text.contains("status=cancelled"));
        assert!(text.contains("status=completed"));
        Ok(())
    }

    #[test]
    fn zero_step_is_rejected() {
        let mut engine = ReplayEngine::from_events(Vec::new());
        assert!(replay_into(&mut engine, 0, &mut Vec::new()).is_err());
    }
}
