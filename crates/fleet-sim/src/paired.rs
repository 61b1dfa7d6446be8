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
use fleet_common::time::advance_secs;
use rand::Rng;

use crate::event::{AmbientContext, EventKind, FleetEvent, TripIdentity};

/// Inclusive bounds, in seconds, for a paired event's duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationWindow {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DurationWindow {
    pub const fn seconds(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.max_secs > self.min_secs {
            rng.gen_range(self.min_secs..=self.max_secs)
        } else {
            self.min_secs
        }
    }
}

#[derive(Debug, Clone)]
pub struct PairedEmission {
    pub events: [FleetEvent; 2],
    pub duration_secs: f64,
    pub resume_at: DateTime<Utc>,
}

/// Emit a start event at `at` and its matching end event once a duration
/// drawn from `window` has elapsed. The caller resumes its clock at
/// `resume_at`.
pub fn emit_paired<R, S, E>(
    rng: &mut R,
    identity: &TripIdentity,
    context: &AmbientContext,
    at: DateTime<Utc>,
    window: DurationWindow,
    start: S,
    end: E,
) -> PairedEmission
where
    R: Rng + ?Sized,
    S: FnOnce(AmbientContext) -> EventKind,
    E: FnOnce(AmbientContext, f64) -> EventKind,
{
    let duration_secs = window.draw(rng);
    let resume_at = advance_secs(at, duration_secs);
    let opening = FleetEvent::new(rng, identity, at, start(context.clone()));
    let closing = FleetEvent::new(rng, identity, resume_at, end(context.clone(), duration_secs));
    PairedEmission {
        events: [opening, closing],
        duration_secs,
        resume_at,
    }
}
