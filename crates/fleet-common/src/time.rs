//! ---
//! fleet_section: "01-core-functionality"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Shared primitives and utilities for the simulator workspace."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use chrono::{DateTime, Duration, Utc};

/// Advance a simulated timestamp by fractional seconds, at millisecond resolution.
pub fn advance_secs(timestamp: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return timestamp;
    }
    timestamp + Duration::milliseconds((seconds * 1000.0).round() as i64)
}

/// Elapsed seconds between two timestamps (negative when `to` precedes `from`).
pub fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// Elapsed whole minutes, rounded to the nearest minute.
pub fn elapsed_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (elapsed_secs(from, to) / 60.0).round().max(0.0) as u64
}

/// Elapsed hours rounded to one decimal place.
pub fn elapsed_hours(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (elapsed_secs(from, to) / 3600.0 * 10.0).round() / 10.0
}
