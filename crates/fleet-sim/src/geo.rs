//! ---
//! fleet_section: "02-simulation"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Telemetry synthesis engine and trip generators."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
//! Great-circle helpers and route-progress interpolation.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A single waypoint or position sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            label: None,
        }
    }

    pub fn labelled(lat: f64, lng: f64, label: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            label: Some(label.into()),
        }
    }
}

/// Haversine distance in kilometres.
pub fn distance_km(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Initial forward azimuth in degrees, normalised to `[0, 360)`.
pub fn bearing_degrees(from: &GeoPoint, to: &GeoPoint) -> f64 {
    if from.lat == to.lat && from.lng == to.lng {
        return 0.0;
    }
    let d_lng = (to.lng - from.lng).to_radians();
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let y = d_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();
    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

pub fn total_distance_km(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_km(&pair[0], &pair[1]))
        .sum()
}

/// Running distance from the first point to each point.
pub fn cumulative_distances(points: &[GeoPoint]) -> Vec<f64> {
    let mut total = 0.0;
    let mut distances = Vec::with_capacity(points.len());
    for (index, point) in points.iter().enumerate() {
        if index > 0 {
            total += distance_km(&points[index - 1], point);
        }
        distances.push(total);
    }
    distances
}

/// Position along a route at a given progress fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePosition {
    pub lat: f64,
    pub lng: f64,
    pub heading_degrees: f64,
    /// Label of the nearer end of the containing segment, when labelled.
    pub label_hint: Option<String>,
}

/// Validated waypoint sequence with cached cumulative distances.
#[derive(Debug, Clone)]
pub struct Route {
    points: Vec<GeoPoint>,
    cumulative_km: Vec<f64>,
}

impl Route {
    pub fn new(points: Vec<GeoPoint>) -> Result<Self> {
        check_coordinates(&points)?;
        let cumulative_km = cumulative_distances(&points);
        Ok(Self {
            points,
            cumulative_km,
        })
    }

    pub fn total_distance_km(&self) -> f64 {
        self.cumulative_km.last().copied().unwrap_or_default()
    }

    pub fn interpolate(&self, progress: f64) -> RoutePosition {
        locate(&self.points, &self.cumulative_km, progress)
    }

    /// Evenly spaced samples along the route, first and last waypoint included.
    pub fn densify(&self, samples: usize) -> Result<Vec<GeoPoint>> {
        if samples < 2 {
            return Err(SimError::RouteTooShort { points: samples });
        }
        let last = (samples - 1) as f64;
        Ok((0..samples)
            .map(|index| {
                let position = self.interpolate(index as f64 / last);
                GeoPoint {
                    lat: position.lat,
                    lng: position.lng,
                    label: position.label_hint,
                }
            })
            .collect())
    }
}

/// Reject sequences that cannot define a single segment.
pub fn check_coordinates(points: &[GeoPoint]) -> Result<()> {
    match points.len() {
        0 => Err(SimError::EmptyCoordinateSequence),
        1 => Err(SimError::RouteTooShort { points: 1 }),
        _ => Ok(()),
    }
}

/// Locate the segment containing `progress` of the total distance and interpolate
/// linearly inside it. `cumulative` must hold one entry per point, as
/// [`cumulative_distances`] returns.
pub fn interpolate(
    points: &[GeoPoint],
    cumulative: &[f64],
    progress: f64,
) -> Result<RoutePosition> {
    check_coordinates(points)?;
    if cumulative.len() != points.len() {
        return Err(SimError::DistanceTableMismatch {
            points: points.len(),
            distances: cumulative.len(),
        });
    }
    Ok(locate(points, cumulative, progress))
}

fn locate(points: &[GeoPoint], cumulative: &[f64], progress: f64) -> RoutePosition {
    let Some(first) = points.first() else {
        return RoutePosition {
            lat: 0.0,
            lng: 0.0,
            heading_degrees: 0.0,
            label_hint: None,
        };
    };
    let last_index = points.len() - 1;
    let heading_of = |segment: usize| {
        let end = (segment + 1).min(last_index);
        bearing_degrees(&points[segment], &points[end])
    };

    if progress <= 0.0 || last_index == 0 {
        return RoutePosition {
            lat: first.lat,
            lng: first.lng,
            heading_degrees: heading_of(0),
            label_hint: first.label.clone(),
        };
    }
    if progress >= 1.0 {
        let last = &points[last_index];
        return RoutePosition {
            lat: last.lat,
            lng: last.lng,
            heading_degrees: heading_of(last_index - 1),
            label_hint: last.label.clone(),
        };
    }

    let total = cumulative.last().copied().unwrap_or_default();
    let target = progress * total;
    let mut segment = 0;
    while segment < last_index - 1 && target > cumulative[segment + 1] {
        segment += 1;
    }

    let start_km = cumulative[segment];
    let end_km = cumulative[segment + 1];
    let fraction = if end_km == start_km {
        0.0
    } else {
        (target - start_km) / (end_km - start_km)
    };

    let start = &points[segment];
    let end = &points[segment + 1];
    let label_hint = if fraction < 0.5 {
        start.label.clone()
    } else {
        end.label.clone().or_else(|| start.label.clone())
    };

    RoutePosition {
        lat: start.lat + (end.lat - start.lat) * fraction,
        lng: start.lng + (end.lng - start.lng) * fraction,
        heading_degrees: bearing_degrees(start, end),
        label_hint,
    }
}
