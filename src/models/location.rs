// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GPS location point and route geometry helpers.

use geo::{Coord, Distance, Haversine, LineString, Point};
use serde::{Deserialize, Serialize};

/// A single GPS fix recorded during a walk.
///
/// Points are ordered by timestamp and owned by the session that
/// recorded them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationPoint {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Unix timestamp in milliseconds
    pub timestamp_ms: i64,
}

impl LocationPoint {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
        }
    }

    /// Great-circle (haversine) distance to another point, in meters.
    pub fn distance_m(&self, other: &LocationPoint) -> f64 {
        let a = Point::new(self.longitude, self.latitude);
        let b = Point::new(other.longitude, other.latitude);
        Haversine.distance(a, b)
    }
}

/// Encode a route as a precision-5 polyline string.
///
/// Returns `None` for routes with fewer than two points, which have no
/// meaningful geometry.
pub fn encode_route(points: &[LocationPoint]) -> Option<String> {
    if points.len() < 2 {
        return None;
    }

    let line: LineString<f64> = points
        .iter()
        .map(|p| Coord {
            x: p.longitude,
            y: p.latitude,
        })
        .collect();

    polyline::encode_coordinates(line, 5).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_distance_known_segment() {
        // Roughly 111 meters per 0.001 degrees of latitude
        let a = LocationPoint::new(37.0, -122.0, 0);
        let b = LocationPoint::new(37.001, -122.0, 2000);

        let d = a.distance_m(&b);
        assert!((d - 111.2).abs() < 1.0, "unexpected distance {}", d);
    }

    #[test]
    fn test_distance_zero_for_identical_points() {
        let a = LocationPoint::new(37.0, -122.0, 0);
        assert_eq!(a.distance_m(&a), 0.0);
    }

    #[test]
    fn test_encode_route_requires_two_points() {
        let single = vec![LocationPoint::new(37.0, -122.0, 0)];
        assert!(encode_route(&single).is_none());

        let pair = vec![
            LocationPoint::new(37.0, -122.0, 0),
            LocationPoint::new(37.001, -122.0, 2000),
        ];
        assert!(encode_route(&pair).is_some());
    }
}
