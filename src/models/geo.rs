// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geographic coordinates as the portal formats them.

use geo::{Distance, Haversine, Point};
use std::fmt;
use std::str::FromStr;

/// A WGS84 coordinate pair.
///
/// The portal stores coordinates as the string `"<lat>, <lon>"`; `Display`
/// and `FromStr` implement exactly that wire format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to another point, in meters.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        Haversine.distance(
            Point::new(self.lon, self.lat),
            Point::new(other.lon, other.lat),
        )
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

impl FromStr for GeoPoint {
    type Err = ParseGeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| ParseGeoError(s.to_string()))?;

        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| ParseGeoError(s.to_string()))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| ParseGeoError(s.to_string()))?;

        Ok(GeoPoint { lat, lon })
    }
}

/// Error parsing a `"<lat>, <lon>"` string.
#[derive(Debug, thiserror::Error)]
#[error("invalid geo string: {0:?}")]
pub struct ParseGeoError(String);
