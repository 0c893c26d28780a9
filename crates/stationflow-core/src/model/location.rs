// ── Geographic points ──

use std::fmt;
use std::str::FromStr;

use geo::{Coord, Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance in meters.
    pub fn distance_m(self, other: Self) -> f64 {
        Haversine.distance(self.to_point(), other.to_point())
    }

    pub fn is_valid(self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// `geo` coordinate (x = longitude, y = latitude).
    pub fn to_coord(self) -> Coord<f64> {
        Coord {
            x: self.lng,
            y: self.lat,
        }
    }

    pub fn to_point(self) -> Point<f64> {
        Point::from(self.to_coord())
    }
}

impl From<Coord<f64>> for LatLng {
    fn from(c: Coord<f64>) -> Self {
        Self { lat: c.y, lng: c.x }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lng)
    }
}

/// Parses `"LAT,LNG"` (whitespace around either number is ignored).
impl FromStr for LatLng {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| format!("expected LAT,LNG but got '{s}'"))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|e| format!("invalid latitude '{lat}': {e}"))?;
        let lng: f64 = lng
            .trim()
            .parse()
            .map_err(|e| format!("invalid longitude '{lng}': {e}"))?;
        let point = Self::new(lat, lng);
        if point.is_valid() {
            Ok(point)
        } else {
            Err(format!("coordinates out of range: {point}"))
        }
    }
}

/// The user's position as reported by a position source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub position: LatLng,
    /// Horizontal accuracy radius in meters, when the source reports one.
    pub accuracy: Option<f64>,
}

impl UserLocation {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self {
            position: LatLng::new(lat, lng),
            accuracy: None,
        }
    }
}
