// ── Station ──

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::location::LatLng;

// ── StationId ───────────────────────────────────────────────────────

/// Backend-assigned station identifier (a UUID string, treated as opaque).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(String);

impl StationId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StationId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<String> for StationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StationId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── TransportType ───────────────────────────────────────────────────

/// Mobility mode served by a station.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TransportType {
    Bus,
    Metro,
    Bike,
    Scooter,
    Minibus,
    Taxi,
    Dolmus,
}

impl TransportType {
    pub const ALL: [Self; 7] = [
        Self::Bus,
        Self::Metro,
        Self::Bike,
        Self::Scooter,
        Self::Minibus,
        Self::Taxi,
        Self::Dolmus,
    ];

    /// `available` counts free vehicles (bike, scooter) rather than free
    /// slots.
    pub fn counts_vehicles(self) -> bool {
        matches!(self, Self::Bike | Self::Scooter)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Bus => "Bus",
            Self::Metro => "Metro",
            Self::Bike => "Bike",
            Self::Scooter => "Scooter",
            Self::Minibus => "Minibus",
            Self::Taxi => "Taxi",
            Self::Dolmus => "Dolmuş",
        }
    }
}

// ── StationStatus ───────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StationStatus {
    Active,
    Maintenance,
    Empty,
    Full,
}

impl StationStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Maintenance => "Maintenance",
            Self::Empty => "Empty",
            Self::Full => "Full",
        }
    }
}

// ── Station ─────────────────────────────────────────────────────────

/// A transit or mobility station.
///
/// `available` is always within `0..=capacity`; conversions from wire
/// records clamp it and reject `capacity == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    #[serde(rename = "type")]
    pub transport: TransportType,
    pub location: LatLng,
    pub capacity: u32,
    pub available: u32,
    pub status: StationStatus,
    pub last_update: Option<NaiveDateTime>,
    pub is_custom: bool,
    pub owner_id: Option<String>,
}

impl Station {
    /// Copy of this station with `available` set, clamped to capacity.
    pub fn with_available(&self, available: u32) -> Self {
        Self {
            available: available.min(self.capacity),
            ..self.clone()
        }
    }

    /// Unit label for `available` ("vehicles" or "free").
    pub fn availability_unit(&self) -> &'static str {
        if self.transport.counts_vehicles() {
            "vehicles"
        } else {
            "free"
        }
    }
}

// ── StationDraft ────────────────────────────────────────────────────

/// User input for a new station, before the backend assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct StationDraft {
    pub name: String,
    pub transport: TransportType,
    pub location: LatLng,
    pub capacity: u32,
    /// Defaults to half the capacity (integer division).
    pub available: Option<u32>,
    pub owner_id: Option<String>,
}

impl StationDraft {
    pub fn effective_available(&self) -> u32 {
        self.available.unwrap_or(self.capacity / 2)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn transport_type_parses_case_insensitively() {
        assert_eq!("BIKE".parse::<TransportType>().unwrap(), TransportType::Bike);
        assert_eq!(TransportType::Dolmus.to_string(), "dolmus");
        assert!("tram".parse::<TransportType>().is_err());
    }

    #[test]
    fn draft_defaults_available_to_half_capacity() {
        let draft = StationDraft {
            name: "Moda".into(),
            transport: TransportType::Bike,
            location: LatLng::new(40.98, 29.03),
            capacity: 7,
            available: None,
            owner_id: None,
        };
        assert_eq!(draft.effective_available(), 3);
    }
}
