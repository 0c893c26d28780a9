// ── Occupancy policy ──
//
// How busy a station looks. Transit stations report free slots, so the
// displayed figure is the occupied share; bike and scooter docks report
// free vehicles, so the displayed figure is the vehicle share. Thresholds
// live in a per-type table that configuration can override.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::model::{Station, StationStatus, TransportType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OccupancyMetric {
    /// `round((capacity - available) / capacity * 100)`
    Occupancy,
    /// `round(available / capacity * 100)`
    VehicleShare,
}

/// Thresholds for one transport type, in whole percent.
///
/// For `Occupancy` the thresholds apply to the occupied share. For
/// `VehicleShare` they apply to the missing share (`100 - share`), so a
/// dock running low on vehicles can be flagged busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyRule {
    pub metric: OccupancyMetric,
    pub busy_at: u8,
    pub full_at: u8,
}

impl OccupancyRule {
    pub const TRANSIT: Self = Self {
        metric: OccupancyMetric::Occupancy,
        busy_at: 80,
        full_at: 100,
    };

    pub const VEHICLES: Self = Self {
        metric: OccupancyMetric::VehicleShare,
        busy_at: 100,
        full_at: 100,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum OccupancyLevel {
    Normal,
    Busy,
    Full,
    /// No vehicles left at a bike or scooter dock.
    Empty,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupancyReading {
    pub metric: OccupancyMetric,
    pub percent: u8,
    pub level: OccupancyLevel,
}

impl OccupancyReading {
    /// `"85% occupancy"` or `"40% vehicles"`.
    pub fn label(&self) -> String {
        match self.metric {
            OccupancyMetric::Occupancy => format!("{}% occupancy", self.percent),
            OccupancyMetric::VehicleShare => format!("{}% vehicles", self.percent),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyPolicy {
    rules: HashMap<TransportType, OccupancyRule>,
}

impl Default for OccupancyPolicy {
    fn default() -> Self {
        let rules = TransportType::ALL
            .into_iter()
            .map(|t| {
                let rule = if t.counts_vehicles() {
                    OccupancyRule::VEHICLES
                } else {
                    OccupancyRule::TRANSIT
                };
                (t, rule)
            })
            .collect();
        Self { rules }
    }
}

impl OccupancyPolicy {
    #[must_use]
    pub fn with_rule(mut self, transport: TransportType, rule: OccupancyRule) -> Self {
        self.rules.insert(transport, rule);
        self
    }

    pub fn rule(&self, transport: TransportType) -> OccupancyRule {
        self.rules.get(&transport).copied().unwrap_or(if transport.counts_vehicles() {
            OccupancyRule::VEHICLES
        } else {
            OccupancyRule::TRANSIT
        })
    }

    pub fn read(&self, station: &Station) -> OccupancyReading {
        let rule = self.rule(station.transport);
        let available = station.available.min(station.capacity);
        let occupied = station.capacity - available;

        let (percent, pressure) = match rule.metric {
            OccupancyMetric::Occupancy => {
                let p = rounded_percent(occupied, station.capacity);
                (p, p)
            }
            OccupancyMetric::VehicleShare => {
                let p = rounded_percent(available, station.capacity);
                (p, 100 - p)
            }
        };

        let level = if station.status == StationStatus::Maintenance {
            OccupancyLevel::Maintenance
        } else if rule.metric == OccupancyMetric::VehicleShare && available == 0 {
            OccupancyLevel::Empty
        } else if pressure >= rule.full_at {
            OccupancyLevel::Full
        } else if pressure >= rule.busy_at {
            OccupancyLevel::Busy
        } else {
            OccupancyLevel::Normal
        };

        OccupancyReading {
            metric: rule.metric,
            percent,
            level,
        }
    }
}

/// `round(part / whole * 100)` with halves rounded up, in integers.
fn rounded_percent(part: u32, whole: u32) -> u8 {
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (u64::from(part.min(whole)), u64::from(whole));
    u8::try_from((200 * part + whole) / (2 * whole)).unwrap_or(100)
}
