// ── Marker modes, visuals, popup content ──

use serde::Serialize;

use crate::model::{Station, StationId, StationStatus, TransportType};
use crate::occupancy::{OccupancyPolicy, OccupancyReading};

/// How a station is drawn. Keyed by station id in the marker registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerMode {
    /// Small colored circle on the map layer.
    Dot,
    /// Large glyph icon; used for the selection and the route target.
    Detailed,
    /// Handed to the cluster layer, which may merge it with neighbors.
    Clustered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkerVisual {
    pub color: &'static str,
    pub glyph: &'static str,
    pub size_px: u8,
    pub z_index: i32,
}

pub const DOT_SIZE_PX: u8 = 12;
pub const DETAILED_SIZE_PX: u8 = 40;
pub const DETAILED_Z_INDEX: i32 = 1000;

const MAINTENANCE: (&str, &str) = ("#9ca3af", "🔧");

/// Color and glyph for a transport type.
pub fn palette(transport: TransportType) -> (&'static str, &'static str) {
    match transport {
        TransportType::Bus => ("#ef4444", "🚌"),
        TransportType::Metro => ("#4f46e5", "🚇"),
        TransportType::Bike => ("#22c55e", "🚲"),
        TransportType::Scooter => ("#eab308", "🛴"),
        TransportType::Minibus => ("#9333ea", "🚐"),
        TransportType::Taxi => ("#eab308", "🚕"),
        TransportType::Dolmus => ("#3b82f6", "🚐"),
    }
}

impl MarkerVisual {
    pub fn for_station(station: &Station, mode: MarkerMode) -> Self {
        let (color, glyph) = if station.status == StationStatus::Maintenance {
            MAINTENANCE
        } else {
            palette(station.transport)
        };
        match mode {
            MarkerMode::Detailed => Self {
                color,
                glyph,
                size_px: DETAILED_SIZE_PX,
                z_index: DETAILED_Z_INDEX,
            },
            MarkerMode::Dot | MarkerMode::Clustered => Self {
                color,
                glyph,
                size_px: DOT_SIZE_PX,
                z_index: 0,
            },
        }
    }
}

// ── Popup ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteAction {
    Create,
    Remove,
}

/// Buttons inside a popup. Surfaces report clicks through a single
/// delegated handler as `MapEvent::PopupAction`; the renderer resolves
/// them against the content currently bound to the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PopupAction {
    Route,
    Report,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupContent {
    pub station: StationId,
    pub name: String,
    pub transport: TransportType,
    pub capacity: u32,
    pub available: u32,
    /// "vehicles" or "free".
    pub availability_unit: &'static str,
    pub status_label: &'static str,
    pub occupancy_label: String,
    pub route_action: RouteAction,
}

impl PopupContent {
    pub fn build(station: &Station, route_to_here: bool, policy: &OccupancyPolicy) -> Self {
        let reading: OccupancyReading = policy.read(station);
        Self {
            station: station.id.clone(),
            name: station.name.clone(),
            transport: station.transport,
            capacity: station.capacity,
            available: station.available,
            availability_unit: station.availability_unit(),
            status_label: station.status.label(),
            occupancy_label: reading.label(),
            route_action: if route_to_here {
                RouteAction::Remove
            } else {
                RouteAction::Create
            },
        }
    }

    /// One-line summary, e.g. `"Kadikoy (Bus) 12/40 free, Active"`.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}) {}/{} {}, {}",
            self.name,
            self.transport.label(),
            self.available,
            self.capacity,
            self.availability_unit,
            self.status_label
        )
    }

    pub fn actions(&self) -> [PopupAction; 2] {
        [PopupAction::Route, PopupAction::Report]
    }

    pub fn route_label(&self) -> &'static str {
        match self.route_action {
            RouteAction::Create => "Create route",
            RouteAction::Remove => "Remove route",
        }
    }
}
