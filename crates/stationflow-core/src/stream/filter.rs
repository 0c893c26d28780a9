// ── Filter predicates for station snapshots ──
//
// Pure functions over snapshots. Order is always preserved so the sidebar
// and the map agree with the backend's listing order.

use std::fmt;
use std::sync::Arc;

use crate::model::{LatLng, Station, TransportType};

/// Sidebar/map filter: everything, or a single transport type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StationFilter {
    #[default]
    All,
    ByType(TransportType),
}

impl StationFilter {
    pub fn matches(&self, station: &Station) -> bool {
        match self {
            Self::All => true,
            Self::ByType(t) => station.transport == *t,
        }
    }

    pub fn apply(&self, stations: &[Arc<Station>]) -> Vec<Arc<Station>> {
        stations
            .iter()
            .filter(|s| self.matches(s))
            .cloned()
            .collect()
    }

    /// Cycle All → bus → metro → … → dolmus → All.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::All => Self::ByType(TransportType::ALL[0]),
            Self::ByType(t) => {
                let idx = TransportType::ALL.iter().position(|x| *x == t).unwrap_or(0);
                TransportType::ALL
                    .get(idx + 1)
                    .map_or(Self::All, |next| Self::ByType(*next))
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::ByType(t) => t.label(),
        }
    }
}

impl fmt::Display for StationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Option<TransportType>> for StationFilter {
    fn from(t: Option<TransportType>) -> Self {
        t.map_or(Self::All, Self::ByType)
    }
}

/// Case-insensitive name substring match. A blank query keeps everything.
pub fn search(stations: &[Arc<Station>], query: &str) -> Vec<Arc<Station>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return stations.to_vec();
    }
    stations
        .iter()
        .filter(|s| s.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Stations sorted by distance from `from`, optionally within `radius_m`.
pub fn nearby(
    stations: &[Arc<Station>],
    from: LatLng,
    radius_m: Option<f64>,
) -> Vec<(Arc<Station>, f64)> {
    let mut hits: Vec<(Arc<Station>, f64)> = stations
        .iter()
        .map(|s| (Arc::clone(s), from.distance_m(s.location)))
        .filter(|(_, d)| radius_m.is_none_or(|r| *d <= r))
        .collect();
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{StationId, StationStatus};
    use pretty_assertions::assert_eq;

    fn station(id: &str, name: &str, transport: TransportType, lat: f64) -> Arc<Station> {
        Arc::new(Station {
            id: StationId::from(id),
            name: name.to_owned(),
            transport,
            location: LatLng::new(lat, 29.0),
            capacity: 10,
            available: 5,
            status: StationStatus::Active,
            last_update: None,
            is_custom: false,
            owner_id: None,
        })
    }

    fn fixture() -> Vec<Arc<Station>> {
        vec![
            station("1", "Kadikoy Bike", TransportType::Bike, 41.00),
            station("2", "Kadikoy Bus", TransportType::Bus, 41.01),
            station("3", "Moda Bike", TransportType::Bike, 41.02),
            station("4", "Taksim Metro", TransportType::Metro, 41.03),
            station("5", "Besiktas Bike", TransportType::Bike, 41.04),
        ]
    }

    #[test]
    fn bike_filter_returns_bike_subset_in_order() {
        let ids: Vec<String> = StationFilter::ByType(TransportType::Bike)
            .apply(&fixture())
            .iter()
            .map(|s| s.id.to_string())
            .collect();
        assert_eq!(ids, vec!["1", "3", "5"]);
        assert_eq!(StationFilter::All.apply(&fixture()).len(), 5);
    }

    #[test]
    fn filter_cycles_through_every_type() {
        let mut f = StationFilter::All;
        let mut seen = Vec::new();
        for _ in 0..8 {
            f = f.next();
            seen.push(f);
        }
        assert_eq!(seen[0], StationFilter::ByType(TransportType::Bus));
        assert_eq!(seen[6], StationFilter::ByType(TransportType::Dolmus));
        assert_eq!(seen[7], StationFilter::All);
    }

    #[test]
    fn search_is_case_insensitive() {
        let hits = search(&fixture(), "  kadIKOY ");
        assert_eq!(hits.len(), 2);
        assert_eq!(search(&fixture(), "").len(), 5);
    }

    #[test]
    fn nearby_sorts_by_distance_and_honors_radius() {
        let from = LatLng::new(41.036, 29.0);
        let all = nearby(&fixture(), from, None);
        let first: Vec<&str> = all.iter().take(2).map(|(s, _)| s.id.as_str()).collect();
        assert_eq!(first, vec!["5", "4"]);
        let close = nearby(&fixture(), from, Some(1_000.0));
        assert_eq!(close.len(), 2);
    }
}
