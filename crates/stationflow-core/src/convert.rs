// ── API-to-domain type conversions ──
//
// Bridges raw `stationflow_api` records into canonical domain types.
// Enum-like strings are parsed into strong types; records the map cannot
// render (unknown type or status, non-positive capacity, coordinates off
// the globe) are rejected, while an out-of-range `available` is clamped.

use chrono::{DateTime, NaiveDateTime};
use tracing::warn;

use stationflow_api::models::{
    FeedbackRecord, JwtResponse, LocationRecord, NewStationRecord, StationRecord,
    UpdateRequestRecord,
};

use crate::error::CoreError;
use crate::model::{
    Feedback, LatLng, RequestStatus, Role, Session, Station, StationDraft, StationId,
    StationStatus, TransportType, UpdateRequest, User,
};

// ── Helpers ────────────────────────────────────────────────────────

/// Parse a backend timestamp: ISO local date-time (`2025-03-01T10:15:00`,
/// optional fraction) or RFC 3339 with an offset.
pub(crate) fn parse_timestamp(raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw?.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.naive_utc())
}

fn invalid(id: &str, reason: impl Into<String>) -> CoreError {
    CoreError::InvalidRecord {
        id: id.to_owned(),
        reason: reason.into(),
    }
}

impl From<LocationRecord> for LatLng {
    fn from(r: LocationRecord) -> Self {
        LatLng::new(r.lat, r.lng)
    }
}

impl From<LatLng> for LocationRecord {
    fn from(p: LatLng) -> Self {
        LocationRecord {
            lat: p.lat,
            lng: p.lng,
        }
    }
}

// ── Station ────────────────────────────────────────────────────────

impl TryFrom<StationRecord> for Station {
    type Error = CoreError;

    fn try_from(r: StationRecord) -> Result<Self, Self::Error> {
        let transport: TransportType = r
            .station_type
            .parse()
            .map_err(|_| invalid(&r.id, format!("unknown type '{}'", r.station_type)))?;
        let status: StationStatus = r
            .status
            .parse()
            .map_err(|_| invalid(&r.id, format!("unknown status '{}'", r.status)))?;

        let capacity = u32::try_from(r.capacity)
            .ok()
            .filter(|c| *c > 0)
            .ok_or_else(|| invalid(&r.id, format!("capacity {} is not positive", r.capacity)))?;

        let location = LatLng::from(r.location);
        if !location.is_valid() {
            return Err(invalid(&r.id, format!("coordinates out of range: {location}")));
        }

        let available = u32::try_from(r.available.clamp(0, i64::from(capacity))).unwrap_or(0);
        if i64::from(available) != r.available {
            warn!(
                station = %r.id,
                reported = r.available,
                capacity,
                "clamping availability into [0, capacity]"
            );
        }

        Ok(Station {
            id: StationId::from(r.id),
            name: r.name,
            transport,
            location,
            capacity,
            available,
            status,
            last_update: parse_timestamp(r.last_update.as_deref()),
            is_custom: r.is_custom.unwrap_or(false),
            owner_id: r.owner_id,
        })
    }
}

/// Convert a full listing, dropping (and logging) records that cannot be
/// rendered.
pub fn stations_from_records(records: Vec<StationRecord>) -> Vec<Station> {
    records
        .into_iter()
        .filter_map(|record| match Station::try_from(record) {
            Ok(station) => Some(station),
            Err(e) => {
                warn!(error = %e, "skipping station record");
                None
            }
        })
        .collect()
}

impl From<&StationDraft> for NewStationRecord {
    fn from(d: &StationDraft) -> Self {
        NewStationRecord {
            name: d.name.trim().to_owned(),
            station_type: d.transport.to_string(),
            location: d.location.into(),
            capacity: i64::from(d.capacity),
            available: i64::from(d.effective_available().min(d.capacity)),
            status: StationStatus::Active.to_string(),
            is_custom: true,
            owner_id: d.owner_id.clone(),
        }
    }
}

// ── Requests and feedback ──────────────────────────────────────────

impl TryFrom<UpdateRequestRecord> for UpdateRequest {
    type Error = CoreError;

    fn try_from(r: UpdateRequestRecord) -> Result<Self, Self::Error> {
        let status: RequestStatus = r
            .status
            .parse()
            .map_err(|_| invalid(&r.id, format!("unknown request status '{}'", r.status)))?;
        Ok(UpdateRequest {
            requested_available: u32::try_from(r.requested_available.max(0)).unwrap_or(0),
            status,
            created_at: parse_timestamp(r.created_at.as_deref()),
            station_id: StationId::from(r.station_id),
            station_name: r.station_name,
            user_id: r.user_id,
            username: r.username,
            id: r.id,
        })
    }
}

pub fn requests_from_records(records: Vec<UpdateRequestRecord>) -> Vec<UpdateRequest> {
    records
        .into_iter()
        .filter_map(|record| match UpdateRequest::try_from(record) {
            Ok(request) => Some(request),
            Err(e) => {
                warn!(error = %e, "skipping update request record");
                None
            }
        })
        .collect()
}

impl From<FeedbackRecord> for Feedback {
    fn from(r: FeedbackRecord) -> Self {
        Feedback {
            created_at: parse_timestamp(r.created_at.as_deref()),
            id: r.id,
            message: r.message,
            email: r.email,
            ip_address: r.ip_address,
        }
    }
}

// ── Session ────────────────────────────────────────────────────────

impl From<JwtResponse> for Session {
    fn from(jwt: JwtResponse) -> Self {
        let role = if jwt.is_admin() { Role::Admin } else { Role::User };
        Session {
            user: User {
                id: jwt.id,
                username: jwt.username,
                email: jwt.email,
                role,
            },
            token: jwt.token.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(available: i64, capacity: i64) -> StationRecord {
        StationRecord {
            id: "s1".into(),
            name: "Kadikoy Iskele".into(),
            station_type: "bus".into(),
            location: LocationRecord {
                lat: 40.99,
                lng: 29.02,
            },
            capacity,
            available,
            status: "active".into(),
            last_update: Some("2025-03-01T10:15:00.123".into()),
            is_custom: None,
            owner_id: None,
        }
    }

    #[test]
    fn availability_is_clamped_to_capacity() {
        let station = Station::try_from(record(55, 40)).unwrap();
        assert_eq!(station.available, 40);
        let station = Station::try_from(record(-3, 40)).unwrap();
        assert_eq!(station.available, 0);
        assert!(station.last_update.is_some());
        assert!(!station.is_custom);
    }

    #[test]
    fn unrenderable_records_are_rejected() {
        assert!(Station::try_from(record(0, 0)).is_err());

        let mut bad_type = record(1, 10);
        bad_type.station_type = "tram".into();
        assert!(Station::try_from(bad_type).is_err());

        let mut off_globe = record(1, 10);
        off_globe.location.lat = 123.0;
        assert!(Station::try_from(off_globe).is_err());
    }

    #[test]
    fn listing_skips_bad_records_and_keeps_order() {
        let mut a = record(1, 10);
        a.id = "a".into();
        let mut bad = record(1, 0);
        bad.id = "bad".into();
        let mut b = record(2, 10);
        b.id = "b".into();

        let ids: Vec<String> = stations_from_records(vec![a, bad, b])
            .into_iter()
            .map(|s| s.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn timestamps_accept_offsets() {
        let ts = parse_timestamp(Some("2025-03-01T10:15:00+03:00")).unwrap();
        assert_eq!(ts.to_string(), "2025-03-01 07:15:00");
        assert!(parse_timestamp(Some("yesterday")).is_none());
    }

    #[test]
    fn draft_becomes_custom_active_record() {
        let draft = StationDraft {
            name: "  Moda Sahil ".into(),
            transport: TransportType::Scooter,
            location: LatLng::new(40.98, 29.03),
            capacity: 9,
            available: None,
            owner_id: Some("u1".into()),
        };
        let body = NewStationRecord::from(&draft);
        assert_eq!(body.name, "Moda Sahil");
        assert_eq!(body.station_type, "scooter");
        assert_eq!(body.available, 4);
        assert_eq!(body.status, "active");
        assert!(body.is_custom);
    }
}
