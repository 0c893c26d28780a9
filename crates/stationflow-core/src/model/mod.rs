// ── Domain model ──
//
// Canonical StationFlow types. Wire records from `stationflow_api` are
// converted into these in `crate::convert`; consumers never see raw JSON
// strings for enum-like fields.

pub mod location;
pub mod request;
pub mod station;
pub mod user;

pub use location::{LatLng, UserLocation};
pub use request::{Feedback, RequestStatus, UpdateRequest};
pub use station::{Station, StationDraft, StationId, StationStatus, TransportType};
pub use user::{Role, Session, User};
