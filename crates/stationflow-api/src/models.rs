// Wire types for the StationFlow REST API.
//
// These mirror the backend's JSON exactly (camelCase, lowercase enum
// strings). Enum-like fields stay `String` here; `stationflow-core`
// parses and validates them into domain types.

use serde::{Deserialize, Serialize};

// ── Stations ─────────────────────────────────────────────────────────

/// A geographic point as the backend sends it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub lat: f64,
    pub lng: f64,
}

/// A station record from `GET /stations` or a `station-update` push event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub station_type: String,
    pub location: LocationRecord,
    pub capacity: i64,
    pub available: i64,
    pub status: String,
    #[serde(default)]
    pub last_update: Option<String>,
    /// Lombok-generated getters serialize `isCustom` as `custom`.
    #[serde(default, alias = "custom")]
    pub is_custom: Option<bool>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// Body for `POST /stations`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStationRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub station_type: String,
    pub location: LocationRecord,
    pub capacity: i64,
    pub available: i64,
    pub status: String,
    pub is_custom: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

// ── Update requests ──────────────────────────────────────────────────

/// Body for `POST /stations/{id}/request-update`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RequestUpdateBody {
    pub available: i64,
}

/// A crowd-sourced occupancy update request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequestRecord {
    pub id: String,
    pub station_id: String,
    #[serde(default)]
    pub station_name: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
    pub requested_available: i64,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct SignInBody<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Successful `POST /auth/signin` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtResponse {
    pub token: String,
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl JwtResponse {
    /// Whether the backend granted the admin role.
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == "ROLE_ADMIN")
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignUpBody<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: [&'a str; 1],
    pub recaptcha_token: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChangePasswordBody<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

/// Generic `{ "message": "..." }` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

// ── Feedback ─────────────────────────────────────────────────────────

/// Body for `POST /feedback`.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackSubmission {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A stored feedback entry (admin view).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
}
