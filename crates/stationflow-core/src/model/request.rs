// ── Update requests and feedback ──

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::station::StationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// A crowd-sourced occupancy report awaiting (or past) admin review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub id: String,
    pub station_id: StationId,
    pub station_name: Option<String>,
    pub user_id: String,
    pub username: Option<String>,
    pub requested_available: u32,
    pub status: RequestStatus,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub message: String,
    pub email: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub ip_address: Option<String>,
}
