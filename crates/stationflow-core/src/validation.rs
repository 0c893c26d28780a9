// ── Client-side validation ──
//
// Checks run before any network call. They mirror the backend's own
// constraints so the user sees the problem without a round trip.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;
use crate::model::{LatLng, Station, StationDraft};

pub const FEEDBACK_MIN_CHARS: usize = 10;
pub const FEEDBACK_MAX_CHARS: usize = 500;
pub const USERNAME_CHARS: std::ops::RangeInclusive<usize> = 3..=20;
pub const PASSWORD_CHARS: std::ops::RangeInclusive<usize> = 6..=40;
pub const EMAIL_MAX_CHARS: usize = 50;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+$").expect("valid regex"));

/// An occupancy report must stay within `0..=capacity`.
pub fn validate_report(station: &Station, available: i64) -> Result<u32, CoreError> {
    u32::try_from(available)
        .ok()
        .filter(|a| *a <= station.capacity)
        .ok_or_else(|| {
            CoreError::validation(format!(
                "available must be between 0 and {} for {}",
                station.capacity, station.name
            ))
        })
}

pub fn validate_location(location: LatLng) -> Result<(), CoreError> {
    if location.is_valid() {
        Ok(())
    } else {
        Err(CoreError::validation(format!(
            "coordinates out of range: {location} (lat -90..90, lng -180..180)"
        )))
    }
}

pub fn validate_station_draft(draft: &StationDraft) -> Result<(), CoreError> {
    if draft.name.trim().is_empty() {
        return Err(CoreError::validation("station name must not be empty"));
    }
    if draft.capacity == 0 {
        return Err(CoreError::validation("capacity must be at least 1"));
    }
    if let Some(available) = draft.available
        && available > draft.capacity
    {
        return Err(CoreError::validation(format!(
            "available ({available}) exceeds capacity ({})",
            draft.capacity
        )));
    }
    validate_location(draft.location)
}

pub fn validate_feedback(message: &str, email: Option<&str>) -> Result<(), CoreError> {
    let len = message.trim().chars().count();
    if !(FEEDBACK_MIN_CHARS..=FEEDBACK_MAX_CHARS).contains(&len) {
        return Err(CoreError::validation(format!(
            "feedback must be {FEEDBACK_MIN_CHARS} to {FEEDBACK_MAX_CHARS} characters (got {len})"
        )));
    }
    if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
        validate_email(email)?;
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), CoreError> {
    if email.chars().count() > EMAIL_MAX_CHARS {
        return Err(CoreError::validation(format!(
            "email must be at most {EMAIL_MAX_CHARS} characters"
        )));
    }
    if EMAIL.is_match(email) {
        Ok(())
    } else {
        Err(CoreError::validation(format!("'{email}' is not a valid email address")))
    }
}

pub fn validate_username(username: &str) -> Result<(), CoreError> {
    let len = username.chars().count();
    if USERNAME_CHARS.contains(&len) {
        Ok(())
    } else {
        Err(CoreError::validation(format!(
            "username must be {} to {} characters",
            USERNAME_CHARS.start(),
            USERNAME_CHARS.end()
        )))
    }
}

pub fn validate_password(password: &str) -> Result<(), CoreError> {
    let len = password.chars().count();
    if PASSWORD_CHARS.contains(&len) {
        Ok(())
    } else {
        Err(CoreError::validation(format!(
            "password must be {} to {} characters",
            PASSWORD_CHARS.start(),
            PASSWORD_CHARS.end()
        )))
    }
}

pub fn validate_sign_up(username: &str, email: &str, password: &str) -> Result<(), CoreError> {
    validate_username(username)?;
    validate_email(email)?;
    validate_password(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StationId, StationStatus, TransportType};

    fn station() -> Station {
        Station {
            id: StationId::from("s1"),
            name: "Uskudar".into(),
            transport: TransportType::Bus,
            location: LatLng::new(41.02, 29.01),
            capacity: 40,
            available: 10,
            status: StationStatus::Active,
            last_update: None,
            is_custom: false,
            owner_id: None,
        }
    }

    #[test]
    fn reports_outside_capacity_are_rejected() {
        assert!(matches!(validate_report(&station(), 40), Ok(40)));
        assert!(matches!(validate_report(&station(), 0), Ok(0)));
        assert!(validate_report(&station(), 41).is_err());
        assert!(validate_report(&station(), -1).is_err());
    }

    #[test]
    fn feedback_length_and_email() {
        assert!(validate_feedback("too short", None).is_err());
        assert!(validate_feedback("The map froze after zooming.", None).is_ok());
        assert!(validate_feedback("The map froze after zooming.", Some("ayse@example.com")).is_ok());
        assert!(validate_feedback("The map froze after zooming.", Some("not an email")).is_err());
        assert!(validate_feedback("The map froze after zooming.", Some("  ")).is_ok());
        assert!(validate_feedback(&"x".repeat(501), None).is_err());
    }

    #[test]
    fn drafts_need_name_capacity_and_coordinates() {
        let mut draft = StationDraft {
            name: "Ev Onu".into(),
            transport: TransportType::Bike,
            location: LatLng::new(41.0, 29.0),
            capacity: 10,
            available: None,
            owner_id: None,
        };
        assert!(validate_station_draft(&draft).is_ok());
        draft.capacity = 0;
        assert!(validate_station_draft(&draft).is_err());
        draft.capacity = 10;
        draft.location = LatLng::new(0.0, 200.0);
        assert!(validate_station_draft(&draft).is_err());
    }

    #[test]
    fn credential_lengths() {
        assert!(validate_sign_up("ay", "a@b.co", "secret").is_err());
        assert!(validate_sign_up("ayse", "a@b.co", "12345").is_err());
        assert!(validate_sign_up("ayse", "a@b.co", "secret").is_ok());
    }
}
