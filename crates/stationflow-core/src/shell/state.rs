// ── Shell UI state ──

use std::sync::Arc;

use strum::{Display, EnumIter};

use crate::model::{LatLng, Session, Station, StationId, UserLocation};
use crate::stream::StationFilter;

/// Dialogs the shell can show. At most one is meaningful at a time but
/// the flags are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Modal {
    Auth,
    AddStation,
    AdminDashboard,
    FeedbackDashboard,
    ReportStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModalFlags {
    pub auth: bool,
    pub add_station: bool,
    pub admin_dashboard: bool,
    pub feedback_dashboard: bool,
    pub report_status: bool,
}

impl ModalFlags {
    pub fn is_open(&self, modal: Modal) -> bool {
        match modal {
            Modal::Auth => self.auth,
            Modal::AddStation => self.add_station,
            Modal::AdminDashboard => self.admin_dashboard,
            Modal::FeedbackDashboard => self.feedback_dashboard,
            Modal::ReportStatus => self.report_status,
        }
    }

    pub fn set(&mut self, modal: Modal, open: bool) {
        let flag = match modal {
            Modal::Auth => &mut self.auth,
            Modal::AddStation => &mut self.add_station,
            Modal::AdminDashboard => &mut self.admin_dashboard,
            Modal::FeedbackDashboard => &mut self.feedback_dashboard,
            Modal::ReportStatus => &mut self.report_status,
        };
        *flag = open;
    }

    pub fn any(&self) -> bool {
        self.auth
            || self.add_station
            || self.admin_dashboard
            || self.feedback_dashboard
            || self.report_status
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Self::Info(text) | Self::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Everything the shell owns besides the station list itself.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub filter: StationFilter,
    pub search: String,
    pub selected: Option<Arc<Station>>,
    pub route_active: bool,
    pub route_destination: Option<Arc<Station>>,
    pub sidebar_open: bool,
    pub modals: ModalFlags,
    /// Waiting for a map click to place a new station.
    pub picking: bool,
    pub picked_location: Option<LatLng>,
    pub report_target: Option<StationId>,
    /// Admin badge; `None` until counted.
    pub pending_requests: Option<usize>,
    pub feedback_count: Option<usize>,
    pub session: Option<Arc<Session>>,
    pub user_location: Option<UserLocation>,
    pub notice: Option<Notice>,
    pub initial_load_requested: bool,
}

impl UiState {
    pub fn selected_id(&self) -> Option<&StationId> {
        self.selected.as_ref().map(|s| &s.id)
    }

    pub fn destination_id(&self) -> Option<&StationId> {
        self.route_destination.as_ref().map(|s| &s.id)
    }

    pub fn is_admin(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_admin())
    }

    /// Whether the active route leads to `id`.
    pub fn routes_to(&self, id: &StationId) -> bool {
        self.route_active && self.destination_id() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn modal_flags_round_trip_every_modal() {
        let mut flags = ModalFlags::default();
        for modal in Modal::iter() {
            assert!(!flags.is_open(modal));
            flags.set(modal, true);
            assert!(flags.is_open(modal));
        }
        assert!(flags.any());
        flags.clear();
        assert!(!flags.any());
    }
}
