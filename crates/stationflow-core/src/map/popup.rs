// ── Popup close debounce ──
//
// Surfaces report popup opens and closes as they happen. Switching from
// A to B shows up either as close(A) then open(B), or as open(B) then a
// late close(A). Neither may deselect. A close that is not followed by an
// open within the debounce window means the user dismissed the popup.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::model::StationId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupState {
    Idle,
    Open(StationId),
    PendingClose { id: StationId, deadline: Instant },
    /// `to` opened while `from` was still open; the close of `from` that
    /// follows is swallowed.
    SuppressedBySwitch { from: StationId, to: StationId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dismissed(pub StationId);

#[derive(Debug)]
pub struct PopupTracker {
    state: PopupState,
    window: Duration,
}

impl PopupTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            state: PopupState::Idle,
            window,
        }
    }

    pub fn state(&self) -> &PopupState {
        &self.state
    }

    /// The station whose popup is (logically) open.
    pub fn open_id(&self) -> Option<&StationId> {
        match &self.state {
            PopupState::Open(id) | PopupState::SuppressedBySwitch { to: id, .. } => Some(id),
            PopupState::Idle | PopupState::PendingClose { .. } => None,
        }
    }

    pub fn on_open(&mut self, id: &StationId) {
        let next = match &self.state {
            PopupState::Open(current) if current != id => PopupState::SuppressedBySwitch {
                from: current.clone(),
                to: id.clone(),
            },
            PopupState::SuppressedBySwitch { from, .. } if from != id => {
                PopupState::SuppressedBySwitch {
                    from: from.clone(),
                    to: id.clone(),
                }
            }
            PopupState::PendingClose { id: closing, .. } if closing != id => {
                debug!(from = %closing, to = %id, "popup switched");
                PopupState::Open(id.clone())
            }
            _ => PopupState::Open(id.clone()),
        };
        self.state = next;
    }

    pub fn on_close(&mut self, id: &StationId, now: Instant) {
        let next = match &self.state {
            PopupState::Open(current) if current == id => PopupState::PendingClose {
                id: id.clone(),
                deadline: now + self.window,
            },
            PopupState::SuppressedBySwitch { from, to } if from == id => {
                PopupState::Open(to.clone())
            }
            PopupState::SuppressedBySwitch { to, .. } if to == id => PopupState::PendingClose {
                id: id.clone(),
                deadline: now + self.window,
            },
            _ => return,
        };
        self.state = next;
    }

    /// Forget everything without reporting a dismissal. Used when the
    /// renderer closes a popup itself.
    pub fn reset(&mut self) {
        self.state = PopupState::Idle;
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            PopupState::PendingClose { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    /// Report a dismissal once the window has elapsed without a reopen.
    pub fn poll(&mut self, now: Instant) -> Option<Dismissed> {
        match &self.state {
            PopupState::PendingClose { id, deadline } if now >= *deadline => {
                let id = id.clone();
                self.state = PopupState::Idle;
                Some(Dismissed(id))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(200);

    fn id(s: &str) -> StationId {
        StationId::from(s)
    }

    #[test]
    fn close_then_open_is_a_switch() {
        let t0 = Instant::now();
        let mut tracker = PopupTracker::new(WINDOW);
        tracker.on_open(&id("a"));
        tracker.on_close(&id("a"), t0);
        tracker.on_open(&id("b"));
        assert_eq!(tracker.poll(t0 + Duration::from_secs(1)), None);
        assert_eq!(tracker.open_id(), Some(&id("b")));
    }

    #[test]
    fn open_then_late_close_is_a_switch() {
        let t0 = Instant::now();
        let mut tracker = PopupTracker::new(WINDOW);
        tracker.on_open(&id("a"));
        tracker.on_open(&id("b"));
        assert!(matches!(tracker.state(), PopupState::SuppressedBySwitch { .. }));
        tracker.on_close(&id("a"), t0);
        assert_eq!(tracker.state(), &PopupState::Open(id("b")));
        assert_eq!(tracker.poll(t0 + Duration::from_secs(1)), None);
    }

    #[test]
    fn lone_close_dismisses_after_window() {
        let t0 = Instant::now();
        let mut tracker = PopupTracker::new(WINDOW);
        tracker.on_open(&id("a"));
        tracker.on_close(&id("a"), t0);
        assert_eq!(tracker.deadline(), Some(t0 + WINDOW));
        assert_eq!(tracker.poll(t0 + Duration::from_millis(199)), None);
        assert_eq!(tracker.poll(t0 + WINDOW), Some(Dismissed(id("a"))));
        assert_eq!(tracker.state(), &PopupState::Idle);
        assert_eq!(tracker.poll(t0 + WINDOW), None);
    }

    #[test]
    fn reopening_same_popup_cancels_dismissal() {
        let t0 = Instant::now();
        let mut tracker = PopupTracker::new(WINDOW);
        tracker.on_open(&id("a"));
        tracker.on_close(&id("a"), t0);
        tracker.on_open(&id("a"));
        assert_eq!(tracker.poll(t0 + WINDOW), None);
    }

    #[test]
    fn reset_drops_pending_close() {
        let t0 = Instant::now();
        let mut tracker = PopupTracker::new(WINDOW);
        tracker.on_open(&id("a"));
        tracker.on_close(&id("a"), t0);
        tracker.reset();
        assert_eq!(tracker.poll(t0 + WINDOW), None);
    }
}
