// ── Reactive data store ──
//
// Concurrent entity storage with push-based change notification.

mod collection;
mod station_store;

pub(crate) use collection::EntityCollection;
pub use station_store::{RefreshOutcome, RefreshToken, StationStore};
