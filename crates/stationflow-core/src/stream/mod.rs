// ── Reactive station streams ──
//
// Subscription types for consuming station list changes from the store.

mod filter;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Station;

pub use filter::{StationFilter, nearby, search};

pub type StationSnapshot = Arc<Vec<Arc<Station>>>;

/// A subscription to the station list.
///
/// Offers both point-in-time snapshot access and change notification via
/// [`changed`](Self::changed) or by converting into a `Stream`.
pub struct StationStream {
    current: StationSnapshot,
    receiver: watch::Receiver<StationSnapshot>,
}

impl StationStream {
    pub(crate) fn new(receiver: watch::Receiver<StationSnapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation (or at the last `changed`).
    pub fn current(&self) -> &StationSnapshot {
        &self.current
    }

    pub fn latest(&self) -> StationSnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. Returns `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<StationSnapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    pub fn into_stream(self) -> StationWatchStream {
        StationWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding a fresh snapshot per store mutation.
pub struct StationWatchStream {
    inner: WatchStream<StationSnapshot>,
}

impl Stream for StationWatchStream {
    type Item = StationSnapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::model::{LatLng, Station, StationId, StationStatus, TransportType};
    use crate::store::StationStore;
    use futures_util::StreamExt;

    fn station(id: &str) -> Station {
        Station {
            id: StationId::from(id),
            name: id.to_owned(),
            transport: TransportType::Metro,
            location: LatLng::new(41.0, 29.0),
            capacity: 10,
            available: 5,
            status: StationStatus::Active,
            last_update: None,
            is_custom: false,
            owner_id: None,
        }
    }

    #[tokio::test]
    async fn changed_yields_new_snapshot() {
        let store = StationStore::new();
        let mut stream = store.subscribe();
        assert!(stream.current().is_empty());

        store.apply_push(station("m1"));
        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(stream.current().len(), 1);
    }

    #[tokio::test]
    async fn into_stream_starts_with_current_value() {
        let store = StationStore::new();
        store.apply_push(station("m1"));
        let mut stream = store.subscribe().into_stream();
        let first = stream.next().await.unwrap();
        assert_eq!(first[0].id.as_str(), "m1");
    }
}
