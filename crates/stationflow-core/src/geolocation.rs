// ── Geolocation watcher ──
//
// Wraps a platform position source in a background task that publishes
// the latest fix on a `watch` channel. The first fix, or the first
// definitive failure, fires the initial-load latch exactly once. There is
// no retry beyond what the source itself does: errors are logged and the
// client carries on without a user location.

use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::UserLocation;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    Unavailable(String),
    #[error("position request timed out")]
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// Oldest cached fix the source may hand back.
    pub maximum_age: Duration,
    pub timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            maximum_age: Duration::ZERO,
            timeout: Duration::from_secs(20),
        }
    }
}

/// A continuous position feed. The stream ends when the source gives up.
pub trait PositionSource: Send + 'static {
    fn watch(
        &mut self,
        options: &WatchOptions,
    ) -> BoxStream<'static, Result<UserLocation, PositionError>>;
}

// ── Initial-load latch ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitialLoadReason {
    FirstFix,
    Failed(PositionError),
    /// The source ended without ever producing a fix.
    SourceEnded,
}

/// Fires at most once.
#[derive(Debug)]
pub struct InitialLoad {
    tx: Option<oneshot::Sender<InitialLoadReason>>,
}

impl InitialLoad {
    pub fn new() -> (Self, oneshot::Receiver<InitialLoadReason>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Returns `true` the first time only.
    pub fn fire(&mut self, reason: InitialLoadReason) -> bool {
        match self.tx.take() {
            Some(tx) => {
                debug!(?reason, "initial load latch fired");
                let _ = tx.send(reason);
                true
            }
            None => false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.tx.is_none()
    }
}

// ── Watcher ──────────────────────────────────────────────────────────

/// Owns the position subscription. Dropping it unsubscribes.
pub struct GeolocationWatcher {
    location: watch::Receiver<Option<UserLocation>>,
    cancel: CancellationToken,
}

impl GeolocationWatcher {
    pub fn spawn<P: PositionSource>(
        mut source: P,
        options: WatchOptions,
    ) -> (Self, oneshot::Receiver<InitialLoadReason>) {
        let (tx, location) = watch::channel(None);
        let (mut latch, initial) = InitialLoad::new();
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let mut positions = source.watch(&options);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = task_cancel.cancelled() => break,
                    next = positions.next() => match next {
                        Some(Ok(fix)) => {
                            tx.send_replace(Some(fix));
                            latch.fire(InitialLoadReason::FirstFix);
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "geolocation error");
                            latch.fire(InitialLoadReason::Failed(e));
                        }
                        None => {
                            info!("position source ended");
                            latch.fire(InitialLoadReason::SourceEnded);
                            break;
                        }
                    },
                }
            }
            debug!("geolocation watcher stopped");
        });

        (Self { location, cancel }, initial)
    }

    /// Subscribe to fixes. `None` until the first one arrives.
    pub fn location(&self) -> watch::Receiver<Option<UserLocation>> {
        self.location.clone()
    }

    pub fn current(&self) -> Option<UserLocation> {
        *self.location.borrow()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for GeolocationWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Sources ──────────────────────────────────────────────────────────

/// A fixed position (e.g. `--at LAT,LNG`). Emits once, then stays quiet.
#[derive(Debug, Clone, Copy)]
pub struct StaticPositionSource(pub UserLocation);

impl PositionSource for StaticPositionSource {
    fn watch(
        &mut self,
        _options: &WatchOptions,
    ) -> BoxStream<'static, Result<UserLocation, PositionError>> {
        stream::iter([Ok(self.0)]).chain(stream::pending()).boxed()
    }
}

/// Positions pushed from elsewhere in the program (tests, the TUI's
/// manual "move me" keys). The stream ends when every sender is dropped.
pub struct ChannelPositionSource {
    rx: Option<mpsc::Receiver<Result<UserLocation, PositionError>>>,
}

impl ChannelPositionSource {
    pub fn new(buffer: usize) -> (Self, mpsc::Sender<Result<UserLocation, PositionError>>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { rx: Some(rx) }, tx)
    }
}

impl PositionSource for ChannelPositionSource {
    fn watch(
        &mut self,
        _options: &WatchOptions,
    ) -> BoxStream<'static, Result<UserLocation, PositionError>> {
        let Some(mut rx) = self.rx.take() else {
            return stream::empty().boxed();
        };
        async_stream::stream! {
            while let Some(item) = rx.recv().await {
                yield item;
            }
        }
        .boxed()
    }
}

/// No positioning available on this platform.
#[derive(Debug, Clone)]
pub struct UnavailablePositionSource {
    pub reason: String,
}

impl PositionSource for UnavailablePositionSource {
    fn watch(
        &mut self,
        _options: &WatchOptions,
    ) -> BoxStream<'static, Result<UserLocation, PositionError>> {
        stream::iter([Err(PositionError::Unavailable(self.reason.clone()))]).boxed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_fix_fires_latch_once_and_updates_location() {
        let (source, tx) = ChannelPositionSource::new(4);
        let (watcher, initial) = GeolocationWatcher::spawn(source, WatchOptions::default());
        let mut location = watcher.location();

        tx.send(Ok(UserLocation::new(41.0, 29.0))).await.unwrap();
        assert_eq!(initial.await.unwrap(), InitialLoadReason::FirstFix);

        tx.send(Ok(UserLocation::new(41.1, 29.1))).await.unwrap();
        location
            .wait_for(|l| l.is_some_and(|l| (l.position.lat - 41.1).abs() < 1e-9))
            .await
            .unwrap();
        assert!(watcher.current().is_some());
    }

    #[tokio::test]
    async fn failure_fires_latch_and_leaves_location_empty() {
        let source = UnavailablePositionSource {
            reason: "no GPS".into(),
        };
        let (watcher, initial) = GeolocationWatcher::spawn(source, WatchOptions::default());
        assert_eq!(
            initial.await.unwrap(),
            InitialLoadReason::Failed(PositionError::Unavailable("no GPS".into()))
        );
        assert!(watcher.current().is_none());
    }

    #[tokio::test]
    async fn latch_ignores_later_failures() {
        let (mut latch, rx) = InitialLoad::new();
        assert!(latch.fire(InitialLoadReason::FirstFix));
        assert!(!latch.fire(InitialLoadReason::Failed(PositionError::Timeout)));
        assert!(latch.has_fired());
        assert_eq!(rx.await.unwrap(), InitialLoadReason::FirstFix);
    }

    #[test]
    fn default_options_request_fresh_high_accuracy_fixes() {
        let opts = WatchOptions::default();
        assert!(opts.high_accuracy);
        assert_eq!(opts.maximum_age, Duration::ZERO);
        assert_eq!(opts.timeout, Duration::from_secs(20));
    }
}
