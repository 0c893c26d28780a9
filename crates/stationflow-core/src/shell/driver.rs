// ── Shell driver ──
//
// Runs the shell against the real world: executes `ShellEffect`s on
// spawned tasks, and merges their results with geolocation fixes, store
// changes and the popup debounce timer into one ordered message queue.
// The shell is only ever touched from the task that owns the driver.

use std::future::pending;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::sleep_until;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::StationDataClient;
use crate::clock::Clock;
use crate::error::CoreError;
use crate::geolocation::{GeolocationWatcher, InitialLoadReason};
use crate::map::{MapEvent, MapSurface};
use crate::model::{RequestStatus, Station, StationId, UserLocation};
use crate::route::{RoutePlan, RoutePlanner, RouteProvider};
use crate::store::RefreshToken;
use crate::stream::StationStream;

use super::app::{AppShell, Effects, ShellEffect};

/// Everything that can wake the shell.
#[derive(Debug)]
pub enum ShellMessage {
    InitialLoad(InitialLoadReason),
    Located(UserLocation),
    StoreChanged,
    /// A popup debounce deadline passed.
    Tick,
    Map(MapEvent),
    StationsLoaded {
        token: RefreshToken,
        result: Result<Vec<Station>, CoreError>,
    },
    RouteResolved(Option<RoutePlan>),
    StationCreated(Result<Station, CoreError>),
    StationDeleted {
        id: StationId,
        result: Result<(), CoreError>,
    },
    ReportSubmitted(Result<String, CoreError>),
    Moderated(Result<String, CoreError>),
    PendingCounted(Result<usize, CoreError>),
    FeedbackCounted(Result<usize, CoreError>),
}

pub struct ShellDriver<S, C, P> {
    shell: AppShell<S, C>,
    client: StationDataClient,
    planner: RoutePlanner<P>,
    tx: mpsc::UnboundedSender<ShellMessage>,
    rx: mpsc::UnboundedReceiver<ShellMessage>,
    stations: StationStream,
    location: Option<watch::Receiver<Option<UserLocation>>>,
    initial: Option<oneshot::Receiver<InitialLoadReason>>,
    watcher: Option<GeolocationWatcher>,
}

impl<S, C, P> ShellDriver<S, C, P>
where
    S: MapSurface,
    C: Clock,
    P: RouteProvider,
{
    pub fn new(shell: AppShell<S, C>, client: StationDataClient, planner: RoutePlanner<P>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stations = shell.store().subscribe();
        Self {
            shell,
            client,
            planner,
            tx,
            rx,
            stations,
            location: None,
            initial: None,
            watcher: None,
        }
    }

    /// Attach a running watcher. Its first fix (or failure) triggers the
    /// initial load; without one, [`start`](Self::start) loads right away.
    #[must_use]
    pub fn with_geolocation(
        mut self,
        watcher: GeolocationWatcher,
        initial: oneshot::Receiver<InitialLoadReason>,
    ) -> Self {
        self.location = Some(watcher.location());
        self.initial = Some(initial);
        self.watcher = Some(watcher);
        self
    }

    pub fn shell(&self) -> &AppShell<S, C> {
        &self.shell
    }

    pub fn client(&self) -> &StationDataClient {
        &self.client
    }

    /// A sender for feeding messages (map events, mostly) from elsewhere.
    pub fn sender(&self) -> mpsc::UnboundedSender<ShellMessage> {
        self.tx.clone()
    }

    /// Kick off loading when no geolocation source is attached.
    pub fn start(&mut self) {
        if self.initial.is_none() {
            self.apply(ShellMessage::InitialLoad(InitialLoadReason::SourceEnded));
        }
    }

    /// Run a synchronous shell input and dispatch whatever it asks for.
    pub fn act<F>(&mut self, f: F)
    where
        F: FnOnce(&mut AppShell<S, C>) -> Effects,
    {
        let effects = f(&mut self.shell);
        self.dispatch(effects);
    }

    // ── Message loop ─────────────────────────────────────────────────

    /// Wait for the next message. `None` once every source is closed.
    pub async fn next(&mut self) -> Option<ShellMessage> {
        loop {
            let deadline = self.shell.next_deadline();
            let rx = &mut self.rx;
            let stations = &mut self.stations;
            let location = &mut self.location;
            let initial = &mut self.initial;

            let wake = tokio::select! {
                msg = rx.recv() => Wake::Message(msg),
                snapshot = stations.changed() => Wake::Store(snapshot.is_some()),
                changed = async {
                    match location.as_mut() {
                        Some(rx) => rx.changed().await.map(|()| *rx.borrow_and_update()),
                        None => pending().await,
                    }
                } => Wake::Location(changed.ok()),
                reason = async {
                    match initial.as_mut() {
                        Some(rx) => rx.await,
                        None => pending().await,
                    }
                } => Wake::Initial(reason.ok()),
                () = async {
                    match deadline {
                        Some(at) => sleep_until(at).await,
                        None => pending().await,
                    }
                } => Wake::Deadline,
            };

            match wake {
                Wake::Message(msg) => return msg,
                Wake::Store(true) => return Some(ShellMessage::StoreChanged),
                Wake::Store(false) => {
                    debug!("station store closed");
                    return None;
                }
                Wake::Location(Some(Some(fix))) => return Some(ShellMessage::Located(fix)),
                Wake::Location(Some(None)) => {}
                Wake::Location(None) => self.location = None,
                Wake::Initial(reason) => {
                    self.initial = None;
                    let reason = reason.unwrap_or(InitialLoadReason::SourceEnded);
                    return Some(ShellMessage::InitialLoad(reason));
                }
                Wake::Deadline => return Some(ShellMessage::Tick),
            }
        }
    }

    /// Feed one message to the shell and dispatch the resulting effects.
    pub fn apply(&mut self, msg: ShellMessage) {
        let shell = &mut self.shell;
        let effects = match msg {
            ShellMessage::InitialLoad(reason) => shell.initial_load(&reason),
            ShellMessage::Located(fix) => shell.location_updated(fix),
            ShellMessage::StoreChanged => {
                shell.store_changed();
                Vec::new()
            }
            ShellMessage::Tick => shell.tick(),
            ShellMessage::Map(event) => shell.map_event(event),
            ShellMessage::StationsLoaded { token, result } => {
                shell.stations_loaded(token, result);
                Vec::new()
            }
            ShellMessage::RouteResolved(plan) => {
                shell.route_resolved(plan);
                Vec::new()
            }
            ShellMessage::StationCreated(result) => {
                shell.station_created(result);
                Vec::new()
            }
            ShellMessage::StationDeleted { id, result } => {
                shell.station_deleted(&id, result);
                Vec::new()
            }
            ShellMessage::ReportSubmitted(result) => {
                shell.report_submitted(result);
                Vec::new()
            }
            ShellMessage::Moderated(result) => shell.moderated(result),
            ShellMessage::PendingCounted(result) => {
                shell.pending_counted(result);
                Vec::new()
            }
            ShellMessage::FeedbackCounted(result) => {
                shell.feedback_counted(result);
                Vec::new()
            }
        };
        self.dispatch(effects);
    }

    /// Process messages until `cancel` fires or every source closes.
    pub async fn run(&mut self, cancel: CancellationToken) {
        self.start();
        loop {
            let msg = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                msg = self.next() => msg,
            };
            match msg {
                Some(msg) => self.apply(msg),
                None => break,
            }
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.shutdown();
        }
        debug!("shell driver stopped");
    }

    // ── Effects ──────────────────────────────────────────────────────

    pub fn dispatch(&self, effects: Effects) {
        for effect in effects {
            self.spawn_effect(effect);
        }
    }

    fn spawn_effect(&self, effect: ShellEffect) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        debug!(?effect, "dispatching");

        match effect {
            ShellEffect::LoadStations(token) => {
                tokio::spawn(async move {
                    let result = client.fetch_stations().await;
                    send(&tx, ShellMessage::StationsLoaded { token, result });
                });
            }
            ShellEffect::FetchRoute(ticket) => {
                let planner = self.planner.clone();
                tokio::spawn(async move {
                    let plan = planner.plan(&ticket).await;
                    send(&tx, ShellMessage::RouteResolved(plan));
                });
            }
            ShellEffect::CreateStation(draft) => {
                tokio::spawn(async move {
                    let result = client.create_station(&draft).await;
                    send(&tx, ShellMessage::StationCreated(result));
                });
            }
            ShellEffect::DeleteStation(id) => {
                tokio::spawn(async move {
                    let result = client.delete_station(&id).await;
                    send(&tx, ShellMessage::StationDeleted { id, result });
                });
            }
            ShellEffect::SubmitReport { station, available } => {
                tokio::spawn(async move {
                    let result = client.report(&station, available).await;
                    send(&tx, ShellMessage::ReportSubmitted(result));
                });
            }
            ShellEffect::Moderate { request_id, approve } => {
                tokio::spawn(async move {
                    let result = if approve {
                        client.approve_request(&request_id).await
                    } else {
                        client.reject_request(&request_id).await
                    };
                    send(&tx, ShellMessage::Moderated(result));
                });
            }
            ShellEffect::CountPendingRequests => {
                tokio::spawn(async move {
                    let result = client.pending_requests().await.map(|requests| {
                        requests
                            .iter()
                            .filter(|r| r.status == RequestStatus::Pending)
                            .count()
                    });
                    send(&tx, ShellMessage::PendingCounted(result));
                });
            }
            ShellEffect::CountFeedback => {
                tokio::spawn(async move {
                    let result = client.list_feedback().await.map(|entries| entries.len());
                    send(&tx, ShellMessage::FeedbackCounted(result));
                });
            }
        }
    }
}

enum Wake {
    Message(Option<ShellMessage>),
    Store(bool),
    Location(Option<Option<UserLocation>>),
    Initial(Option<InitialLoadReason>),
    Deadline,
}

fn send(tx: &mpsc::UnboundedSender<ShellMessage>, msg: ShellMessage) {
    if tx.send(msg).is_err() {
        warn!("shell driver gone, dropping result");
    }
}
