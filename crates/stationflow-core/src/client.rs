// ── Data client ──
//
// Lifecycle of one backend connection: session handling, station
// listing and mutations, moderation, feedback, and the push channel that
// keeps the `StationStore` current. Every write is validated locally and
// gated on the session before it reaches the network.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use stationflow_api::models::{FeedbackSubmission, NewStationRecord};
use stationflow_api::{PushChannelHandle, PushEvent, PushStatus, RoutingClient, StationApiClient};

use crate::config::ClientConfig;
use crate::convert::{requests_from_records, stations_from_records};
use crate::error::CoreError;
use crate::model::{Feedback, Session, Station, StationDraft, StationId, UpdateRequest};
use crate::store::{RefreshOutcome, RefreshToken, StationStore};
use crate::validation;

/// Cheaply cloneable handle to one StationFlow deployment.
#[derive(Clone)]
pub struct StationDataClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    api: StationApiClient,
    routing: Arc<RoutingClient>,
    store: Arc<StationStore>,
    session: ArcSwapOption<Session>,
    push: Mutex<Option<PushChannelHandle>>,
    push_task: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl StationDataClient {
    /// Build the HTTP clients. Does not touch the network.
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        let transport = config.transport();
        let api = StationApiClient::new(config.api_url.as_str(), &transport)?;
        let routing = RoutingClient::new(config.routing_url.as_str(), &transport)?;
        Ok(Self::from_parts(config, api, routing))
    }

    /// Assemble from pre-built API clients (tests point these at mocks).
    pub fn from_parts(config: ClientConfig, api: StationApiClient, routing: RoutingClient) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                api,
                routing: Arc::new(routing),
                store: Arc::new(StationStore::new()),
                session: ArcSwapOption::empty(),
                push: Mutex::new(None),
                push_task: Mutex::new(None),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<StationStore> {
        &self.inner.store
    }

    /// Shared routing client, for building a `RoutePlanner`.
    pub fn routing(&self) -> Arc<RoutingClient> {
        Arc::clone(&self.inner.routing)
    }

    // ── Session ──────────────────────────────────────────────────────

    pub fn session(&self) -> Option<Arc<Session>> {
        self.inner.session.load_full()
    }

    pub fn is_admin(&self) -> bool {
        self.inner
            .session
            .load()
            .as_ref()
            .is_some_and(|s| s.is_admin())
    }

    pub async fn sign_in(&self, username: &str, password: &SecretString) -> Result<Arc<Session>, CoreError> {
        if username.trim().is_empty() || password.expose_secret().is_empty() {
            return Err(CoreError::validation("username and password are required"));
        }
        let jwt = self.inner.api.sign_in(username.trim(), password).await?;
        let session = Session::from(jwt);
        info!(user = %session.user.username, admin = session.is_admin(), "signed in");
        Ok(self.restore_session(session))
    }

    /// Adopt a previously persisted session without contacting the
    /// backend. An expired token surfaces on the first gated call.
    pub fn restore_session(&self, session: Session) -> Arc<Session> {
        self.inner.api.set_token(session.token.clone());
        let session = Arc::new(session);
        self.inner.session.store(Some(Arc::clone(&session)));
        session
    }

    pub fn sign_out(&self) {
        self.inner.api.clear_token();
        if let Some(previous) = self.inner.session.swap(None) {
            debug!(user = %previous.user.username, "signed out");
        }
    }

    pub async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &SecretString,
        captcha_token: &str,
    ) -> Result<String, CoreError> {
        validation::validate_sign_up(username, email, password.expose_secret())?;
        let resp = self
            .inner
            .api
            .sign_up(username.trim(), email.trim(), password, captcha_token)
            .await?;
        Ok(resp.message)
    }

    pub async fn change_password(&self, current: &SecretString, new: &SecretString) -> Result<String, CoreError> {
        self.require_session("change your password")?;
        validation::validate_password(new.expose_secret())?;
        let resp = self.guard(self.inner.api.change_password(current, new).await)?;
        Ok(resp.message)
    }

    fn require_session(&self, action: &str) -> Result<Arc<Session>, CoreError> {
        self.session().ok_or_else(|| CoreError::NotSignedIn {
            action: action.to_owned(),
        })
    }

    fn require_admin(&self, action: &str) -> Result<Arc<Session>, CoreError> {
        let session = self.require_session(action)?;
        if session.is_admin() {
            Ok(session)
        } else {
            Err(CoreError::PermissionDenied {
                message: format!("only administrators can {action}"),
            })
        }
    }

    /// Drop the local session when the backend says it is no longer valid.
    fn guard<T>(&self, result: Result<T, stationflow_api::Error>) -> Result<T, CoreError> {
        result.map_err(|e| {
            let err = CoreError::from(e);
            if err.is_session_expired() {
                warn!("backend rejected the session token");
                self.sign_out();
            }
            err
        })
    }

    // ── Stations ─────────────────────────────────────────────────────

    /// Fetch the listing without touching the store.
    pub async fn fetch_stations(&self) -> Result<Vec<Station>, CoreError> {
        let records = self.inner.api.list_stations().await?;
        Ok(stations_from_records(records))
    }

    /// Full refresh into the store.
    pub async fn refresh(&self) -> Result<RefreshOutcome, CoreError> {
        let token = self.inner.store.begin_refresh();
        self.refresh_with(token).await
    }

    /// Full refresh against an already-issued token.
    pub async fn refresh_with(&self, token: RefreshToken) -> Result<RefreshOutcome, CoreError> {
        let listing = self.fetch_stations().await?;
        let outcome = self.inner.store.apply_refresh(token, listing);
        debug!(?outcome, "station refresh");
        Ok(outcome)
    }

    pub async fn get_station(&self, id: &StationId) -> Result<Station, CoreError> {
        match self.inner.api.get_station(id.as_str()).await {
            Ok(record) => Station::try_from(record),
            Err(e) if e.is_not_found() => Err(CoreError::StationNotFound { id: id.clone() }),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a custom station owned by the signed-in user. The store is
    /// left alone; the shell merges the result.
    pub async fn create_station(&self, draft: &StationDraft) -> Result<Station, CoreError> {
        let session = self.require_session("add a station")?;
        validation::validate_station_draft(draft)?;

        let mut body = NewStationRecord::from(draft);
        body.owner_id = Some(session.user.id.clone());
        let record = self.guard(self.inner.api.create_station(&body).await)?;
        let station = Station::try_from(record)?;
        info!(id = %station.id, name = %station.name, "station created");
        Ok(station)
    }

    pub async fn delete_station(&self, id: &StationId) -> Result<(), CoreError> {
        self.require_admin("delete stations")?;
        match self.inner.api.delete_station(id.as_str()).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Err(CoreError::StationNotFound { id: id.clone() }),
            Err(e) => return self.guard(Err(e)),
        }
        info!(%id, "station deleted");
        Ok(())
    }

    /// File an occupancy update request. Returns the backend's message.
    pub async fn report(&self, station: &Station, available: i64) -> Result<String, CoreError> {
        self.require_session("report occupancy")?;
        let available = validation::validate_report(station, available)?;
        let resp = self.guard(
            self.inner
                .api
                .request_update(station.id.as_str(), i64::from(available))
                .await,
        )?;
        info!(station = %station.id, available, "update request submitted");
        Ok(resp.message)
    }

    // ── Moderation ───────────────────────────────────────────────────

    pub async fn pending_requests(&self) -> Result<Vec<UpdateRequest>, CoreError> {
        self.require_admin("review update requests")?;
        let records = self.guard(self.inner.api.list_update_requests().await)?;
        Ok(requests_from_records(records))
    }

    pub async fn my_requests(&self) -> Result<Vec<UpdateRequest>, CoreError> {
        self.require_session("list your requests")?;
        let records = self.guard(self.inner.api.list_my_requests().await)?;
        Ok(requests_from_records(records))
    }

    /// Approve a request. The station change itself arrives through the
    /// push channel.
    pub async fn approve_request(&self, id: &str) -> Result<String, CoreError> {
        self.require_admin("approve update requests")?;
        let resp = self.guard(self.inner.api.approve_request(id).await)?;
        Ok(resp.message)
    }

    pub async fn reject_request(&self, id: &str) -> Result<String, CoreError> {
        self.require_admin("reject update requests")?;
        let resp = self.guard(self.inner.api.reject_request(id).await)?;
        Ok(resp.message)
    }

    // ── Feedback ─────────────────────────────────────────────────────

    pub async fn submit_feedback(&self, message: &str, email: Option<&str>) -> Result<String, CoreError> {
        validation::validate_feedback(message, email)?;
        let body = FeedbackSubmission {
            message: message.trim().to_owned(),
            email: email
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_owned),
        };
        let resp = self.guard(self.inner.api.submit_feedback(&body).await)?;
        Ok(resp.message)
    }

    pub async fn list_feedback(&self) -> Result<Vec<Feedback>, CoreError> {
        self.require_admin("read feedback")?;
        let records = self.guard(self.inner.api.list_feedback().await)?;
        Ok(records.into_iter().map(Feedback::from).collect())
    }

    pub async fn delete_feedback(&self, id: &str) -> Result<(), CoreError> {
        self.require_admin("delete feedback")?;
        self.guard(self.inner.api.delete_feedback(id).await)
    }

    // ── Push channel ─────────────────────────────────────────────────

    /// Subscribe to live updates and apply them to the store. Returns the
    /// connection status, or `None` when push is disabled in config.
    pub async fn start_push(&self) -> Result<Option<watch::Receiver<PushStatus>>, CoreError> {
        if !self.inner.config.push.enabled {
            debug!("push channel disabled");
            return Ok(None);
        }
        let mut slot = self.inner.push.lock().await;
        if let Some(handle) = slot.as_ref() {
            return Ok(Some(handle.status()));
        }

        let http = self.inner.config.transport().streaming().build_client()?;
        let handle = PushChannelHandle::connect(
            http,
            self.inner.api.push_url()?,
            self.inner.config.reconnect(),
            self.inner.cancel.child_token(),
        );
        let status = handle.status();
        let task = tokio::spawn(push_task(self.clone(), handle.subscribe(), self.inner.cancel.clone()));
        *slot = Some(handle);
        *self.inner.push_task.lock().await = Some(task);
        info!("push channel started");
        Ok(Some(status))
    }

    pub async fn stop_push(&self) {
        if let Some(handle) = self.inner.push.lock().await.take() {
            handle.shutdown();
        }
        if let Some(task) = self.inner.push_task.lock().await.take() {
            task.abort();
            let _ = task.await;
        }
    }

    /// Stop every background task. The client is unusable afterwards.
    pub async fn shutdown(&self) {
        self.stop_push().await;
        self.inner.cancel.cancel();
    }

    /// Apply one push event to the store.
    pub fn apply_push_event(&self, event: &PushEvent) {
        match event {
            PushEvent::StationUpdate(record) => match Station::try_from(record.clone()) {
                Ok(station) => {
                    let id = station.id.clone();
                    let added = self.inner.store.apply_push(station);
                    debug!(%id, added, "station pushed");
                }
                Err(e) => warn!(error = %e, "dropping pushed station"),
            },
            PushEvent::Heartbeat => self.inner.store.record_heartbeat(),
            PushEvent::Other { event, .. } => debug!(event, "ignoring push event"),
        }
    }
}

async fn push_task(
    client: StationDataClient,
    mut events: broadcast::Receiver<Arc<PushEvent>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            received = events.recv() => match received {
                Ok(event) => client.apply_push_event(&event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "push consumer lagged, resyncing");
                    if let Err(e) = client.refresh().await {
                        warn!(error = %e, "resync after lag failed");
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    debug!("push task exiting");
}
