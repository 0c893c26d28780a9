// ── Application shell ──
//
// The single owner of UI state. Every input is a synchronous method that
// mutates state, re-syncs the map, and returns the async work it needs as
// `ShellEffect`s. Results come back through the matching `*_done`/`*ed`
// methods, so the shell itself never awaits and never races itself.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::CoreError;
use crate::geolocation::{InitialLoadReason, PositionError};
use crate::map::{MapEvent, MapIntent, MapRenderer, MapSurface, ReconcileReport, Scene};
use crate::model::{LatLng, Session, Station, StationDraft, StationId, UserLocation};
use crate::route::{RouteKey, RoutePlan, RouteService, RouteTicket};
use crate::store::{RefreshOutcome, RefreshToken, StationStore};
use crate::stream::{StationFilter, search};
use crate::validation;

use super::state::{Modal, Notice, UiState};

/// Async work requested by the shell.
#[derive(Debug, Clone)]
pub enum ShellEffect {
    LoadStations(RefreshToken),
    FetchRoute(RouteTicket),
    CreateStation(StationDraft),
    DeleteStation(StationId),
    SubmitReport { station: Arc<Station>, available: i64 },
    Moderate { request_id: String, approve: bool },
    CountPendingRequests,
    CountFeedback,
}

pub type Effects = Vec<ShellEffect>;

pub struct AppShell<S, C> {
    state: UiState,
    store: Arc<StationStore>,
    renderer: MapRenderer<S, C>,
    routes: RouteService,
    /// Origin of the last route request, for drift detection.
    route_origin: Option<LatLng>,
}

impl<S: MapSurface, C: Clock> AppShell<S, C> {
    pub fn new(store: Arc<StationStore>, renderer: MapRenderer<S, C>) -> Self {
        Self {
            state: UiState::default(),
            store,
            renderer,
            routes: RouteService::new(),
            route_origin: None,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn store(&self) -> &Arc<StationStore> {
        &self.store
    }

    pub fn renderer(&self) -> &MapRenderer<S, C> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut MapRenderer<S, C> {
        &mut self.renderer
    }

    pub fn routes(&self) -> &RouteService {
        &self.routes
    }

    /// The station list after type filter and search, in store order.
    pub fn filtered(&self) -> Vec<Arc<Station>> {
        let snapshot = self.store.snapshot();
        let by_type = self.state.filter.apply(&snapshot);
        search(&by_type, &self.state.search)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.renderer.next_deadline()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.state.notice.take()
    }

    fn info(&mut self, text: impl Into<String>) {
        self.state.notice = Some(Notice::Info(text.into()));
    }

    fn fail(&mut self, err: &CoreError) {
        warn!(error = %err, "operation failed");
        self.state.notice = Some(Notice::Error(err.to_string()));
        if err.is_session_expired() {
            self.state.session = None;
            self.state.modals.set(Modal::Auth, true);
        }
    }

    /// Push the current state to the map.
    pub fn sync_map(&mut self) -> ReconcileReport {
        let scene = Scene {
            stations: Arc::new(self.filtered()),
            selected: self.state.selected.clone(),
            route_destination: self.state.route_destination.clone(),
            route_active: self.state.route_active,
            picking: self.state.picking,
        };
        self.renderer.sync(scene)
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// First fix or definitive geolocation failure. Only the first call
    /// loads.
    pub fn initial_load(&mut self, reason: &InitialLoadReason) -> Effects {
        if self.state.initial_load_requested {
            return Vec::new();
        }
        self.state.initial_load_requested = true;
        info!(?reason, "loading stations");
        vec![ShellEffect::LoadStations(self.store.begin_refresh())]
    }

    /// Manual reload.
    pub fn reload(&mut self) -> Effects {
        vec![ShellEffect::LoadStations(self.store.begin_refresh())]
    }

    pub fn stations_loaded(&mut self, token: RefreshToken, result: Result<Vec<Station>, CoreError>) {
        match result {
            Ok(listing) => {
                if let RefreshOutcome::Applied { total, kept_newer } = self.store.apply_refresh(token, listing) {
                    debug!(total, kept_newer, "listing applied");
                }
                self.store_changed();
            }
            Err(e) => self.fail(&e),
        }
    }

    /// The store changed underneath us (push, refresh, local mutation).
    /// Re-point pinned snapshots at their current versions and re-render.
    pub fn store_changed(&mut self) {
        if let Some(id) = self.state.selected_id().cloned()
            && let Some(fresh) = self.store.get(&id)
        {
            self.state.selected = Some(fresh);
        }
        if let Some(id) = self.state.destination_id().cloned()
            && let Some(fresh) = self.store.get(&id)
        {
            self.state.route_destination = Some(fresh);
        }
        self.sync_map();
    }

    // ── Filter, search, selection ────────────────────────────────────

    pub fn set_filter(&mut self, filter: StationFilter) {
        if filter == self.state.filter {
            return;
        }
        self.state.filter = filter;
        self.state.selected = None;
        self.sync_map();
    }

    pub fn cycle_filter(&mut self) {
        self.set_filter(self.state.filter.next());
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.state.search = query.into();
        self.sync_map();
    }

    pub fn select(&mut self, id: &StationId) {
        match self.store.get(id) {
            Some(station) => {
                self.state.selected = Some(station);
                self.sync_map();
            }
            None => self.fail(&CoreError::StationNotFound { id: id.clone() }),
        }
    }

    pub fn deselect(&mut self) {
        if self.state.selected.take().is_some() {
            self.sync_map();
        }
    }

    pub fn toggle_sidebar(&mut self) {
        self.state.sidebar_open = !self.state.sidebar_open;
    }

    pub fn open_modal(&mut self, modal: Modal) -> Effects {
        self.state.modals.set(modal, true);
        match modal {
            Modal::AdminDashboard if self.state.is_admin() => vec![ShellEffect::CountPendingRequests],
            Modal::FeedbackDashboard if self.state.is_admin() => vec![ShellEffect::CountFeedback],
            _ => Vec::new(),
        }
    }

    pub fn close_modal(&mut self, modal: Modal) {
        self.state.modals.set(modal, false);
        match modal {
            Modal::ReportStatus => self.state.report_target = None,
            Modal::AddStation => self.state.picked_location = None,
            _ => {}
        }
    }

    // ── Map input ────────────────────────────────────────────────────

    pub fn map_event(&mut self, event: MapEvent) -> Effects {
        match self.renderer.handle_event(event) {
            Some(intent) => self.apply_intent(intent),
            None => Vec::new(),
        }
    }

    /// Fire expired timers.
    pub fn tick(&mut self) -> Effects {
        match self.renderer.poll() {
            Some(intent) => self.apply_intent(intent),
            None => Vec::new(),
        }
    }

    pub fn apply_intent(&mut self, intent: MapIntent) -> Effects {
        debug!(?intent, "map intent");
        match intent {
            MapIntent::Select(id) => {
                self.select(&id);
                Vec::new()
            }
            MapIntent::Deselect => {
                self.deselect();
                Vec::new()
            }
            MapIntent::LocationPicked(at) => {
                self.location_picked(at);
                Vec::new()
            }
            MapIntent::CreateRoute(id) => self.create_route(&id),
            MapIntent::RemoveRoute => {
                self.remove_route();
                Vec::new()
            }
            MapIntent::Report(id) => {
                self.open_report(&id);
                Vec::new()
            }
        }
    }

    // ── User location ────────────────────────────────────────────────

    pub fn location_updated(&mut self, at: UserLocation) -> Effects {
        self.state.user_location = Some(at);
        self.renderer.set_user_location(&at);

        let drifted = self
            .route_origin
            .is_some_and(|origin| origin.distance_m(at.position) > self.renderer.config().route_refresh_threshold_m);
        if !self.state.route_active || !drifted {
            return Vec::new();
        }
        let Some(key) = self.routes.active_key().cloned() else {
            return Vec::new();
        };
        debug!(destination = %key.destination, "origin moved, re-planning route");
        self.route_origin = Some(at.position);
        vec![ShellEffect::FetchRoute(self.routes.begin(key, at.position))]
    }

    pub fn location_failed(&mut self, err: &PositionError) {
        warn!(error = %err, "continuing without user location");
    }

    // ── Route ────────────────────────────────────────────────────────

    pub fn create_route(&mut self, id: &StationId) -> Effects {
        let Some(origin) = self.state.user_location.map(|l| l.position) else {
            self.fail(&CoreError::validation("your location is needed to plan a route"));
            return Vec::new();
        };
        let Some(destination) = self.store.get(id) else {
            self.fail(&CoreError::StationNotFound { id: id.clone() });
            return Vec::new();
        };

        let key = RouteKey {
            origin,
            destination: destination.id.clone(),
            destination_point: destination.location,
        };
        self.renderer.clear_route();
        self.state.route_active = true;
        self.state.route_destination = Some(destination);
        self.route_origin = Some(origin);
        let ticket = self.routes.begin(key, origin);
        self.sync_map();
        vec![ShellEffect::FetchRoute(ticket)]
    }

    pub fn remove_route(&mut self) {
        self.routes.invalidate();
        self.route_origin = None;
        self.state.route_active = false;
        self.state.route_destination = None;
        self.renderer.clear_route();
        self.sync_map();
    }

    /// Route to the selection, or remove the route if it already leads
    /// there.
    pub fn toggle_route(&mut self) -> Effects {
        let Some(id) = self.state.selected_id().cloned() else {
            return Vec::new();
        };
        if self.state.routes_to(&id) {
            self.remove_route();
            Vec::new()
        } else {
            self.create_route(&id)
        }
    }

    /// A planner result. Stale generations are dropped.
    pub fn route_resolved(&mut self, plan: Option<RoutePlan>) {
        let Some(plan) = plan else {
            return;
        };
        if !self.routes.is_current(plan.generation) {
            debug!(generation = plan.generation, "discarding stale route");
            return;
        }
        self.renderer.show_route(&plan);
    }

    // ── Add station ──────────────────────────────────────────────────

    pub fn start_picking(&mut self) {
        if self.state.session.is_none() {
            self.fail(&CoreError::NotSignedIn {
                action: "add a station".into(),
            });
            self.state.modals.set(Modal::Auth, true);
            return;
        }
        self.state.picking = true;
        self.state.picked_location = None;
        self.sync_map();
    }

    pub fn cancel_picking(&mut self) {
        self.state.picking = false;
        self.sync_map();
    }

    fn location_picked(&mut self, at: LatLng) {
        self.state.picking = false;
        self.state.picked_location = Some(at);
        self.state.modals.set(Modal::AddStation, true);
        self.sync_map();
    }

    pub fn submit_station(&mut self, mut draft: StationDraft) -> Effects {
        let Some(session) = self.state.session.clone() else {
            self.fail(&CoreError::NotSignedIn {
                action: "add a station".into(),
            });
            return Vec::new();
        };
        if let Err(e) = validation::validate_station_draft(&draft) {
            self.fail(&e);
            return Vec::new();
        }
        draft.owner_id = Some(session.user.id.clone());
        vec![ShellEffect::CreateStation(draft)]
    }

    /// Append and select the new station.
    pub fn station_created(&mut self, result: Result<Station, CoreError>) {
        match result {
            Ok(station) => {
                let id = station.id.clone();
                self.info(format!("Added {}", station.name));
                self.store.insert_local(station);
                self.state.modals.set(Modal::AddStation, false);
                self.state.picked_location = None;
                self.state.selected = self.store.get(&id);
                self.sync_map();
            }
            Err(e) => self.fail(&e),
        }
    }

    // ── Delete ───────────────────────────────────────────────────────

    pub fn request_delete(&mut self, id: &StationId) -> Effects {
        if !self.state.is_admin() {
            self.fail(&CoreError::PermissionDenied {
                message: "only administrators can delete stations".into(),
            });
            return Vec::new();
        }
        vec![ShellEffect::DeleteStation(id.clone())]
    }

    /// Drop the station and any selection or route pointing at it.
    pub fn station_deleted(&mut self, id: &StationId, result: Result<(), CoreError>) {
        if let Err(e) = result {
            self.fail(&e);
            return;
        }
        self.store.remove_local(id);
        if self.state.selected_id() == Some(id) {
            self.state.selected = None;
        }
        if self.state.destination_id() == Some(id) {
            self.routes.invalidate();
            self.route_origin = None;
            self.state.route_active = false;
            self.state.route_destination = None;
            self.renderer.clear_route();
        }
        if self.state.report_target.as_ref() == Some(id) {
            self.close_modal(Modal::ReportStatus);
        }
        self.info(format!("Deleted station {id}"));
        self.sync_map();
    }

    // ── Report ───────────────────────────────────────────────────────

    pub fn open_report(&mut self, id: &StationId) {
        if self.state.session.is_none() {
            self.fail(&CoreError::NotSignedIn {
                action: "report occupancy".into(),
            });
            self.state.modals.set(Modal::Auth, true);
            return;
        }
        self.state.report_target = Some(id.clone());
        self.state.modals.set(Modal::ReportStatus, true);
    }

    pub fn submit_report(&mut self, available: i64) -> Effects {
        let Some(station) = self.state.report_target.as_ref().and_then(|id| self.store.get(id)) else {
            return Vec::new();
        };
        if let Err(e) = validation::validate_report(&station, available) {
            self.fail(&e);
            return Vec::new();
        }
        vec![ShellEffect::SubmitReport { station, available }]
    }

    pub fn report_submitted(&mut self, result: Result<String, CoreError>) {
        match result {
            Ok(message) => {
                self.info(message);
                self.close_modal(Modal::ReportStatus);
            }
            Err(e) => self.fail(&e),
        }
    }

    // ── Session ──────────────────────────────────────────────────────

    pub fn signed_in(&mut self, session: Arc<Session>) -> Effects {
        let admin = session.is_admin();
        self.info(format!("Signed in as {}", session.user.username));
        self.state.session = Some(session);
        self.state.modals.set(Modal::Auth, false);
        if admin {
            vec![ShellEffect::CountPendingRequests]
        } else {
            Vec::new()
        }
    }

    /// Clear user-scoped UI state. Station data stays.
    pub fn signed_out(&mut self) {
        self.state.session = None;
        self.state.modals.clear();
        self.state.pending_requests = None;
        self.state.feedback_count = None;
        self.state.report_target = None;
        self.state.picked_location = None;
        if self.state.picking {
            self.state.picking = false;
            self.sync_map();
        }
    }

    // ── Admin ────────────────────────────────────────────────────────

    pub fn moderate(&mut self, request_id: impl Into<String>, approve: bool) -> Effects {
        if !self.state.is_admin() {
            self.fail(&CoreError::PermissionDenied {
                message: "only administrators can review update requests".into(),
            });
            return Vec::new();
        }
        vec![ShellEffect::Moderate {
            request_id: request_id.into(),
            approve,
        }]
    }

    pub fn moderated(&mut self, result: Result<String, CoreError>) -> Effects {
        match result {
            Ok(message) => {
                self.info(message);
                vec![ShellEffect::CountPendingRequests]
            }
            Err(e) => {
                self.fail(&e);
                Vec::new()
            }
        }
    }

    pub fn pending_counted(&mut self, result: Result<usize, CoreError>) {
        match result {
            Ok(count) => self.state.pending_requests = Some(count),
            Err(e) => self.fail(&e),
        }
    }

    pub fn feedback_counted(&mut self, result: Result<usize, CoreError>) {
        match result {
            Ok(count) => self.state.feedback_count = Some(count),
            Err(e) => self.fail(&e),
        }
    }
}
