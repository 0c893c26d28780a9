#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;

use stationflow_core::geolocation::InitialLoadReason;
use stationflow_core::map::{MapEvent, MapRenderer, RecordingSurface, SurfaceOp};
use stationflow_core::route::{ProviderRoute, RoutePlanner, RouteProvider, RouteStyle};
use stationflow_core::shell::Modal;
use stationflow_core::store::RefreshToken;
use stationflow_core::{
    AppShell, CoreError, LatLng, ManualClock, MapConfig, OccupancyPolicy, Role, Session, ShellEffect,
    Station, StationDraft, StationFilter, StationId, StationStatus, StationStore, TransportType, User,
    UserLocation,
};

type Shell = AppShell<RecordingSurface, ManualClock>;

// ── Helpers ─────────────────────────────────────────────────────────

fn shell() -> (Shell, ManualClock) {
    let clock = ManualClock::new();
    let config = MapConfig {
        clustering: false,
        ..MapConfig::default()
    };
    let renderer = MapRenderer::new(
        RecordingSurface::new(),
        clock.clone(),
        config,
        OccupancyPolicy::default(),
    );
    (AppShell::new(Arc::new(StationStore::new()), renderer), clock)
}

fn station(id: &str, transport: TransportType, lat: f64, lng: f64) -> Station {
    Station {
        id: StationId::from(id),
        name: format!("Station {id}"),
        transport,
        location: LatLng::new(lat, lng),
        capacity: 20,
        available: 5,
        status: StationStatus::Active,
        last_update: None,
        is_custom: false,
        owner_id: None,
    }
}

/// Two stations near the default center, one in Ankara.
fn fixture() -> Vec<Station> {
    vec![
        station("a", TransportType::Bus, 41.0100, 28.9800),
        station("b", TransportType::Bike, 41.0050, 28.9700),
        station("c", TransportType::Metro, 39.9200, 32.8500),
        station("d", TransportType::Bike, 41.0090, 28.9790),
    ]
}

fn session(role: Role) -> Arc<Session> {
    Arc::new(Session {
        user: User {
            id: "u1".into(),
            username: "ayse".into(),
            email: "ayse@example.com".into(),
            role,
        },
        token: SecretString::from("jwt".to_owned()),
    })
}

fn load_token(effects: &[ShellEffect]) -> RefreshToken {
    match effects {
        [ShellEffect::LoadStations(token)] => *token,
        other => panic!("expected a single load, got {other:?}"),
    }
}

fn loaded(stations: Vec<Station>) -> (Shell, ManualClock) {
    let (mut shell, clock) = shell();
    let token = load_token(&shell.initial_load(&InitialLoadReason::FirstFix));
    shell.stations_loaded(token, Ok(stations));
    (shell, clock)
}

fn id(raw: &str) -> StationId {
    StationId::from(raw)
}

fn rendered(shell: &Shell) -> HashSet<StationId> {
    shell.renderer().rendered_ids()
}

fn selected(shell: &Shell) -> Option<StationId> {
    shell.state().selected_id().cloned()
}

struct FixedProvider(Option<Vec<LatLng>>);

impl RouteProvider for FixedProvider {
    async fn route(&self, _from: LatLng, _to: LatLng) -> Result<ProviderRoute, CoreError> {
        match &self.0 {
            Some(points) => Ok(ProviderRoute {
                points: points.clone(),
                distance_m: Some(7_000.0),
                duration_s: Some(600.0),
            }),
            None => Err(CoreError::RoutingFailed {
                message: "no route".into(),
            }),
        }
    }
}

fn fetch_ticket(effects: Vec<ShellEffect>) -> stationflow_core::route::RouteTicket {
    match effects.into_iter().next() {
        Some(ShellEffect::FetchRoute(ticket)) => ticket,
        other => panic!("expected a route fetch, got {other:?}"),
    }
}

// ── Loading ─────────────────────────────────────────────────────────

#[test]
fn initial_load_fires_once() {
    let (mut shell, _) = shell();
    assert_eq!(shell.initial_load(&InitialLoadReason::FirstFix).len(), 1);
    assert!(shell.initial_load(&InitialLoadReason::SourceEnded).is_empty());
}

#[test]
fn failed_load_leaves_previous_list() {
    let (mut shell, _) = loaded(fixture());
    let token = load_token(&shell.reload());
    shell.stations_loaded(
        token,
        Err(CoreError::ConnectionFailed {
            url: "http://localhost".into(),
            reason: "refused".into(),
        }),
    );
    assert_eq!(shell.store().len(), 4);
    assert!(shell.state().notice.as_ref().unwrap().is_error());
}

#[test]
fn stale_listing_does_not_overwrite_push() {
    let (mut shell, _) = shell();
    let token = load_token(&shell.initial_load(&InitialLoadReason::FirstFix));

    let mut pushed = station("a", TransportType::Bus, 41.0100, 28.9800);
    pushed.available = 9;
    shell.store().apply_push(pushed);

    shell.stations_loaded(token, Ok(fixture()));
    assert_eq!(shell.store().get(&id("a")).unwrap().available, 9);
    assert_eq!(shell.store().len(), 4);
}

// ── Rendering ───────────────────────────────────────────────────────

#[test]
fn rendered_set_is_visible_plus_pinned() {
    let (mut shell, _) = loaded(fixture());
    shell.location_updated(UserLocation::new(41.0082, 28.9784));
    shell.select(&id("b"));
    let _ = shell.create_route(&id("c"));

    let bounds = shell.renderer().view().bounds();
    let mut expected: HashSet<StationId> = shell
        .filtered()
        .iter()
        .filter(|s| bounds.contains(s.location))
        .map(|s| s.id.clone())
        .collect();
    expected.insert(id("b"));
    expected.insert(id("c"));

    assert!(!bounds.contains(LatLng::new(39.92, 32.85)));
    assert_eq!(rendered(&shell), expected);
}

#[test]
fn reconciliation_is_idempotent() {
    let (mut shell, _) = loaded(fixture());
    shell.select(&id("a"));
    shell.sync_map();
    let report = shell.sync_map();
    assert_eq!((report.created, report.removed, report.popup_updates), (0, 0, 0));
    assert!(report.is_noop());
}

#[test]
fn push_for_selected_station_refreshes_popup() {
    let (mut shell, _) = loaded(fixture());
    shell.select(&id("a"));

    let mut pushed = station("a", TransportType::Bus, 41.0100, 28.9800);
    pushed.available = 17;
    shell.store().apply_push(pushed);
    shell.store_changed();

    assert_eq!(shell.state().selected.as_ref().unwrap().available, 17);
    let popup = &shell.renderer().surface().popups[&id("a")];
    assert_eq!(popup.available, 17);
}

// ── Occupancy bounds ────────────────────────────────────────────────

#[test]
fn out_of_range_report_is_rejected_before_sending() {
    let (mut shell, _) = loaded(fixture());
    shell.signed_in(session(Role::User));
    shell.open_report(&id("a"));
    assert!(shell.state().modals.is_open(Modal::ReportStatus));

    assert!(shell.submit_report(21).is_empty());
    assert!(shell.submit_report(-1).is_empty());
    assert!(shell.state().notice.as_ref().unwrap().is_error());

    let effects = shell.submit_report(20);
    assert!(matches!(
        effects.as_slice(),
        [ShellEffect::SubmitReport { available: 20, .. }]
    ));
}

// ── Popup debounce ──────────────────────────────────────────────────

#[test]
fn switching_popups_never_deselects() {
    let (mut shell, clock) = loaded(fixture());
    shell.map_event(MapEvent::MarkerClicked(id("a")));
    assert_eq!(selected(&shell), Some(id("a")));

    // Surface closes A on its own before reporting the click on B.
    shell.map_event(MapEvent::PopupClosed(id("a")));
    shell.map_event(MapEvent::MarkerClicked(id("d")));
    shell.map_event(MapEvent::PopupOpened(id("d")));
    clock.advance(Duration::from_millis(500));
    shell.tick();
    assert_eq!(selected(&shell), Some(id("d")));

    // Late close of the previous popup after the switch.
    shell.map_event(MapEvent::MarkerClicked(id("a")));
    shell.map_event(MapEvent::PopupClosed(id("d")));
    clock.advance(Duration::from_millis(500));
    shell.tick();
    assert_eq!(selected(&shell), Some(id("a")));
}

#[test]
fn dismissing_the_only_popup_deselects_after_window() {
    let (mut shell, clock) = loaded(fixture());
    shell.map_event(MapEvent::MarkerClicked(id("a")));
    shell.map_event(MapEvent::PopupClosed(id("a")));

    clock.advance(Duration::from_millis(100));
    shell.tick();
    assert_eq!(selected(&shell), Some(id("a")));

    clock.advance(Duration::from_millis(150));
    shell.tick();
    assert_eq!(selected(&shell), None);
    assert!(shell.renderer().open_popup().is_none());
}

#[test]
fn reclicking_the_closing_station_keeps_it_selected() {
    let (mut shell, clock) = loaded(fixture());
    shell.map_event(MapEvent::MarkerClicked(id("a")));
    shell.map_event(MapEvent::PopupClosed(id("a")));

    clock.advance(Duration::from_millis(50));
    shell.map_event(MapEvent::MarkerClicked(id("a")));
    clock.advance(Duration::from_millis(300));
    shell.tick();

    assert_eq!(selected(&shell), Some(id("a")));
    assert_eq!(shell.renderer().open_popup(), Some(&id("a")));
}

// ── Route ───────────────────────────────────────────────────────────

fn route_fixture() -> Vec<Station> {
    vec![station("dest", TransportType::Bus, 41.05, 29.05)]
}

#[tokio::test]
async fn route_success_draws_polyline_and_fits_once() {
    let (mut shell, _) = loaded(route_fixture());
    shell.location_updated(UserLocation::new(41.00, 29.00));
    let planner = RoutePlanner::new(FixedProvider(Some(vec![
        LatLng::new(41.00, 29.00),
        LatLng::new(41.02, 29.03),
        LatLng::new(41.05, 29.05),
    ])));

    let ticket = fetch_ticket(shell.create_route(&id("dest")));
    shell.route_resolved(planner.plan(&ticket).await);

    let surface = shell.renderer().surface();
    let (points, style) = surface.route.clone().unwrap();
    assert_eq!(points.len(), 3);
    assert_eq!(style, RouteStyle::Normal.polyline());
    assert_eq!(surface.fit_count(), 1);

    // Small drift and unrelated changes keep the fit.
    assert!(shell.location_updated(UserLocation::new(41.0001, 29.0001)).is_empty());
    shell.set_search("dest");
    shell.sync_map();
    assert_eq!(shell.renderer().surface().fit_count(), 1);
}

#[tokio::test]
async fn route_failure_draws_dashed_line_and_fits_once() {
    let (mut shell, _) = loaded(route_fixture());
    shell.location_updated(UserLocation::new(41.00, 29.00));
    let planner = RoutePlanner::new(FixedProvider(None));

    let ticket = fetch_ticket(shell.create_route(&id("dest")));
    shell.route_resolved(planner.plan(&ticket).await);

    let surface = shell.renderer().surface();
    let (points, style) = surface.route.clone().unwrap();
    assert_eq!(points, vec![LatLng::new(41.00, 29.00), LatLng::new(41.05, 29.05)]);
    assert_eq!(style.dash, Some("10, 10"));
    assert_eq!(surface.fit_count(), 1);
}

#[tokio::test]
async fn origin_drift_replans_without_refitting() {
    let (mut shell, _) = loaded(route_fixture());
    shell.location_updated(UserLocation::new(41.00, 29.00));
    let planner = RoutePlanner::new(FixedProvider(None));

    let first = fetch_ticket(shell.create_route(&id("dest")));
    shell.route_resolved(planner.plan(&first).await);

    let second = fetch_ticket(shell.location_updated(UserLocation::new(41.01, 29.00)));
    assert!(first.is_cancelled());
    shell.route_resolved(planner.plan(&second).await);

    let surface = shell.renderer().surface();
    assert_eq!(surface.route.as_ref().unwrap().0[0], LatLng::new(41.01, 29.00));
    assert_eq!(surface.fit_count(), 1);
}

#[tokio::test]
async fn removed_route_discards_late_result() {
    let (mut shell, _) = loaded(route_fixture());
    shell.location_updated(UserLocation::new(41.00, 29.00));
    let planner = RoutePlanner::new(FixedProvider(None));

    let ticket = fetch_ticket(shell.create_route(&id("dest")));
    shell.remove_route();
    shell.route_resolved(planner.plan(&ticket).await);

    let surface = shell.renderer().surface();
    assert!(surface.route.is_none());
    assert_eq!(surface.count(|op| matches!(op, SurfaceOp::DrawRoute { .. })), 0);
    assert!(!shell.state().route_active);
}

#[test]
fn route_needs_a_user_location() {
    let (mut shell, _) = loaded(route_fixture());
    assert!(shell.create_route(&id("dest")).is_empty());
    assert!(!shell.state().route_active);
}

// ── Filter ──────────────────────────────────────────────────────────

#[test]
fn bike_filter_keeps_bike_subset_in_order() {
    let (mut shell, _) = loaded(fixture());
    shell.set_filter(StationFilter::ByType(TransportType::Bike));
    let ids: Vec<_> = shell.filtered().iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids, vec![id("b"), id("d")]);
}

#[test]
fn filter_change_clears_selection() {
    let (mut shell, _) = loaded(fixture());
    shell.select(&id("a"));
    shell.set_filter(StationFilter::ByType(TransportType::Metro));
    assert_eq!(selected(&shell), None);
}

// ── Mutations ───────────────────────────────────────────────────────

#[test]
fn deleting_selected_destination_clears_both() {
    let (mut shell, _) = loaded(fixture());
    shell.signed_in(session(Role::Admin));
    shell.location_updated(UserLocation::new(41.0082, 28.9784));
    shell.select(&id("a"));
    let _ = shell.create_route(&id("a"));

    let effects = shell.request_delete(&id("a"));
    assert!(matches!(effects.as_slice(), [ShellEffect::DeleteStation(_)]));
    shell.station_deleted(&id("a"), Ok(()));

    let state = shell.state();
    assert!(state.selected.is_none());
    assert!(state.route_destination.is_none());
    assert!(!state.route_active);
    assert!(shell.routes().active_key().is_none());
    assert!(!rendered(&shell).contains(&id("a")));
    assert!(!shell.store().contains(&id("a")));
}

#[test]
fn failed_delete_changes_nothing() {
    let (mut shell, _) = loaded(fixture());
    shell.signed_in(session(Role::Admin));
    shell.select(&id("a"));
    shell.station_deleted(
        &id("a"),
        Err(CoreError::PermissionDenied {
            message: "nope".into(),
        }),
    );
    assert_eq!(selected(&shell), Some(id("a")));
    assert!(shell.store().contains(&id("a")));
}

#[test]
fn delete_requires_admin() {
    let (mut shell, _) = loaded(fixture());
    shell.signed_in(session(Role::User));
    assert!(shell.request_delete(&id("a")).is_empty());
}

#[test]
fn picked_station_is_appended_and_selected() {
    let (mut shell, _) = loaded(fixture());
    shell.signed_in(session(Role::User));
    shell.start_picking();
    let at = LatLng::new(41.0070, 28.9760);
    shell.map_event(MapEvent::MapClicked(at));
    assert_eq!(shell.state().picked_location, Some(at));
    assert!(shell.state().modals.is_open(Modal::AddStation));

    let draft = StationDraft {
        name: "Karakoy".into(),
        transport: TransportType::Scooter,
        location: at,
        capacity: 12,
        available: None,
        owner_id: None,
    };
    let effects = shell.submit_station(draft);
    let Some(ShellEffect::CreateStation(draft)) = effects.into_iter().next() else {
        panic!("expected a create");
    };
    assert_eq!(draft.owner_id.as_deref(), Some("u1"));

    let mut created = station("new", TransportType::Scooter, at.lat, at.lng);
    created.available = draft.effective_available();
    created.is_custom = true;
    shell.station_created(Ok(created));

    assert_eq!(selected(&shell), Some(id("new")));
    assert_eq!(shell.store().snapshot().last().unwrap().id, id("new"));
    assert!(!shell.state().modals.is_open(Modal::AddStation));
    assert!(rendered(&shell).contains(&id("new")));
}

#[test]
fn create_and_delete_results_merge_into_the_store_once() {
    let (mut shell, _) = loaded(fixture());
    shell.signed_in(session(Role::Admin));

    let before = shell.store().version();
    let mut created = station("new", TransportType::Bus, 41.01, 28.98);
    created.is_custom = true;
    shell.station_created(Ok(created));
    assert_eq!(shell.store().version(), before + 1);
    assert_eq!(shell.store().len(), 5);

    shell.station_deleted(&id("new"), Ok(()));
    assert_eq!(shell.store().version(), before + 2);
    assert_eq!(shell.store().len(), 4);
}

#[test]
fn picking_requires_session() {
    let (mut shell, _) = loaded(fixture());
    shell.start_picking();
    assert!(!shell.state().picking);
    assert!(shell.state().modals.is_open(Modal::Auth));
}

// ── Session ─────────────────────────────────────────────────────────

#[test]
fn admin_sign_in_counts_pending_requests() {
    let (mut shell, _) = loaded(fixture());
    let effects = shell.signed_in(session(Role::Admin));
    assert!(matches!(effects.as_slice(), [ShellEffect::CountPendingRequests]));
    shell.pending_counted(Ok(3));
    assert_eq!(shell.state().pending_requests, Some(3));
}

#[test]
fn logout_clears_ui_state_but_keeps_stations() {
    let (mut shell, _) = loaded(fixture());
    shell.signed_in(session(Role::Admin));
    shell.pending_counted(Ok(2));
    let _ = shell.open_modal(Modal::AdminDashboard);
    shell.open_report(&id("a"));

    shell.signed_out();

    let state = shell.state();
    assert!(state.session.is_none());
    assert!(!state.modals.any());
    assert_eq!(state.pending_requests, None);
    assert!(state.report_target.is_none());
    assert_eq!(shell.store().len(), 4);
}
