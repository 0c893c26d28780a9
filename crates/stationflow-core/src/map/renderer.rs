// ── Map renderer ──
//
// Owns the surface and everything drawn on it. The shell hands over a
// `Scene` whenever stations, selection or the route change; the renderer
// reconciles markers, keeps the single popup consistent with the
// selection, and translates raw surface events into `MapIntent`s for the
// shell. It never mutates shell state itself.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::debug;

use super::cluster::{self, ClusterLayout};
use super::marker::{MarkerMode, MarkerVisual, PopupAction, PopupContent, RouteAction};
use super::popup::{Dismissed, PopupState, PopupTracker};
use super::reconcile::{DesiredMarker, MarkerRegistry, ReconcileReport};
use super::surface::{MapSurface, MarkerSpec};
use super::viewport::MapView;
use crate::clock::Clock;
use crate::config::MapConfig;
use crate::model::{LatLng, Station, StationId, UserLocation};
use crate::occupancy::OccupancyPolicy;
use crate::route::{RouteKey, RoutePlan};
use crate::spatial::{self, MAX_ZOOM};

/// Shell state the map depends on.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// The filtered station list, in display order.
    pub stations: Arc<Vec<Arc<Station>>>,
    /// Pinned regardless of filter or viewport.
    pub selected: Option<Arc<Station>>,
    /// Pinned regardless of filter or viewport.
    pub route_destination: Option<Arc<Station>>,
    pub route_active: bool,
    pub picking: bool,
}

impl Scene {
    fn selected_id(&self) -> Option<&StationId> {
        self.selected.as_ref().map(|s| &s.id)
    }

    fn destination_id(&self) -> Option<&StationId> {
        self.route_destination.as_ref().map(|s| &s.id)
    }

    fn is_pinned(&self, id: &StationId) -> bool {
        self.selected_id() == Some(id) || self.destination_id() == Some(id)
    }
}

/// Raw input from a surface.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    MarkerClicked(StationId),
    /// A click on the map background.
    MapClicked(LatLng),
    PopupOpened(StationId),
    PopupClosed(StationId),
    /// A button inside a popup, reported through the container's single
    /// delegated handler.
    PopupAction {
        station: StationId,
        action: PopupAction,
    },
    /// Pan or zoom finished.
    ViewChanged {
        center: LatLng,
        zoom: u8,
    },
    /// Index into the most recent cluster list.
    ClusterClicked(usize),
    Resized {
        width_px: u32,
        height_px: u32,
    },
}

/// What the shell should do in response to map input.
#[derive(Debug, Clone, PartialEq)]
pub enum MapIntent {
    Select(StationId),
    Deselect,
    LocationPicked(LatLng),
    CreateRoute(StationId),
    RemoveRoute,
    Report(StationId),
}

pub struct MapRenderer<S, C> {
    surface: S,
    clock: C,
    config: MapConfig,
    policy: OccupancyPolicy,
    view: MapView,
    registry: MarkerRegistry,
    popup: PopupTracker,
    clusters: ClusterLayout,
    scene: Scene,
    /// Selection whose popup/centering has been applied.
    focused: Option<StationId>,
    has_user_marker: bool,
    route: Option<RoutePlan>,
    fitted: Option<RouteKey>,
}

impl<S: MapSurface, C: Clock> MapRenderer<S, C> {
    pub fn new(mut surface: S, clock: C, config: MapConfig, policy: OccupancyPolicy) -> Self {
        let view = MapView::new(
            config.default_center,
            config.default_zoom,
            config.viewport_width_px,
            config.viewport_height_px,
        );
        surface.set_view(&view);
        Self {
            surface,
            clock,
            popup: PopupTracker::new(config.popup_close_debounce),
            config,
            policy,
            view,
            registry: MarkerRegistry::new(),
            clusters: ClusterLayout::default(),
            scene: Scene::default(),
            focused: None,
            has_user_marker: false,
            route: None,
            fitted: None,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn view(&self) -> &MapView {
        &self.view
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn registry(&self) -> &MarkerRegistry {
        &self.registry
    }

    pub fn rendered_ids(&self) -> HashSet<StationId> {
        self.registry.ids()
    }

    pub fn clusters(&self) -> &ClusterLayout {
        &self.clusters
    }

    pub fn popup_state(&self) -> &PopupState {
        self.popup.state()
    }

    pub fn open_popup(&self) -> Option<&StationId> {
        self.popup.open_id()
    }

    pub fn route(&self) -> Option<&RoutePlan> {
        self.route.as_ref()
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    // ── Scene sync ───────────────────────────────────────────────────

    /// Bring the surface in line with `scene`.
    pub fn sync(&mut self, scene: Scene) -> ReconcileReport {
        self.scene = scene;
        let selection_changed = self.scene.selected_id() != self.focused.as_ref();

        if selection_changed {
            self.close_foreign_popup();
        }
        let mut report = self.reconcile_markers();
        if selection_changed {
            let moved = self.focus_selection();
            if moved {
                let again = self.reconcile_markers();
                report.created += again.created;
                report.removed += again.removed;
                report.icon_updates += again.icon_updates;
                report.popup_updates += again.popup_updates;
                report.rebound += again.rebound;
            }
        }
        report
    }

    fn desired_markers(&self) -> Vec<DesiredMarker> {
        let bounds = self.view.bounds();
        let clustering = cluster::clustering_active(
            self.config.clustering,
            self.view.zoom,
            self.config.disable_clustering_at_zoom,
        );
        let loose_mode = if clustering {
            MarkerMode::Clustered
        } else {
            MarkerMode::Dot
        };

        let mut desired: Vec<DesiredMarker> = self
            .scene
            .stations
            .iter()
            .filter(|s| !self.scene.is_pinned(&s.id) && bounds.contains(s.location))
            .map(|s| self.marker_for(s, loose_mode))
            .collect();

        let mut pinned: Vec<&Arc<Station>> = Vec::with_capacity(2);
        pinned.extend(self.scene.selected.iter());
        if let Some(dest) = &self.scene.route_destination
            && self.scene.selected_id() != Some(&dest.id)
        {
            pinned.push(dest);
        }
        desired.extend(pinned.into_iter().map(|s| self.marker_for(s, MarkerMode::Detailed)));
        desired
    }

    fn marker_for(&self, station: &Station, mode: MarkerMode) -> DesiredMarker {
        let route_to_here =
            self.scene.route_active && self.scene.destination_id() == Some(&station.id);
        DesiredMarker {
            id: station.id.clone(),
            spec: MarkerSpec {
                position: station.location,
                mode,
                visual: MarkerVisual::for_station(station, mode),
            },
            popup: PopupContent::build(station, route_to_here, &self.policy),
        }
    }

    fn reconcile_markers(&mut self) -> ReconcileReport {
        let desired = self.desired_markers();
        let open = self.popup.open_id().cloned();
        let report = self
            .registry
            .reconcile(&desired, &mut self.surface, open.as_ref());

        let clustered: Vec<(StationId, LatLng)> = desired
            .iter()
            .filter(|d| d.spec.mode == MarkerMode::Clustered)
            .map(|d| (d.id.clone(), d.spec.position))
            .collect();
        let layout = if clustered.is_empty() {
            ClusterLayout::default()
        } else {
            cluster::layout(&clustered, self.view.zoom, self.config.cluster_radius_px)
        };
        if layout != self.clusters {
            self.surface.set_clusters(&layout.clusters);
            self.clusters = layout;
        }

        if !report.is_noop() {
            debug!(?report, "markers reconciled");
        }
        report
    }

    /// Close an open popup that does not belong to the new selection.
    fn close_foreign_popup(&mut self) {
        let target = self.scene.selected_id().cloned();
        if let Some(open) = self.popup.open_id().cloned()
            && Some(&open) != target.as_ref()
        {
            self.surface.close_popup(&open);
            self.popup.reset();
        }
    }

    /// Open the popup for the new selection and center on it. Returns
    /// `true` if the view moved.
    fn focus_selection(&mut self) -> bool {
        self.focused = self.scene.selected_id().cloned();
        let Some(station) = self.scene.selected.clone() else {
            return false;
        };

        if self.popup.open_id() != Some(&station.id) {
            self.surface.open_popup(&station.id);
            self.popup.on_open(&station.id);
        }

        if self.scene.route_active || self.scene.picking {
            return false;
        }
        let offset = self.view.center.distance_m(station.location);
        if offset <= self.config.recenter_threshold_m {
            return false;
        }
        self.view = MapView::new(
            station.location,
            self.config.select_zoom,
            self.view.width_px,
            self.view.height_px,
        );
        self.surface.set_view(&self.view);
        true
    }

    // ── Events ───────────────────────────────────────────────────────

    pub fn handle_event(&mut self, event: MapEvent) -> Option<MapIntent> {
        match event {
            MapEvent::MarkerClicked(id) => {
                if self.scene.picking {
                    return None;
                }
                // Re-clicking the focused station inside the close window
                // never changes the selection, so sync will not reopen it.
                if self.focused.as_ref() == Some(&id) && self.popup.open_id() != Some(&id) {
                    self.surface.open_popup(&id);
                    self.popup.on_open(&id);
                }
                Some(MapIntent::Select(id))
            }
            MapEvent::MapClicked(at) => self.scene.picking.then_some(MapIntent::LocationPicked(at)),
            MapEvent::PopupOpened(id) => {
                self.popup.on_open(&id);
                None
            }
            MapEvent::PopupClosed(id) => {
                let now = self.clock.now();
                self.popup.on_close(&id, now);
                None
            }
            MapEvent::PopupAction { station, action } => self.resolve_popup_action(&station, action),
            MapEvent::ViewChanged { center, zoom } => {
                self.view = MapView::new(center, zoom, self.view.width_px, self.view.height_px);
                self.reconcile_markers();
                None
            }
            MapEvent::ClusterClicked(index) => {
                self.expand_cluster(index);
                None
            }
            MapEvent::Resized {
                width_px,
                height_px,
            } => {
                self.view = MapView::new(self.view.center, self.view.zoom, width_px, height_px);
                self.surface.set_view(&self.view);
                self.reconcile_markers();
                None
            }
        }
    }

    fn resolve_popup_action(&self, station: &StationId, action: PopupAction) -> Option<MapIntent> {
        if self.popup.open_id() != Some(station) {
            debug!(%station, "ignoring action from a popup that is not open");
            return None;
        }
        let content = self.registry.popup(station)?;
        Some(match action {
            PopupAction::Route => match content.route_action {
                RouteAction::Create => MapIntent::CreateRoute(station.clone()),
                RouteAction::Remove => MapIntent::RemoveRoute,
            },
            PopupAction::Report => MapIntent::Report(station.clone()),
        })
    }

    fn expand_cluster(&mut self, index: usize) {
        let Some(bounds) = self.clusters.clusters.get(index).map(|c| c.bounds) else {
            return;
        };
        let fit = spatial::fit_zoom(
            &bounds,
            self.view.width_px,
            self.view.height_px,
            self.config.fit_padding_px,
            self.config.disable_clustering_at_zoom,
        );
        let zoom = fit.max(self.view.zoom.saturating_add(1)).min(MAX_ZOOM);
        self.move_view(bounds.center(), zoom);
    }

    // ── Viewport control ─────────────────────────────────────────────

    /// Programmatic pan/zoom; markers follow.
    pub fn move_view(&mut self, center: LatLng, zoom: u8) {
        self.view = MapView::new(center, zoom, self.view.width_px, self.view.height_px);
        self.surface.set_view(&self.view);
        self.reconcile_markers();
    }

    pub fn pan_by(&mut self, dx_px: f64, dy_px: f64) {
        let panned = self.view.panned(dx_px, dy_px);
        self.move_view(panned.center, panned.zoom);
    }

    pub fn zoom_by(&mut self, delta: i8) {
        let zoom = self.view.zoom.saturating_add_signed(delta).min(MAX_ZOOM);
        self.move_view(self.view.center, zoom);
    }

    // ── User location ────────────────────────────────────────────────

    /// First fix places the marker and flies to it; later fixes move it.
    pub fn set_user_location(&mut self, at: &UserLocation) {
        if self.has_user_marker {
            self.surface.move_user_marker(at);
            return;
        }
        self.surface.add_user_marker(at);
        self.has_user_marker = true;
        self.move_view(at.position, self.config.user_fix_zoom);
    }

    // ── Route ────────────────────────────────────────────────────────

    /// Draw `plan`, fitting the view only the first time its key is seen.
    pub fn show_route(&mut self, plan: &RoutePlan) {
        self.surface.draw_route(&plan.points, &plan.style.polyline());
        self.route = Some(plan.clone());

        if self.fitted.as_ref() == Some(&plan.key) {
            return;
        }
        self.fitted = Some(plan.key.clone());
        let Some(bounds) = plan.bounds() else {
            return;
        };
        let zoom = spatial::fit_zoom(
            &bounds,
            self.view.width_px,
            self.view.height_px,
            self.config.fit_padding_px,
            self.config.max_fit_zoom,
        );
        self.view = MapView::new(bounds.center(), zoom, self.view.width_px, self.view.height_px);
        self.surface
            .fit_bounds(&bounds, self.config.fit_padding_px, &self.view);
        self.reconcile_markers();
    }

    pub fn clear_route(&mut self) {
        if self.route.take().is_some() {
            self.surface.clear_route();
        }
        self.fitted = None;
    }

    // ── Debounce ─────────────────────────────────────────────────────

    pub fn next_deadline(&self) -> Option<Instant> {
        self.popup.deadline()
    }

    /// Turn an expired popup close into a deselect.
    pub fn poll(&mut self) -> Option<MapIntent> {
        let Dismissed(id) = self.popup.poll(self.clock.now())?;
        if self.scene.selected_id() == Some(&id) {
            // The surface already closed it; don't close it again on sync.
            self.focused = None;
            Some(MapIntent::Deselect)
        } else {
            None
        }
    }
}
