//! `TuiSurface`: the terminal's map surface.
//!
//! Keeps the state the renderer pushes (markers, popups, clusters, user
//! marker, route, view) and answers the questions drawing and key handling
//! need: where a point lands on the canvas, and which marker or cluster is
//! under the crosshair.

use std::collections::{BTreeMap, HashSet};

use stationflow_core::map::{ClusterGlyph, MapSurface, MapView, MarkerSpec, PopupContent, SurfaceOp};
use stationflow_core::route::PolylineStyle;
use stationflow_core::spatial;
use stationflow_core::{LatLng, StationId, UserLocation};

/// Nominal pixel size of one terminal cell; cells are about twice as tall
/// as they are wide.
pub const CELL_WIDTH_PX: u32 = 8;
pub const CELL_HEIGHT_PX: u32 = 16;

/// Something the crosshair can hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Marker(StationId),
    /// Index into the current cluster list.
    Cluster(usize),
}

#[derive(Debug, Default)]
pub struct TuiSurface {
    markers: BTreeMap<StationId, MarkerSpec>,
    popups: BTreeMap<StationId, PopupContent>,
    open_popup: Option<StationId>,
    clusters: Vec<ClusterGlyph>,
    clustered: HashSet<StationId>,
    user: Option<UserLocation>,
    route: Option<(Vec<LatLng>, PolylineStyle)>,
    view: Option<MapView>,
}

impl TuiSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> Option<&MapView> {
        self.view.as_ref()
    }

    pub fn user(&self) -> Option<&UserLocation> {
        self.user.as_ref()
    }

    pub fn route(&self) -> Option<&(Vec<LatLng>, PolylineStyle)> {
        self.route.as_ref()
    }

    pub fn clusters(&self) -> &[ClusterGlyph] {
        &self.clusters
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Markers drawn individually (not merged into a cluster), lowest
    /// z-index first.
    pub fn loose_markers(&self) -> Vec<(&StationId, &MarkerSpec)> {
        let mut loose: Vec<_> = self
            .markers
            .iter()
            .filter(|(id, _)| !self.clustered.contains(*id))
            .collect();
        loose.sort_by_key(|(_, spec)| spec.visual.z_index);
        loose
    }

    pub fn shown_popup(&self) -> Option<&PopupContent> {
        self.open_popup.as_ref().and_then(|id| self.popups.get(id))
    }

    pub fn popup(&self, id: &StationId) -> Option<&PopupContent> {
        self.popups.get(id)
    }

    /// Close the open popup as the user would, returning its station so
    /// the caller can report `PopupClosed`.
    pub fn dismiss_popup(&mut self) -> Option<StationId> {
        self.open_popup.take()
    }

    // ── Geometry ─────────────────────────────────────────────────────

    /// Canvas coordinates: pixels from the view center, y pointing up.
    pub fn to_canvas(&self, p: LatLng) -> Option<(f64, f64)> {
        let view = self.view?;
        let c = spatial::project(view.center, view.zoom);
        let px = spatial::project(p, view.zoom);
        Some((px.x - c.x, c.y - px.y))
    }

    /// `(x_bounds, y_bounds)` for a ratatui canvas showing the view.
    pub fn canvas_bounds(&self) -> ([f64; 2], [f64; 2]) {
        let (w, h) = self
            .view
            .map_or((1.0, 1.0), |v| (f64::from(v.width_px), f64::from(v.height_px)));
        ([-w / 2.0, w / 2.0], [-h / 2.0, h / 2.0])
    }

    /// The marker or cluster closest to the view center, within `max_px`.
    pub fn target_at_center(&self, max_px: f64) -> Option<Target> {
        let distance = |p: LatLng| self.to_canvas(p).map(|(x, y)| x.hypot(y));

        let markers = self
            .loose_markers()
            .into_iter()
            .filter_map(|(id, spec)| Some((distance(spec.position)?, Target::Marker(id.clone()))));
        let clusters = self
            .clusters
            .iter()
            .enumerate()
            .filter_map(|(i, c)| Some((distance(c.center)?, Target::Cluster(i))));

        markers
            .chain(clusters)
            .filter(|(d, _)| *d <= max_px)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, target)| target)
    }
}

impl MapSurface for TuiSurface {
    fn apply(&mut self, op: SurfaceOp) {
        match op {
            SurfaceOp::AddMarker { id, spec, popup } => {
                self.popups.insert(id.clone(), popup);
                self.markers.insert(id, spec);
            }
            SurfaceOp::UpdateMarker { id, spec } => {
                self.markers.insert(id, spec);
            }
            SurfaceOp::RemoveMarker { id } => {
                self.markers.remove(&id);
                self.popups.remove(&id);
                if self.open_popup.as_ref() == Some(&id) {
                    self.open_popup = None;
                }
            }
            SurfaceOp::SetPopupContent { id, popup } => {
                self.popups.insert(id, popup);
            }
            SurfaceOp::OpenPopup { id } => self.open_popup = Some(id),
            SurfaceOp::ClosePopup { id } => {
                if self.open_popup.as_ref() == Some(&id) {
                    self.open_popup = None;
                }
            }
            SurfaceOp::SetClusters(clusters) => {
                self.clustered = clusters.iter().flat_map(|c| c.members.iter().cloned()).collect();
                self.clusters = clusters;
            }
            SurfaceOp::AddUserMarker(at) | SurfaceOp::MoveUserMarker(at) => self.user = Some(at),
            SurfaceOp::DrawRoute { points, style } => self.route = Some((points, style)),
            SurfaceOp::ClearRoute => self.route = None,
            SurfaceOp::SetView(view) | SurfaceOp::FitBounds { view, .. } => self.view = Some(view),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use stationflow_core::map::{MarkerMode, MarkerVisual};
    use stationflow_core::occupancy::OccupancyPolicy;
    use stationflow_core::{Station, StationStatus, TransportType};

    use super::*;

    fn station(id: &str, lat: f64, lng: f64) -> Station {
        Station {
            id: StationId::from(id),
            name: format!("Station {id}"),
            transport: TransportType::Bus,
            location: LatLng::new(lat, lng),
            capacity: 20,
            available: 5,
            status: StationStatus::Active,
            last_update: None,
            is_custom: false,
            owner_id: None,
        }
    }

    fn add(surface: &mut TuiSurface, s: &Station, mode: MarkerMode) {
        surface.add_marker(
            &s.id,
            &MarkerSpec {
                position: s.location,
                mode,
                visual: MarkerVisual::for_station(s, mode),
            },
            &PopupContent::build(s, false, &OccupancyPolicy::default()),
        );
    }

    fn surface_at(center: LatLng) -> TuiSurface {
        let mut surface = TuiSurface::new();
        surface.set_view(&MapView::new(center, 15, 800, 480));
        surface
    }

    #[test]
    fn view_center_maps_to_canvas_origin() {
        let center = LatLng::new(41.0, 29.0);
        let surface = surface_at(center);
        let (x, y) = surface.to_canvas(center).unwrap();
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);

        let (x, y) = surface.to_canvas(LatLng::new(41.001, 29.001)).unwrap();
        assert!(x > 0.0, "east is right");
        assert!(y > 0.0, "north is up");
        assert_eq!(surface.canvas_bounds(), ([-400.0, 400.0], [-240.0, 240.0]));
    }

    #[test]
    fn crosshair_picks_the_nearest_loose_marker() {
        let center = LatLng::new(41.0, 29.0);
        let mut surface = surface_at(center);
        add(&mut surface, &station("near", 41.0001, 29.0001), MarkerMode::Dot);
        add(&mut surface, &station("far", 41.003, 29.003), MarkerMode::Dot);

        assert_eq!(surface.target_at_center(40.0), Some(Target::Marker(StationId::from("near"))));
        assert_eq!(surface.target_at_center(1.0), None);
    }

    #[test]
    fn clustered_members_are_hidden_and_the_cluster_is_targeted() {
        let center = LatLng::new(41.0, 29.0);
        let mut surface = surface_at(center);
        let a = station("a", 41.0, 29.0);
        let b = station("b", 41.0, 29.0);
        add(&mut surface, &a, MarkerMode::Clustered);
        add(&mut surface, &b, MarkerMode::Clustered);
        surface.set_clusters(&[ClusterGlyph {
            center,
            count: 2,
            members: vec![a.id.clone(), b.id.clone()],
            bounds: spatial::Bounds::new(center, center),
        }]);

        assert!(surface.loose_markers().is_empty());
        assert_eq!(surface.target_at_center(10.0), Some(Target::Cluster(0)));
    }

    #[test]
    fn popup_follows_open_close_and_removal() {
        let mut surface = surface_at(LatLng::new(41.0, 29.0));
        let s = station("s1", 41.0, 29.0);
        add(&mut surface, &s, MarkerMode::Detailed);

        surface.open_popup(&s.id);
        assert_eq!(surface.shown_popup().unwrap().name, "Station s1");
        assert_eq!(surface.dismiss_popup(), Some(s.id.clone()));
        assert!(surface.shown_popup().is_none());

        surface.open_popup(&s.id);
        surface.remove_marker(&s.id);
        assert!(surface.shown_popup().is_none());
        assert_eq!(surface.marker_count(), 0);
    }
}
