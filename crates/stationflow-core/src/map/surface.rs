// ── Map surface abstraction ──
//
// The renderer only talks to a map through `MapSurface`. Each call maps to
// one `SurfaceOp`; a concrete surface either overrides the typed methods
// or handles the ops in `apply`.

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::cluster::ClusterGlyph;
use super::marker::{MarkerMode, MarkerVisual, PopupContent};
use super::viewport::MapView;
use crate::model::{LatLng, StationId, UserLocation};
use crate::route::PolylineStyle;
use crate::spatial::Bounds;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSpec {
    pub position: LatLng,
    pub mode: MarkerMode,
    pub visual: MarkerVisual,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    AddMarker {
        id: StationId,
        spec: MarkerSpec,
        popup: PopupContent,
    },
    UpdateMarker {
        id: StationId,
        spec: MarkerSpec,
    },
    RemoveMarker {
        id: StationId,
    },
    SetPopupContent {
        id: StationId,
        popup: PopupContent,
    },
    OpenPopup {
        id: StationId,
    },
    ClosePopup {
        id: StationId,
    },
    SetClusters(Vec<ClusterGlyph>),
    AddUserMarker(UserLocation),
    MoveUserMarker(UserLocation),
    DrawRoute {
        points: Vec<LatLng>,
        style: PolylineStyle,
    },
    ClearRoute,
    SetView(MapView),
    FitBounds {
        bounds: Bounds,
        padding_px: u32,
        view: MapView,
    },
}

pub trait MapSurface {
    fn apply(&mut self, op: SurfaceOp);

    fn add_marker(&mut self, id: &StationId, spec: &MarkerSpec, popup: &PopupContent) {
        self.apply(SurfaceOp::AddMarker {
            id: id.clone(),
            spec: spec.clone(),
            popup: popup.clone(),
        });
    }

    fn update_marker(&mut self, id: &StationId, spec: &MarkerSpec) {
        self.apply(SurfaceOp::UpdateMarker {
            id: id.clone(),
            spec: spec.clone(),
        });
    }

    fn remove_marker(&mut self, id: &StationId) {
        self.apply(SurfaceOp::RemoveMarker { id: id.clone() });
    }

    fn set_popup_content(&mut self, id: &StationId, popup: &PopupContent) {
        self.apply(SurfaceOp::SetPopupContent {
            id: id.clone(),
            popup: popup.clone(),
        });
    }

    fn open_popup(&mut self, id: &StationId) {
        self.apply(SurfaceOp::OpenPopup { id: id.clone() });
    }

    fn close_popup(&mut self, id: &StationId) {
        self.apply(SurfaceOp::ClosePopup { id: id.clone() });
    }

    fn set_clusters(&mut self, clusters: &[ClusterGlyph]) {
        self.apply(SurfaceOp::SetClusters(clusters.to_vec()));
    }

    fn add_user_marker(&mut self, at: &UserLocation) {
        self.apply(SurfaceOp::AddUserMarker(*at));
    }

    fn move_user_marker(&mut self, at: &UserLocation) {
        self.apply(SurfaceOp::MoveUserMarker(*at));
    }

    fn draw_route(&mut self, points: &[LatLng], style: &PolylineStyle) {
        self.apply(SurfaceOp::DrawRoute {
            points: points.to_vec(),
            style: *style,
        });
    }

    fn clear_route(&mut self) {
        self.apply(SurfaceOp::ClearRoute);
    }

    fn set_view(&mut self, view: &MapView) {
        self.apply(SurfaceOp::SetView(*view));
    }

    /// `view` is the renderer's computed result; surfaces that fit
    /// natively may use `bounds` instead.
    fn fit_bounds(&mut self, bounds: &Bounds, padding_px: u32, view: &MapView) {
        self.apply(SurfaceOp::FitBounds {
            bounds: *bounds,
            padding_px,
            view: *view,
        });
    }
}

// ── LogSurface ───────────────────────────────────────────────────────

/// Headless surface: logs every operation and optionally forwards it.
#[derive(Debug, Default)]
pub struct LogSurface {
    sink: Option<mpsc::UnboundedSender<SurfaceOp>>,
}

impl LogSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: mpsc::UnboundedSender<SurfaceOp>) -> Self {
        Self { sink: Some(sink) }
    }
}

impl MapSurface for LogSurface {
    fn apply(&mut self, op: SurfaceOp) {
        match &op {
            SurfaceOp::AddMarker { id, spec, .. } => {
                info!(station = %id, mode = ?spec.mode, "marker added");
            }
            SurfaceOp::UpdateMarker { id, spec } => {
                info!(station = %id, mode = ?spec.mode, "marker updated");
            }
            SurfaceOp::RemoveMarker { id } => info!(station = %id, "marker removed"),
            SurfaceOp::SetPopupContent { id, .. } => debug!(station = %id, "popup content set"),
            SurfaceOp::OpenPopup { id } => info!(station = %id, "popup opened"),
            SurfaceOp::ClosePopup { id } => info!(station = %id, "popup closed"),
            SurfaceOp::SetClusters(clusters) => debug!(count = clusters.len(), "clusters updated"),
            SurfaceOp::AddUserMarker(at) => info!(at = %at.position, "user marker placed"),
            SurfaceOp::MoveUserMarker(at) => debug!(at = %at.position, "user marker moved"),
            SurfaceOp::DrawRoute { points, style } => {
                info!(points = points.len(), dashed = style.dash.is_some(), "route drawn");
            }
            SurfaceOp::ClearRoute => info!("route cleared"),
            SurfaceOp::SetView(view) => debug!(center = %view.center, zoom = view.zoom, "view set"),
            SurfaceOp::FitBounds { view, .. } => {
                info!(center = %view.center, zoom = view.zoom, "view fitted to route");
            }
        }
        if let Some(sink) = &self.sink {
            let _ = sink.send(op);
        }
    }
}

// ── RecordingSurface ─────────────────────────────────────────────────

/// In-memory surface that keeps both the op log and the resulting state.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<SurfaceOp>,
    pub markers: BTreeMap<StationId, MarkerSpec>,
    pub popups: BTreeMap<StationId, PopupContent>,
    pub open_popup: Option<StationId>,
    pub clusters: Vec<ClusterGlyph>,
    pub user_marker: Option<UserLocation>,
    pub route: Option<(Vec<LatLng>, PolylineStyle)>,
    pub view: Option<MapView>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker_ids(&self) -> Vec<StationId> {
        self.markers.keys().cloned().collect()
    }

    pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn count(&self, pred: impl Fn(&SurfaceOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    pub fn fit_count(&self) -> usize {
        self.count(|op| matches!(op, SurfaceOp::FitBounds { .. }))
    }
}

impl MapSurface for RecordingSurface {
    fn apply(&mut self, op: SurfaceOp) {
        match &op {
            SurfaceOp::AddMarker { id, spec, popup } => {
                self.markers.insert(id.clone(), spec.clone());
                self.popups.insert(id.clone(), popup.clone());
            }
            SurfaceOp::UpdateMarker { id, spec } => {
                self.markers.insert(id.clone(), spec.clone());
            }
            SurfaceOp::RemoveMarker { id } => {
                self.markers.remove(id);
                self.popups.remove(id);
                if self.open_popup.as_ref() == Some(id) {
                    self.open_popup = None;
                }
            }
            SurfaceOp::SetPopupContent { id, popup } => {
                self.popups.insert(id.clone(), popup.clone());
            }
            SurfaceOp::OpenPopup { id } => self.open_popup = Some(id.clone()),
            SurfaceOp::ClosePopup { id } => {
                if self.open_popup.as_ref() == Some(id) {
                    self.open_popup = None;
                }
            }
            SurfaceOp::SetClusters(clusters) => self.clusters.clone_from(clusters),
            SurfaceOp::AddUserMarker(at) | SurfaceOp::MoveUserMarker(at) => {
                self.user_marker = Some(*at);
            }
            SurfaceOp::DrawRoute { points, style } => self.route = Some((points.clone(), *style)),
            SurfaceOp::ClearRoute => self.route = None,
            SurfaceOp::SetView(view) | SurfaceOp::FitBounds { view, .. } => self.view = Some(*view),
        }
        self.ops.push(op);
    }
}
