// ── Marker clustering ──
//
// Grid clustering in projected pixel space: markers sharing a
// `radius_px` cell at the current zoom merge into one glyph. Cells with a
// single marker stay individual. Output order follows input order so the
// layout is stable across identical inputs.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{LatLng, StationId};
use crate::spatial::{Bounds, project};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterGlyph {
    pub center: LatLng,
    pub count: usize,
    pub members: Vec<StationId>,
    #[serde(skip)]
    pub bounds: Bounds,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterLayout {
    pub clusters: Vec<ClusterGlyph>,
    /// Members of the cluster layer that ended up alone in their cell.
    pub singles: Vec<StationId>,
}

impl ClusterLayout {
    pub fn cluster_of(&self, id: &StationId) -> Option<&ClusterGlyph> {
        self.clusters.iter().find(|c| c.members.contains(id))
    }
}

/// Whether the cluster layer groups markers at `zoom`.
pub fn clustering_active(enabled: bool, zoom: u8, disable_at_zoom: u8) -> bool {
    enabled && zoom < disable_at_zoom
}

// Float-to-cell truncation is intended; values are bounded by world size.
#[allow(clippy::cast_possible_truncation)]
pub fn layout(markers: &[(StationId, LatLng)], zoom: u8, radius_px: u32) -> ClusterLayout {
    let cell = f64::from(radius_px.max(1));
    let mut order: Vec<Vec<usize>> = Vec::new();
    let mut by_cell: HashMap<(i64, i64), usize> = HashMap::new();

    for (idx, (_, position)) in markers.iter().enumerate() {
        let px = project(*position, zoom);
        let key = ((px.x / cell).floor() as i64, (px.y / cell).floor() as i64);
        let slot = *by_cell.entry(key).or_insert_with(|| {
            order.push(Vec::new());
            order.len() - 1
        });
        if let Some(group) = order.get_mut(slot) {
            group.push(idx);
        }
    }

    let mut result = ClusterLayout::default();
    for group in order {
        let members: Vec<&(StationId, LatLng)> =
            group.iter().filter_map(|i| markers.get(*i)).collect();
        match members.as_slice() {
            [] => {}
            [(id, _)] => result.singles.push(id.clone()),
            many => {
                let Some(bounds) = Bounds::from_points(many.iter().map(|(_, p)| *p)) else {
                    continue;
                };
                #[allow(clippy::cast_precision_loss)]
                let n = many.len() as f64;
                let (lat, lng) = many
                    .iter()
                    .fold((0.0, 0.0), |(lat, lng), (_, p)| (lat + p.lat, lng + p.lng));
                result.clusters.push(ClusterGlyph {
                    center: LatLng::new(lat / n, lng / n),
                    count: many.len(),
                    members: many.iter().map(|(id, _)| id.clone()).collect(),
                    bounds,
                });
            }
        }
    }
    result
}
