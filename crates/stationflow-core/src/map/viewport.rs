// ── Viewport ──

use crate::model::LatLng;
use crate::spatial::{self, Bounds, MAX_ZOOM};

/// What part of the world the surface currently shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: u8,
    pub width_px: u32,
    pub height_px: u32,
}

impl MapView {
    pub fn new(center: LatLng, zoom: u8, width_px: u32, height_px: u32) -> Self {
        Self {
            center,
            zoom: zoom.min(MAX_ZOOM),
            width_px: width_px.max(1),
            height_px: height_px.max(1),
        }
    }

    pub fn bounds(&self) -> Bounds {
        spatial::view_bounds(self.center, self.zoom, self.width_px, self.height_px)
    }

    /// Shift the view by a pixel offset at the current zoom.
    #[must_use]
    pub fn panned(&self, dx_px: f64, dy_px: f64) -> Self {
        let mut px = spatial::project(self.center, self.zoom);
        px.x += dx_px;
        px.y += dy_px;
        let center = spatial::unproject(px, self.zoom);
        Self {
            center: LatLng::new(
                center.lat.clamp(-spatial::MAX_LATITUDE, spatial::MAX_LATITUDE),
                center.lng.clamp(-180.0, 180.0),
            ),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panning_moves_center_east() {
        let view = MapView::new(LatLng::new(41.0, 29.0), 13, 800, 600);
        let moved = view.panned(100.0, 0.0);
        assert!(moved.center.lng > view.center.lng);
        assert!((moved.center.lat - view.center.lat).abs() < 1e-9);
    }

    #[test]
    fn bounds_hold_the_center_and_drop_far_points() {
        let view = MapView::new(LatLng::new(41.0082, 28.9784), 13, 800, 600);
        let bounds = view.bounds();
        assert!(bounds.contains(view.center));
        assert!(!bounds.contains(LatLng::new(39.92, 32.85)));
    }
}
