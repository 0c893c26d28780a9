// ── Map geometry ──
//
// Geographic bounds, Web-Mercator projection at integer zoom levels, and
// the zoom-to-fit calculation used for route framing. Pixel coordinates
// follow the slippy-map convention: 256 px tiles, origin at the
// north-west corner of the world, y growing southwards.

use std::f64::consts::PI;

use geo::{BoundingRect, Coord, LineString, Rect};
use serde::{Deserialize, Serialize};

use crate::model::LatLng;

pub const TILE_SIZE: f64 = 256.0;
pub const MAX_ZOOM: u8 = 19;
/// Latitude limit of the square Web-Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

// ── Bounds ───────────────────────────────────────────────────────────

/// An axis-aligned lat/lng box. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds(Rect<f64>);

impl Bounds {
    /// Corners may be given in any order.
    pub fn new(a: LatLng, b: LatLng) -> Self {
        Self(Rect::new(a.to_coord(), b.to_coord()))
    }

    /// Smallest box covering every point, or `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLng>,
    {
        let line: LineString<f64> = points.into_iter().map(LatLng::to_coord).collect();
        line.bounding_rect().map(Self)
    }

    pub fn south_west(&self) -> LatLng {
        self.0.min().into()
    }

    pub fn north_east(&self) -> LatLng {
        self.0.max().into()
    }

    pub fn center(&self) -> LatLng {
        self.0.center().into()
    }

    pub fn contains(&self, p: LatLng) -> bool {
        let (min, max) = (self.0.min(), self.0.max());
        (min.y..=max.y).contains(&p.lat) && (min.x..=max.x).contains(&p.lng)
    }

    #[must_use]
    pub fn extend(&self, p: LatLng) -> Self {
        let (min, max) = (self.0.min(), self.0.max());
        Self(Rect::new(
            Coord {
                x: min.x.min(p.lng),
                y: min.y.min(p.lat),
            },
            Coord {
                x: max.x.max(p.lng),
                y: max.y.max(p.lat),
            },
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

// ── Projection ───────────────────────────────────────────────────────

fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * f64::from(1u32 << zoom.min(MAX_ZOOM))
}

/// Project to world pixel coordinates at `zoom`.
pub fn project(p: LatLng, zoom: u8) -> PixelPoint {
    let size = world_size(zoom);
    let lat = p.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (p.lng + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
    PixelPoint { x, y }
}

pub fn unproject(px: PixelPoint, zoom: u8) -> LatLng {
    let size = world_size(zoom);
    let lng = px.x / size * 360.0 - 180.0;
    let n = PI - 2.0 * PI * px.y / size;
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}

/// Geographic box covered by a `width_px` x `height_px` view centered on
/// `center`.
pub fn view_bounds(center: LatLng, zoom: u8, width_px: u32, height_px: u32) -> Bounds {
    let c = project(center, zoom);
    let (hw, hh) = (f64::from(width_px) / 2.0, f64::from(height_px) / 2.0);
    let nw = unproject(PixelPoint { x: c.x - hw, y: c.y - hh }, zoom);
    let se = unproject(PixelPoint { x: c.x + hw, y: c.y + hh }, zoom);
    Bounds::new(
        LatLng::new(se.lat.max(-MAX_LATITUDE), nw.lng.max(-180.0)),
        LatLng::new(nw.lat.min(MAX_LATITUDE), se.lng.min(180.0)),
    )
}

/// Highest integer zoom at which `bounds` fits inside the view with
/// `padding_px` on every side, capped at `max_zoom`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fit_zoom(bounds: &Bounds, width_px: u32, height_px: u32, padding_px: u32, max_zoom: u8) -> u8 {
    let sw = project(bounds.south_west(), 0);
    let ne = project(bounds.north_east(), 0);
    let span_x = (ne.x - sw.x).abs();
    let span_y = (sw.y - ne.y).abs();

    let avail_x = f64::from(width_px.saturating_sub(2 * padding_px).max(1));
    let avail_y = f64::from(height_px.saturating_sub(2 * padding_px).max(1));

    let scale = match (span_x > f64::EPSILON, span_y > f64::EPSILON) {
        (false, false) => return max_zoom.min(MAX_ZOOM),
        (true, false) => avail_x / span_x,
        (false, true) => avail_y / span_y,
        (true, true) => (avail_x / span_x).min(avail_y / span_y),
    };

    // Clamped to 0..=19, so the cast is exact.
    scale.log2().floor().clamp(0.0, f64::from(max_zoom.min(MAX_ZOOM))) as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn projection_round_trips_near_istanbul() {
        let p = LatLng::new(41.0082, 28.9784);
        let back = unproject(project(p, 13), 13);
        assert!((back.lat - p.lat).abs() < 1e-9);
        assert!((back.lng - p.lng).abs() < 1e-9);
    }

    #[test]
    fn origin_projects_to_world_center() {
        let px = project(LatLng::new(0.0, 0.0), 1);
        assert!((px.x - 256.0).abs() < 1e-9);
        assert!((px.y - 256.0).abs() < 1e-9);
    }

    #[test]
    fn view_bounds_contain_center_and_shrink_with_zoom() {
        let center = LatLng::new(41.0, 29.0);
        let wide = view_bounds(center, 12, 800, 600);
        let narrow = view_bounds(center, 15, 800, 600);
        assert!(wide.contains(center));
        assert!(narrow.contains(center));
        assert!(wide.contains(narrow.north_east()));
        assert!(!narrow.contains(wide.north_east()));
    }

    #[test]
    fn fit_zoom_frames_both_points() {
        let bounds = Bounds::new(LatLng::new(41.00, 29.00), LatLng::new(41.05, 29.05));
        let zoom = fit_zoom(&bounds, 800, 600, 50, 18);
        let view = view_bounds(bounds.center(), zoom, 800, 600);
        assert!(view.contains(bounds.south_west()));
        assert!(view.contains(bounds.north_east()));
        // One level deeper no longer fits.
        let tighter = view_bounds(bounds.center(), zoom + 1, 700, 500);
        assert!(!(tighter.contains(bounds.south_west()) && tighter.contains(bounds.north_east())));
    }

    #[test]
    fn single_point_fits_at_max_zoom() {
        let p = LatLng::new(41.0, 29.0);
        let bounds = Bounds::from_points([p]).unwrap();
        assert_eq!(fit_zoom(&bounds, 800, 600, 50, 17), 17);
    }

    #[test]
    fn bounds_extend_and_from_points() {
        let b = Bounds::from_points([LatLng::new(41.0, 29.0), LatLng::new(41.1, 28.9)]).unwrap();
        assert!(b.contains(LatLng::new(41.05, 28.95)));
        let b = b.extend(LatLng::new(40.9, 29.2));
        assert!(b.contains(LatLng::new(40.95, 29.15)));
        assert!(Bounds::from_points(std::iter::empty()).is_none());
    }
}
