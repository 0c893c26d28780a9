// ── Map rendering ──
//
// The renderer keeps a toolkit-neutral map surface in sync with shell
// state. Everything a concrete map (terminal canvas, log sink, test
// recorder) needs to implement is the `MapSurface` trait.

pub mod cluster;
pub mod marker;
pub mod popup;
pub mod reconcile;
pub mod renderer;
pub mod surface;
pub mod viewport;

pub use cluster::{ClusterGlyph, ClusterLayout};
pub use marker::{MarkerMode, MarkerVisual, PopupAction, PopupContent, RouteAction};
pub use popup::{PopupState, PopupTracker};
pub use reconcile::{MarkerRegistry, ReconcileReport};
pub use renderer::{MapEvent, MapIntent, MapRenderer, Scene};
pub use surface::{LogSurface, MapSurface, MarkerSpec, RecordingSurface, SurfaceOp};
pub use viewport::MapView;
