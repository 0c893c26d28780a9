// stationflow-core: Reactive station store, map renderer, and application
// shell between stationflow-api and the CLI/TUI front ends.

pub mod client;
pub mod clock;
pub mod config;
pub mod convert;
pub mod error;
pub mod geolocation;
pub mod map;
pub mod model;
pub mod occupancy;
pub mod route;
pub mod shell;
pub mod spatial;
pub mod store;
pub mod stream;
pub mod validation;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::StationDataClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, MapConfig, PushConfig, TlsVerification};
pub use error::CoreError;
pub use occupancy::{OccupancyLevel, OccupancyPolicy, OccupancyReading};
pub use route::{RoutePlan, RoutePlanner, RouteProvider, RouteService};
pub use shell::{AppShell, ShellDriver, ShellEffect, ShellMessage, UiState};
pub use store::StationStore;
pub use stream::{StationFilter, StationStream};

// Push channel status for front ends that show liveness, and the routing
// provider type front ends name when holding a `ShellDriver`.
pub use stationflow_api::{PushStatus, RoutingClient};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Feedback, LatLng, RequestStatus, Role, Session, Station, StationDraft, StationId, StationStatus,
    TransportType, UpdateRequest, User, UserLocation,
};
