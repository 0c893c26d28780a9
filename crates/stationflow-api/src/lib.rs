// stationflow-api: Async Rust client for the StationFlow backend, its
// server-sent-events push channel, and an OSRM routing provider.

pub mod auth;
pub mod client;
pub mod error;
pub mod events;
pub mod feedback;
pub mod models;
pub mod requests;
pub mod routing;
pub mod stations;
pub mod transport;

pub use client::StationApiClient;
pub use error::Error;
pub use events::{PushChannelHandle, PushEvent, PushStatus, ReconnectConfig};
pub use routing::{DEFAULT_ROUTING_URL, RouteGeometry, RoutingClient};
pub use transport::{TlsMode, TransportConfig};
