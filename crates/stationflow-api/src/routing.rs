// Client for an OSRM-compatible routing provider.
//
// Only the driving profile with full GeoJSON geometry is used. The
// provider is public and unauthenticated; any failure is the caller's
// cue to fall back to a straight line.

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::LocationRecord;
use crate::transport::TransportConfig;

/// The public OSRM demo server.
pub const DEFAULT_ROUTING_URL: &str = "https://router.project-osrm.org/";

/// A driving path returned by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteGeometry {
    /// Path vertices as `[lng, lat]` pairs, origin first.
    pub coordinates: Vec<[f64; 2]>,
    /// Length in meters.
    pub distance_m: f64,
    /// Estimated travel time in seconds.
    pub duration_s: f64,
}

// ── Wire shapes ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

// ── Client ───────────────────────────────────────────────────────────

pub struct RoutingClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RoutingClient {
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        Self::with_client(transport.build_client()?, base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, Error> {
        let mut url = Url::parse(base_url)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(Self { http, base_url: url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Request a driving route from `from` to `to`.
    ///
    /// `GET route/v1/driving/{lng},{lat};{lng},{lat}?overview=full&geometries=geojson`
    pub async fn driving_route(
        &self,
        from: LocationRecord,
        to: LocationRecord,
    ) -> Result<RouteGeometry, Error> {
        let mut url = self.base_url.join(&format!(
            "route/v1/driving/{},{};{},{}",
            from.lng, from.lat, to.lng, to.lat
        ))?;
        url.query_pairs_mut()
            .append_pair("overview", "full")
            .append_pair("geometries", "geojson");
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        let parsed: OsrmResponse = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                Error::Deserialization {
                    message: e.to_string(),
                    body: body.clone(),
                }
            } else {
                Error::Routing {
                    message: format!("HTTP {status}"),
                }
            }
        })?;

        if parsed.code != "Ok" {
            return Err(Error::Routing {
                message: parsed.message.unwrap_or(parsed.code),
            });
        }

        let route = parsed.routes.into_iter().next().ok_or_else(|| Error::Routing {
            message: "provider returned no routes".into(),
        })?;
        if route.geometry.coordinates.is_empty() {
            return Err(Error::Routing {
                message: "route geometry is empty".into(),
            });
        }

        Ok(RouteGeometry {
            coordinates: route.geometry.coordinates,
            distance_m: route.distance,
            duration_s: route.duration,
        })
    }
}
