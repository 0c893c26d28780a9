// ── Route service ──
//
// Turns (origin, destination) into a drawable path. The provider is asked
// for a driving route; any failure degrades to a straight dashed line so
// the user still sees where to go. Each request carries a ticket from
// `RouteService`: a newer request or turning the route off cancels the
// ticket, and a result for a cancelled ticket is never drawn.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use stationflow_api::RoutingClient;

use crate::error::CoreError;
use crate::model::{LatLng, StationId};
use crate::spatial::Bounds;

// ── Provider seam ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRoute {
    pub points: Vec<LatLng>,
    pub distance_m: Option<f64>,
    pub duration_s: Option<f64>,
}

pub trait RouteProvider: Send + Sync + 'static {
    fn route(
        &self,
        from: LatLng,
        to: LatLng,
    ) -> impl Future<Output = Result<ProviderRoute, CoreError>> + Send;
}

impl RouteProvider for RoutingClient {
    async fn route(&self, from: LatLng, to: LatLng) -> Result<ProviderRoute, CoreError> {
        let geometry = self.driving_route(from.into(), to.into()).await?;
        Ok(ProviderRoute {
            points: geometry
                .coordinates
                .iter()
                .map(|[lng, lat]| LatLng::new(*lat, *lng))
                .collect(),
            distance_m: Some(geometry.distance_m),
            duration_s: Some(geometry.duration_s),
        })
    }
}

// ── Styles ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStyle {
    Normal,
    /// Straight line drawn when the provider failed.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolylineStyle {
    pub color: &'static str,
    pub weight: u8,
    pub opacity: f32,
    pub dash: Option<&'static str>,
}

impl RouteStyle {
    pub fn polyline(self) -> PolylineStyle {
        match self {
            Self::Normal => PolylineStyle {
                color: "#3b82f6",
                weight: 5,
                opacity: 0.8,
                dash: None,
            },
            Self::Fallback => PolylineStyle {
                color: "#ef4444",
                weight: 4,
                opacity: 0.7,
                dash: Some("10, 10"),
            },
        }
    }
}

// ── Keys, tickets, plans ─────────────────────────────────────────────

/// Identity of a route for viewport fitting. The origin is the user's
/// position when the route was activated, so a drifting GPS fix does not
/// re-fit the map.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteKey {
    pub origin: LatLng,
    pub destination: StationId,
    pub destination_point: LatLng,
}

#[derive(Debug, Clone)]
pub struct RouteTicket {
    pub generation: u64,
    pub key: RouteKey,
    /// Origin to route from right now (may differ from `key.origin`).
    pub origin: LatLng,
    cancel: CancellationToken,
}

impl RouteTicket {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    pub generation: u64,
    pub key: RouteKey,
    pub points: Vec<LatLng>,
    pub style: RouteStyle,
    pub distance_m: Option<f64>,
    pub duration_s: Option<f64>,
}

impl RoutePlan {
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.points.iter().copied())
    }

    pub fn is_fallback(&self) -> bool {
        self.style == RouteStyle::Fallback
    }
}

// ── Service ──────────────────────────────────────────────────────────

/// Generation counter plus the cancellation handle of the in-flight
/// request. Owned by the shell; never shared across tasks.
#[derive(Debug, Default)]
pub struct RouteService {
    generation: u64,
    active: Option<(RouteKey, CancellationToken)>,
}

impl RouteService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request, cancelling whatever was in flight.
    pub fn begin(&mut self, key: RouteKey, origin: LatLng) -> RouteTicket {
        self.cancel_in_flight();
        self.generation += 1;
        let cancel = CancellationToken::new();
        self.active = Some((key.clone(), cancel.clone()));
        RouteTicket {
            generation: self.generation,
            key,
            origin,
            cancel,
        }
    }

    /// Route turned off or destination gone: drop any pending result.
    pub fn invalidate(&mut self) {
        self.cancel_in_flight();
        self.generation += 1;
        self.active = None;
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.active.is_some() && generation == self.generation
    }

    pub fn active_key(&self) -> Option<&RouteKey> {
        self.active.as_ref().map(|(key, _)| key)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn cancel_in_flight(&mut self) {
        if let Some((_, cancel)) = &self.active {
            cancel.cancel();
        }
    }
}

// ── Planner ──────────────────────────────────────────────────────────

/// Executes tickets against a provider. Cheap to clone.
pub struct RoutePlanner<P> {
    provider: Arc<P>,
}

impl<P> Clone for RoutePlanner<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P: RouteProvider> RoutePlanner<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    pub fn from_arc(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Resolve a ticket. `None` means it was cancelled and nothing should
    /// be drawn.
    pub async fn plan(&self, ticket: &RouteTicket) -> Option<RoutePlan> {
        let from = ticket.origin;
        let to = ticket.key.destination_point;

        let result = tokio::select! {
            biased;
            () = ticket.cancel.cancelled() => return None,
            result = self.provider.route(from, to) => result,
        };
        if ticket.is_cancelled() {
            debug!(generation = ticket.generation, "route result arrived after cancellation");
            return None;
        }

        let plan = match result {
            Ok(route) if route.points.len() >= 2 => RoutePlan {
                generation: ticket.generation,
                key: ticket.key.clone(),
                points: route.points,
                style: RouteStyle::Normal,
                distance_m: route.distance_m,
                duration_s: route.duration_s,
            },
            Ok(_) => straight_line(ticket, "provider returned a degenerate path"),
            Err(e) => straight_line(ticket, &e.to_string()),
        };
        Some(plan)
    }
}

fn straight_line(ticket: &RouteTicket, reason: &str) -> RoutePlan {
    warn!(destination = %ticket.key.destination, reason, "routing failed, drawing straight line");
    let (from, to) = (ticket.origin, ticket.key.destination_point);
    RoutePlan {
        generation: ticket.generation,
        key: ticket.key.clone(),
        points: vec![from, to],
        style: RouteStyle::Fallback,
        distance_m: Some(from.distance_m(to)),
        duration_s: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Fixed(Result<Vec<LatLng>, String>);

    impl RouteProvider for Fixed {
        async fn route(&self, _from: LatLng, _to: LatLng) -> Result<ProviderRoute, CoreError> {
            match &self.0 {
                Ok(points) => Ok(ProviderRoute {
                    points: points.clone(),
                    distance_m: Some(1200.0),
                    duration_s: Some(180.0),
                }),
                Err(message) => Err(CoreError::RoutingFailed {
                    message: message.clone(),
                }),
            }
        }
    }

    struct Slow;

    impl RouteProvider for Slow {
        async fn route(&self, from: LatLng, to: LatLng) -> Result<ProviderRoute, CoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ProviderRoute {
                points: vec![from, to],
                distance_m: None,
                duration_s: None,
            })
        }
    }

    fn key() -> RouteKey {
        RouteKey {
            origin: LatLng::new(41.00, 29.00),
            destination: StationId::from("dest"),
            destination_point: LatLng::new(41.05, 29.05),
        }
    }

    #[tokio::test]
    async fn provider_success_draws_normal_style() {
        let mut service = RouteService::new();
        let ticket = service.begin(key(), key().origin);
        let planner = RoutePlanner::new(Fixed(Ok(vec![
            LatLng::new(41.00, 29.00),
            LatLng::new(41.02, 29.03),
            LatLng::new(41.05, 29.05),
        ])));
        let plan = planner.plan(&ticket).await.unwrap();
        assert_eq!(plan.style, RouteStyle::Normal);
        assert_eq!(plan.points.len(), 3);
        assert!(service.is_current(plan.generation));
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_straight_line() {
        let mut service = RouteService::new();
        let ticket = service.begin(key(), key().origin);
        let plan = RoutePlanner::new(Fixed(Err("NoRoute".into())))
            .plan(&ticket)
            .await
            .unwrap();
        assert!(plan.is_fallback());
        assert_eq!(plan.points, vec![key().origin, key().destination_point]);
        assert_eq!(plan.style.polyline().dash, Some("10, 10"));
    }

    #[tokio::test(start_paused = true)]
    async fn invalidated_ticket_yields_nothing() {
        let mut service = RouteService::new();
        let ticket = service.begin(key(), key().origin);
        let planner = RoutePlanner::new(Slow);
        let pending = tokio::spawn({
            let planner = planner.clone();
            let ticket = ticket.clone();
            async move { planner.plan(&ticket).await }
        });
        service.invalidate();
        assert!(pending.await.unwrap().is_none());
        assert!(!service.is_current(ticket.generation));
    }

    #[test]
    fn newer_request_supersedes_older() {
        let mut service = RouteService::new();
        let first = service.begin(key(), key().origin);
        let second = service.begin(key(), LatLng::new(41.01, 29.01));
        assert!(first.is_cancelled());
        assert!(!service.is_current(first.generation));
        assert!(service.is_current(second.generation));
        assert_eq!(service.active_key(), Some(&key()));
    }
}
