//! `route`: one-shot route planning to a station.

use std::time::Duration;

use serde::Serialize;

use stationflow_core::route::RouteKey;
use stationflow_core::{LatLng, RoutePlan, RoutePlanner, RouteService, StationId};

use crate::cli::{GlobalOpts, RouteArgs};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

#[derive(Serialize)]
struct RouteSummary {
    station: StationId,
    station_name: String,
    from: LatLng,
    to: LatLng,
    /// `"provider"` or `"straight-line"`.
    kind: &'static str,
    distance_m: Option<f64>,
    duration_s: Option<f64>,
    points: Vec<LatLng>,
}

impl RouteSummary {
    fn new(name: String, plan: RoutePlan) -> Self {
        Self {
            station: plan.key.destination.clone(),
            station_name: name,
            from: plan.points.first().copied().unwrap_or(plan.key.origin),
            to: plan.key.destination_point,
            kind: if plan.is_fallback() { "straight-line" } else { "provider" },
            distance_m: plan.distance_m,
            duration_s: plan.duration_s,
            points: plan.points,
        }
    }
}

fn detail(r: &RouteSummary) -> String {
    let mut lines = vec![
        format!("To:        {} ({})", r.station_name, r.station),
        format!("From:      {}", r.from),
        format!("Route:     {}", r.kind),
    ];
    if let Some(m) = r.distance_m {
        lines.push(format!("Distance:  {}", output::format_distance(m)));
    }
    if let Some(secs) = r.duration_s.filter(|s| s.is_finite() && *s >= 0.0) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
        let rounded = Duration::from_secs(secs.round() as u64);
        lines.push(format!("Duration:  {}", humantime::format_duration(rounded)));
    }
    lines.push(format!("Points:    {}", r.points.len()));
    if r.kind == "straight-line" {
        lines.push("(routing provider unavailable; showing the direct line)".into());
    }
    lines.join("\n")
}

pub async fn handle(ctx: &Context, args: RouteArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = &ctx.client;
    let origin = util::parse_point("from", &args.from)?;
    let station = client.get_station(&StationId::new(args.station)).await?;

    let mut routes = RouteService::new();
    let ticket = routes.begin(
        RouteKey {
            origin,
            destination: station.id.clone(),
            destination_point: station.location,
        },
        origin,
    );
    let planner = RoutePlanner::from_arc(client.routing());
    let plan = planner
        .plan(&ticket)
        .await
        .ok_or_else(|| CliError::Internal("route request was cancelled".into()))?;

    let summary = RouteSummary::new(station.name, plan);
    let out = output::render_single(global.output, &summary, detail, |r| {
        r.points
            .iter()
            .map(|p| format!("{},{}", p.lat, p.lng))
            .collect::<Vec<_>>()
            .join("\n")
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
