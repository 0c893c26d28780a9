//! Station command handlers.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use stationflow_core::stream::{nearby, search};
use stationflow_core::{OccupancyPolicy, Station, StationDraft, StationId};

use crate::cli::{GlobalOpts, StationsArgs, StationsCommand};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct StationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    transport: &'static str,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "Occupancy")]
    occupancy: String,
    #[tabled(rename = "Status")]
    status: &'static str,
}

impl StationRow {
    fn new(s: &Station, policy: &OccupancyPolicy) -> Self {
        let reading = policy.read(s);
        Self {
            id: s.id.to_string(),
            name: s.name.clone(),
            transport: s.transport.label(),
            available: format!("{}/{} {}", s.available, s.capacity, s.availability_unit()),
            occupancy: format!("{} ({})", reading.label(), output::level_label(reading.level, false)),
            status: s.status.label(),
        }
    }
}

/// A station with its distance from `--near`.
#[derive(Serialize)]
struct NearStation {
    #[serde(flatten)]
    station: Arc<Station>,
    distance_m: f64,
}

#[derive(Tabled)]
struct NearRow {
    #[tabled(rename = "Distance")]
    distance: String,
    #[tabled(inline)]
    station: StationRow,
}

// ── Detail view ─────────────────────────────────────────────────────

fn detail(s: &Station, policy: &OccupancyPolicy, color: bool) -> String {
    let reading = policy.read(s);
    let mut lines = vec![
        format!("ID:         {}", s.id),
        format!("Name:       {}", s.name),
        format!("Type:       {}", s.transport.label()),
        format!("Location:   {}", s.location),
        format!("Available:  {}/{} {}", s.available, s.capacity, s.availability_unit()),
        format!(
            "Occupancy:  {} ({})",
            reading.label(),
            output::level_label(reading.level, color)
        ),
        format!("Status:     {}", s.status.label()),
    ];
    if let Some(at) = s.last_update {
        lines.push(format!("Updated:    {}", at.format("%Y-%m-%d %H:%M")));
    }
    if s.is_custom {
        lines.push(format!(
            "Custom:     yes{}",
            s.owner_id
                .as_deref()
                .map(|owner| format!(" (owner {owner})"))
                .unwrap_or_default()
        ));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: StationsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = &ctx.client;
    let policy = &client.config().occupancy;
    let color = output::should_color(global.color);

    match args.command {
        StationsCommand::List {
            transport,
            search: query,
            near,
            radius,
        } => {
            let near = near.map(|raw| util::parse_point("near", &raw)).transpose()?;
            if radius.is_some_and(|r| !(r.is_finite() && r > 0.0)) {
                return Err(CliError::validation("radius", "must be a positive number of meters"));
            }

            let spinner = util::spinner(global, "Loading stations");
            let loaded = client.refresh().await;
            if let Some(bar) = spinner {
                bar.finish_and_clear();
            }
            loaded?;

            let snapshot = client.store().snapshot();
            let by_type = util::filter(transport).apply(&snapshot);
            let matched = search(&by_type, query.as_deref().unwrap_or_default());

            let out = match near {
                Some(from) => {
                    let hits: Vec<NearStation> = nearby(&matched, from, radius)
                        .into_iter()
                        .map(|(station, distance_m)| NearStation { station, distance_m })
                        .collect();
                    output::render_list(
                        global.output,
                        &hits,
                        |h| NearRow {
                            distance: output::format_distance(h.distance_m),
                            station: StationRow::new(&h.station, policy),
                        },
                        |h| h.station.id.to_string(),
                    )
                }
                None => output::render_list(
                    global.output,
                    &matched,
                    |s| StationRow::new(s, policy),
                    |s| s.id.to_string(),
                ),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        StationsCommand::Show { id } => {
            let station = client.get_station(&StationId::new(id)).await?;
            let out = output::render_single(
                global.output,
                &station,
                |s| detail(s, policy, color),
                |s| s.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        StationsCommand::Add {
            name,
            transport,
            at,
            capacity,
            available,
        } => {
            let draft = StationDraft {
                name,
                transport: util::transport(transport),
                location: util::parse_point("at", &at)?,
                capacity,
                available,
                owner_id: None,
            };
            let station = client.create_station(&draft).await?;
            let out = output::render_single(
                global.output,
                &station,
                |s| detail(s, policy, color),
                |s| s.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            output::success(global, &format!("Station '{}' created", station.name));
            Ok(())
        }

        StationsCommand::Delete { id } => {
            if !util::confirm(&format!("Delete station '{id}'? This cannot be undone."), global.yes)? {
                return Ok(());
            }
            client.delete_station(&StationId::new(id.clone())).await?;
            output::success(global, &format!("Station '{id}' deleted"));
            Ok(())
        }

        StationsCommand::Report { id, available } => {
            let station = client.get_station(&StationId::new(id)).await?;
            let message = client.report(&station, available).await?;
            output::success(
                global,
                if message.is_empty() {
                    "Update request submitted"
                } else {
                    &message
                },
            );
            Ok(())
        }
    }
}
