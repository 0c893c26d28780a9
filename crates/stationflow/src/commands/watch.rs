//! `watch`: run the full map shell headlessly and narrate what it draws.
//!
//! The shell drives a `LogSurface` whose operations are forwarded here and
//! printed one per line: text for table/plain output, a JSON object per
//! line for the JSON formats. Runs until Ctrl-C.

use serde_json::json;
use tokio::sync::mpsc;
use tracing::info;

use stationflow_core::geolocation::{GeolocationWatcher, StaticPositionSource, WatchOptions};
use stationflow_core::map::{LogSurface, MapRenderer, SurfaceOp};
use stationflow_core::shell::Notice;
use stationflow_core::{
    AppShell, PushStatus, RoutePlanner, ShellDriver, ShellMessage, StationId, SystemClock,
    UserLocation,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;

use super::{Context, util};

// ── Op formatting ───────────────────────────────────────────────────

fn op_text(op: &SurfaceOp) -> String {
    match op {
        SurfaceOp::AddMarker { id, spec, popup } => {
            format!("+ {id} {} [{:?}]", popup.summary(), spec.mode)
        }
        SurfaceOp::UpdateMarker { id, spec } => format!("~ {id} [{:?}]", spec.mode),
        SurfaceOp::RemoveMarker { id } => format!("- {id}"),
        SurfaceOp::SetPopupContent { id, popup } => format!("~ {id} {}", popup.summary()),
        SurfaceOp::OpenPopup { id } => format!("> popup {id}"),
        SurfaceOp::ClosePopup { id } => format!("< popup {id}"),
        SurfaceOp::SetClusters(clusters) => {
            let merged: usize = clusters.iter().map(|c| c.count).sum();
            format!("# {} clusters covering {merged} stations", clusters.len())
        }
        SurfaceOp::AddUserMarker(at) | SurfaceOp::MoveUserMarker(at) => format!("@ you are at {}", at.position),
        SurfaceOp::DrawRoute { points, style } => format!(
            "= route with {} points{}",
            points.len(),
            if style.dash.is_some() { " (straight line)" } else { "" }
        ),
        SurfaceOp::ClearRoute => "= route cleared".into(),
        SurfaceOp::SetView(view) => format!("* view {} z{}", view.center, view.zoom),
        SurfaceOp::FitBounds { view, .. } => format!("* fit {} z{}", view.center, view.zoom),
    }
}

fn op_json(op: &SurfaceOp) -> serde_json::Value {
    match op {
        SurfaceOp::AddMarker { id, spec, popup } => {
            json!({ "op": "add_marker", "station": id, "marker": spec, "popup": popup })
        }
        SurfaceOp::UpdateMarker { id, spec } => json!({ "op": "update_marker", "station": id, "marker": spec }),
        SurfaceOp::RemoveMarker { id } => json!({ "op": "remove_marker", "station": id }),
        SurfaceOp::SetPopupContent { id, popup } => json!({ "op": "popup_content", "station": id, "popup": popup }),
        SurfaceOp::OpenPopup { id } => json!({ "op": "open_popup", "station": id }),
        SurfaceOp::ClosePopup { id } => json!({ "op": "close_popup", "station": id }),
        SurfaceOp::SetClusters(clusters) => json!({ "op": "clusters", "clusters": clusters }),
        SurfaceOp::AddUserMarker(at) | SurfaceOp::MoveUserMarker(at) => json!({ "op": "user", "at": at }),
        SurfaceOp::DrawRoute { points, style } => json!({
            "op": "route",
            "points": points,
            "fallback": style.dash.is_some(),
        }),
        SurfaceOp::ClearRoute => json!({ "op": "clear_route" }),
        SurfaceOp::SetView(view) | SurfaceOp::FitBounds { view, .. } => json!({
            "op": if matches!(op, SurfaceOp::SetView(_)) { "view" } else { "fit" },
            "center": view.center,
            "zoom": view.zoom,
        }),
    }
}

fn print_op(op: &SurfaceOp, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => println!("{}", op_json(op)),
        OutputFormat::Table | OutputFormat::Yaml | OutputFormat::Plain => println!("{}", op_text(op)),
    }
}

fn print_notice(notice: &Notice) {
    if notice.is_error() {
        eprintln!("! {}", notice.text());
    } else {
        eprintln!("i {}", notice.text());
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = ctx.client.clone();
    let cfg = client.config();
    let at = args.at.map(|raw| util::parse_point("at", &raw)).transpose()?;
    let mut pending_select = args.select.map(StationId::new);

    let (ops_tx, mut ops) = mpsc::unbounded_channel();
    let renderer = MapRenderer::new(
        LogSurface::with_sink(ops_tx),
        SystemClock,
        cfg.map.clone(),
        cfg.occupancy.clone(),
    );
    let shell = AppShell::new(client.store().clone(), renderer);
    let planner = RoutePlanner::from_arc(client.routing());
    let mut driver = ShellDriver::new(shell, client.clone(), planner);

    if let Some(point) = at {
        let (watcher, initial) = GeolocationWatcher::spawn(
            StaticPositionSource(UserLocation::new(point.lat, point.lng)),
            WatchOptions::default(),
        );
        driver = driver.with_geolocation(watcher, initial);
    }

    let filter = util::filter(args.transport);
    driver.act(|shell| {
        shell.set_filter(filter);
        Vec::new()
    });
    if let Some(session) = client.session() {
        driver.act(|shell| shell.signed_in(session));
    }

    if let Some(mut status) = client.start_push().await? {
        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let now = *status.borrow_and_update();
                match now {
                    PushStatus::Connected => eprintln!("i live updates connected"),
                    PushStatus::Reconnecting { attempt } => {
                        eprintln!("i live updates lost, reconnecting (attempt {attempt})");
                    }
                    PushStatus::Closed => {
                        eprintln!("! live updates closed");
                        break;
                    }
                    PushStatus::Connecting => {}
                }
            }
        });
    }

    info!(profile = %ctx.profile, "watching; press Ctrl-C to stop");
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    driver.start();
    loop {
        while let Ok(op) = ops.try_recv() {
            print_op(&op, global.output);
        }
        driver.act(|shell| {
            if let Some(notice) = shell.take_notice() {
                print_notice(&notice);
            }
            Vec::new()
        });

        let msg = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            msg = driver.next() => msg,
        };
        let Some(msg) = msg else { break };
        let store_changed = matches!(msg, ShellMessage::StoreChanged);
        driver.apply(msg);

        if store_changed
            && let Some(id) = pending_select.take_if(|id| driver.shell().store().contains(id))
        {
            driver.act(|shell| {
                shell.select(&id);
                if args.route { shell.create_route(&id) } else { Vec::new() }
            });
        }
    }

    let shell = driver.shell();
    eprintln!(
        "i stopped: {} stations loaded, {} on the map",
        shell.store().len(),
        shell.renderer().rendered_ids().len()
    );
    Ok(())
}
