//! `stationflow-tui`: terminal map of transit stations and their occupancy.
//!
//! Runs the same application shell as the `watch` command against a
//! character-cell map surface. Live updates arrive over the push channel
//! when the profile enables it.
//!
//! Logs go to a file (default under the platform log directory) so they
//! never corrupt the terminal.

mod action;
mod app;
mod event;
mod forms;
mod surface;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use stationflow_config::SessionStore;
use stationflow_core::geolocation::{GeolocationWatcher, StaticPositionSource, WatchOptions};
use stationflow_core::map::MapRenderer;
use stationflow_core::{
    AppShell, LatLng, RoutePlanner, ShellDriver, StationDataClient, SystemClock, UserLocation,
};

use crate::app::App;
use crate::surface::TuiSurface;

/// Terminal map for StationFlow station occupancy.
#[derive(Parser, Debug)]
#[command(name = "stationflow-tui", version, about)]
struct Cli {
    /// Config profile to use
    #[arg(short, long, env = "STATIONFLOW_PROFILE")]
    profile: Option<String>,

    /// Backend base URL, overriding the profile
    #[arg(long, env = "STATIONFLOW_API_URL")]
    api_url: Option<String>,

    /// Pretend to be at LAT,LNG (e.g. 41.0082,28.9784)
    #[arg(long, value_name = "LAT,LNG", value_parser = parse_point)]
    at: Option<LatLng>,

    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_point(raw: &str) -> Result<LatLng, String> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got '{raw}'"))?;
    let lat: f64 = lat.trim().parse().map_err(|_| format!("bad latitude '{lat}'"))?;
    let lng: f64 = lng.trim().parse().map_err(|_| format!("bad longitude '{lng}'"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(format!("'{raw}' is outside the valid coordinate range"));
    }
    Ok(LatLng::new(lat, lng))
}

/// File-only tracing. Hold the guard until exit so the writer flushes.
fn setup_tracing(cli: &Cli) -> Result<WorkerGuard> {
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "stationflow_tui={level},stationflow_core={level},stationflow_api={level}"
        ))
    });

    let path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| stationflow_config::log_dir().join("stationflow-tui.log"));
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), PathBuf::from);
    std::fs::create_dir_all(&dir).wrap_err_with(|| format!("creating log directory {}", dir.display()))?;
    let file = path
        .file_name()
        .ok_or_else(|| eyre!("log file path {} has no file name", path.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, file));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
        .init();
    Ok(guard)
}

/// Client for the active profile, with the push channel on.
fn build_client(cli: &Cli) -> Result<(StationDataClient, SessionStore)> {
    let cfg = stationflow_config::load_config_or_default();
    let name = stationflow_config::active_profile_name(&cfg, cli.profile.as_deref());
    let mut profile = match stationflow_config::profile(&cfg, &name) {
        Ok(profile) => profile.clone(),
        Err(_) if cli.api_url.is_some() => stationflow_config::Profile::default(),
        Err(e) => return Err(e).wrap_err("run `stationflow config init` or pass --api-url"),
    };
    if let Some(url) = &cli.api_url {
        profile.api_url.clone_from(url);
    }

    let mut config = stationflow_config::to_client_config(&cfg, &profile)?;
    config.push.enabled = true;
    let client = StationDataClient::new(config)?;
    Ok((client, SessionStore::new(name)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tui::install_hooks()?;
    let _log_guard = setup_tracing(&cli)?;

    let (client, sessions) = build_client(&cli)?;
    info!(profile = sessions.profile(), "starting stationflow-tui");

    let restored = match sessions.load() {
        Ok(Some(session)) => {
            client.restore_session(session);
            true
        }
        Ok(None) => false,
        Err(e) => {
            warn!(error = %e, "ignoring unreadable session file");
            false
        }
    };

    let cfg = client.config();
    let renderer = MapRenderer::new(TuiSurface::new(), SystemClock, cfg.map.clone(), cfg.occupancy.clone());
    let shell = AppShell::new(client.store().clone(), renderer);
    let planner = RoutePlanner::from_arc(client.routing());
    let mut driver = ShellDriver::new(shell, client.clone(), planner);

    if let Some(at) = cli.at {
        let (watcher, initial) = GeolocationWatcher::spawn(
            StaticPositionSource(UserLocation::new(at.lat, at.lng)),
            WatchOptions::default(),
        );
        driver = driver.with_geolocation(watcher, initial);
    }
    if let Some(session) = client.session() {
        driver.act(|shell| shell.signed_in(session));
    }

    let push = match client.start_push().await {
        Ok(status) => status,
        Err(e) => {
            warn!(error = %e, "live updates unavailable");
            None
        }
    };

    let mut app = App::new(driver, cfg.occupancy.clone(), push);
    let outcome = app.run().await;

    if restored
        && client.session().is_none()
        && let Err(e) = sessions.clear()
    {
        warn!(error = %e, "failed to clear expired session");
    }
    client.shutdown().await;
    outcome
}
