//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use stationflow_core::{LatLng, StationFilter, TransportType};

use crate::cli::{GlobalOpts, OutputFormat, TransportArg};
use crate::error::CliError;

pub fn transport(arg: TransportArg) -> TransportType {
    match arg {
        TransportArg::Bus => TransportType::Bus,
        TransportArg::Metro => TransportType::Metro,
        TransportArg::Bike => TransportType::Bike,
        TransportArg::Scooter => TransportType::Scooter,
        TransportArg::Minibus => TransportType::Minibus,
        TransportArg::Taxi => TransportType::Taxi,
        TransportArg::Dolmus => TransportType::Dolmus,
    }
}

pub fn filter(arg: Option<TransportArg>) -> StationFilter {
    StationFilter::from(arg.map(transport))
}

/// Parse a `LAT,LNG` flag value.
pub fn parse_point(field: &str, raw: &str) -> Result<LatLng, CliError> {
    raw.parse::<LatLng>()
        .map_err(|reason| CliError::validation(field, reason))
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Map a dialoguer / rpassword failure into a CLI error.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::validation("interactive", format!("prompt failed: {e}"))
}

/// A stderr spinner for slow fetches, shown only for interactive table
/// output.
pub fn spinner(global: &GlobalOpts, message: &'static str) -> Option<ProgressBar> {
    if global.quiet || global.output != OutputFormat::Table || !std::io::stderr().is_terminal() {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(80));
    Some(bar)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_points_are_usage_errors() {
        let err = parse_point("near", "north").err();
        assert!(matches!(err, Some(CliError::Validation { ref field, .. }) if field == "near"));
        assert!(parse_point("near", "41.0,29.0").is_ok());
    }

    #[test]
    fn type_flag_maps_to_filter() {
        assert_eq!(filter(None), StationFilter::All);
        assert_eq!(
            filter(Some(TransportArg::Dolmus)),
            StationFilter::ByType(TransportType::Dolmus)
        );
    }
}
