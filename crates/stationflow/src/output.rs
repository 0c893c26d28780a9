//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use stationflow_core::OccupancyLevel;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Whether stderr status lines may carry ANSI color.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// A `✓ message` line on stderr, unless `--quiet`.
pub fn success(global: &GlobalOpts, message: &str) {
    if global.quiet {
        return;
    }
    if should_color(global.color) {
        eprintln!("{} {message}", "✓".green());
    } else {
        eprintln!("✓ {message}");
    }
}

/// Occupancy level as a short word, colored when allowed.
pub fn level_label(level: OccupancyLevel, color: bool) -> String {
    let word = match level {
        OccupancyLevel::Normal => "ok",
        OccupancyLevel::Busy => "busy",
        OccupancyLevel::Full => "full",
        OccupancyLevel::Empty => "empty",
        OccupancyLevel::Maintenance => "maintenance",
    };
    if !color {
        return word.to_owned();
    }
    match level {
        OccupancyLevel::Normal => word.green().to_string(),
        OccupancyLevel::Busy => word.yellow().to_string(),
        OccupancyLevel::Full | OccupancyLevel::Empty => word.red().to_string(),
        OccupancyLevel::Maintenance => word.dimmed().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable items in the chosen format.
///
/// `to_row` builds the table row, `id_fn` the plain-text line.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single item. Table mode uses the hand-formatted `detail_fn`.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Print rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub(crate) fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.expect("serialization should not fail")
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).expect("serialization should not fail")
}

/// `"40 m"` below a kilometer, `"1.3 km"` above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1_000.0 {
        format!("{meters:.0} m")
    } else {
        format!("{:.1} km", meters / 1_000.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, Tabled)]
    struct Row {
        id: String,
    }

    #[test]
    fn plain_output_is_one_id_per_line() {
        let data = vec![Row { id: "a".into() }, Row { id: "b".into() }];
        let out = render_list(OutputFormat::Plain, &data, |r| Row { id: r.id.clone() }, |r| r.id.clone());
        assert_eq!(out, "a\nb");
    }

    #[test]
    fn compact_json_is_single_line() {
        let data = vec![Row { id: "a".into() }];
        let out = render_list(OutputFormat::JsonCompact, &data, |r| Row { id: r.id.clone() }, |r| r.id.clone());
        assert_eq!(out, r#"[{"id":"a"}]"#);
    }

    #[test]
    fn distances_switch_units_at_a_kilometer() {
        assert_eq!(format_distance(412.4), "412 m");
        assert_eq!(format_distance(1_340.0), "1.3 km");
    }

    #[test]
    fn uncolored_levels_are_plain_words() {
        assert_eq!(level_label(OccupancyLevel::Busy, false), "busy");
    }
}
