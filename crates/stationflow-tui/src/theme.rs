//! Palette and semantic styles.

use ratatui::style::{Color, Modifier, Style};

use stationflow_core::{OccupancyLevel, PushStatus};

// ── Palette ───────────────────────────────────────────────────────────

pub const ELECTRIC_PURPLE: Color = Color::Rgb(225, 53, 255); // #e135ff
pub const NEON_CYAN: Color = Color::Rgb(128, 255, 234); // #80ffea
pub const CORAL: Color = Color::Rgb(255, 106, 193); // #ff6ac1
pub const ELECTRIC_YELLOW: Color = Color::Rgb(241, 250, 140); // #f1fa8c
pub const SUCCESS_GREEN: Color = Color::Rgb(80, 250, 123); // #50fa7b
pub const ERROR_RED: Color = Color::Rgb(255, 99, 99); // #ff6363

pub const DIM_WHITE: Color = Color::Rgb(189, 193, 207); // #bdc1cf
pub const BORDER_GRAY: Color = Color::Rgb(98, 114, 164); // #6272a4
pub const BG_HIGHLIGHT: Color = Color::Rgb(40, 42, 54); // #282a36
pub const BG_DARK: Color = Color::Rgb(30, 31, 41); // #1e1f29

/// Dashed fallback routes.
pub const ROUTE_FALLBACK: Color = ELECTRIC_YELLOW;
pub const ROUTE: Color = NEON_CYAN;
pub const USER: Color = CORAL;

/// Parse a `#rrggbb` marker color. Anything else falls back to dim white.
pub fn hex(color: &str) -> Color {
    let parse = |range: std::ops::Range<usize>| color.get(range).and_then(|h| u8::from_str_radix(h, 16).ok());
    match (color.strip_prefix('#').map(str::len), parse(1..3), parse(3..5), parse(5..7)) {
        (Some(6), Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => DIM_WHITE,
    }
}

pub fn level_color(level: OccupancyLevel) -> Color {
    match level {
        OccupancyLevel::Normal => SUCCESS_GREEN,
        OccupancyLevel::Busy => ELECTRIC_YELLOW,
        OccupancyLevel::Full | OccupancyLevel::Empty => ERROR_RED,
        OccupancyLevel::Maintenance => BORDER_GRAY,
    }
}

/// Indicator glyph and color for the push channel.
pub fn push_indicator(status: Option<PushStatus>) -> (&'static str, Color) {
    match status {
        Some(PushStatus::Connected) => ("● live", SUCCESS_GREEN),
        Some(PushStatus::Connecting) => ("◐ connecting", ELECTRIC_YELLOW),
        Some(PushStatus::Reconnecting { .. }) => ("◐ reconnecting", ELECTRIC_YELLOW),
        Some(PushStatus::Closed) => ("○ offline", ERROR_RED),
        None => ("○ static", BORDER_GRAY),
    }
}

// ── Semantic styles ───────────────────────────────────────────────────

pub fn title_style() -> Style {
    Style::default().fg(NEON_CYAN).add_modifier(Modifier::BOLD)
}

pub fn border_focused() -> Style {
    Style::default().fg(ELECTRIC_PURPLE)
}

pub fn border_default() -> Style {
    Style::default().fg(BORDER_GRAY)
}

pub fn list_row() -> Style {
    Style::default().fg(DIM_WHITE)
}

pub fn list_highlight() -> Style {
    Style::default()
        .fg(ELECTRIC_PURPLE)
        .bg(BG_HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

pub fn key_hint() -> Style {
    Style::default().fg(BORDER_GRAY)
}

pub fn key_hint_key() -> Style {
    Style::default().fg(NEON_CYAN).add_modifier(Modifier::BOLD)
}
