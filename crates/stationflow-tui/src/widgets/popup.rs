//! Popup overlay for the open station.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use stationflow_core::OccupancyLevel;
use stationflow_core::map::PopupContent;

use crate::theme;

const WIDTH: u16 = 38;
const HEIGHT: u16 = 9;

/// Drawn in the top-right corner of `map_area`.
pub fn render(frame: &mut Frame, map_area: Rect, content: &PopupContent, level: Option<OccupancyLevel>) {
    let width = WIDTH.min(map_area.width.saturating_sub(2));
    let height = HEIGHT.min(map_area.height.saturating_sub(2));
    let area = Rect::new(
        map_area.x + map_area.width.saturating_sub(width + 1),
        map_area.y + 1,
        width,
        height,
    );

    frame.render_widget(Clear, area);
    let block = Block::default()
        .title(format!(" {} ", content.name))
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_focused())
        .style(Style::default().bg(theme::BG_DARK));

    let label = |text: &'static str| Span::styled(text, theme::key_hint());
    let occupancy_color = level.map_or(theme::DIM_WHITE, theme::level_color);
    let lines = vec![
        Line::from(vec![label("Type       "), Span::raw(content.transport.label())]),
        Line::from(vec![
            label("Available  "),
            Span::raw(format!(
                "{}/{} {}",
                content.available, content.capacity, content.availability_unit
            )),
        ]),
        Line::from(vec![
            label("Occupancy  "),
            Span::styled(
                content.occupancy_label.as_str(),
                Style::default().fg(occupancy_color).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![label("Status     "), Span::raw(content.status_label)]),
        Line::from(""),
        Line::from(vec![
            Span::styled("r ", theme::key_hint_key()),
            label(content.route_label()),
            Span::raw("  "),
            Span::styled("R ", theme::key_hint_key()),
            label("report  "),
            Span::styled("Esc ", theme::key_hint_key()),
            label("close"),
        ]),
    ];
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
