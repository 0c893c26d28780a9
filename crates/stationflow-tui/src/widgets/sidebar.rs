//! Station list beside the map.

use std::sync::Arc;

use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState},
};

use stationflow_core::map::marker::palette;
use stationflow_core::{OccupancyPolicy, Station, StationId, StationStatus};

use crate::theme;

pub struct SidebarProps<'a> {
    pub stations: &'a [Arc<Station>],
    pub highlighted: usize,
    pub selected: Option<&'a StationId>,
    pub policy: &'a OccupancyPolicy,
    pub filter: &'a str,
    pub search: &'a str,
    pub focused: bool,
}

fn item<'a>(station: &'a Station, selected: bool, policy: &OccupancyPolicy) -> ListItem<'a> {
    let (color, _) = palette(station.transport);
    let reading = policy.read(station);
    let dot = if station.status == StationStatus::Maintenance {
        Span::styled("◌ ", Style::default().fg(theme::BORDER_GRAY))
    } else {
        Span::styled("● ", Style::default().fg(theme::hex(color)))
    };
    let marker = if selected { "▸ " } else { "  " };
    ListItem::new(Line::from(vec![
        Span::styled(marker, theme::key_hint_key()),
        dot,
        Span::styled(station.name.as_str(), theme::list_row()),
        Span::raw("  "),
        Span::styled(
            format!("{}/{}", station.available, station.capacity),
            Style::default().fg(theme::level_color(reading.level)),
        ),
    ]))
}

pub fn render(frame: &mut Frame, area: Rect, props: &SidebarProps<'_>) {
    let mut title = format!(" Stations · {} ", props.filter);
    if !props.search.is_empty() {
        title = format!(" Stations · {} · \"{}\" ", props.filter, props.search);
    }
    let block = Block::default()
        .title(title)
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(if props.focused {
            theme::border_focused()
        } else {
            theme::border_default()
        });

    let items: Vec<ListItem<'_>> = props
        .stations
        .iter()
        .map(|s| item(s, props.selected == Some(&s.id), props.policy))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(if props.focused {
            theme::list_highlight()
        } else {
            Style::default()
        });

    let mut state = ListState::default().with_selected((!props.stations.is_empty()).then_some(props.highlighted));
    frame.render_stateful_widget(list, area, &mut state);
}
