//! Bottom status line: push liveness, counts, session, key hints.

use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};

use stationflow_core::PushStatus;

use crate::theme;

pub struct StatusProps<'a> {
    pub push: Option<PushStatus>,
    pub shown: usize,
    pub total: usize,
    pub on_map: usize,
    pub user: Option<&'a str>,
    pub pending_requests: Option<usize>,
    pub picking: bool,
    /// The live search line, while typing.
    pub search: Option<&'a str>,
}

pub fn render(frame: &mut Frame, area: Rect, props: &StatusProps<'_>) {
    if let Some(query) = props.search {
        let line = Line::from(vec![
            Span::styled(" / ", Style::default().fg(theme::ELECTRIC_PURPLE)),
            Span::styled(query, Style::default().fg(theme::NEON_CYAN)),
            Span::styled("█", Style::default().fg(theme::NEON_CYAN)),
            Span::styled("  Esc clear  Enter keep", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let (indicator, color) = theme::push_indicator(props.push);
    let mut spans = vec![
        Span::raw(" "),
        Span::styled(indicator, Style::default().fg(color)),
        Span::styled(
            format!(" │ {}/{} stations, {} on map", props.shown, props.total, props.on_map),
            Style::default().fg(theme::DIM_WHITE),
        ),
    ];
    if let Some(user) = props.user {
        spans.push(Span::styled(format!(" │ {user}"), Style::default().fg(theme::NEON_CYAN)));
    }
    if let Some(pending) = props.pending_requests.filter(|n| *n > 0) {
        spans.push(Span::styled(
            format!(" ({pending} pending)"),
            Style::default().fg(theme::ELECTRIC_YELLOW),
        ));
    }
    if props.picking {
        spans.push(Span::styled(
            " │ move the crosshair, Enter to place, Esc to cancel",
            Style::default().fg(theme::ELECTRIC_YELLOW),
        ));
    } else {
        spans.push(Span::styled(
            " │ Tab list  Enter select  f filter  / search  p add  q quit",
            theme::key_hint(),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
