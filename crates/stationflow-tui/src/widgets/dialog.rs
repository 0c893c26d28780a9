//! Modal prompts and the notice toast.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use stationflow_core::shell::Notice;

use crate::forms::{Field, Prompt, StationForm};
use crate::theme;

use super::centered;

fn frame_block(title: &str) -> Block<'static> {
    Block::default()
        .title(format!(" {title} "))
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme::ELECTRIC_YELLOW))
        .style(Style::default().bg(theme::BG_DARK))
}

fn field_line<'a>(label: &'a str, value: &'a str, active: bool) -> Line<'a> {
    let style = if active {
        Style::default().fg(theme::NEON_CYAN).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme::DIM_WHITE)
    };
    let mut spans = vec![Span::styled(format!("  {label:<10}"), theme::key_hint()), Span::styled(value, style)];
    if active {
        spans.push(Span::styled("█", Style::default().fg(theme::NEON_CYAN)));
    }
    Line::from(spans)
}

fn hints(keys: &[(&'static str, &'static str)]) -> Line<'static> {
    let mut spans = vec![Span::raw("  ")];
    for (key, what) in keys {
        spans.push(Span::styled(format!("{key} "), theme::key_hint_key()));
        spans.push(Span::styled(format!("{what}  "), theme::key_hint()));
    }
    Line::from(spans)
}

/// Report and add-station dialogs. Search lives in the status bar.
pub fn render_prompt(frame: &mut Frame, area: Rect, prompt: &Prompt) {
    match prompt {
        Prompt::Search(_) => {}
        Prompt::Report { station, value } => {
            let dialog = centered(area, 46, 6);
            frame.render_widget(Clear, dialog);
            let lines = vec![
                Line::from(Span::styled(
                    format!("  How many are available at {station}?"),
                    Style::default().fg(theme::DIM_WHITE),
                )),
                Line::from(""),
                field_line("Available", value, true),
                hints(&[("Enter", "send"), ("Esc", "cancel")]),
            ];
            frame.render_widget(Paragraph::new(lines).block(frame_block("Report occupancy")), dialog);
        }
        Prompt::AddStation(form) => render_form(frame, area, form),
    }
}

fn render_form(frame: &mut Frame, area: Rect, form: &StationForm) {
    let dialog = centered(area, 50, 8);
    frame.render_widget(Clear, dialog);
    let transport = format!("◂ {} ▸", form.transport().label());
    let lines = vec![
        field_line("Name", &form.name, form.field == Field::Name),
        field_line("Type", &transport, form.field == Field::Transport),
        field_line("Capacity", &form.capacity, form.field == Field::Capacity),
        Line::from(""),
        hints(&[("Tab", "next"), ("←/→", "type"), ("Enter", "add"), ("Esc", "cancel")]),
    ];
    frame.render_widget(Paragraph::new(lines).block(frame_block("Add station")), dialog);
}

/// Toast above the status bar, bottom right.
pub fn render_notice(frame: &mut Frame, area: Rect, notice: &Notice) {
    let text = notice.text();
    let len = u16::try_from(text.chars().count()).unwrap_or(u16::MAX);
    let width = len.saturating_add(6).clamp(20, area.width.saturating_sub(2).max(20));
    let toast = Rect::new(
        area.x + area.width.saturating_sub(width + 1),
        area.y + area.height.saturating_sub(4),
        width.min(area.width),
        3.min(area.height),
    );

    let (color, icon) = if notice.is_error() {
        (theme::ERROR_RED, "✗")
    } else {
        (theme::SUCCESS_GREEN, "✓")
    };
    frame.render_widget(Clear, toast);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
        .style(Style::default().bg(theme::BG_DARK));
    let line = Line::from(vec![
        Span::styled(format!(" {icon} "), Style::default().fg(color)),
        Span::styled(text, Style::default().fg(theme::DIM_WHITE)),
    ]);
    frame.render_widget(Paragraph::new(line).block(block), toast);
}
