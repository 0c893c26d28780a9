//! The map canvas: route, markers, clusters, user marker, crosshair.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{
        Block, BorderType, Borders,
        canvas::{Canvas, Context, Line as CanvasLine, Points},
    },
};

use stationflow_core::map::MarkerMode;

use crate::surface::TuiSurface;
use crate::theme;

/// Dash period in canvas pixels for fallback routes.
const DASH_PX: f64 = 24.0;

pub struct MapProps<'a> {
    pub surface: &'a TuiSurface,
    pub focused: bool,
    pub picking: bool,
}

pub fn render(frame: &mut Frame, area: Rect, props: &MapProps<'_>) {
    let surface = props.surface;
    let title = surface.view().map_or_else(
        || " Map ".to_owned(),
        |v| format!(" Map · {} · z{} ", v.center, v.zoom),
    );
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

    let (x_bounds, y_bounds) = surface.canvas_bounds();
    let picking = props.picking;
    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            draw_route(ctx, surface);
            ctx.layer();
            draw_markers(ctx, surface);
            draw_crosshair(ctx, picking);
        });
    frame.render_widget(canvas, area);
}

fn draw_route(ctx: &mut Context<'_>, surface: &TuiSurface) {
    let Some((points, style)) = surface.route() else {
        return;
    };
    let color = if style.dash.is_some() {
        theme::ROUTE_FALLBACK
    } else {
        theme::ROUTE
    };
    let projected: Vec<(f64, f64)> = points.iter().filter_map(|p| surface.to_canvas(*p)).collect();
    for pair in projected.windows(2) {
        let &[(x1, y1), (x2, y2)] = pair else {
            continue;
        };
        if style.dash.is_none() {
            ctx.draw(&CanvasLine::new(x1, y1, x2, y2, color));
            continue;
        }
        let length = (x2 - x1).hypot(y2 - y1);
        if length <= f64::EPSILON {
            continue;
        }
        let step = DASH_PX / length;
        let mut t = 0.0;
        while t < 1.0 {
            let end = (t + step / 2.0).min(1.0);
            ctx.draw(&CanvasLine::new(
                x1 + (x2 - x1) * t,
                y1 + (y2 - y1) * t,
                x1 + (x2 - x1) * end,
                y1 + (y2 - y1) * end,
                color,
            ));
            t += step;
        }
    }
}

fn draw_markers(ctx: &mut Context<'_>, surface: &TuiSurface) {
    for (id, spec) in surface.loose_markers() {
        let Some((x, y)) = surface.to_canvas(spec.position) else {
            continue;
        };
        let color = theme::hex(spec.visual.color);
        match spec.mode {
            MarkerMode::Detailed => {
                let name = surface.popup(id).map_or_else(|| id.to_string(), |p| p.name.clone());
                ctx.print(
                    x,
                    y,
                    Span::styled(
                        format!("{} {name}", spec.visual.glyph),
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    ),
                );
            }
            MarkerMode::Dot | MarkerMode::Clustered => {
                ctx.draw(&Points {
                    coords: &[(x, y)],
                    color,
                });
            }
        }
    }

    for cluster in surface.clusters() {
        if let Some((x, y)) = surface.to_canvas(cluster.center) {
            ctx.print(
                x,
                y,
                Span::styled(
                    format!("({})", cluster.count),
                    Style::default()
                        .fg(theme::ELECTRIC_PURPLE)
                        .add_modifier(Modifier::BOLD),
                ),
            );
        }
    }

    if let Some(user) = surface.user()
        && let Some((x, y)) = surface.to_canvas(user.position)
    {
        ctx.print(x, y, Span::styled("◉", Style::default().fg(theme::USER)));
    }
}

fn draw_crosshair(ctx: &mut Context<'_>, picking: bool) {
    let (symbol, color) = if picking {
        ("⊕", theme::ELECTRIC_YELLOW)
    } else {
        ("+", theme::BORDER_GRAY)
    };
    ctx.print(0.0, 0.0, Span::styled(symbol, Style::default().fg(color)));
}
