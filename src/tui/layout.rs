//! TUI layout and widget rendering.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Circle, Context, Line as Segment, Points, Rectangle};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::runtime::App;
use super::style;
use crate::data::Position;
use crate::layers::aggregate::BinShape;
use crate::layers::styling::METRES_PER_DEGREE;
use crate::layers::{self, LayerId};
use crate::scene::{Glyph, Shape};

/// Width of the layer and legend panel.
const SIDE_PANEL_WIDTH: u16 = 36;
/// Entries listed for the column layer.
const LIST_LIMIT: usize = 6;

struct Areas {
    header: Rect,
    map: Rect,
    side: Rect,
    status: Rect,
    footer: Rect,
}

fn split(area: Rect) -> Areas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(8),    // map + side panel
            Constraint::Length(6), // status panel
            Constraint::Length(1), // footer
        ])
        .split(area);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(SIDE_PANEL_WIDTH)])
        .split(rows[1]);
    Areas {
        header: rows[0],
        map: body[0],
        side: body[1],
        status: rows[2],
        footer: rows[3],
    }
}

/// Width / height of the map canvas inside a terminal of `area`.
///
/// Terminal cells are about twice as tall as they are wide.
pub fn map_aspect(area: Rect) -> f64 {
    let map = split(area).map;
    let w = f64::from(map.width.saturating_sub(2));
    let h = f64::from(map.height.saturating_sub(2));
    if h > 0.0 { w / (2.0 * h) } else { 2.0 }
}

/// Renders the full TUI frame.
pub fn render(frame: &mut Frame, app: &App) {
    let areas = split(frame.area());
    render_header(frame, app, areas.header);
    render_map(frame, app, areas.map);
    render_side_panel(frame, app, areas.side);
    render_status(frame, app, areas.status);
    render_footer(frame, areas.footer);
}

/// Header bar: title, timestep, clock, speed, run state.
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let (state_icon, state_label, state_color) = if app.playback.is_animating() {
        ("▶", "PLAYING", style::PLAYING)
    } else {
        ("‖", "PAUSED", style::HEADER_FG)
    };

    let header = Line::from(vec![
        Span::styled(
            " GRIDVIZ ",
            Style::default()
                .fg(style::HEADER_FG)
                .bg(style::HEADER_BG)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            &app.dashboard().config().dashboard.title,
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " │ t={}/{} │ {} │ {}x │ ",
            app.playback.timestep(),
            app.playback.horizon(),
            app.clock_label(),
            app.playback.speed(),
        )),
        Span::styled(
            format!("{state_icon} {state_label}"),
            Style::default().fg(state_color),
        ),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

/// Map canvas: every placeable glyph, bottom layer first.
fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let (lon, lat) = app.viewport.bounds(app.map_aspect);
    let kind = app.layers.kind();
    let title = format!(
        " Map  {:.4},{:.4}  z{:.1} ",
        app.viewport.latitude, app.viewport.longitude, app.viewport.zoom
    );

    let canvas = Canvas::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .marker(symbols::Marker::Braille)
        .x_bounds(lon)
        .y_bounds(lat)
        .paint(|ctx| {
            let mut current: Option<LayerId> = None;
            for g in &app.scene.glyphs {
                if current.is_some_and(|l| l != g.layer) {
                    ctx.layer();
                }
                current = Some(g.layer);
                let opacity = layers::spec_for(kind, g.layer).map_or(1.0, |s| s.opacity);
                paint_glyph(ctx, g, style::layer_color(g.color, opacity));
            }
            if let Some(at) = app.inspected_glyph().and_then(Glyph::anchor) {
                ctx.layer();
                ctx.print(
                    at.0,
                    at.1,
                    Span::styled("◎", Style::default().fg(style::INSPECT).add_modifier(Modifier::BOLD)),
                );
            }
        });
    frame.render_widget(canvas, area);
}

fn paint_glyph(ctx: &mut Context<'_>, g: &Glyph, color: ratatui::style::Color) {
    match &g.shape {
        Shape::Circle { at, radius_m } => {
            let radius = radius_m / METRES_PER_DEGREE;
            ctx.draw(&Points {
                coords: &[*at],
                color,
            });
            if radius > 0.0 {
                ctx.draw(&Circle {
                    x: at.0,
                    y: at.1,
                    radius,
                    color,
                });
            }
        }
        Shape::Path(points) => paint_segments(ctx, points.windows(2).map(|w| (w[0], w[1])), color),
        Shape::Ring(points) => {
            let closing = match (points.first(), points.last()) {
                (Some(first), Some(last)) if first != last => Some((*last, *first)),
                _ => None,
            };
            paint_segments(ctx, points.windows(2).map(|w| (w[0], w[1])).chain(closing), color);
        }
        Shape::Icon { at, symbol, .. } => {
            ctx.print(
                at.0,
                at.1,
                Span::styled(symbol.to_string(), Style::default().fg(color)),
            );
        }
        Shape::Column { at, radius_m, .. } => ctx.draw(&Circle {
            x: at.0,
            y: at.1,
            radius: radius_m / METRES_PER_DEGREE,
            color,
        }),
        Shape::Bin { center, shape, .. } => match *shape {
            BinShape::Square { size } => ctx.draw(&Rectangle {
                x: center.0 - size / 2.0,
                y: center.1 - size / 2.0,
                width: size,
                height: size,
                color,
            }),
            BinShape::Hex { radius } => {
                let corner = |k: u8| {
                    let a = (60.0 * f64::from(k) + 30.0).to_radians();
                    (center.0 + radius * a.cos(), center.1 + radius * a.sin())
                };
                for k in 0..6 {
                    let (p, q) = (corner(k), corner((k + 1) % 6));
                    ctx.draw(&Segment {
                        x1: p.0,
                        y1: p.1,
                        x2: q.0,
                        y2: q.1,
                        color,
                    });
                }
            }
        },
        // Undecoded cell tokens have nowhere to go.
        Shape::Cell { .. } => {}
    }
}

fn paint_segments(
    ctx: &mut Context<'_>,
    segments: impl Iterator<Item = (Position, Position)>,
    color: ratatui::style::Color,
) {
    for (p, q) in segments {
        ctx.draw(&Segment {
            x1: p.0,
            y1: p.1,
            x2: q.0,
            y2: q.1,
            color,
        });
    }
}

/// Layer toggles, per-layer value ranges, and the heaviest columns.
fn render_side_panel(frame: &mut Frame, app: &App, area: Rect) {
    let kind = app.layers.kind();
    let mut lines = Vec::new();

    for spec in layers::catalog(kind) {
        let on = app.layers.is_visible(spec.id);
        let (mark, color) = if on {
            ("[x]", style::LAYER_ON)
        } else {
            ("[ ]", style::LAYER_OFF)
        };
        lines.push(Line::from(Span::styled(
            format!(" {mark} {} {}", spec.hotkey, spec.label),
            Style::default().fg(color),
        )));
    }

    let mut ranges = Vec::new();
    for id in app.layers.visible_in_draw_order() {
        if let Some(stats) = app.scene.stats(id) {
            let label = layers::spec_for(kind, id).map_or(id.key(), |s| s.label);
            ranges.push(Line::from(format!(
                " {label:<12} {:>8.3}..{:<8.3}",
                stats.min, stats.max
            )));
        }
    }
    if !ranges.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            " Values",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.extend(ranges);
    }

    let mut columns: Vec<&Glyph> = app.scene.layer(LayerId::Columns).collect();
    if !columns.is_empty() {
        let total = columns.len();
        columns.sort_by(|a, b| b.value.unwrap_or(0.0).total_cmp(&a.value.unwrap_or(0.0)));
        let label = layers::spec_for(kind, LayerId::Columns).map_or("Columns", |s| s.label);
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {label} ({total})"),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for g in columns.into_iter().take(LIST_LIMIT) {
            let value = g.value.map(|v| format!("{v:.2}")).unwrap_or_default();
            lines.push(Line::from(vec![
                Span::styled(" ██ ", Style::default().fg(style::to_color(g.color))),
                Span::raw(format!(
                    "{:<18} {value}",
                    g.entity.as_deref().unwrap_or("?")
                )),
            ]));
        }
    }

    let block = Block::default().title(" Layers ").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Status panel: metric summary, lookup misses, inspected glyph, last message.
fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let misses = app.scene.misses.len();
    let miss_style = if misses > 0 {
        Style::default().fg(style::MISS_WARN)
    } else {
        Style::default().fg(style::FOOTER_FG)
    };
    let lines = vec![
        Line::from(format!("  {}", app.headline())),
        Line::from(vec![
            Span::raw(format!("  glyphs={}  ", app.scene.glyphs.len())),
            Span::styled(format!("lookup misses={misses}"), miss_style),
        ]),
        match app.inspect_text() {
            Some(text) => Line::from(vec![
                Span::styled("  inspect: ", Style::default().fg(style::INSPECT)),
                Span::raw(text),
            ]),
            None => Line::from(Span::styled(
                "  Tab: inspect a glyph",
                Style::default().fg(style::FOOTER_FG),
            )),
        },
        Line::from(format!("  {}", app.message.as_deref().unwrap_or(""))),
    ];
    let block = Block::default().title(" Status ").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Footer with keybinding hints.
fn render_footer(frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new(Line::from(Span::styled(
        " q:Quit  Space:Play  ←/→:Step  ↑/↓:Speed  r:Reset  [/]:Zoom  WASD:Pan  f:Fit  Tab:Inspect  letters:Layers",
        Style::default().fg(style::FOOTER_FG),
    )));
    frame.render_widget(footer, area);
}
