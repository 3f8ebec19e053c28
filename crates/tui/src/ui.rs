use std::borrow::Cow;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use altar_core::engine::RunOutcome;
use altar_core::platform::hotkey;
use altar_core::types;

use crate::App;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = if app.log_visible {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(f.area())
    } else {
        Layout::default()
            .constraints([Constraint::Percentage(100)])
            .split(f.area())
    };

    let status = app.status();
    let (banner_label, banner_bg) = if app.is_running() && status.running {
        ("RUNNING (Press S to stop)", Color::Green)
    } else if app.is_running() {
        ("STARTING...", Color::Yellow)
    } else {
        ("STOPPED (Press S to start)", Color::Red)
    };

    let mut lines: Vec<Line> = vec![
        Line::from(vec![
            Span::raw(" "),
            key("s"),
            Span::raw(" start/stop, "),
            key("l"),
            Span::raw(" logs, "),
            key("q"),
            Span::raw(" quit, stop hotkey: "),
            key(hotkey::hotkey_label()),
        ]),
        Line::from(""),
        Line::from(vec![
            label(" Confirmed  "),
            Span::styled(
                status.success_count.to_string(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![label(" Rate       "), Span::raw(format!("{:.1}/min", status.rate_per_min))]),
        Line::from(vec![
            label(" Elapsed    "),
            Span::raw(format!("{:.1}s", status.elapsed.as_secs_f64())),
        ]),
    ];

    if let Some(summary) = &app.last_summary {
        let color = match summary.outcome {
            RunOutcome::Stopped => Color::Cyan,
            _ => Color::Red,
        };
        lines.push(Line::from(vec![
            label(" Last run   "),
            Span::styled(summary.to_string(), Style::default().fg(color)),
        ]));
    }
    lines.push(Line::from(""));

    match &app.config {
        Ok(config) => {
            for (i, slot) in config.slots.iter().enumerate() {
                lines.push(Line::from(vec![
                    Span::styled(format!(" slot {:<3}", i + 1), Style::default().fg(Color::White)),
                    Span::raw(format!("{:<12}", slot.coord.to_string())),
                    swatch(slot.color),
                    label(format!(" {}", slot.color)),
                ]));
            }
            lines.push(Line::from(vec![
                Span::styled(" drop     ", Style::default().fg(Color::White)),
                Span::raw(config.drop_zone.0.to_string()),
            ]));
            lines.push(Line::from(vec![
                Span::styled(" confirm  ", Style::default().fg(Color::White)),
                Span::raw(format!("{:<12}", config.confirm.coord.to_string())),
                swatch(config.confirm.color),
                Span::styled(format!(" {}", config.confirm.color), Style::default().fg(Color::DarkGray)),
            ]));
            lines.push(Line::from(""));
            let d = &config.delays;
            lines.push(Line::from(label(format!(
                " tolerance {}  delays {}/{}/{}/{}/{}s  jitter {:.0}%",
                config.tolerance,
                d.before_check,
                d.after_press,
                d.drag_duration,
                d.after_drag,
                d.after_click,
                d.jitter * 100.0
            ))));
        }
        Err(e) => {
            lines.push(Line::from(Span::styled(
                format!(" profile not usable: {}", e),
                Style::default().fg(Color::Red),
            )));
        }
    }

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(chunks[0]);

    let banner_width = left[0].width as usize;
    let pad_total = banner_width.saturating_sub(banner_label.len());
    let pad_left = pad_total / 2;
    let centered = format!(
        "{}{}{}",
        " ".repeat(pad_left),
        banner_label,
        " ".repeat(pad_total - pad_left)
    );
    let banner = Paragraph::new(Line::from(Span::styled(
        centered,
        Style::default().fg(Color::Black).bg(banner_bg).add_modifier(Modifier::BOLD),
    )));
    f.render_widget(banner, left[0]);

    let body = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(body, left[1]);

    if app.log_visible && chunks.len() > 1 {
        let visible_height = chunks[1].height.saturating_sub(2) as usize;
        let total = app.log_messages.len();
        let scroll = app.log_scroll.min(total.saturating_sub(visible_height));
        let start = total.saturating_sub(visible_height + scroll);
        let end = total.saturating_sub(scroll);
        let log_lines: Vec<Line> = app
            .log_messages
            .range(start..end)
            .map(|m| parse_log_line(m))
            .collect();

        let log_panel = Paragraph::new(log_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Logs ")
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(log_panel, chunks[1]);
    }

    if let Some(dialog) = &app.confirm {
        dialog.render(f);
    }
}

fn key(s: &'static str) -> Span<'static> {
    Span::styled(s, Style::default().fg(Color::Yellow))
}

fn label<'a>(s: impl Into<Cow<'a, str>>) -> Span<'a> {
    Span::styled(s, Style::default().fg(Color::DarkGray))
}

fn swatch(c: types::Color) -> Span<'static> {
    Span::styled("  ", Style::default().bg(Color::Rgb(c.r, c.g, c.b)))
}

/// Parse a structured log line (level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage)
/// into a colored Line.
fn parse_log_line(raw: &str) -> Line<'_> {
    let parts: Vec<&str> = raw.splitn(5, '\x1f').collect();
    if parts.len() < 5 {
        return Line::from(raw);
    }

    let (level, prefix, timestamp, message) = (parts[0], parts[1], parts[3], parts[4]);
    let color = match parts[2].parse::<u8>().unwrap_or(0) {
        1 => Color::DarkGray,
        2 => Color::LightBlue,
        3 => Color::LightGreen,
        _ => Color::White,
    };

    let mut spans = vec![
        Span::styled(timestamp, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
    ];
    match level {
        "ERROR" => spans.push(Span::styled("error ", Style::default().fg(Color::Red))),
        "WARN" => spans.push(Span::styled("warn ", Style::default().fg(Color::Yellow))),
        "DEBUG" => spans.push(Span::styled("debug ", Style::default().fg(Color::DarkGray))),
        _ => {}
    }
    if !prefix.is_empty() {
        spans.push(Span::styled(prefix, Style::default().fg(color).add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(message, Style::default().fg(color)));
    Line::from(spans)
}
