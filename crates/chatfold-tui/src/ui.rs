//! Ratatui drawing for the folded chat feed.

use std::time::Instant;

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::app::{App, Row};

pub fn draw(frame: &mut Frame<'_>, app: &App, now: Instant) {
    frame.render_widget(Clear, frame.area());

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, layout[0], app);
    draw_feed(frame, layout[1], app, now);
    draw_footer(frame, layout[2]);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            "chatfold",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" | {}", header_status(app.folded_total))),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(title, area);
}

fn draw_feed(frame: &mut Frame<'_>, area: Rect, app: &App, now: Instant) {
    let inner_height = area.height.saturating_sub(2) as usize;
    let rows: Vec<&Row> = app.visible_rows().collect();
    let skip = rows.len().saturating_sub(inner_height);

    // Numbered activation slots count from the newest visible badge.
    let badge_order: Vec<_> = app
        .selectable_badges()
        .iter()
        .map(|badge| badge.handle)
        .collect();

    let mut lines = Vec::new();
    for row in rows.into_iter().skip(skip) {
        lines.push(render_row(row, &badge_order, now));
    }

    let block = Block::default().title("Messages").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}

fn render_row(
    row: &Row,
    badge_order: &[chatfold_core::BadgeHandle],
    now: Instant,
) -> Line<'static> {
    let mut spans = Vec::new();

    if let Some(view) = row.view.as_ref() {
        if let Some(received) = view.received_at() {
            spans.push(Span::styled(
                format!("[{}] ", received.format("%H:%M:%S")),
                Style::default().fg(Color::DarkGray),
            ));
        }
        if let Some(author) = view.author.as_deref() {
            spans.push(Span::styled(
                format!("{author}: "),
                Style::default().fg(Color::Cyan),
            ));
        }
        spans.push(Span::raw(view.text.clone()));
    }

    if let Some(badge) = row.badge.as_ref() {
        if badge.visible {
            let style = if badge.pulsing(now) {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            };
            spans.push(Span::raw(" "));
            spans.push(Span::styled(format!("x{}", badge.count), style));
            if let Some(slot) = badge_order.iter().position(|h| *h == badge.handle) {
                spans.push(Span::styled(
                    format!(" ({})", slot + 1),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
    }

    Line::from(spans)
}

fn header_status(folded_total: u64) -> String {
    format!("live feed, {folded_total} duplicates folded")
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect) {
    let footer = Paragraph::new(Text::from(Line::from(vec![
        Span::styled("1-9", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" = reset a counter  "),
        Span::styled("Q", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" = quit"),
    ])))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, area);
}
