use crate::shared::{DisplayState, MixKind, Mode};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use super::grid::draw_track_grid;

const MODES: [Mode; 4] = [Mode::Grid, Mode::Mix, Mode::Library, Mode::Code];

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let grid_height = state.tracks.len() as u16 + 2;
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),           // mode tabs + transport
            Constraint::Length(grid_height), // track grid
            Constraint::Min(6),              // side panel + program text
            Constraint::Length(3),           // status line
        ])
        .split(area);

    draw_header(frame, sections[0], state);
    draw_track_grid(frame, sections[1], state);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(sections[2]);
    draw_side_panel(frame, bottom[0], state);
    draw_program(frame, bottom[1], state);

    draw_status(frame, sections[3], state);
}

fn focus_block(title: &'static str, focused: bool) -> Block<'static> {
    let color = if focused { Color::LightMagenta } else { Color::DarkGray };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title)
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let mut spans = Vec::new();
    for mode in MODES {
        let style = if mode == state.mode {
            Style::default().fg(Color::Black).bg(Color::LightMagenta).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} ", mode.label()), style));
        spans.push(Span::raw(" "));
    }

    let (play_label, play_color) = if state.playing {
        ("▶ PLAYING", Color::Green)
    } else {
        ("■ STOPPED", Color::Red)
    };
    spans.push(Span::styled(format!("  {play_label}  "), Style::default().fg(play_color)));
    let tempo = if state.bpm_enabled {
        format!("{:.0} bpm ({:.3} cps)", state.bpm, state.cps)
    } else {
        format!("{:.0} bpm (off)", state.bpm)
    };
    spans.push(Span::raw(tempo));

    let block = Block::default().borders(Borders::ALL).title(" stepcode ");
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_side_panel(frame: &mut Frame, area: Rect, state: &DisplayState) {
    match state.mode {
        Mode::Mix => draw_mix(frame, area, state),
        Mode::Library => draw_library(frame, area, state),
        Mode::Grid | Mode::Code => draw_params(frame, area, state),
    }
}

fn checkbox_line(label: String, enabled: bool, selected: bool) -> Line<'static> {
    let mark = if enabled { "[x] " } else { "[ ] " };
    let style = if selected {
        Style::default().fg(Color::Black).bg(Color::White)
    } else if enabled {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Gray)
    };
    Line::from(Span::styled(format!("{mark}{label}"), style))
}

fn draw_mix(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let mut lines: Vec<Line> = state
        .mix_rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let label = match row.kind {
                MixKind::Preset => format!("preset  {}", row.label),
                MixKind::Saved => format!("saved   {}", row.label),
            };
            checkbox_line(label, row.enabled, i == state.mix_cursor)
        })
        .collect();
    lines.push(Line::raw(""));
    lines.extend(param_lines(state));
    frame.render_widget(Paragraph::new(lines).block(focus_block(" mix ", true)), area);
}

fn draw_library(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let mut lines: Vec<Line> = if state.library.is_empty() {
        vec![Line::styled("no saved patterns (n to save)", Style::default().fg(Color::DarkGray))]
    } else {
        state
            .library
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let style = if i == state.library_cursor {
                    Style::default().fg(Color::Black).bg(Color::White)
                } else {
                    Style::default().fg(Color::Gray)
                };
                Line::styled(name.clone(), style)
            })
            .collect()
    };
    if let Some(name) = &state.name_prompt {
        lines.push(Line::raw(""));
        lines.push(Line::styled(format!("name: {name}_"), Style::default().fg(Color::Yellow)));
    }
    frame.render_widget(Paragraph::new(lines).block(focus_block(" library ", true)), area);
}

fn param_lines(state: &DisplayState) -> Vec<Line<'static>> {
    vec![
        Line::raw(format!("lpf {:.0}   lpq {:.2}", state.lpf, state.lpq)),
        Line::raw(format!("room {:.2}   delay {:.2}", state.room, state.delay)),
        Line::raw(format!("visualizer {}", if state.visualizer { "on" } else { "off" })),
    ]
}

fn draw_params(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let mut lines = param_lines(state);
    lines.push(Line::raw(""));
    let history = format!(
        "undo {}   redo {}",
        if state.can_undo { "yes" } else { "-" },
        if state.can_redo { "yes" } else { "-" },
    );
    lines.push(Line::styled(history, Style::default().fg(Color::DarkGray)));
    frame.render_widget(Paragraph::new(lines).block(focus_block(" params ", false)), area);
}

fn draw_program(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let focused = state.mode == Mode::Code;
    let mut text = state.program.clone();
    if focused {
        text.push('▏');
    }
    let body = if state.program.is_empty() && !focused {
        Paragraph::new(Line::styled("(empty program)", Style::default().fg(Color::DarkGray)))
    } else {
        Paragraph::new(text)
    };
    frame.render_widget(
        body.wrap(Wrap { trim: false }).block(focus_block(" program ", focused)),
        area,
    );
}

fn draw_status(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let block = Block::default().borders(Borders::ALL);
    let line = Line::styled(state.status.clone(), Style::default().fg(Color::Yellow));
    frame.render_widget(Paragraph::new(line).block(block), area);
}
