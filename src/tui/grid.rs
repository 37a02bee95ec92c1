use crate::shared::{DisplayState, Mode, TrackRow};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

const HIT: &str = "■ ";
const REST: &str = "· ";

pub fn draw_track_grid(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let focused = state.mode == Mode::Grid;
    let lines: Vec<Line> = state
        .tracks
        .iter()
        .enumerate()
        .map(|(row, track)| {
            let cursor = (focused && row == state.cursor_track).then_some(state.cursor_step);
            track_line(track, cursor)
        })
        .collect();

    let border = if focused { Color::LightMagenta } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(" tracks ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn track_line(track: &TrackRow, cursor: Option<usize>) -> Line<'static> {
    let name_style = if cursor.is_some() {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let flag = |on: bool, label: &'static str, color: Color| {
        if on {
            Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD))
        } else {
            Span::styled(label, Style::default().fg(Color::DarkGray))
        }
    };

    let mut spans = vec![
        Span::styled(if cursor.is_some() { "> " } else { "  " }, name_style),
        Span::styled(format!("{:<8}", track.id), name_style),
        Span::styled(format!("{:<9}", track.sound), Style::default().fg(Color::Cyan)),
        flag(track.in_mix, "● ", Color::Green),
        flag(track.muted, "M ", Color::Red),
        flag(track.solo, "S ", Color::Yellow),
        Span::raw(" "),
    ];

    let step_color = if track.audible && track.in_mix {
        Color::LightMagenta
    } else {
        Color::Magenta
    };
    for (i, &on) in track.steps.iter().enumerate() {
        let mut style = if on {
            Style::default().fg(step_color)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        if i % 4 == 0 && !on {
            style = style.fg(Color::Gray);
        }
        if cursor == Some(i) {
            style = style.bg(Color::White).fg(Color::Black);
        }
        spans.push(Span::styled(if on { HIT } else { REST }, style));
    }
    Line::from(spans)
}
