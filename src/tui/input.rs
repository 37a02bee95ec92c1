use std::time::Duration;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crate::shared::{InputEvent, Mode};
use super::mode::TuiState;

// poll for input from tui, resolves keys to semantic input events based on
// the current mode so the middle layer never sees raw keys
pub fn poll_input(timeout: Duration, ts: &TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key, ts));
    }
    Ok(vec![])
}

pub fn handle_key(key: KeyEvent, ts: &TuiState) -> Vec<InputEvent> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => vec![InputEvent::Quit],
            KeyCode::Char('p') => vec![InputEvent::PlayPress],
            KeyCode::Char('z') => vec![InputEvent::Undo],
            KeyCode::Char('y') => vec![InputEvent::Redo],
            _ => vec![],
        };
    }

    match key.code {
        KeyCode::Esc if ts.naming => return vec![InputEvent::CancelName],
        KeyCode::Esc => return vec![InputEvent::Quit],
        KeyCode::Tab => return vec![InputEvent::NextMode],
        _ => {}
    }

    if ts.naming {
        return resolve_name(key.code);
    }
    match ts.mode {
        Mode::Grid => resolve_grid(key.code),
        Mode::Mix => resolve_mix(key.code),
        Mode::Library => resolve_library(key.code),
        Mode::Code => resolve_code(key.code),
    }
}

fn arrows(code: KeyCode) -> Option<InputEvent> {
    match code {
        KeyCode::Up => Some(InputEvent::CursorUp),
        KeyCode::Down => Some(InputEvent::CursorDown),
        KeyCode::Left => Some(InputEvent::CursorLeft),
        KeyCode::Right => Some(InputEvent::CursorRight),
        _ => None,
    }
}

fn resolve_grid(code: KeyCode) -> Vec<InputEvent> {
    if let Some(ev) = arrows(code) {
        return vec![ev];
    }
    let ev = match code {
        KeyCode::Char('k') => InputEvent::CursorUp,
        KeyCode::Char('j') => InputEvent::CursorDown,
        KeyCode::Char('h') => InputEvent::CursorLeft,
        KeyCode::Char('l') => InputEvent::CursorRight,
        KeyCode::Char(' ') | KeyCode::Enter => InputEvent::ToggleStep,
        KeyCode::Char('a') => InputEvent::AddTrack,
        KeyCode::Char('D') => InputEvent::RemoveTrack,
        KeyCode::Char('0') => InputEvent::ClearTrack,
        KeyCode::Char('m') => InputEvent::ToggleMute,
        KeyCode::Char('s') => InputEvent::ToggleSolo,
        KeyCode::Char('[') => InputEvent::CycleSound(false),
        KeyCode::Char(']') => InputEvent::CycleSound(true),
        KeyCode::Char('n') => InputEvent::CycleStepCount,
        KeyCode::Char('r') => InputEvent::Randomize,
        KeyCode::Char('e') => InputEvent::ToggleTrackInMix,
        KeyCode::Char('g') => InputEvent::Regenerate,
        KeyCode::Char('p') => InputEvent::PlayPress,
        KeyCode::Char('u') => InputEvent::Undo,
        KeyCode::Char('U') => InputEvent::Redo,
        _ => return vec![],
    };
    vec![ev]
}

// lowercase = down, shifted = up
fn resolve_mix(code: KeyCode) -> Vec<InputEvent> {
    if let Some(ev) = arrows(code) {
        return vec![ev];
    }
    let ev = match code {
        KeyCode::Char(' ') | KeyCode::Enter => InputEvent::ToggleMixEntry,
        KeyCode::Char('-') => InputEvent::AdjustBpm(-1.0),
        KeyCode::Char('=') => InputEvent::AdjustBpm(1.0),
        KeyCode::Char('_') => InputEvent::AdjustBpm(-10.0),
        KeyCode::Char('+') => InputEvent::AdjustBpm(10.0),
        KeyCode::Char('b') => InputEvent::ToggleBpmEnabled,
        KeyCode::Char('f') => InputEvent::AdjustLpf(0.8),
        KeyCode::Char('F') => InputEvent::AdjustLpf(1.25),
        KeyCode::Char('q') => InputEvent::AdjustLpq(-0.5),
        KeyCode::Char('Q') => InputEvent::AdjustLpq(0.5),
        KeyCode::Char('o') => InputEvent::AdjustRoom(-0.05),
        KeyCode::Char('O') => InputEvent::AdjustRoom(0.05),
        KeyCode::Char('y') => InputEvent::AdjustDelay(-0.05),
        KeyCode::Char('Y') => InputEvent::AdjustDelay(0.05),
        KeyCode::Char('v') => InputEvent::ToggleVisualizer,
        KeyCode::Char('p') => InputEvent::PlayPress,
        KeyCode::Char('u') => InputEvent::Undo,
        KeyCode::Char('U') => InputEvent::Redo,
        _ => return vec![],
    };
    vec![ev]
}

fn resolve_library(code: KeyCode) -> Vec<InputEvent> {
    let ev = match code {
        KeyCode::Up | KeyCode::Char('k') => InputEvent::CursorUp,
        KeyCode::Down | KeyCode::Char('j') => InputEvent::CursorDown,
        KeyCode::Char('n') => InputEvent::BeginSaveName,
        KeyCode::Char('l') | KeyCode::Enter => InputEvent::LoadSaved,
        KeyCode::Char('d') => InputEvent::DeleteSaved,
        KeyCode::Char('x') => InputEvent::ExportLibrary,
        KeyCode::Char('i') => InputEvent::ImportLibrary,
        KeyCode::Char('p') => InputEvent::PlayPress,
        KeyCode::Char('u') => InputEvent::Undo,
        KeyCode::Char('U') => InputEvent::Redo,
        _ => return vec![],
    };
    vec![ev]
}

fn resolve_name(code: KeyCode) -> Vec<InputEvent> {
    match code {
        KeyCode::Enter => vec![InputEvent::ConfirmName],
        KeyCode::Backspace => vec![InputEvent::NameBackspace],
        KeyCode::Char(c) => vec![InputEvent::NameChar(c)],
        _ => vec![],
    }
}

fn resolve_code(code: KeyCode) -> Vec<InputEvent> {
    match code {
        KeyCode::Enter => vec![InputEvent::Newline],
        KeyCode::Backspace => vec![InputEvent::Backspace],
        KeyCode::Char(c) => vec![InputEvent::InsertChar(c)],
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state(mode: Mode) -> TuiState {
        TuiState {
            mode,
            ..TuiState::default()
        }
    }

    #[test]
    fn same_key_means_different_things_per_mode() {
        let k = key(KeyCode::Char('n'));
        assert_eq!(handle_key(k, &state(Mode::Grid)), vec![InputEvent::CycleStepCount]);
        assert_eq!(handle_key(k, &state(Mode::Library)), vec![InputEvent::BeginSaveName]);
        assert_eq!(handle_key(k, &state(Mode::Code)), vec![InputEvent::InsertChar('n')]);
    }

    #[test]
    fn escape_cancels_prompt_before_quitting() {
        let mut ts = state(Mode::Library);
        ts.naming = true;
        assert_eq!(handle_key(key(KeyCode::Esc), &ts), vec![InputEvent::CancelName]);
        assert_eq!(handle_key(key(KeyCode::Char('d')), &ts), vec![InputEvent::NameChar('d')]);
        ts.naming = false;
        assert_eq!(handle_key(key(KeyCode::Esc), &ts), vec![InputEvent::Quit]);
    }

    #[test]
    fn control_keys_work_in_code_mode() {
        let ts = state(Mode::Code);
        let undo = KeyEvent::new(KeyCode::Char('z'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(undo, &ts), vec![InputEvent::Undo]);
        assert_eq!(handle_key(key(KeyCode::Tab), &ts), vec![InputEvent::NextMode]);
    }
}
