// Sits between the TUI and the engine. The TUI sends semantic events in and
// reads a DisplayState out; this layer owns the cursors, the play state and
// decides what the evaluator should be told.

use std::path::PathBuf;

use tracing::warn;

use stepcode::engine::{
    Engine, EngineError, PRESETS, SoundId, StepCount,
    mix::{LPF_OPEN, MAX_BPM, MIN_BPM},
};
use stepcode::evaluator::{EvalCommand, EvalError, EvalOutcome, EvalReport};
use stepcode::pipeline::persistence;

use crate::shared::{DisplayState, InputEvent, MixKind, MixRow, Mode, TrackRow};

pub struct Middle {
    pub engine: Engine,
    project_dir: PathBuf,
    mode: Mode,
    cursor_track: usize,
    cursor_step: usize,
    mix_cursor: usize,
    library_cursor: usize,
    name_prompt: Option<String>,
    playing: bool,
    status: String,
}

// Two decimals is plenty for knob-style values.
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl Middle {
    pub fn new(engine: Engine, project_dir: PathBuf) -> Self {
        Self {
            engine,
            project_dir,
            mode: Mode::Grid,
            cursor_track: 0,
            cursor_step: 0,
            mix_cursor: 0,
            library_cursor: 0,
            name_prompt: None,
            playing: false,
            status: String::from("ready"),
        }
    }

    pub fn display_state(&self) -> DisplayState {
        let tracks = self.engine.tracks();
        let mix = self.engine.mix();
        let params = self.engine.params();
        DisplayState {
            mode: self.mode,
            tracks: tracks
                .tracks()
                .iter()
                .map(|t| TrackRow {
                    id: t.id().to_string(),
                    sound: t.config().sound.to_string(),
                    muted: t.config().muted,
                    solo: t.config().solo,
                    audible: tracks.is_audible(t),
                    in_mix: mix.track_enabled(t.id()),
                    steps: t.steps().to_vec(),
                })
                .collect(),
            cursor_track: self.cursor_track,
            cursor_step: self.cursor_step,
            mix_rows: self.mix_rows(),
            mix_cursor: self.mix_cursor,
            library: self.library_names(),
            library_cursor: self.library_cursor,
            program: self.engine.editor_text().to_string(),
            bpm: params.bpm,
            bpm_enabled: params.bpm_enabled,
            cps: params.cps(),
            lpf: params.lpf,
            lpq: params.lpq,
            room: params.room,
            delay: params.delay,
            visualizer: params.visualizer,
            playing: self.playing,
            can_undo: self.engine.can_undo(),
            can_redo: self.engine.can_redo(),
            status: self.status.clone(),
            name_prompt: self.name_prompt.clone(),
        }
    }

    fn mix_rows(&self) -> Vec<MixRow> {
        let mix = self.engine.mix();
        let presets = PRESETS.iter().map(|p| MixRow {
            kind: MixKind::Preset,
            key: p.key.to_string(),
            label: p.label.to_string(),
            enabled: mix.preset_enabled(p.key),
        });
        let saved = self.engine.library().names().map(|name| MixRow {
            kind: MixKind::Saved,
            key: name.to_string(),
            label: name.to_string(),
            enabled: mix.saved_enabled(name),
        });
        presets.chain(saved).collect()
    }

    fn library_names(&self) -> Vec<String> {
        self.engine.library().names().map(str::to_string).collect()
    }

    fn selected_track_id(&self) -> String {
        let tracks = self.engine.tracks().tracks();
        tracks[self.cursor_track.min(tracks.len() - 1)].id().to_string()
    }

    fn selected_saved(&self) -> Option<String> {
        self.library_names().into_iter().nth(self.library_cursor)
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Vec<EvalCommand> {
        let program_before = self.engine.editor_text().to_string();
        let cps_before = self.engine.params().cps();

        let result = match event {
            InputEvent::Quit => Ok(()),
            InputEvent::NextMode => {
                self.mode = self.mode.next();
                self.name_prompt = None;
                Ok(())
            }
            InputEvent::PlayPress => return self.toggle_play(),
            InputEvent::Undo => self.engine.undo(),
            InputEvent::Redo => self.engine.redo(),

            InputEvent::CursorUp => {
                self.move_cursor(-1, 0);
                Ok(())
            }
            InputEvent::CursorDown => {
                self.move_cursor(1, 0);
                Ok(())
            }
            InputEvent::CursorLeft => {
                self.move_cursor(0, -1);
                Ok(())
            }
            InputEvent::CursorRight => {
                self.move_cursor(0, 1);
                Ok(())
            }

            InputEvent::ToggleStep => {
                let id = self.selected_track_id();
                self.engine.toggle_step(&id, self.cursor_step)
            }
            InputEvent::AddTrack => self.engine.add_track().map(|id| {
                self.cursor_track = self.engine.tracks().index_of(&id).unwrap_or(0);
                self.status = format!("added {id}");
            }),
            InputEvent::RemoveTrack => {
                let id = self.selected_track_id();
                self.engine.remove_track(&id)
            }
            InputEvent::ClearTrack => {
                let id = self.selected_track_id();
                self.engine.clear_track(&id)
            }
            InputEvent::ToggleMute => {
                let id = self.selected_track_id();
                let muted = self.track_flag(&id, |c| c.muted);
                self.engine.set_muted(&id, !muted)
            }
            InputEvent::ToggleSolo => {
                let id = self.selected_track_id();
                let solo = self.track_flag(&id, |c| c.solo);
                self.engine.set_solo(&id, !solo)
            }
            InputEvent::CycleSound(forward) => {
                let id = self.selected_track_id();
                let next = self.track_sound(&id).cycle(forward);
                self.engine.set_sound(&id, next)
            }
            InputEvent::CycleStepCount => {
                let id = self.selected_track_id();
                let next = self.track_step_count(&id).next();
                self.engine.set_step_count(&id, next.into())
            }
            InputEvent::Randomize => {
                let id = self.selected_track_id();
                let p = self.engine.config().randomize_probability;
                self.engine.randomize(&id, p, &mut rand::rng())
            }
            InputEvent::ToggleTrackInMix => {
                let id = self.selected_track_id();
                let on = self.engine.mix().track_enabled(&id);
                self.engine.set_track_enabled(&id, !on)
            }
            InputEvent::Regenerate => self.engine.regenerate(),

            InputEvent::ToggleMixEntry => self.toggle_mix_entry(),
            InputEvent::AdjustBpm(delta) => {
                let bpm = (self.engine.params().bpm + delta).clamp(MIN_BPM, MAX_BPM);
                self.engine.set_bpm(bpm.round())
            }
            InputEvent::ToggleBpmEnabled => {
                let on = self.engine.params().bpm_enabled;
                self.engine.set_bpm_enabled(!on)
            }
            InputEvent::AdjustLpf(factor) => {
                let hz = (self.engine.params().lpf * factor).clamp(20.0, LPF_OPEN);
                self.engine.set_lpf(hz.round())
            }
            InputEvent::AdjustLpq(delta) => {
                let q = (self.engine.params().lpq + delta).clamp(0.0, 50.0);
                self.engine.set_lpq(round2(q))
            }
            InputEvent::AdjustRoom(delta) => {
                let room = (self.engine.params().room + delta).clamp(0.0, 1.0);
                self.engine.set_room(round2(room))
            }
            InputEvent::AdjustDelay(delta) => {
                let delay = (self.engine.params().delay + delta).clamp(0.0, 1.0);
                self.engine.set_delay(round2(delay))
            }
            InputEvent::ToggleVisualizer => {
                let on = self.engine.params().visualizer;
                self.engine.set_visualizer(!on)
            }

            InputEvent::BeginSaveName => {
                self.name_prompt = Some(String::new());
                Ok(())
            }
            InputEvent::NameChar(c) => {
                if let Some(name) = self.name_prompt.as_mut() {
                    name.push(c);
                }
                Ok(())
            }
            InputEvent::NameBackspace => {
                if let Some(name) = self.name_prompt.as_mut() {
                    name.pop();
                }
                Ok(())
            }
            InputEvent::ConfirmName => match self.name_prompt.take() {
                Some(name) => self.engine.save_current(&name).map(|_| {
                    self.status = format!("saved '{}'", name.trim());
                }),
                None => Ok(()),
            },
            InputEvent::CancelName => {
                self.name_prompt = None;
                Ok(())
            }
            InputEvent::LoadSaved => match self.selected_saved() {
                Some(name) => self.engine.load_saved(&name).map(|_| {
                    self.status = format!("loaded '{name}'");
                }),
                None => Ok(()),
            },
            InputEvent::DeleteSaved => match self.selected_saved() {
                Some(name) => self.engine.delete_saved(&name).map(|_| {
                    self.status = format!("deleted '{name}'");
                }),
                None => Ok(()),
            },
            InputEvent::ExportLibrary => {
                match persistence::export_library(&self.project_dir, &self.engine) {
                    Ok(path) => self.status = format!("exported to {}", path.display()),
                    Err(e) => self.status = format!("export failed: {e}"),
                }
                Ok(())
            }
            InputEvent::ImportLibrary => {
                match persistence::import_library(&self.project_dir, &mut self.engine) {
                    Ok(n) => self.status = format!("imported {n} patterns"),
                    Err(e) => self.status = format!("import failed: {e}"),
                }
                Ok(())
            }

            // text edits are evaluated once the debounce settles, see tick()
            InputEvent::InsertChar(c) => return self.edit_text(|text| text.push(c)),
            InputEvent::Backspace => {
                return self.edit_text(|text| {
                    text.pop();
                });
            }
            InputEvent::Newline => return self.edit_text(|text| text.push('\n')),
        };

        if let Err(e) = result {
            self.report_engine_error(e);
        }
        self.clamp_cursors();
        self.follow_program(&program_before, cps_before)
    }

    fn report_engine_error(&mut self, e: EngineError) {
        self.status = e.to_string();
    }

    fn track_flag(&self, id: &str, f: impl Fn(&stepcode::engine::TrackConfig) -> bool) -> bool {
        self.engine.tracks().get(id).map(|t| f(t.config())).unwrap_or(false)
    }

    fn track_sound(&self, id: &str) -> SoundId {
        self.engine
            .tracks()
            .get(id)
            .map(|t| t.config().sound.clone())
            .unwrap_or_default()
    }

    fn track_step_count(&self, id: &str) -> StepCount {
        self.engine
            .tracks()
            .get(id)
            .map(|t| t.config().step_count)
            .unwrap_or_default()
    }

    fn toggle_mix_entry(&mut self) -> Result<(), EngineError> {
        let Some(row) = self.mix_rows().into_iter().nth(self.mix_cursor) else {
            return Ok(());
        };
        match row.kind {
            MixKind::Preset => self.engine.set_preset_enabled(&row.key, !row.enabled),
            MixKind::Saved => self.engine.set_saved_enabled(&row.key, !row.enabled),
        }
    }

    fn edit_text(&mut self, f: impl FnOnce(&mut String)) -> Vec<EvalCommand> {
        let mut text = self.engine.editor_text().to_string();
        f(&mut text);
        self.engine.set_editor_text(text);
        Vec::new()
    }

    fn move_cursor(&mut self, rows: isize, cols: isize) {
        let step = |value: usize, delta: isize, len: usize| -> usize {
            if len == 0 {
                return 0;
            }
            (value as isize + delta).clamp(0, len as isize - 1) as usize
        };
        match self.mode {
            Mode::Grid => {
                self.cursor_track = step(self.cursor_track, rows, self.engine.tracks().len());
                let id = self.selected_track_id();
                let len = self.track_step_count(&id).len();
                self.cursor_step = step(self.cursor_step, cols, len);
            }
            Mode::Mix => self.mix_cursor = step(self.mix_cursor, rows, self.mix_rows().len()),
            Mode::Library => {
                self.library_cursor = step(self.library_cursor, rows, self.engine.library().len())
            }
            Mode::Code => {}
        }
    }

    fn clamp_cursors(&mut self) {
        let tracks = self.engine.tracks().len();
        self.cursor_track = self.cursor_track.min(tracks.saturating_sub(1));
        let id = self.selected_track_id();
        let steps = self.track_step_count(&id).len();
        self.cursor_step = self.cursor_step.min(steps - 1);
        self.mix_cursor = self.mix_cursor.min(self.mix_rows().len().saturating_sub(1));
        let saved = self.engine.library().len();
        self.library_cursor = self.library_cursor.min(saved.saturating_sub(1));
    }

    fn toggle_play(&mut self) -> Vec<EvalCommand> {
        if self.playing {
            self.playing = false;
            self.status = String::from("stopped");
            return vec![EvalCommand::Stop];
        }
        let program = self.engine.editor_text();
        if program.trim().is_empty() {
            self.status = String::from("nothing to play");
            return Vec::new();
        }
        self.playing = true;
        self.status = String::from("playing");
        vec![EvalCommand::Evaluate(program.to_string())]
    }

    // While playing, any change to the program text is sent on; a program
    // that became empty stops playback.
    fn follow_program(&mut self, before: &str, cps_before: f64) -> Vec<EvalCommand> {
        if !self.playing {
            return Vec::new();
        }
        let mut cmds = Vec::new();
        let params = self.engine.params();
        if params.bpm_enabled && params.cps() != cps_before {
            cmds.push(EvalCommand::SetCps(params.cps()));
        }
        let program = self.engine.editor_text();
        if program != before {
            if program.trim().is_empty() {
                self.playing = false;
                self.status = String::from("nothing to play");
                return vec![EvalCommand::Stop];
            }
            cmds.push(EvalCommand::Evaluate(program.to_string()));
        }
        cmds
    }

    /// Advances the text-edit debounce; a settled edit is evaluated when
    /// playing.
    pub fn tick(&mut self, elapsed: f64) -> Vec<EvalCommand> {
        if !self.engine.tick(elapsed) || !self.playing {
            return Vec::new();
        }
        let program = self.engine.editor_text();
        if program.trim().is_empty() {
            self.playing = false;
            self.status = String::from("nothing to play");
            return vec![EvalCommand::Stop];
        }
        vec![EvalCommand::Evaluate(program.to_string())]
    }

    pub fn on_eval_report(&mut self, report: EvalReport) {
        match report.outcome {
            EvalOutcome::Failed(msg) => self.status = format!("evaluation failed: {msg}"),
            EvalOutcome::Running if self.playing => self.status = String::from("playing"),
            _ => {}
        }
    }

    /// The evaluator refused a command. Engine state is untouched, so the
    /// current program can simply be played again.
    pub fn on_eval_error(&mut self, err: EvalError) {
        if matches!(err, EvalError::EmptyProgram | EvalError::Disconnected) {
            self.playing = false;
        }
        self.status = err.to_string();
    }

    /// Saves the project if the engine changed since the last save.
    pub fn autosave(&mut self) {
        if self.engine.take_dirty() {
            self.save_now();
        }
    }

    pub fn save_now(&mut self) {
        if let Err(e) = persistence::save_engine(&self.project_dir, &self.engine) {
            warn!(error = %e, "project save failed");
            self.status = format!("save failed: {e}");
        }
    }

    /// Pending text edits go into history before the final save.
    pub fn shutdown(&mut self) {
        self.engine.flush_pending_edit();
        self.save_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepcode::engine::EngineConfig;
    use tempfile::{TempDir, tempdir};

    fn middle() -> (Middle, TempDir) {
        let dir = tempdir().unwrap();
        let engine = Engine::new(EngineConfig::default());
        (Middle::new(engine, dir.path().to_path_buf()), dir)
    }

    #[test]
    fn toggling_a_step_while_stopped_sends_nothing() {
        let (mut m, _dir) = middle();
        assert!(m.handle_input(InputEvent::ToggleStep).is_empty());
        assert!(m.display_state().tracks[0].steps[0]);
        assert!(m.display_state().program.contains("s(\"bd*8\")"));
    }

    #[test]
    fn play_with_empty_program_reports_nothing_to_play() {
        let (mut m, _dir) = middle();
        assert!(m.handle_input(InputEvent::PlayPress).is_empty());
        let ds = m.display_state();
        assert!(!ds.playing);
        assert_eq!(ds.status, "nothing to play");
    }

    #[test]
    fn edits_while_playing_are_evaluated() {
        let (mut m, _dir) = middle();
        m.handle_input(InputEvent::ToggleStep);
        let cmds = m.handle_input(InputEvent::PlayPress);
        assert!(matches!(cmds.as_slice(), [EvalCommand::Evaluate(_)]));

        m.handle_input(InputEvent::CursorRight);
        let cmds = m.handle_input(InputEvent::ToggleStep);
        match cmds.as_slice() {
            [EvalCommand::Evaluate(p)] => assert!(p.contains("x x ~")),
            other => panic!("unexpected {other:?}"),
        }

        // emptying the grid stops playback
        m.handle_input(InputEvent::ClearTrack);
        assert!(!m.display_state().playing);
    }

    #[test]
    fn bpm_change_while_playing_sets_tempo() {
        let (mut m, _dir) = middle();
        m.handle_input(InputEvent::ToggleStep);
        m.handle_input(InputEvent::PlayPress);
        let cmds = m.handle_input(InputEvent::AdjustBpm(12.0));
        assert_eq!(cmds.first(), Some(&EvalCommand::SetCps(132.0 / 60.0 / 4.0)));
        assert!(matches!(cmds.get(1), Some(EvalCommand::Evaluate(p)) if p.starts_with("setcps(")));
    }

    #[test]
    fn code_edits_settle_before_evaluation() {
        let (mut m, _dir) = middle();
        m.handle_input(InputEvent::ToggleStep);
        m.handle_input(InputEvent::PlayPress);
        for c in "//".chars() {
            assert!(m.handle_input(InputEvent::InsertChar(c)).is_empty());
        }
        assert!(m.tick(0.1).is_empty());
        let cmds = m.tick(1.0);
        assert!(matches!(cmds.as_slice(), [EvalCommand::Evaluate(p)] if p.ends_with("//")));
    }

    #[test]
    fn engine_errors_land_in_status() {
        let (mut m, _dir) = middle();
        for _ in 0..3 {
            m.handle_input(InputEvent::RemoveTrack);
        }
        m.handle_input(InputEvent::RemoveTrack);
        let ds = m.display_state();
        assert_eq!(ds.tracks.len(), 1);
        assert!(ds.status.contains("last remaining track"));
    }

    #[test]
    fn undo_redo_through_events() {
        let (mut m, _dir) = middle();
        m.handle_input(InputEvent::CycleStepCount);
        assert_eq!(m.display_state().tracks[0].steps.len(), 16);
        m.handle_input(InputEvent::Undo);
        assert_eq!(m.display_state().tracks[0].steps.len(), 8);
        m.handle_input(InputEvent::Redo);
        assert_eq!(m.display_state().tracks[0].steps.len(), 16);
        m.handle_input(InputEvent::Undo);
        m.handle_input(InputEvent::Undo);
        assert_eq!(m.display_state().status, "nothing to undo");
    }

    #[test]
    fn save_name_prompt_and_mix_toggle() {
        let (mut m, _dir) = middle();
        m.handle_input(InputEvent::ToggleStep);
        m.handle_input(InputEvent::BeginSaveName);
        for c in "beat".chars() {
            m.handle_input(InputEvent::NameChar(c));
        }
        m.handle_input(InputEvent::ConfirmName);
        let ds = m.display_state();
        assert_eq!(ds.library, vec!["beat".to_string()]);
        assert_eq!(ds.name_prompt, None);

        m.handle_input(InputEvent::NextMode); // mix
        for _ in 0..PRESETS.len() {
            m.handle_input(InputEvent::CursorDown);
        }
        m.handle_input(InputEvent::ToggleMixEntry);
        let row = m.display_state().mix_rows.last().cloned().unwrap();
        assert_eq!(row.kind, MixKind::Saved);
        assert!(row.enabled);
    }

    #[test]
    fn export_and_import_via_project_dir() {
        let (mut m, _dir) = middle();
        m.engine.save_current("a").unwrap();
        m.handle_input(InputEvent::ExportLibrary);
        assert!(m.display_state().status.starts_with("exported"));

        m.engine.delete_saved("a").unwrap();
        m.handle_input(InputEvent::ImportLibrary);
        assert_eq!(m.display_state().library, vec!["a".to_string()]);
    }

    #[test]
    fn autosave_writes_project() {
        let (mut m, dir) = middle();
        m.handle_input(InputEvent::ToggleStep);
        m.autosave();
        assert!(persistence::project_file_path(dir.path()).exists());
    }
}
