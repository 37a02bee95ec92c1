//! The editable state tree and every operation allowed on it.
//!
//! All mutations go through [`Engine`]. Each one runs against a copy of the
//! current state; only when it succeeds is the copy swapped in and the old
//! state pushed onto the history, so a failed operation changes nothing.

mod debounce;
mod error;

pub mod compiler;
pub mod history;
pub mod library;
pub mod mix;
pub mod track;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use compiler::{REFERENCE_NOTE, compile_track, structure_mask};
pub use debounce::EditDebounce;
pub use error::EngineError;
pub use history::{DEFAULT_MAX_HISTORY, HistoryStack};
pub use library::{PatternLibrary, SavedPattern};
pub use mix::{MixSelection, PRESETS, Preset, SynthParams, bpm_to_cps, compose};
pub use track::{SoloPolicy, SoundId, StepCount, Track, TrackConfig, TrackStore};

/// Tunables that different front ends historically disagreed on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// What the UI passes to `randomize` when the user doesn't pick one.
    pub randomize_probability: f64,
    pub solo_policy: SoloPolicy,
    pub max_history: usize,
    pub text_debounce_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            randomize_probability: 0.5,
            solo_policy: SoloPolicy::Independent,
            max_history: DEFAULT_MAX_HISTORY,
            text_debounce_ms: 500,
        }
    }
}

/// Everything undo/redo restores, as one value.
#[derive(Clone, Debug, PartialEq)]
pub struct EditState {
    pub tracks: TrackStore,
    pub mix: MixSelection,
    pub params: SynthParams,
    pub editor_text: String,
}

impl Default for EditState {
    fn default() -> Self {
        let tracks = TrackStore::default();
        let mix = MixSelection::all_tracks(&tracks);
        let params = SynthParams::default();
        let editor_text = compose(&tracks, &mix, &PatternLibrary::default(), &params);
        Self {
            tracks,
            mix,
            params,
            editor_text,
        }
    }
}

impl EditState {
    fn recompose(&mut self, library: &PatternLibrary) {
        self.editor_text = compose(&self.tracks, &self.mix, library, &self.params);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Program {
    Recompose,
    Keep,
}

pub struct Engine {
    state: EditState,
    library: PatternLibrary,
    history: HistoryStack<EditState>,
    debounce: EditDebounce<EditState>,
    config: EngineConfig,
    dirty: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_state(EditState::default(), PatternLibrary::default(), config)
    }

    /// Start from restored state. Selections naming things that don't
    /// exist are dropped.
    pub fn with_state(mut state: EditState, library: PatternLibrary, config: EngineConfig) -> Self {
        state.mix.prune(&state.tracks, &library);
        Self {
            state,
            library,
            history: HistoryStack::new(config.max_history),
            debounce: EditDebounce::new(config.text_debounce_ms as f64 / 1000.0),
            config,
            dirty: false,
        }
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    /// Independent copy of the editable state.
    pub fn snapshot(&self) -> EditState {
        self.state.clone()
    }

    pub fn tracks(&self) -> &TrackStore {
        &self.state.tracks
    }

    pub fn mix(&self) -> &MixSelection {
        &self.state.mix
    }

    pub fn params(&self) -> &SynthParams {
        &self.state.params
    }

    pub fn editor_text(&self) -> &str {
        &self.state.editor_text
    }

    pub fn library(&self) -> &PatternLibrary {
        &self.library
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn can_undo(&self) -> bool {
        self.debounce.is_pending() || self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        !self.debounce.is_pending() && self.history.can_redo()
    }

    /// True once since the last call if anything worth persisting changed.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn mutate<T>(
        &mut self,
        what: &'static str,
        program: Program,
        op: impl FnOnce(&mut EditState, &PatternLibrary) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        self.flush_pending_edit();
        let mut next = self.state.clone();
        let out = op(&mut next, &self.library)?;
        if program == Program::Recompose {
            next.recompose(&self.library);
        }
        let before = std::mem::replace(&mut self.state, next);
        self.history.push(before);
        self.dirty = true;
        debug!(op = what, history = self.history.len(), "state updated");
        Ok(out)
    }

    // -- tracks --

    pub fn add_track(&mut self) -> Result<String, EngineError> {
        self.mutate("add_track", Program::Recompose, |s, _| {
            let id = s.tracks.add_track();
            s.mix.tracks.insert(id.clone(), true);
            Ok(id)
        })
    }

    pub fn remove_track(&mut self, id: &str) -> Result<(), EngineError> {
        self.mutate("remove_track", Program::Recompose, |s, _| {
            s.tracks.remove_track(id)?;
            s.mix.tracks.remove(id);
            Ok(())
        })
    }

    pub fn toggle_step(&mut self, id: &str, index: usize) -> Result<(), EngineError> {
        self.mutate("toggle_step", Program::Recompose, |s, _| s.tracks.toggle_step(id, index))
    }

    pub fn set_step_count(&mut self, id: &str, n: u8) -> Result<(), EngineError> {
        self.mutate("set_step_count", Program::Recompose, |s, _| s.tracks.set_step_count(id, n))
    }

    pub fn set_sound(&mut self, id: &str, sound: SoundId) -> Result<(), EngineError> {
        self.mutate("set_sound", Program::Recompose, |s, _| s.tracks.set_sound(id, sound))
    }

    pub fn set_muted(&mut self, id: &str, muted: bool) -> Result<(), EngineError> {
        self.mutate("set_muted", Program::Recompose, |s, _| s.tracks.set_muted(id, muted))
    }

    pub fn set_solo(&mut self, id: &str, solo: bool) -> Result<(), EngineError> {
        let policy = self.config.solo_policy;
        self.mutate("set_solo", Program::Recompose, |s, _| s.tracks.set_solo(id, solo, policy))
    }

    pub fn clear_track(&mut self, id: &str) -> Result<(), EngineError> {
        self.mutate("clear_track", Program::Recompose, |s, _| s.tracks.clear(id))
    }

    pub fn randomize<R: Rng + ?Sized>(
        &mut self,
        id: &str,
        probability: f64,
        rng: &mut R,
    ) -> Result<(), EngineError> {
        self.mutate("randomize", Program::Recompose, |s, _| {
            s.tracks.randomize(id, probability, rng)
        })
    }

    // -- mix selection --

    pub fn set_track_enabled(&mut self, id: &str, enabled: bool) -> Result<(), EngineError> {
        self.mutate("set_track_enabled", Program::Recompose, |s, _| {
            if !s.tracks.contains(id) {
                return Err(EngineError::NotFound(id.to_string()));
            }
            s.mix.tracks.insert(id.to_string(), enabled);
            Ok(())
        })
    }

    pub fn set_preset_enabled(&mut self, key: &str, enabled: bool) -> Result<(), EngineError> {
        self.mutate("set_preset_enabled", Program::Recompose, |s, _| {
            if mix::preset(key).is_none() {
                return Err(EngineError::NotFound(key.to_string()));
            }
            s.mix.presets.insert(key.to_string(), enabled);
            Ok(())
        })
    }

    pub fn set_saved_enabled(&mut self, name: &str, enabled: bool) -> Result<(), EngineError> {
        let name = library::normalize_name(name);
        self.mutate("set_saved_enabled", Program::Recompose, |s, library| {
            if !library.contains(name) {
                return Err(EngineError::NotFound(name.to_string()));
            }
            s.mix.saved.insert(name.to_string(), enabled);
            Ok(())
        })
    }

    // -- global params --

    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), EngineError> {
        self.mutate("set_bpm", Program::Recompose, |s, _| s.params.set_bpm(bpm))
    }

    pub fn set_bpm_enabled(&mut self, enabled: bool) -> Result<(), EngineError> {
        self.mutate("set_bpm_enabled", Program::Recompose, |s, _| {
            s.params.bpm_enabled = enabled;
            Ok(())
        })
    }

    pub fn set_lpf(&mut self, hz: f64) -> Result<(), EngineError> {
        self.mutate("set_lpf", Program::Recompose, |s, _| s.params.set_lpf(hz))
    }

    pub fn set_lpq(&mut self, q: f64) -> Result<(), EngineError> {
        self.mutate("set_lpq", Program::Recompose, |s, _| s.params.set_lpq(q))
    }

    pub fn set_room(&mut self, room: f64) -> Result<(), EngineError> {
        self.mutate("set_room", Program::Recompose, |s, _| s.params.set_room(room))
    }

    pub fn set_delay(&mut self, delay: f64) -> Result<(), EngineError> {
        self.mutate("set_delay", Program::Recompose, |s, _| s.params.set_delay(delay))
    }

    pub fn set_visualizer(&mut self, on: bool) -> Result<(), EngineError> {
        self.mutate("set_visualizer", Program::Recompose, |s, _| {
            s.params.visualizer = on;
            Ok(())
        })
    }

    /// Overwrite the program text with a fresh composition, discarding
    /// manual edits.
    pub fn regenerate(&mut self) -> Result<(), EngineError> {
        self.mutate("regenerate", Program::Recompose, |_, _| Ok(()))
    }

    // -- free text --

    /// Replace the program text. History and persistence only see the
    /// edit once the debounce quantum passes without further edits.
    pub fn set_editor_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text == self.state.editor_text {
            return;
        }
        self.debounce.edit(|| self.state.clone());
        self.state.editor_text = text;
    }

    /// Advance the edit debounce. Returns true when a pending edit was
    /// committed to history.
    pub fn tick(&mut self, elapsed_secs: f64) -> bool {
        match self.debounce.tick(elapsed_secs) {
            Some(before) => {
                self.history.push(before);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn flush_pending_edit(&mut self) {
        if let Some(before) = self.debounce.flush() {
            self.history.push(before);
            self.dirty = true;
        }
    }

    // -- history --

    pub fn undo(&mut self) -> Result<(), EngineError> {
        self.flush_pending_edit();
        let restored = self.history.undo(&self.state)?;
        self.restore(restored);
        debug!(index = self.history.index(), "undo");
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), EngineError> {
        self.flush_pending_edit();
        let restored = self.history.redo()?;
        self.restore(restored);
        debug!(index = self.history.index(), "redo");
        Ok(())
    }

    // Whole-state swap; the program text comes from the snapshot as-is.
    fn restore(&mut self, mut state: EditState) {
        state.mix.saved.retain(|name, _| self.library.contains(name));
        self.state = state;
        self.dirty = true;
    }

    // -- library --

    /// Save the current program text along with the grid and params.
    pub fn save_current(&mut self, name: &str) -> Result<(), EngineError> {
        self.flush_pending_edit();
        let pattern = SavedPattern::new(
            self.state.editor_text.clone(),
            &self.state.tracks,
            &self.state.params,
        );
        self.library.save(name, pattern)?;
        self.dirty = true;
        debug!(name = name.trim(), "pattern saved");
        Ok(())
    }

    pub fn delete_saved(&mut self, name: &str) -> Result<(), EngineError> {
        let name = library::normalize_name(name);
        if !self.library.contains(name) {
            return Err(EngineError::NotFound(name.to_string()));
        }
        self.mutate("delete_saved", Program::Recompose, |s, _| {
            s.mix.saved.remove(name);
            Ok(())
        })?;
        self.library.delete(name)?;
        Ok(())
    }

    /// Replace the grid and params with a saved pattern's snapshot and show
    /// its stored code.
    pub fn load_saved(&mut self, name: &str) -> Result<(), EngineError> {
        let saved = self.library.load(name)?;
        self.mutate("load_saved", Program::Keep, |s, _| {
            s.tracks = saved.tracks();
            s.params = saved.synth_params;
            s.mix.adopt_tracks(&s.tracks);
            s.editor_text = saved.code;
            Ok(())
        })
    }

    pub fn export_library(&self) -> Vec<(String, SavedPattern)> {
        self.library.export()
    }

    pub fn export_library_json(&self) -> Result<String, EngineError> {
        self.library.to_export_json()
    }

    /// Wholesale replace of the library. Saved-pattern selections are
    /// cleared since they may name patterns that no longer exist.
    pub fn import_library(
        &mut self,
        entries: Vec<(String, SavedPattern)>,
    ) -> Result<(), EngineError> {
        let library = PatternLibrary::from_export(entries)?;
        self.mutate("import_library", Program::Recompose, |s, _| {
            s.mix.saved.clear();
            Ok(())
        })?;
        self.library = library;
        Ok(())
    }

    pub fn import_library_json(&mut self, text: &str) -> Result<(), EngineError> {
        let entries = PatternLibrary::parse_export(text)?;
        self.import_library(entries)
    }
}
