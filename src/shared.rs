// Types passed between the TUI and the middle layer.
//
// Keys (resolved by the TUI into the semantic events below):
//
// Everywhere:
//   Esc           //  Quit (cancels the name prompt instead, if one is open)
//   Tab           //  NextMode (Grid -> Mix -> Library -> Code)
//   Ctrl-p        //  PlayPress
//   Ctrl-z / Ctrl-y  // Undo / Redo
//
// Grid:
//   arrows / hjkl //  move the cursor
//   Space, Enter  //  ToggleStep
//   a / D / 0     //  AddTrack / RemoveTrack / ClearTrack
//   m / s         //  ToggleMute / ToggleSolo
//   [ / ]         //  CycleSound back / forward
//   n             //  CycleStepCount (4 -> 8 -> 16)
//   r             //  Randomize
//   e             //  ToggleTrackInMix
//   g             //  Regenerate (throw away hand edits)
//   p             //  PlayPress
//   u / U         //  Undo / Redo
//
// Mix:
//   up / down, Space  // move / ToggleMixEntry
//   - / =         //  bpm -1 / +1,  _ / + for -10 / +10
//   b             //  ToggleBpmEnabled
//   f / F, q / Q, o / O, y / Y  // lpf, lpq, room, delay down / up
//   v             //  ToggleVisualizer
//
// Library:
//   up / down     //  move
//   n             //  BeginSaveName, then type, Enter to save
//   l / d         //  LoadSaved / DeleteSaved
//   x / i         //  ExportLibrary / ImportLibrary
//
// Code:
//   anything typed goes into the program text

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Grid,
    Mix,
    Library,
    Code,
}

impl Mode {
    pub fn next(self) -> Self {
        match self {
            Mode::Grid => Mode::Mix,
            Mode::Mix => Mode::Library,
            Mode::Library => Mode::Code,
            Mode::Code => Mode::Grid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Grid => "GRID",
            Mode::Mix => "MIX",
            Mode::Library => "LIBRARY",
            Mode::Code => "CODE",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    Quit,
    NextMode,
    PlayPress,
    Undo,
    Redo,

    // cursor, meaning depends on mode
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,

    // grid, acting on the track/step under the cursor
    ToggleStep,
    AddTrack,
    RemoveTrack,
    ClearTrack,
    ToggleMute,
    ToggleSolo,
    CycleSound(bool), // true = forward
    CycleStepCount,
    Randomize,
    ToggleTrackInMix,
    Regenerate,

    // mix
    ToggleMixEntry,
    AdjustBpm(f64),
    ToggleBpmEnabled,
    AdjustLpf(f64), // multiplier
    AdjustLpq(f64),
    AdjustRoom(f64),
    AdjustDelay(f64),
    ToggleVisualizer,

    // library
    BeginSaveName,
    NameChar(char),
    NameBackspace,
    ConfirmName,
    CancelName,
    LoadSaved,
    DeleteSaved,
    ExportLibrary,
    ImportLibrary,

    // code
    InsertChar(char),
    Backspace,
    Newline,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackRow {
    pub id: String,
    pub sound: String,
    pub muted: bool,
    pub solo: bool,
    pub audible: bool,
    pub in_mix: bool,
    pub steps: Vec<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MixKind {
    Preset,
    Saved,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MixRow {
    pub kind: MixKind,
    pub key: String,
    pub label: String,
    pub enabled: bool,
}

/// Read-only projection of the engine plus UI cursor state. Rebuilt every
/// frame; the TUI never writes back into it.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayState {
    pub mode: Mode,
    pub tracks: Vec<TrackRow>,
    pub cursor_track: usize,
    pub cursor_step: usize,
    pub mix_rows: Vec<MixRow>,
    pub mix_cursor: usize,
    pub library: Vec<String>,
    pub library_cursor: usize,
    pub program: String,
    pub bpm: f64,
    pub bpm_enabled: bool,
    pub cps: f64,
    pub lpf: f64,
    pub lpq: f64,
    pub room: f64,
    pub delay: f64,
    pub visualizer: bool,
    pub playing: bool,
    pub can_undo: bool,
    pub can_redo: bool,
    pub status: String,
    pub name_prompt: Option<String>,
}
