// Picks the enabled sources and glues them into one program.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::compiler::compile_track;
use super::error::EngineError;
use super::library::PatternLibrary;
use super::track::TrackStore;

/// Built-in program fragment. Never edited at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Preset {
    pub key: &'static str,
    pub label: &'static str,
    pub code: &'static str,
}

// Kept sorted by key; that is the order presets are stacked in.
pub const PRESETS: [Preset; 5] = [
    Preset {
        key: "arp",
        label: "Minor arp",
        code: "n(\"0 2 4 7 4 2\").scale(\"C:minor\").s(\"triangle\")",
    },
    Preset {
        key: "bass",
        label: "Saw bass",
        code: "note(\"c2 ~ c2 eb2 ~ g1 ~ bb1\").s(\"sawtooth\").lpf(600)",
    },
    Preset {
        key: "breakbeat",
        label: "Breakbeat",
        code: "s(\"bd ~ ~ bd ~ ~ sd ~, hh*8\")",
    },
    Preset {
        key: "four_on_floor",
        label: "Four on the floor",
        code: "s(\"bd*4, ~ cp ~ cp\")",
    },
    Preset {
        key: "hats",
        label: "Sixteenth hats",
        code: "s(\"hh*16\").gain(0.5)",
    },
];

pub fn preset(key: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.key == key)
}

pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 300.0;
// Cutoff at or above this is treated as "filter open" and not emitted.
pub const LPF_OPEN: f64 = 20000.0;
const NEUTRAL_LPQ: f64 = 1.0;

/// beats per minute -> cycles per second, four beats to a cycle
pub fn bpm_to_cps(bpm: f64) -> f64 {
    bpm / 60.0 / 4.0
}

/// Global modifiers applied to the composed program as a whole.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SynthParams {
    pub bpm: f64,
    pub bpm_enabled: bool,
    pub lpf: f64,
    pub lpq: f64,
    pub room: f64,
    pub delay: f64,
    // inline piano roll after the program
    pub visualizer: bool,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            bpm_enabled: true,
            lpf: LPF_OPEN,
            lpq: NEUTRAL_LPQ,
            room: 0.0,
            delay: 0.0,
            visualizer: false,
        }
    }
}

fn check(
    what: &'static str,
    value: f64,
    min: f64,
    max: f64,
    allowed: &'static str,
) -> Result<f64, EngineError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(EngineError::out_of_range(what, value, allowed))
    }
}

impl SynthParams {
    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), EngineError> {
        self.bpm = check("bpm", bpm, MIN_BPM, MAX_BPM, "20 to 300")?;
        Ok(())
    }

    pub fn set_lpf(&mut self, hz: f64) -> Result<(), EngineError> {
        self.lpf = check("lpf", hz, 20.0, LPF_OPEN, "20 to 20000")?;
        Ok(())
    }

    pub fn set_lpq(&mut self, q: f64) -> Result<(), EngineError> {
        self.lpq = check("lpq", q, 0.0, 50.0, "0 to 50")?;
        Ok(())
    }

    pub fn set_room(&mut self, room: f64) -> Result<(), EngineError> {
        self.room = check("room", room, 0.0, 1.0, "0 to 1")?;
        Ok(())
    }

    pub fn set_delay(&mut self, delay: f64) -> Result<(), EngineError> {
        self.delay = check("delay", delay, 0.0, 1.0, "0 to 1")?;
        Ok(())
    }

    pub fn cps(&self) -> f64 {
        bpm_to_cps(self.bpm)
    }

    // Only non-neutral values are emitted.
    fn modifiers(&self) -> String {
        let mut out = String::new();
        if self.lpf < LPF_OPEN {
            out.push_str(&format!(".lpf({})", self.lpf));
        }
        if self.lpq != NEUTRAL_LPQ {
            out.push_str(&format!(".lpq({})", self.lpq));
        }
        if self.room > 0.0 {
            out.push_str(&format!(".room({})", self.room));
        }
        if self.delay > 0.0 {
            out.push_str(&format!(".delay({})", self.delay));
        }
        if self.visualizer {
            out.push_str("._pianoroll()");
        }
        out
    }
}

/// Which sources go into the composed program. A key that is present and
/// `true` is included.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixSelection {
    pub tracks: BTreeMap<String, bool>,
    pub presets: BTreeMap<String, bool>,
    pub saved: BTreeMap<String, bool>,
}

impl MixSelection {
    /// Every track of `tracks` enabled, nothing else.
    pub fn all_tracks(tracks: &TrackStore) -> Self {
        Self {
            tracks: tracks.tracks().iter().map(|t| (t.id().to_string(), true)).collect(),
            ..Self::default()
        }
    }

    pub fn track_enabled(&self, id: &str) -> bool {
        self.tracks.get(id).copied().unwrap_or(false)
    }

    pub fn preset_enabled(&self, key: &str) -> bool {
        self.presets.get(key).copied().unwrap_or(false)
    }

    pub fn saved_enabled(&self, name: &str) -> bool {
        self.saved.get(name).copied().unwrap_or(false)
    }

    /// Drops keys that no longer name a track, preset or saved pattern.
    pub fn prune(&mut self, tracks: &TrackStore, library: &PatternLibrary) {
        self.tracks.retain(|id, _| tracks.contains(id));
        self.presets.retain(|key, _| preset(key).is_some());
        self.saved.retain(|name, _| library.contains(name));
    }

    /// Like `prune`, but also enables tracks that have no entry yet.
    pub fn adopt_tracks(&mut self, tracks: &TrackStore) {
        self.tracks.retain(|id, _| tracks.contains(id));
        for t in tracks.tracks() {
            self.tracks.entry(t.id().to_string()).or_insert(true);
        }
    }
}

/// Fragments in composition order: tracks (store order), then presets
/// (key order), then saved patterns (name order).
pub fn fragments(
    tracks: &TrackStore,
    selection: &MixSelection,
    library: &PatternLibrary,
) -> Vec<String> {
    let mut out = Vec::new();

    for track in tracks.tracks() {
        if !selection.track_enabled(track.id()) || !tracks.is_audible(track) {
            continue;
        }
        if let Some(fragment) = compile_track(track.steps(), &track.config().sound) {
            out.push(fragment);
        }
    }

    for (key, _) in selection.presets.iter().filter(|(_, on)| **on) {
        if let Some(p) = preset(key) {
            out.push(p.code.to_string());
        }
    }

    for (name, _) in selection.saved.iter().filter(|(_, on)| **on) {
        // stored code, never re-derived from the snapshot; blank code is
        // not a source
        if let Some(saved) = library.get(name).filter(|p| !p.code.trim().is_empty()) {
            out.push(saved.code.clone());
        }
    }

    out
}

/// Joins fragments into one program. Empty when nothing is enabled.
pub fn compose_fragments(fragments: &[String], params: &SynthParams) -> String {
    let body = match fragments {
        [] => return String::new(),
        [only] => only.clone(),
        many => {
            let inner = many
                .iter()
                .map(|f| format!("  {f}"))
                .collect::<Vec<_>>()
                .join(",\n");
            format!("stack(\n{inner}\n)")
        }
    };
    let body = format!("{body}{}", params.modifiers());
    if params.bpm_enabled {
        format!("setcps({})\n{body}", params.cps())
    } else {
        body
    }
}

pub fn compose(
    tracks: &TrackStore,
    selection: &MixSelection,
    library: &PatternLibrary,
    params: &SynthParams,
) -> String {
    compose_fragments(&fragments(tracks, selection, library), params)
}
