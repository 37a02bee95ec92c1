// Track grids and their per-track configuration.
//
// "track": one row of the grid, a sound plus its steps.
// "step": one on/off slot inside a track.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::EngineError;

pub const DEFAULT_SOUND: &str = "bd";

// Sounds the compiler plays as pitched notes instead of sample hits.
pub const TONAL_SOUNDS: [&str; 3] = ["sawtooth", "sine", "triangle"];

// What the UI cycles through. Anything else loaded from disk is kept as-is.
pub const SOUND_PALETTE: [&str; 13] = [
    "bd", "sd", "hh", "oh", "cp", "rim", "lt", "mt", "ht", "cr", "sawtooth", "sine", "triangle",
];

const DEFAULT_TRACKS: [&str; 4] = ["bd", "sd", "hh", "sawtooth"];

/// Allowed grid lengths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StepCount {
    Four,
    #[default]
    Eight,
    Sixteen,
}

impl StepCount {
    pub const ALL: [StepCount; 3] = [StepCount::Four, StepCount::Eight, StepCount::Sixteen];

    pub fn len(self) -> usize {
        match self {
            StepCount::Four => 4,
            StepCount::Eight => 8,
            StepCount::Sixteen => 16,
        }
    }

    /// 4 -> 8 -> 16 -> 4
    pub fn next(self) -> Self {
        match self {
            StepCount::Four => StepCount::Eight,
            StepCount::Eight => StepCount::Sixteen,
            StepCount::Sixteen => StepCount::Four,
        }
    }

    fn from_len(len: usize) -> Option<Self> {
        u8::try_from(len).ok().and_then(|n| StepCount::try_from(n).ok())
    }
}

impl TryFrom<u8> for StepCount {
    type Error = EngineError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            4 => Ok(StepCount::Four),
            8 => Ok(StepCount::Eight),
            16 => Ok(StepCount::Sixteen),
            other => Err(EngineError::out_of_range("step count", other, "4, 8 or 16")),
        }
    }
}

impl From<StepCount> for u8 {
    fn from(count: StepCount) -> u8 {
        count.len() as u8
    }
}

/// Opaque sound name, resolved by whatever evaluates the program.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundId(pub String);

impl SoundId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_tonal(&self) -> bool {
        TONAL_SOUNDS.contains(&self.0.as_str())
    }

    /// Next entry of the palette, wrapping. Unknown sounds restart at the top.
    pub fn cycle(&self, forward: bool) -> SoundId {
        let len = SOUND_PALETTE.len();
        let next = match SOUND_PALETTE.iter().position(|s| *s == self.0) {
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None => 0,
        };
        SoundId::new(SOUND_PALETTE[next])
    }
}

impl Default for SoundId {
    fn default() -> Self {
        SoundId::new(DEFAULT_SOUND)
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How soloing interacts with mute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SoloPolicy {
    /// Solo and mute are independent flags.
    #[default]
    Independent,
    /// Soloing a track also clears that track's mute.
    UnmuteSoloed,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackConfig {
    pub muted: bool,
    pub solo: bool,
    pub step_count: StepCount,
    pub sound: SoundId,
}

impl TrackConfig {
    pub fn with_sound(sound: impl Into<String>) -> Self {
        Self {
            sound: SoundId::new(sound),
            ..Self::default()
        }
    }
}

/// One grid row. `steps.len()` always equals `config.step_count.len()`.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    id: String,
    steps: Vec<bool>,
    config: TrackConfig,
}

impl Track {
    fn new(id: String, config: TrackConfig) -> Self {
        Self {
            id,
            steps: vec![false; config.step_count.len()],
            config,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn steps(&self) -> &[bool] {
        &self.steps
    }

    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    pub fn has_active_steps(&self) -> bool {
        self.steps.iter().any(|&s| s)
    }
}

/// Ordered collection of tracks. Order is creation order and is the
/// "stable id order" used when composing.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackStore {
    tracks: Vec<Track>,
    next_number: u32,
}

impl Default for TrackStore {
    fn default() -> Self {
        let mut store = Self {
            tracks: Vec::new(),
            next_number: 1,
        };
        for sound in DEFAULT_TRACKS {
            let id = store.fresh_id();
            store.tracks.push(Track::new(id, TrackConfig::with_sound(sound)));
        }
        store
    }
}

impl TrackStore {
    /// Rebuild from the persisted halves. Configs missing for an id get
    /// defaults (step count taken from the grid when it is a legal length),
    /// grids are resized to their config, duplicate ids keep the first entry.
    /// An empty sequencer yields the default track set.
    pub fn from_parts(
        sequencer: &[(String, Vec<bool>)],
        configs: &BTreeMap<String, TrackConfig>,
    ) -> Self {
        let mut tracks: Vec<Track> = Vec::with_capacity(sequencer.len());
        for (id, steps) in sequencer {
            if id.is_empty() || tracks.iter().any(|t| &t.id == id) {
                continue;
            }
            let config = match configs.get(id) {
                Some(c) => c.clone(),
                None => TrackConfig {
                    step_count: StepCount::from_len(steps.len()).unwrap_or_default(),
                    ..TrackConfig::default()
                },
            };
            let mut steps = steps.clone();
            steps.resize(config.step_count.len(), false);
            tracks.push(Track {
                id: id.clone(),
                steps,
                config,
            });
        }
        if tracks.is_empty() {
            return Self::default();
        }
        let next_number = tracks.len() as u32 + 1;
        Self { tracks, next_number }
    }

    pub fn sequencer_state(&self) -> Vec<(String, Vec<bool>)> {
        self.tracks
            .iter()
            .map(|t| (t.id.clone(), t.steps.clone()))
            .collect()
    }

    pub fn track_configs(&self) -> BTreeMap<String, TrackConfig> {
        self.tracks
            .iter()
            .map(|t| (t.id.clone(), t.config.clone()))
            .collect()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Track, EngineError> {
        self.tracks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    fn fresh_id(&mut self) -> String {
        loop {
            let id = format!("track{}", self.next_number);
            self.next_number += 1;
            if !self.contains(&id) {
                return id;
            }
        }
    }

    /// Appends an 8-step, all-off track with default config.
    pub fn add_track(&mut self) -> String {
        let id = self.fresh_id();
        self.tracks.push(Track::new(id.clone(), TrackConfig::default()));
        id
    }

    pub fn remove_track(&mut self, id: &str) -> Result<(), EngineError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        if self.tracks.len() == 1 {
            return Err(EngineError::InvariantViolation(
                "cannot remove the last remaining track".to_string(),
            ));
        }
        self.tracks.remove(index);
        Ok(())
    }

    pub fn toggle_step(&mut self, id: &str, index: usize) -> Result<(), EngineError> {
        let track = self.get_mut(id)?;
        let step = track
            .steps
            .get_mut(index)
            .ok_or_else(|| {
                EngineError::out_of_range("step index", index, "below the track's step count")
            })?;
        *step = !*step;
        Ok(())
    }

    /// Keeps the leading `min(old, new)` steps, pads with inactive.
    pub fn set_step_count(&mut self, id: &str, n: u8) -> Result<(), EngineError> {
        let count = StepCount::try_from(n)?;
        let track = self.get_mut(id)?;
        track.steps.resize(count.len(), false);
        track.config.step_count = count;
        Ok(())
    }

    pub fn set_sound(&mut self, id: &str, sound: SoundId) -> Result<(), EngineError> {
        if sound.as_str().trim().is_empty() {
            return Err(EngineError::MalformedInput("sound name must not be empty".to_string()));
        }
        self.get_mut(id)?.config.sound = sound;
        Ok(())
    }

    pub fn set_muted(&mut self, id: &str, muted: bool) -> Result<(), EngineError> {
        self.get_mut(id)?.config.muted = muted;
        Ok(())
    }

    /// Other tracks' solo flags are left alone; several tracks may be soloed.
    pub fn set_solo(
        &mut self,
        id: &str,
        solo: bool,
        policy: SoloPolicy,
    ) -> Result<(), EngineError> {
        let config = &mut self.get_mut(id)?.config;
        config.solo = solo;
        if solo && policy == SoloPolicy::UnmuteSoloed {
            config.muted = false;
        }
        Ok(())
    }

    pub fn clear(&mut self, id: &str) -> Result<(), EngineError> {
        self.get_mut(id)?.steps.fill(false);
        Ok(())
    }

    /// Each step independently becomes active with `probability`.
    pub fn randomize<R: Rng + ?Sized>(
        &mut self,
        id: &str,
        probability: f64,
        rng: &mut R,
    ) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(EngineError::out_of_range("probability", probability, "0.0 to 1.0"));
        }
        let track = self.get_mut(id)?;
        for step in track.steps.iter_mut() {
            *step = rng.random_bool(probability);
        }
        Ok(())
    }

    pub fn any_solo(&self) -> bool {
        self.tracks.iter().any(|t| t.config.solo)
    }

    /// Mute always wins; with any solo present only soloed tracks sound.
    pub fn is_audible(&self, track: &Track) -> bool {
        !track.config.muted && (!self.any_solo() || track.config.solo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn first_id(store: &TrackStore) -> String {
        store.tracks()[0].id().to_string()
    }

    fn assert_lengths_consistent(store: &TrackStore) {
        for t in store.tracks() {
            assert_eq!(t.steps().len(), t.config().step_count.len(), "track {}", t.id());
        }
    }

    #[test]
    fn default_store_has_four_eight_step_tracks() {
        let store = TrackStore::default();
        assert_eq!(store.len(), 4);
        let sounds: Vec<&str> = store.tracks().iter().map(|t| t.config().sound.as_str()).collect();
        assert_eq!(sounds, vec!["bd", "sd", "hh", "sawtooth"]);
        assert!(store.tracks().iter().all(|t| t.steps() == [false; 8]));
    }

    #[test]
    fn add_track_appends_with_fresh_id() {
        let mut store = TrackStore::default();
        let id = store.add_track();
        assert_eq!(id, "track5");
        assert_eq!(store.tracks().last().unwrap().id(), "track5");
        assert_eq!(store.get(&id).unwrap().steps().len(), 8);

        store.remove_track("track5").unwrap();
        // ids are never reused within a session
        assert_eq!(store.add_track(), "track6");
    }

    #[test]
    fn cannot_remove_last_track() {
        let mut store = TrackStore::default();
        for id in ["track1", "track2", "track3"] {
            store.remove_track(id).unwrap();
        }
        let before = store.clone();
        let err = store.remove_track("track4").unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
        assert_eq!(store, before);
    }

    #[test]
    fn toggle_step_checks_bounds() {
        let mut store = TrackStore::default();
        let id = first_id(&store);
        store.toggle_step(&id, 3).unwrap();
        assert!(store.get(&id).unwrap().steps()[3]);
        store.toggle_step(&id, 3).unwrap();
        assert!(!store.get(&id).unwrap().steps()[3]);

        let err = store.toggle_step(&id, 8).unwrap_err();
        assert!(matches!(err, EngineError::OutOfRange { .. }));
        assert!(matches!(store.toggle_step("nope", 0), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn resize_keeps_prefix_and_pads() {
        for old in StepCount::ALL {
            for new in StepCount::ALL {
                let mut store = TrackStore::default();
                let id = first_id(&store);
                store.set_step_count(&id, old.into()).unwrap();
                for i in 0..old.len() {
                    store.toggle_step(&id, i).unwrap();
                }
                store.set_step_count(&id, new.into()).unwrap();

                let steps = store.get(&id).unwrap().steps();
                let keep = old.len().min(new.len());
                assert_eq!(steps.len(), new.len());
                assert!(steps[..keep].iter().all(|&s| s));
                assert!(steps[keep..].iter().all(|&s| !s));
                assert_lengths_consistent(&store);
            }
        }
    }

    #[test]
    fn illegal_step_count_is_rejected() {
        let mut store = TrackStore::default();
        let id = first_id(&store);
        let before = store.clone();
        assert!(matches!(store.set_step_count(&id, 12), Err(EngineError::OutOfRange { .. })));
        assert_eq!(store, before);
    }

    #[test]
    fn solo_rules() {
        let mut store = TrackStore::default();
        assert!(store.tracks().iter().all(|t| store.is_audible(t)));

        store.set_solo("track1", true, SoloPolicy::Independent).unwrap();
        store.set_solo("track2", true, SoloPolicy::Independent).unwrap();
        let audible: Vec<&str> = store
            .tracks()
            .iter()
            .filter(|t| store.is_audible(t))
            .map(|t| t.id())
            .collect();
        assert_eq!(audible, vec!["track1", "track2"]);

        store.set_muted("track2", true).unwrap();
        assert!(!store.is_audible(store.get("track2").unwrap()));
    }

    #[test]
    fn unmute_soloed_policy_clears_mute() {
        let mut store = TrackStore::default();
        store.set_muted("track1", true).unwrap();
        store.set_solo("track1", true, SoloPolicy::Independent).unwrap();
        assert!(store.get("track1").unwrap().config().muted);

        store.set_solo("track1", false, SoloPolicy::UnmuteSoloed).unwrap();
        assert!(store.get("track1").unwrap().config().muted);
        store.set_solo("track1", true, SoloPolicy::UnmuteSoloed).unwrap();
        assert!(!store.get("track1").unwrap().config().muted);
    }

    #[test]
    fn randomize_respects_probability_extremes() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut store = TrackStore::default();
        let id = first_id(&store);
        store.set_step_count(&id, 16).unwrap();

        store.randomize(&id, 1.0, &mut rng).unwrap();
        assert!(store.get(&id).unwrap().steps().iter().all(|&s| s));
        store.randomize(&id, 0.0, &mut rng).unwrap();
        assert!(!store.get(&id).unwrap().has_active_steps());
        assert_lengths_consistent(&store);

        assert!(matches!(
            store.randomize(&id, 1.5, &mut rng),
            Err(EngineError::OutOfRange { .. })
        ));
        assert!(store.randomize(&id, f64::NAN, &mut rng).is_err());
    }

    #[test]
    fn from_parts_reconciles_lengths_and_defaults() {
        let mut configs = BTreeMap::new();
        configs.insert(
            "a".to_string(),
            TrackConfig {
                step_count: StepCount::Four,
                ..TrackConfig::with_sound("sine")
            },
        );
        let sequencer = vec![
            ("a".to_string(), vec![true; 8]),
            ("b".to_string(), vec![true; 16]),
            ("c".to_string(), vec![true; 5]),
            ("a".to_string(), vec![false; 4]),
        ];
        let store = TrackStore::from_parts(&sequencer, &configs);

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("a").unwrap().steps(), &[true; 4]);
        assert_eq!(store.get("b").unwrap().config().step_count, StepCount::Sixteen);
        let c = store.get("c").unwrap().steps();
        assert_eq!(c, &[true, true, true, true, true, false, false, false]);
        assert_lengths_consistent(&store);

        let empty = TrackStore::from_parts(&[], &BTreeMap::new());
        assert_eq!(empty, TrackStore::default());
    }

    #[test]
    fn sound_palette_cycles() {
        assert_eq!(SoundId::new("bd").cycle(true).as_str(), "sd");
        assert_eq!(SoundId::new("bd").cycle(false).as_str(), "triangle");
        assert_eq!(SoundId::new("gm_piano").cycle(true).as_str(), "bd");
        assert!(SoundId::new("sine").is_tonal());
        assert!(!SoundId::new("bd").is_tonal());
    }

    #[test]
    fn step_count_serializes_as_number() {
        let json = serde_json::to_string(&StepCount::Sixteen).unwrap();
        assert_eq!(json, "16");
        assert!(serde_json::from_str::<StepCount>("12").is_err());
    }
}
