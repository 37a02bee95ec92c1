// The record written to and read from disk. Every field is optional on the
// way in so older or hand-edited files still load.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::engine::{
    EditState, Engine, EngineConfig, MixSelection, PatternLibrary, SavedPattern, SynthParams,
    TrackConfig, TrackStore,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectState {
    pub sequencer_state: Vec<(String, Vec<bool>)>,
    pub track_configs: BTreeMap<String, TrackConfig>,
    pub mix_selection: MixSelection,
    pub synth_params: SynthParams,
    pub saved_patterns: Vec<(String, SavedPattern)>,
    pub editor_text: String,
}

impl ProjectState {
    /// Parse a project record one field at a time. A field that doesn't
    /// parse falls back to its default, a bad track config is dropped (the
    /// grid length then decides the step count) and a bad saved pattern is
    /// skipped. Only text that isn't a JSON object is an error.
    pub fn from_json_lenient(text: &str) -> Result<Self, serde_json::Error> {
        let Value::Object(mut record) = serde_json::from_str::<Value>(text)? else {
            return Err(serde::de::Error::custom("project record is not an object"));
        };
        Ok(Self {
            sequencer_state: field(&mut record, "sequencerState"),
            track_configs: track_configs(&mut record),
            mix_selection: field(&mut record, "mixSelection"),
            synth_params: field(&mut record, "synthParams"),
            saved_patterns: saved_patterns(&mut record),
            editor_text: field(&mut record, "editorText"),
        })
    }

    pub fn from_engine(engine: &Engine) -> Self {
        let state = engine.state();
        Self {
            sequencer_state: state.tracks.sequencer_state(),
            track_configs: state.tracks.track_configs(),
            mix_selection: state.mix.clone(),
            synth_params: state.params.clone(),
            saved_patterns: engine.export_library(),
            editor_text: state.editor_text.clone(),
        }
    }

    /// Rebuild an engine. Grids are reconciled with their configs and
    /// selections are pruned to things that exist; history starts empty.
    pub fn into_engine(self, config: EngineConfig) -> Engine {
        let tracks = TrackStore::from_parts(&self.sequencer_state, &self.track_configs);
        let library = PatternLibrary::from_export_lossy(self.saved_patterns);
        let state = EditState {
            tracks,
            mix: self.mix_selection,
            params: self.synth_params,
            editor_text: self.editor_text,
        };
        Engine::with_state(state, library, config)
    }
}

fn field<T: DeserializeOwned + Default>(record: &mut Map<String, Value>, key: &str) -> T {
    match record.remove(key) {
        None | Some(Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(field = key, error = %e, "unreadable field, using default");
            T::default()
        }),
    }
}

fn track_configs(record: &mut Map<String, Value>) -> BTreeMap<String, TrackConfig> {
    let raw: BTreeMap<String, Value> = field(record, "trackConfigs");
    raw.into_iter()
        .filter_map(|(id, value)| match serde_json::from_value(value) {
            Ok(config) => Some((id, config)),
            Err(e) => {
                warn!(track = %id, error = %e, "dropping unreadable track config");
                None
            }
        })
        .collect()
}

fn saved_patterns(record: &mut Map<String, Value>) -> Vec<(String, SavedPattern)> {
    let raw: Vec<Value> = field(record, "savedPatterns");
    raw.into_iter()
        .filter_map(|entry| {
            let Ok([Value::String(name), Value::Object(mut pattern)]) =
                serde_json::from_value::<[Value; 2]>(entry)
            else {
                warn!("skipping malformed saved pattern entry");
                return None;
            };
            let pattern = SavedPattern {
                code: field(&mut pattern, "code"),
                sequencer_state: field(&mut pattern, "sequencerState"),
                track_configs: track_configs(&mut pattern),
                synth_params: field(&mut pattern, "synthParams"),
            };
            Some((name, pattern))
        })
        .collect()
}
