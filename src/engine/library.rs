// Named, saved programs plus the grid state they came from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::EngineError;
use super::mix::SynthParams;
use super::track::{TrackConfig, TrackStore};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SavedPattern {
    pub code: String,
    pub sequencer_state: Vec<(String, Vec<bool>)>,
    pub track_configs: BTreeMap<String, TrackConfig>,
    pub synth_params: SynthParams,
}

impl SavedPattern {
    pub fn new(code: impl Into<String>, tracks: &TrackStore, params: &SynthParams) -> Self {
        Self {
            code: code.into(),
            sequencer_state: tracks.sequencer_state(),
            track_configs: tracks.track_configs(),
            synth_params: params.clone(),
        }
    }

    pub fn tracks(&self) -> TrackStore {
        TrackStore::from_parts(&self.sequencer_state, &self.track_configs)
    }
}

/// Pattern names are compared and stored without surrounding whitespace.
pub fn normalize_name(name: &str) -> &str {
    name.trim()
}

/// Saved patterns keyed by unique, non-empty name. Iteration is name order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatternLibrary {
    patterns: BTreeMap<String, SavedPattern>,
}

impl PatternLibrary {
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.patterns.contains_key(normalize_name(name))
    }

    pub fn get(&self, name: &str) -> Option<&SavedPattern> {
        self.patterns.get(normalize_name(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.keys().map(String::as_str)
    }

    pub fn save(&mut self, name: &str, pattern: SavedPattern) -> Result<(), EngineError> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(EngineError::MalformedInput("pattern name must not be empty".to_string()));
        }
        if self.patterns.contains_key(name) {
            return Err(EngineError::DuplicateName(name.to_string()));
        }
        self.patterns.insert(name.to_string(), pattern);
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<SavedPattern, EngineError> {
        let name = normalize_name(name);
        self.patterns
            .remove(name)
            .ok_or_else(|| EngineError::NotFound(name.to_string()))
    }

    pub fn load(&self, name: &str) -> Result<SavedPattern, EngineError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(normalize_name(name).to_string()))
    }

    pub fn export(&self) -> Vec<(String, SavedPattern)> {
        self.patterns
            .iter()
            .map(|(name, p)| (name.clone(), p.clone()))
            .collect()
    }

    /// Builds a library from an exported list. Empty or repeated names make
    /// the whole list invalid.
    pub fn from_export(entries: Vec<(String, SavedPattern)>) -> Result<Self, EngineError> {
        let mut patterns = BTreeMap::new();
        for (name, pattern) in entries {
            let name = normalize_name(&name).to_string();
            if name.is_empty() {
                return Err(EngineError::MalformedInput("empty pattern name".to_string()));
            }
            if patterns.insert(name.clone(), pattern).is_some() {
                return Err(EngineError::MalformedInput(format!("pattern '{name}' appears twice")));
            }
        }
        Ok(Self { patterns })
    }

    /// Lenient variant for project files: the first occurrence of a name
    /// wins and blank names are skipped.
    pub fn from_export_lossy(entries: Vec<(String, SavedPattern)>) -> Self {
        let mut patterns = BTreeMap::new();
        for (name, pattern) in entries {
            let name = normalize_name(&name);
            if !name.is_empty() {
                patterns.entry(name.to_string()).or_insert(pattern);
            }
        }
        Self { patterns }
    }

    /// Parses the export file format: a JSON list of `[name, record]` pairs.
    pub fn parse_export(text: &str) -> Result<Vec<(String, SavedPattern)>, EngineError> {
        serde_json::from_str(text).map_err(|e| EngineError::MalformedInput(e.to_string()))
    }

    pub fn to_export_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(&self.export())
            .map_err(|e| EngineError::MalformedInput(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(code: &str) -> SavedPattern {
        SavedPattern::new(code, &TrackStore::default(), &SynthParams::default())
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut lib = PatternLibrary::default();
        lib.save("X", pattern("a")).unwrap();
        let err = lib.save("X", pattern("b")).unwrap_err();
        assert_eq!(err, EngineError::DuplicateName("X".into()));
        assert_eq!(lib.len(), 1);
        assert_eq!(lib.get("X").unwrap().code, "a");
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut lib = PatternLibrary::default();
        assert!(matches!(lib.save("   ", pattern("a")), Err(EngineError::MalformedInput(_))));
        assert!(lib.is_empty());
    }

    #[test]
    fn names_ignore_surrounding_whitespace() {
        let mut lib = PatternLibrary::default();
        lib.save(" X ", pattern("a")).unwrap();
        assert_eq!(lib.names().collect::<Vec<_>>(), vec!["X"]);
        assert!(lib.contains(" X"));
        assert_eq!(lib.load("X ").unwrap().code, "a");
        let err = lib.save("X", pattern("b")).unwrap_err();
        assert_eq!(err, EngineError::DuplicateName("X".into()));
        lib.delete("  X").unwrap();
        assert!(lib.is_empty());

        let padded = vec![(" y ".to_string(), pattern("1"))];
        let imported = PatternLibrary::from_export(padded).unwrap();
        assert_eq!(imported.names().collect::<Vec<_>>(), vec!["y"]);
        let clash = vec![("z".to_string(), pattern("1")), ("z ".to_string(), pattern("2"))];
        assert!(PatternLibrary::from_export(clash).is_err());
    }

    #[test]
    fn delete_and_load_missing() {
        let mut lib = PatternLibrary::default();
        assert_eq!(lib.delete("nope").unwrap_err(), EngineError::NotFound("nope".into()));
        assert_eq!(lib.load("nope").unwrap_err(), EngineError::NotFound("nope".into()));

        lib.save("keep", pattern("k")).unwrap();
        let loaded = lib.load("keep").unwrap();
        assert_eq!(loaded.tracks(), TrackStore::default());
        lib.delete("keep").unwrap();
        assert!(!lib.contains("keep"));
    }

    #[test]
    fn export_is_name_ordered_pairs() {
        let mut lib = PatternLibrary::default();
        lib.save("b", pattern("2")).unwrap();
        lib.save("a", pattern("1")).unwrap();
        let names: Vec<String> = lib.export().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);

        let json = lib.to_export_json().unwrap();
        let parsed = PatternLibrary::parse_export(&json).unwrap();
        assert_eq!(PatternLibrary::from_export(parsed).unwrap(), lib);
    }

    #[test]
    fn malformed_exports_are_reported() {
        for bad in [
            "{\"a\": 1}",
            "[[\"a\"]]",
            "[[1, {}]]",
            "not json",
            "[[\"a\", {\"code\": 3}]]",
        ] {
            assert!(
                matches!(PatternLibrary::parse_export(bad), Err(EngineError::MalformedInput(_))),
                "{bad}"
            );
        }
        let dup = vec![("a".to_string(), pattern("1")), ("a".to_string(), pattern("2"))];
        assert!(PatternLibrary::from_export(dup.clone()).is_err());
        assert_eq!(PatternLibrary::from_export_lossy(dup).get("a").unwrap().code, "1");
    }

    #[test]
    fn missing_record_fields_default() {
        let parsed =
            PatternLibrary::parse_export(r#"[["only code", {"code": "s(\"bd\")"}]]"#).unwrap();
        assert_eq!(parsed[0].1.code, "s(\"bd\")");
        assert_eq!(parsed[0].1.synth_params, SynthParams::default());
        assert_eq!(parsed[0].1.tracks(), TrackStore::default());
    }
}
