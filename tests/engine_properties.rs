use rand::SeedableRng;
use rand::rngs::StdRng;

use stepcode::engine::mix::compose_fragments;
use stepcode::engine::{
    Engine, EngineConfig, EngineError, PatternLibrary, SoundId, SynthParams, compile_track,
};

fn engine() -> Engine {
    Engine::new(EngineConfig::default())
}

fn first(engine: &Engine) -> String {
    engine.tracks().tracks()[0].id().to_string()
}

fn steps(engine: &Engine, id: &str) -> Vec<bool> {
    engine.tracks().get(id).unwrap().steps().to_vec()
}

#[test]
fn grid_length_always_matches_step_count() {
    let mut e = engine();
    let id = first(&e);
    let mut rng = StdRng::seed_from_u64(7);
    for n in [16, 4, 8, 16, 4] {
        e.set_step_count(&id, n).unwrap();
        e.randomize(&id, 0.7, &mut rng).unwrap();
        for track in e.tracks().tracks() {
            assert_eq!(track.steps().len(), track.config().step_count.len());
        }
    }
    assert!(e.set_step_count(&id, 5).is_err());
    assert_eq!(steps(&e, &id).len(), 4);
}

#[test]
fn resizing_keeps_leading_steps() {
    let mut e = engine();
    let id = first(&e);
    for i in [0, 1, 6] {
        e.toggle_step(&id, i).unwrap();
    }
    e.set_step_count(&id, 4).unwrap();
    assert_eq!(steps(&e, &id), vec![true, true, false, false]);

    e.set_step_count(&id, 16).unwrap();
    let grid = steps(&e, &id);
    assert_eq!(&grid[..4], &[true, true, false, false]);
    assert!(grid[4..].iter().all(|s| !s));
}

#[test]
fn compiled_fragments_for_sample_and_tonal_sounds() {
    let grid = [true, false, true, false, false, false, false, false];
    assert_eq!(
        compile_track(&grid, &SoundId::new("bd")).unwrap(),
        "s(\"bd*8\").struct(\"x ~ x ~ ~ ~ ~ ~\")"
    );
    assert_eq!(
        compile_track(&grid[..4], &SoundId::new("sine")).unwrap(),
        "note(\"c3\").s(\"sine\").struct(\"x ~ x ~\")"
    );
    assert_eq!(compile_track(&[false; 16], &SoundId::new("bd")), None);
}

#[test]
fn composition_of_zero_one_and_many_fragments() {
    let params = SynthParams::default();
    assert_eq!(compose_fragments(&[], &params), "");

    let one = vec!["s(\"bd*4\")".to_string()];
    assert_eq!(compose_fragments(&one, &params), "setcps(0.5)\ns(\"bd*4\")");

    let mut quiet = params.clone();
    quiet.bpm_enabled = false;
    let many = vec!["a".to_string(), "b".to_string()];
    assert_eq!(compose_fragments(&many, &quiet), "stack(\n  a,\n  b\n)");
}

#[test]
fn empty_grid_composes_an_empty_program() {
    let e = engine();
    assert_eq!(e.editor_text(), "");
}

#[test]
fn undo_twice_then_redo() {
    let mut e = engine();
    let id = first(&e);
    let s0 = e.snapshot();
    e.toggle_step(&id, 0).unwrap();
    let s1 = e.snapshot();
    e.toggle_step(&id, 1).unwrap();

    e.undo().unwrap();
    assert_eq!(e.snapshot(), s1);
    e.undo().unwrap();
    assert_eq!(e.snapshot(), s0);
    assert_eq!(e.undo(), Err(EngineError::NothingToUndo));

    e.redo().unwrap();
    assert_eq!(e.snapshot(), s1);
}

#[test]
fn action_after_undo_discards_redo() {
    let mut e = engine();
    let id = first(&e);
    e.toggle_step(&id, 0).unwrap();
    e.toggle_step(&id, 1).unwrap();
    e.undo().unwrap();
    e.toggle_step(&id, 2).unwrap();
    assert!(!e.can_redo());
    assert_eq!(e.redo(), Err(EngineError::NothingToRedo));
}

#[test]
fn oldest_history_is_evicted_first() {
    let config = EngineConfig {
        max_history: 3,
        ..EngineConfig::default()
    };
    let mut e = Engine::new(config);
    let id = first(&e);
    let mut seen = vec![e.snapshot()];
    for i in 0..5 {
        e.toggle_step(&id, i).unwrap();
        seen.push(e.snapshot());
    }

    e.undo().unwrap();
    assert_eq!(e.snapshot(), seen[4]);
    e.undo().unwrap();
    assert_eq!(e.snapshot(), seen[3]);
    assert!(!e.can_undo());
}

#[test]
fn duplicate_save_is_refused_and_delete_clears_selection() {
    let mut e = engine();
    let id = first(&e);
    e.toggle_step(&id, 0).unwrap();
    e.save_current("groove").unwrap();
    assert!(matches!(e.save_current("groove"), Err(EngineError::DuplicateName(_))));
    assert_eq!(e.library().len(), 1);

    e.set_saved_enabled("groove", true).unwrap();
    assert!(e.mix().saved_enabled("groove"));

    e.delete_saved("groove").unwrap();
    assert!(!e.library().contains("groove"));
    assert!(!e.mix().saved.contains_key("groove"));
}

#[test]
fn malformed_import_changes_nothing() {
    let mut e = engine();
    let id = first(&e);
    e.toggle_step(&id, 3).unwrap();
    e.save_current("keep").unwrap();
    let before = e.snapshot();
    let names: Vec<String> = e.library().names().map(str::to_string).collect();

    let err = e.import_library_json("{ not json").unwrap_err();
    assert!(matches!(err, EngineError::MalformedInput(_)));
    assert_eq!(e.snapshot(), before);
    assert_eq!(e.library().names().map(str::to_string).collect::<Vec<_>>(), names);
}

#[test]
fn export_then_import_restores_library() {
    let mut e = engine();
    let id = first(&e);
    e.toggle_step(&id, 0).unwrap();
    e.save_current("one").unwrap();
    let json = e.export_library_json().unwrap();

    let mut other = engine();
    other.import_library_json(&json).unwrap();
    assert_eq!(other.library(), e.library());
    assert!(PatternLibrary::parse_export(&json).is_ok());
}

#[test]
fn failed_operation_leaves_no_history() {
    let mut e = engine();
    let before = e.snapshot();
    assert!(e.set_bpm(1000.0).is_err());
    assert!(e.remove_track("nope").is_err());
    assert_eq!(e.snapshot(), before);
    assert!(!e.can_undo());
}
