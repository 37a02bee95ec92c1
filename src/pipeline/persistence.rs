// Called on startup, whenever the engine reports changes, and on quit.
// Everything lives under <project_dir>/.stepcode/
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use crate::engine::Engine;
use crate::pipeline::project::ProjectState;

const STEPCODE_DIR: &str = ".stepcode";
const PROJECT_FILE: &str = "project.json";
const EXPORT_FILE: &str = "patterns.json";
const PROGRAM_FILE: &str = "program.strudel";
const LOG_FILE: &str = "stepcode.log";

pub fn state_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(STEPCODE_DIR)
}

// <project_dir>/.stepcode/project.json
pub fn project_file_path(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(PROJECT_FILE)
}

pub fn export_file_path(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(EXPORT_FILE)
}

// where the evaluator picks up the current program
pub fn program_file_path(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(PROGRAM_FILE)
}

pub fn log_file_path(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(LOG_FILE)
}

/// `None` when there is no project yet. Fields that don't parse fall back
/// to defaults; a file that can't be read as a project at all is renamed to
/// `project.json.bad` so the next save doesn't overwrite it.
pub fn load_project(project_dir: &Path) -> Option<ProjectState> {
    let path = project_file_path(project_dir);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            set_aside(&path, &e.to_string());
            return None;
        }
    };
    match ProjectState::from_json_lenient(&data) {
        Ok(state) => Some(state),
        Err(e) => {
            set_aside(&path, &e.to_string());
            None
        }
    }
}

pub fn bad_project_file_path(project_dir: &Path) -> PathBuf {
    project_file_path(project_dir).with_extension("json.bad")
}

fn set_aside(path: &Path, reason: &str) {
    let bad = path.with_extension("json.bad");
    match std::fs::rename(path, &bad) {
        Ok(()) => {
            warn!(path = %bad.display(), error = reason, "unreadable project file moved aside")
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not move unreadable project file")
        }
    }
}

// Save the project state to disk, making the files if they don't exist already
pub fn save_project(project_dir: &Path, state: &ProjectState) -> anyhow::Result<()> {
    let path = project_file_path(project_dir);
    write_creating_dir(&path, &serde_json::to_string_pretty(state)?)
}

pub fn save_engine(project_dir: &Path, engine: &Engine) -> anyhow::Result<()> {
    save_project(project_dir, &ProjectState::from_engine(engine))
}

/// Writes the saved-pattern library as a list of `[name, record]` pairs.
pub fn export_library(project_dir: &Path, engine: &Engine) -> anyhow::Result<PathBuf> {
    let path = export_file_path(project_dir);
    let json = engine.export_library_json()?;
    write_creating_dir(&path, &json)?;
    info!(path = %path.display(), patterns = engine.library().len(), "library exported");
    Ok(path)
}

/// Reads the export file and replaces the library with it. A malformed
/// file leaves the engine untouched.
pub fn import_library(project_dir: &Path, engine: &mut Engine) -> anyhow::Result<usize> {
    let path = export_file_path(project_dir);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    engine.import_library_json(&text)?;
    info!(path = %path.display(), patterns = engine.library().len(), "library imported");
    Ok(engine.library().len())
}

fn write_creating_dir(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?; // create .stepcode/ if needed
    }
    std::fs::write(path, contents)?;
    Ok(())
}
