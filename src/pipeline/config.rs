// Optional <project_dir>/.stepcode/config.json. Anything missing or
// unreadable falls back to defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::EngineConfig;
use crate::pipeline::persistence::state_dir;

const CONFIG_FILE: &str = "config.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    #[serde(flatten)]
    pub engine: EngineConfig,
    /// tracing filter directive; `RUST_LOG` wins when set
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

pub fn config_file_path(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(CONFIG_FILE)
}

pub fn load_config(project_dir: &Path) -> Config {
    let path = config_file_path(project_dir);
    let Ok(data) = std::fs::read_to_string(&path) else {
        return Config::default();
    };
    match serde_json::from_str::<Config>(&data) {
        Ok(mut config) => {
            if !(0.0..=1.0).contains(&config.engine.randomize_probability) {
                warn!(
                    value = config.engine.randomize_probability,
                    "randomizeProbability outside 0..=1, using default"
                );
                config.engine.randomize_probability = EngineConfig::default().randomize_probability;
            }
            config
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable config");
            Config::default()
        }
    }
}
