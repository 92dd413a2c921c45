use serde::Deserialize;
use std::path::Path;
use tracing::info;

use super::error::RepairError;

pub const CONFIG_FILE_NAME: &str = "repair.toml";

/// Settings for a repair run, read from `repair.toml` in the config directory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path pattern selecting the timetable files, e.g.
    /// `data/train-timetables/jreast-tsurumi*.json`.
    pub pattern: String,
    /// Number of spaces per indentation level in the rewritten files.
    pub indent: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pattern: "data/train-timetables/jreast-tsurumi*.json".to_string(),
            indent: 4,
        }
    }
}

/// Loads the config from `<config_path>/repair.toml`, falling back to the
/// defaults when the file does not exist.
pub fn read_config(config_path: &str) -> Result<Config, RepairError> {
    let path = Path::new(config_path).join(CONFIG_FILE_NAME);
    if !path.exists() {
        info!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let file = fs_err::read_to_string(&path)?;
    toml::from_str(&file).map_err(|source| RepairError::Config { path, source })
}
