//! Persisted application state.

use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{MuxError, MuxResult};
use crate::profile::DEFAULT_PROFILE;

/// File name of the state file inside the profile directory.
pub const STATE_FILE_NAME: &str = ".envy_state.json";

/// State carried across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    /// Profile that was active when the application last switched.
    pub last_profile: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self { last_profile: DEFAULT_PROFILE.into() }
    }
}

/// Serialize state to JSON.
pub fn serialize_state(state: &AppState) -> MuxResult<String> {
    serde_json::to_string_pretty(state).map_err(|e| MuxError::Persistence(e.to_string()))
}

/// Deserialize state from JSON.
pub fn deserialize_state(json: &str) -> MuxResult<AppState> {
    serde_json::from_str(json).map_err(|e| MuxError::Persistence(e.to_string()))
}

/// Load state from `dir`, falling back to the default for a missing or
/// corrupt file.
pub fn load_state(dir: &Path) -> AppState {
    let path = dir.join(STATE_FILE_NAME);
    let Ok(json) = fs::read_to_string(&path) else {
        return AppState::default();
    };
    match deserialize_state(&json) {
        Ok(state) if !state.last_profile.is_empty() => state,
        Ok(_) => AppState::default(),
        Err(err) => {
            warn!("Ignoring corrupt {}: {err}", path.display());
            AppState::default()
        },
    }
}

/// Save state into `dir`.
pub fn save_state(dir: &Path, state: &AppState) -> MuxResult<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(STATE_FILE_NAME), serialize_state(state)?)?;
    Ok(())
}
