//! Application configuration schema.
//!
//! Corresponds to `envy.toml` in the config directory. Every field has a
//! default, so a partial file only overrides what it names.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::command::{AppCommand, normalize_key_spec};
use crate::error::{MuxError, MuxResult};

/// File name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "envy.toml";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvyConfig {
    /// Key → command bindings.
    pub keybindings: KeybindingsConfig,
    /// How long to wait for output pumps after a process exits.
    pub drain_timeout_ms: u64,
    /// Add variables that force unbuffered, colorized child output.
    pub force_color: bool,
    /// Whether to show the status bar.
    pub show_status_bar: bool,
}

impl Default for EnvyConfig {
    fn default() -> Self {
        Self {
            keybindings: KeybindingsConfig::default(),
            drain_timeout_ms: 500,
            force_color: true,
            show_status_bar: true,
        }
    }
}

impl EnvyConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> MuxResult<Self> {
        toml::from_str(text).map_err(|e| MuxError::Config(e.to_string()))
    }

    /// Load `envy.toml` from `dir`.
    ///
    /// A missing file yields the defaults. A malformed file also yields the
    /// defaults, together with the error so the caller can surface it.
    pub fn load(dir: &Path) -> (Self, Option<MuxError>) {
        let path = dir.join(CONFIG_FILE_NAME);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return (Self::default(), None),
            Err(err) => {
                warn!("Failed to read {}: {err}", path.display());
                return (Self::default(), Some(err.into()));
            },
        };
        match Self::from_toml(&text) {
            Ok(config) => (config, None),
            Err(err) => {
                warn!("Ignoring malformed {}: {err}", path.display());
                (Self::default(), Some(err))
            },
        }
    }

    /// Drain timeout as a [`Duration`].
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

/// Global key bindings, written as key specs like `"ctrl+n"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeybindingsConfig {
    /// Key to create a pane.
    pub new_pane: String,
    /// Key to close the active pane.
    pub close_pane: String,
    /// Key for the previous pane.
    pub prev_pane: String,
    /// Alternate key for the previous pane.
    pub prev_pane_alt: String,
    /// Key for the next pane.
    pub next_pane: String,
    /// Alternate key for the next pane.
    pub next_pane_alt: String,
    /// Key to toggle the profile panel.
    pub toggle_profiles: String,
    /// Key to interrupt the running process.
    pub interrupt: String,
    /// Key to quit.
    pub quit: String,
}

impl Default for KeybindingsConfig {
    fn default() -> Self {
        Self {
            new_pane: "ctrl+n".into(),
            close_pane: "ctrl+w".into(),
            prev_pane: "ctrl+h".into(),
            prev_pane_alt: "ctrl+left".into(),
            next_pane: "ctrl+l".into(),
            next_pane_alt: "ctrl+right".into(),
            toggle_profiles: "ctrl+e".into(),
            interrupt: "ctrl+c".into(),
            quit: "ctrl+d".into(),
        }
    }
}

impl KeybindingsConfig {
    /// Convert the bindings into a normalized key spec → command map.
    ///
    /// Specs that cannot be parsed are skipped with a warning.
    pub fn to_bindings_map(&self) -> HashMap<String, AppCommand> {
        let entries = [
            (&self.new_pane, AppCommand::NewPane),
            (&self.close_pane, AppCommand::ClosePane),
            (&self.prev_pane, AppCommand::PrevPane),
            (&self.prev_pane_alt, AppCommand::PrevPane),
            (&self.next_pane, AppCommand::NextPane),
            (&self.next_pane_alt, AppCommand::NextPane),
            (&self.toggle_profiles, AppCommand::ToggleProfiles),
            (&self.interrupt, AppCommand::Interrupt),
            (&self.quit, AppCommand::Quit),
        ];

        let mut m = HashMap::new();
        for (spec, command) in entries {
            match normalize_key_spec(spec) {
                Some(key) => {
                    m.insert(key, command);
                },
                None => warn!("Ignoring invalid key binding {spec:?} for {command:?}"),
            }
        }
        m
    }
}
