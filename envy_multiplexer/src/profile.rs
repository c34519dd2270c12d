//! Environment profiles stored as `<name>.env` files.
//!
//! A profile file holds `KEY=VALUE` lines. Blank lines and `#` comments are
//! ignored when loading and preserved when variables are written back.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{MuxError, MuxResult};

/// Profile every installation starts with. It cannot be deleted or renamed.
pub const DEFAULT_PROFILE: &str = "default";

/// File extension of profile files.
pub const PROFILE_EXTENSION: &str = "env";

/// Longest accepted profile name.
pub const MAX_PROFILE_NAME_LEN: usize = 50;

/// Header written to a profile file created on first load.
const MISSING_PROFILE_HEADER: &str = "# Environment\n";

/// Whether `name` is usable as a profile name.
pub fn is_valid_profile_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() <= MAX_PROFILE_NAME_LEN
        && name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// Whether `name` is usable as an environment variable name.
pub fn is_valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if !first.is_numeric() && (first.is_alphabetic() || first == '_') => {},
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Parse `KEY=VALUE` lines, stripping quotes around values.
pub fn parse_vars(content: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            vars.insert(key.trim().to_owned(), value.to_owned());
        }
    }
    vars
}

/// Render `vars` after the comment and blank lines of `existing`.
pub fn render_vars(existing: &str, vars: &BTreeMap<String, String>) -> String {
    let mut lines: Vec<String> = existing
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            trimmed.is_empty() || trimmed.starts_with('#')
        })
        .map(str::to_owned)
        .collect();
    lines.extend(vars.iter().map(|(k, v)| format!("{k}={v}")));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Result of loading a profile.
///
/// Loading never fails outright: unreadable files produce an empty variable
/// set and an error message for the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedProfile {
    /// Parsed variables.
    pub vars: BTreeMap<String, String>,
    /// Set when the file existed but could not be read.
    pub error: Option<String>,
    /// Whether the file was missing and has just been created.
    pub created: bool,
}

/// Directory of profile files.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    /// Store rooted at `dir`. The directory is created on demand.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the profile files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the profile directory if needed.
    pub fn ensure_dir(&self) -> MuxResult<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Path of the file backing `name`.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{PROFILE_EXTENSION}"))
    }

    /// Whether a profile file exists.
    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    /// Sorted names of all profiles.
    pub fn list(&self) -> MuxResult<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == PROFILE_EXTENSION) {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Load the variables of `name`, creating the file if it is missing.
    pub fn load(&self, name: &str) -> LoadedProfile {
        let path = self.path(name);
        match fs::read_to_string(&path) {
            Ok(content) => LoadedProfile { vars: parse_vars(&content), ..Default::default() },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let created = self
                    .ensure_dir()
                    .and_then(|_| fs::write(&path, MISSING_PROFILE_HEADER).map_err(Into::into));
                match created {
                    Ok(()) => {
                        info!("Created missing profile {}", path.display());
                        LoadedProfile { created: true, ..Default::default() }
                    },
                    Err(err) => {
                        warn!("Failed to create {}: {err}", path.display());
                        LoadedProfile { error: Some(err.to_string()), ..Default::default() }
                    },
                }
            },
            Err(err) => {
                warn!("Failed to read {}: {err}", path.display());
                LoadedProfile {
                    error: Some(format!("failed to read {name}: {err}")),
                    ..Default::default()
                }
            },
        }
    }

    /// Write `vars` to `name`, keeping the file's comment and blank lines.
    pub fn save_vars(&self, name: &str, vars: &BTreeMap<String, String>) -> MuxResult<()> {
        let path = self.path(name);
        let existing = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };
        self.ensure_dir()?;
        fs::write(&path, render_vars(&existing, vars))?;
        Ok(())
    }

    /// Raw file content of `name`.
    pub fn read_raw(&self, name: &str) -> MuxResult<String> {
        Ok(fs::read_to_string(self.path(name))?)
    }

    /// Replace the raw file content of `name`.
    pub fn write_raw(&self, name: &str, content: &str) -> MuxResult<()> {
        self.ensure_dir()?;
        fs::write(self.path(name), content)?;
        Ok(())
    }

    /// Create a new profile with a dated comment header.
    pub fn create(&self, name: &str) -> MuxResult<()> {
        if !is_valid_profile_name(name) {
            return Err(MuxError::InvalidProfileName(name.into()));
        }
        if self.exists(name) {
            return Err(MuxError::ProfileExists(name.into()));
        }
        let date = chrono::Local::now().format("%Y-%m-%d");
        self.write_raw(name, &format!("# {name}\n# Created: {date}\n"))?;
        info!("Created profile {name}");
        Ok(())
    }

    /// Delete a profile. `default` and the `active` profile are refused.
    pub fn delete(&self, name: &str, active: &str) -> MuxResult<()> {
        if name == DEFAULT_PROFILE || name == active {
            return Err(MuxError::ProtectedProfile(name.into()));
        }
        let path = self.path(name);
        if !path.is_file() {
            return Err(MuxError::ProfileNotFound(name.into()));
        }
        fs::remove_file(path)?;
        info!("Deleted profile {name}");
        Ok(())
    }

    /// Rename a profile. `default` cannot be renamed and existing targets are
    /// never overwritten.
    pub fn rename(&self, from: &str, to: &str) -> MuxResult<()> {
        if from == DEFAULT_PROFILE {
            return Err(MuxError::ProtectedProfile(from.into()));
        }
        if !is_valid_profile_name(to) {
            return Err(MuxError::InvalidProfileName(to.into()));
        }
        if self.exists(to) {
            return Err(MuxError::ProfileExists(to.into()));
        }
        let source = self.path(from);
        if !source.is_file() {
            return Err(MuxError::ProfileNotFound(from.into()));
        }
        fs::rename(source, self.path(to))?;
        info!("Renamed profile {from} to {to}");
        Ok(())
    }
}
