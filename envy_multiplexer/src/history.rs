//! Submitted command history, persisted as newline-delimited text.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::MuxResult;

/// Maximum number of retained history entries.
pub const MAX_HISTORY: usize = 1000;

/// Command history with Up/Down navigation.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
    /// Navigation cursor; `entries.len()` means "past the newest entry".
    cursor: usize,
    path: Option<PathBuf>,
}

impl History {
    /// In-memory history that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load history from `path`. A missing file yields an empty history.
    pub fn load(path: impl Into<PathBuf>) -> MuxResult<Self> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };
        let mut entries: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        truncate_front(&mut entries);
        let cursor = entries.len();
        Ok(Self { entries, cursor, path: Some(path) })
    }

    /// File backing this history, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Record a submitted line and reset navigation.
    ///
    /// Consecutive duplicates are stored once.
    pub fn push(&mut self, line: &str) {
        let line = line.trim();
        if !line.is_empty() && self.entries.last().is_none_or(|last| last != line) {
            self.entries.push(line.to_owned());
            truncate_front(&mut self.entries);
        }
        self.cursor = self.entries.len();
    }

    /// Step back to an older entry.
    pub fn older(&mut self) -> Option<&str> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// Step forward to a newer entry. Returns `None` once past the newest
    /// entry, at which point the input should be cleared.
    pub fn newer(&mut self) -> Option<&str> {
        if self.cursor + 1 < self.entries.len() {
            self.cursor += 1;
            self.entries.get(self.cursor).map(String::as_str)
        } else {
            self.cursor = self.entries.len();
            None
        }
    }

    /// Write the history to its file, if it has one.
    pub fn save(&self) -> MuxResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.entries.join("\n"))?;
        Ok(())
    }
}

fn truncate_front(entries: &mut Vec<String>) {
    if entries.len() > MAX_HISTORY {
        entries.drain(..entries.len() - MAX_HISTORY);
    }
}
