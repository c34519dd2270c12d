//! Error types for the multiplexer crate.

use std::io;

use crate::pane::PaneId;

/// Errors that can occur in the multiplexer.
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    /// The requested pane was not found.
    #[error("pane not found: {0}")]
    PaneNotFound(PaneId),

    /// The last remaining pane cannot be closed.
    #[error("cannot close the last pane")]
    LastPane,

    /// The pane already has a running process.
    #[error("pane {0} is already running a process")]
    AlreadyRunning(PaneId),

    /// The OS refused to start the process.
    #[error("{program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The profile name contains forbidden characters or is too long.
    #[error("invalid profile name: {0:?}")]
    InvalidProfileName(String),

    /// The profile does not exist on disk.
    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    /// A profile with this name already exists.
    #[error("profile already exists: {0}")]
    ProfileExists(String),

    /// The profile may not be deleted or renamed.
    #[error("profile is protected: {0}")]
    ProtectedProfile(String),

    /// Persisted state could not be read or written.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The configuration file is malformed.
    #[error("config error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience type alias for multiplexer results.
pub type MuxResult<T> = Result<T, MuxError>;
