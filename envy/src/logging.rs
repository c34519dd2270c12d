//! Logging to a file next to the profiles.
//!
//! The terminal belongs to the interface, so log records never go to stderr
//! while it runs.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "ENVY_LOG";

/// Install the global logger, appending to `path`.
pub fn initialize(path: &Path, verbose: bool) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let default = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    Builder::from_env(Env::new().filter_or(LOG_ENV, default.as_str()))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .map_err(io::Error::other)
}
