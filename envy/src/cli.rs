//! Command line options.

use std::env;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Name of the profile folder inside the config directory.
pub const ENV_FOLDER_NAME: &str = "envs";

/// Name of the history file inside the config directory.
pub const HISTORY_FILE_NAME: &str = ".envy_history";

/// Name of the log file inside the config directory.
pub const LOG_FILE_NAME: &str = "envy.log";

/// A multi-pane terminal layered over named environment profiles.
#[derive(Parser, Debug, Default)]
#[command(author, about, version)]
pub struct Options {
    /// Directory holding profiles, history and configuration.
    #[arg(long, env = "ENVY_HOME", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Log at debug level unless ENVY_LOG says otherwise.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands that run without the terminal interface.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Open the profile folder in the system file manager.
    Open,
}

impl Options {
    /// Resolve the config directory.
    ///
    /// Falls back to the directory of the executable, then to the current
    /// directory.
    pub fn config_dir(&self) -> PathBuf {
        if let Some(dir) = &self.config_dir {
            return dir.clone();
        }
        env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(PathBuf::from))
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Directory holding the `.env` profiles.
    pub fn env_dir(&self) -> PathBuf {
        self.config_dir().join(ENV_FOLDER_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_open_subcommand() {
        let options = Options::parse_from(["envy", "--config-dir", "/tmp/envy", "open"]);
        assert_eq!(options.command, Some(Command::Open));
        assert_eq!(options.env_dir(), PathBuf::from("/tmp/envy/envs"));
    }

    #[test]
    fn verbose_flag() {
        let options = Options::parse_from(["envy", "-v", "--config-dir", "x"]);
        assert!(options.verbose);
        assert_eq!(options.command, None);
    }

    #[test]
    fn clap_definition_is_valid() {
        use clap::CommandFactory;
        Options::command().debug_assert();
    }
}
