//! A multi-pane terminal layered over named environment profiles.

use std::env;
use std::error::Error;
use std::fs;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use clap::Parser;
use log::{error, info};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use envy_multiplexer::buffer::LineKind;
use envy_multiplexer::config::EnvyConfig;

mod actions;
mod ansi;
mod app;
mod builtins;
mod cli;
mod completion;
mod editor;
mod event;
mod keys;
mod logging;
mod render;
mod system;
mod terminal;

use crate::app::{App, Paths};
use crate::cli::{Command, HISTORY_FILE_NAME, LOG_FILE_NAME, Options};
use crate::event::{Event, EventProxy};
use crate::terminal::TerminalModes;

/// Upper bound on queued events handled between two draws.
const MAX_EVENTS_PER_FRAME: usize = 256;

fn main() -> Result<(), Box<dyn Error>> {
    let options = Options::parse();
    let config_dir = options.config_dir();
    let env_dir = options.env_dir();

    if let Err(err) = logging::initialize(&config_dir.join(LOG_FILE_NAME), options.verbose) {
        eprintln!("envy: logging disabled: {err}");
    }
    info!("Version {}", env!("CARGO_PKG_VERSION"));

    match options.command {
        Some(Command::Open) => open(&env_dir),
        None => run(&config_dir, env_dir),
    }
}

/// `envy open`: reveal the profile folder and exit.
fn open(env_dir: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(env_dir)?;
    println!("Opening {}...", env_dir.display());
    system::open_folder(env_dir)?;
    Ok(())
}

fn run(config_dir: &Path, env_dir: PathBuf) -> Result<(), Box<dyn Error>> {
    let (config, config_error) = EnvyConfig::load(config_dir);
    let (sender, receiver) = mpsc::channel();
    let paths = Paths { env_dir, history_file: config_dir.join(HISTORY_FILE_NAME) };
    let mut app = App::new(paths, config, EventProxy::new(sender.clone()), env::current_dir()?);
    if let Some(err) = config_error {
        app.say(LineKind::Error, err.to_string());
    }
    app.say(LineKind::Muted, "Type 'help' for commands");

    terminal::install_panic_hook();
    let mut modes = TerminalModes::enable()?;
    let result = event_loop(&mut app, sender, receiver);
    app.shutdown();
    modes.undo();

    if let Err(err) = &result {
        error!("Event loop failed: {err}");
    }
    result
}

/// Draw, then handle events until a quit is requested.
fn event_loop(
    app: &mut App,
    sender: Sender<Event>,
    receiver: Receiver<Event>,
) -> Result<(), Box<dyn Error>> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;
    event::spawn_input_thread(sender)?;

    while !app.should_quit() {
        terminal.draw(|frame| render::draw(frame, app))?;

        let Ok(event) = receiver.recv() else {
            break;
        };
        app.handle_event(event);
        for event in receiver.try_iter().take(MAX_EVENTS_PER_FRAME) {
            if app.should_quit() {
                break;
            }
            app.handle_event(event);
        }
    }
    Ok(())
}
