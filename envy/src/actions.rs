//! Execute bound commands against the controller.

use log::{debug, info};

use envy_multiplexer::buffer::LineKind;
use envy_multiplexer::command::AppCommand;

use crate::app::{App, Mode};

/// Execute a bound command. Returns `true` if it changed anything.
pub fn execute_command(app: &mut App, cmd: AppCommand) -> bool {
    match cmd {
        AppCommand::NewPane => new_pane(app),
        AppCommand::ClosePane => close_pane(app),
        AppCommand::PrevPane => {
            app.registry.focus_prev();
            app.mode = Mode::Terminal;
            true
        },
        AppCommand::NextPane => {
            app.registry.focus_next();
            app.mode = Mode::Terminal;
            true
        },
        AppCommand::ToggleProfiles => toggle_profiles(app),
        AppCommand::Interrupt => interrupt(app),
        AppCommand::Quit => quit(app),
    }
}

fn new_pane(app: &mut App) -> bool {
    let id = app.registry.create_pane();
    app.say(LineKind::Muted, format!("── Terminal {id} ──"));
    app.mode = Mode::Terminal;
    true
}

fn close_pane(app: &mut App) -> bool {
    match app.registry.close_active() {
        Ok(()) => {
            app.mode = Mode::Terminal;
            true
        },
        Err(e) => {
            debug!("Close pane refused: {e}");
            false
        },
    }
}

fn toggle_profiles(app: &mut App) -> bool {
    match app.mode {
        Mode::Terminal => {
            app.refresh_profiles();
            app.load_selected();
            app.mode = Mode::Profiles;
        },
        Mode::Profiles => app.mode = Mode::Terminal,
        Mode::Editor => app.leave_editor(Mode::Terminal),
    }
    true
}

/// Kill the active pane's process, or clear its input line when idle.
fn interrupt(app: &mut App) -> bool {
    if app.mode != Mode::Terminal {
        return false;
    }
    let pane = app.registry.active_pane_mut();
    if pane.is_running() {
        info!("Interrupting pane {}", pane.id());
        pane.terminate();
        pane.push_line(LineKind::Error, "^C");
    } else {
        pane.input.clear();
    }
    true
}

/// Quit, but only from an idle terminal pane.
fn quit(app: &mut App) -> bool {
    if app.mode != Mode::Terminal || app.registry.active_pane().is_running() {
        return false;
    }
    app.request_quit();
    true
}
