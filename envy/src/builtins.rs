//! Built-in commands and external command dispatch.
//!
//! Built-ins run synchronously on the controller thread and report back
//! through lines in the active pane. Anything else is spawned in the active
//! pane with the active profile's environment.

use std::fs;

use log::{info, warn};

use envy_multiplexer::buffer::LineKind;
use envy_multiplexer::error::MuxError;
use envy_multiplexer::line::{self, Builtin, Invocation};
use envy_multiplexer::process::{Environment, SpawnRequest};
use envy_multiplexer::profile::{is_valid_profile_name, is_valid_var_name};

use crate::app::App;
use crate::system;

const COMMAND_HELP: [(&str, &str); 11] = [
    ("env", "Show variables"),
    ("set K V", "Set variable"),
    ("unset K", "Remove variable"),
    ("switch NAME", "Change profile"),
    ("new NAME", "Create profile"),
    ("cd [DIR]", "Change directory"),
    ("pwd", "Print directory"),
    ("open", "Open envs folder"),
    ("clear", "Clear terminal"),
    ("help", "Show this help"),
    ("exit", "Quit"),
];

const SHORTCUT_HELP: [(&str, &str); 7] = [
    ("Ctrl+N", "New terminal"),
    ("Ctrl+W", "Close terminal"),
    ("Ctrl+H/L", "Switch terminals"),
    ("Ctrl+E", "Profile editor"),
    ("Ctrl+C", "Kill process"),
    ("Ctrl+D", "Exit"),
    ("PgUp/PgDn", "Scroll output"),
];

/// Parse and run a submitted line in the active pane.
pub fn execute(app: &mut App, input: &str) {
    match line::parse(input) {
        Ok(None) => {},
        Ok(Some(Invocation::Builtin(builtin))) => run_builtin(app, builtin),
        Ok(Some(Invocation::Usage(usage))) => app.say(LineKind::Error, usage),
        Ok(Some(Invocation::External { program, args })) => spawn_external(app, program, args),
        Err(err) => app.say(LineKind::Error, err.to_string()),
    }
}

fn run_builtin(app: &mut App, builtin: Builtin) {
    match builtin {
        Builtin::Exit => app.request_quit(),
        Builtin::Clear => {
            let pane = app.registry.active_pane_mut();
            pane.output().clear();
            pane.scroll = 0;
        },
        Builtin::Cd(dir) => change_dir(app, dir.as_deref()),
        Builtin::Pwd => app.say(LineKind::Info, app.cwd.display().to_string()),
        Builtin::Open => {
            let opened = app
                .store
                .ensure_dir()
                .and_then(|()| system::open_folder(app.store.dir()).map_err(MuxError::from));
            match opened {
                Ok(()) => app.say(LineKind::Success, "✓ Opened envs folder"),
                Err(err) => app.say(LineKind::Error, format!("Error opening folder: {err}")),
            }
        },
        Builtin::Env => {
            if app.vars.is_empty() {
                app.say(LineKind::Muted, "No variables");
            }
            for (key, value) in &app.vars {
                app.say(LineKind::Info, format!("{key}={value}"));
            }
        },
        Builtin::Set { key, value } => {
            if !is_valid_var_name(&key) {
                app.say(LineKind::Error, "Invalid variable name");
                return;
            }
            app.vars.insert(key.clone(), value);
            if app.save_vars() {
                app.say(LineKind::Success, format!("✓ Set {key}"));
            }
        },
        Builtin::Unset(key) => {
            app.vars.remove(&key);
            if app.save_vars() {
                app.say(LineKind::Success, format!("✓ Unset {key}"));
            }
        },
        Builtin::Switch(name) => {
            if !is_valid_profile_name(&name) || !app.store.exists(&name) {
                app.say(LineKind::Error, format!("Not found: {name}"));
                return;
            }
            app.activate_profile(&name);
            app.say(LineKind::Success, format!("✓ Switched to {name}"));
        },
        Builtin::New(name) => match app.store.create(&name) {
            Ok(()) => {
                app.refresh_profiles();
                app.say(LineKind::Success, format!("✓ Created {name}"));
            },
            Err(MuxError::InvalidProfileName(_)) => app.say(LineKind::Error, "Invalid name"),
            Err(MuxError::ProfileExists(_)) => app.say(LineKind::Error, "Already exists"),
            Err(err) => app.say(LineKind::Error, err.to_string()),
        },
        Builtin::Help => show_help(app),
    }
}

fn change_dir(app: &mut App, dir: Option<&str>) {
    let target = system::resolve_dir(&app.cwd, dir, app.home.as_deref());
    match fs::metadata(&target) {
        Ok(meta) if meta.is_dir() => {
            info!("Changed directory to {}", target.display());
            app.git_branch = system::git_branch(&target);
            app.cwd = target;
        },
        Ok(_) => app.say(LineKind::Error, format!("cd: not a directory: {}", target.display())),
        Err(err) => app.say(LineKind::Error, format!("cd: {}: {err}", target.display())),
    }
}

fn show_help(app: &App) {
    app.say(LineKind::Info, "Commands");
    for (usage, what) in COMMAND_HELP {
        app.say(LineKind::Stdout, format!("  {usage:<14}{what}"));
    }
    app.say(LineKind::Stdout, "");
    app.say(LineKind::Info, "Shortcuts");
    for (keys, what) in SHORTCUT_HELP {
        app.say(LineKind::Stdout, format!("  {keys:<14}{what}"));
    }
}

/// Start `program` in the active pane with the active profile applied.
fn spawn_external(app: &mut App, program: String, args: Vec<String>) {
    let env = Environment::capture(&app.vars, app.config.force_color);
    let request = SpawnRequest::new(program, args, env)
        .cwd(&app.cwd)
        .drain_timeout(app.config.drain_timeout());
    let proxy = app.proxy.clone();
    if let Err(err) = app.registry.active_pane_mut().spawn(request, proxy) {
        warn!("Spawn failed: {err}");
        app.say(LineKind::Error, err.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::app::tests::Harness;

    #[test]
    fn set_env_unset() {
        let mut h = Harness::new();
        h.run("set API_URL http://localhost:8080");
        assert_eq!(h.last(), "✓ Set API_URL");
        h.run("set 9X y");
        assert_eq!(h.last(), "Invalid variable name");

        h.run("env");
        assert_eq!(h.last(), "API_URL=http://localhost:8080");
        let saved = fs::read_to_string(h.app.store.path("default")).unwrap();
        assert!(saved.contains("API_URL=http://localhost:8080"), "{saved}");

        h.run("unset API_URL");
        assert_eq!(h.last(), "✓ Unset API_URL");
        h.run("env");
        assert_eq!(h.last(), "No variables");
    }

    #[test]
    fn set_joins_remaining_words() {
        let mut h = Harness::new();
        h.run("set GREETING hello big world");
        assert_eq!(h.app.vars.get("GREETING").map(String::as_str), Some("hello big world"));
    }

    #[test]
    fn usage_and_parse_errors() {
        let mut h = Harness::new();
        h.run("set ONLY");
        assert_eq!(h.last(), "Usage: set KEY VALUE");
        h.run("switch");
        assert_eq!(h.last(), "Usage: switch <profile>");
        h.run("echo \"unterminated");
        assert!(h.last().starts_with("parse error"), "{}", h.last());
        assert!(!h.app.registry.active_pane().is_running());
    }

    #[test]
    fn new_and_switch() {
        let mut h = Harness::new();
        h.run("switch nope");
        assert_eq!(h.last(), "Not found: nope");
        h.run("new bad/name");
        assert_eq!(h.last(), "Invalid name");

        h.run("new dev");
        assert_eq!(h.last(), "✓ Created dev");
        assert_eq!(h.app.profiles, ["default", "dev"]);
        h.run("new dev");
        assert_eq!(h.last(), "Already exists");

        h.run("switch dev");
        assert_eq!(h.last(), "✓ Switched to dev");
        assert_eq!(h.app.profile, "dev");
        assert!(h.app.command_prompt().starts_with("[dev] "));
    }

    #[test]
    fn cd_and_pwd() {
        let mut h = Harness::new();
        let sub = h.dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        h.run("cd sub");
        assert_eq!(h.app.cwd, sub);
        h.run("pwd");
        assert_eq!(h.last(), sub.display().to_string());
        assert!(h.app.command_prompt().contains(" sub"));

        h.run("cd missing");
        assert!(h.last().starts_with("cd: "), "{}", h.last());
        assert_eq!(h.app.cwd, sub);

        h.run("cd ..");
        assert_eq!(h.app.cwd, h.dir.path());
    }

    #[test]
    fn clear_empties_pane() {
        let mut h = Harness::new();
        h.run("help");
        assert!(h.texts().iter().any(|t| t == "Commands"));
        h.run("cls");
        assert!(h.texts().is_empty());
    }

    #[test]
    fn exit_requests_quit() {
        let mut h = Harness::new();
        h.run("quit");
        assert!(h.app.should_quit());
    }

    #[test]
    fn spawn_failure_leaves_pane_idle() {
        let mut h = Harness::new();
        h.run("envy-definitely-not-a-command");
        assert!(!h.app.registry.active_pane().is_running());
        assert!(h.last().starts_with("envy-definitely-not-a-command: "), "{}", h.last());
        assert_eq!(h.app.registry.active_pane().display_name(), "Term 1");
    }

    #[cfg(unix)]
    #[test]
    fn running_pane_shows_program_name() {
        let mut h = Harness::new();
        h.run("sleep 30");
        assert!(h.app.registry.active_pane().is_running());
        assert_eq!(h.app.registry.active_pane().display_name(), "sleep");
        h.app.registry.active_pane().terminate();
        h.wait_idle();
        assert_eq!(h.app.registry.active_pane().display_name(), "Term 1");
    }
}
