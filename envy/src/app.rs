//! The controller.
//!
//! [`App`] owns all interface state and is driven by the main loop one
//! [`Event`] at a time. Session workers never touch it directly; they post
//! into the event channel through [`EventProxy`].

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, info, warn};

use envy_multiplexer::buffer::LineKind;
use envy_multiplexer::command::AppCommand;
use envy_multiplexer::config::EnvyConfig;
use envy_multiplexer::error::MuxError;
use envy_multiplexer::history::History;
use envy_multiplexer::input::InputLine;
use envy_multiplexer::process::SessionEvent;
use envy_multiplexer::profile::{DEFAULT_PROFILE, ProfileStore, is_valid_profile_name};
use envy_multiplexer::registry::PaneRegistry;
use envy_multiplexer::state::{self, AppState};

use crate::actions;
use crate::builtins;
use crate::completion::{Completer, Sources};
use crate::editor::{Editor, NO_PROFILES};
use crate::event::{Event, EventProxy};
use crate::keys;
use crate::system;

/// Lines moved by PageUp and PageDown.
const PAGE_SCROLL: usize = 5;

/// Glyph repeated to separate consecutive commands.
const SEPARATOR: &str = "┈";

/// View receiving keys that are not global bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Terminal,
    Profiles,
    Editor,
}

/// What a modal prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    NewProfile,
    DeleteProfile(String),
    RenameProfile(String),
    /// Leaving the editor with unsaved changes.
    ConfirmSave,
}

/// Modal prompt drawn over the profile views.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub kind: PromptKind,
    /// Typed answer; unused by yes/no prompts.
    pub input: InputLine,
    pub error: Option<String>,
}

impl Prompt {
    fn new(kind: PromptKind) -> Self {
        Self { kind, input: InputLine::default(), error: None }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            PromptKind::NewProfile => "Create Environment",
            PromptKind::DeleteProfile(_) => "Confirm Delete",
            PromptKind::RenameProfile(_) => "Rename Environment",
            PromptKind::ConfirmSave => "Unsaved Changes",
        }
    }

    pub fn message(&self) -> &'static str {
        match self.kind {
            PromptKind::NewProfile => "Enter environment name:",
            PromptKind::DeleteProfile(_) => "Are you sure? (y/n)",
            PromptKind::RenameProfile(_) => "Enter new name:",
            PromptKind::ConfirmSave => "Save changes before exiting? (y/n)",
        }
    }

    /// Whether the prompt is answered with a single `y` or `n`.
    pub fn is_confirmation(&self) -> bool {
        matches!(self.kind, PromptKind::DeleteProfile(_) | PromptKind::ConfirmSave)
    }
}

/// Files the controller reads and writes.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Folder of `.env` profiles and the state file.
    pub env_dir: PathBuf,
    /// Command history.
    pub history_file: PathBuf,
}

pub struct App {
    pub registry: PaneRegistry,
    pub store: ProfileStore,
    pub config: EnvyConfig,
    bindings: HashMap<String, AppCommand>,
    pub history: History,
    /// Active profile.
    pub profile: String,
    /// Variables of the active profile, applied to every spawn.
    pub vars: BTreeMap<String, String>,
    /// Profile names listed in the panel.
    pub profiles: Vec<String>,
    /// Highlighted entry of `profiles`.
    pub selected: usize,
    pub mode: Mode,
    pub prompt: Option<Prompt>,
    pub editor: Editor,
    /// Working directory handed to spawned commands.
    pub cwd: PathBuf,
    pub home: Option<PathBuf>,
    pub git_branch: Option<String>,
    completer: Completer,
    pub proxy: EventProxy,
    /// Columns and rows of the output area at the last draw.
    pub output_size: (usize, usize),
    quit: bool,
}

impl App {
    pub fn new(paths: Paths, config: EnvyConfig, proxy: EventProxy, cwd: PathBuf) -> Self {
        let store = ProfileStore::new(paths.env_dir);
        if let Err(err) = store.ensure_dir() {
            warn!("Failed to create {}: {err}", store.dir().display());
        }

        let history = History::load(&paths.history_file).unwrap_or_else(|err| {
            warn!("Failed to load history from {}: {err}", paths.history_file.display());
            History::in_memory()
        });

        let AppState { last_profile } = state::load_state(store.dir());
        let profile = if is_valid_profile_name(&last_profile) {
            last_profile
        } else {
            DEFAULT_PROFILE.to_owned()
        };

        let mut app = Self {
            registry: PaneRegistry::new(),
            store,
            bindings: config.keybindings.to_bindings_map(),
            config,
            history,
            profile,
            vars: BTreeMap::new(),
            profiles: Vec::new(),
            selected: 0,
            mode: Mode::Terminal,
            prompt: None,
            editor: Editor::default(),
            git_branch: system::git_branch(&cwd),
            cwd,
            home: home::home_dir(),
            completer: Completer::default(),
            proxy,
            output_size: (80, 24),
            quit: false,
        };
        app.reload_vars();
        app.refresh_profiles();
        info!("Started with profile {}", app.profile);
        app
    }

    /// Whether the main loop should exit.
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn request_quit(&mut self) {
        info!("Quit requested");
        self.quit = true;
    }

    /// Kill every process and persist history and state.
    pub fn shutdown(&mut self) {
        self.registry.terminate_all();
        if let Err(err) = self.history.save() {
            warn!("Failed to save history: {err}");
        }
        self.save_state();
    }

    /// Append a line to the active pane.
    pub fn say(&self, kind: LineKind, text: impl Into<String>) {
        self.registry.active_pane().push_line(kind, text);
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Paste(text) => self.handle_paste(&text),
            Event::Session(SessionEvent::Finished(completion)) => {
                if !self.registry.complete(&completion) {
                    debug!("Dropped completion for pane {}", completion.pane_id);
                }
            },
            // Re-arm the pane's notification; the redraw follows this batch.
            Event::Session(SessionEvent::Output(pane_id)) => {
                if let Some(pane) = self.registry.get(pane_id) {
                    pane.output().take_pending();
                }
            },
            Event::Resize | Event::Tick => {},
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return;
        }
        if let Some(command) = keys::map_command_key(&key, &self.bindings) {
            actions::execute_command(self, command);
            return;
        }
        match self.mode {
            Mode::Terminal => self.handle_terminal_key(key),
            Mode::Profiles => self.handle_profile_key(key),
            Mode::Editor => self.handle_editor_key(key),
        }
    }

    fn handle_paste(&mut self, text: &str) {
        if let Some(prompt) = &mut self.prompt {
            if !prompt.is_confirmation() {
                insert_text(&mut prompt.input, text);
            }
            return;
        }
        match self.mode {
            Mode::Terminal => {
                self.completer.reset();
                insert_text(&mut self.registry.active_pane_mut().input, text);
            },
            Mode::Editor if self.editor.header_focus => insert_text(&mut self.editor.header, text),
            Mode::Editor => {
                for c in text.chars().filter(|&c| c != '\r') {
                    match c {
                        '\n' => self.editor.newline(),
                        c if !c.is_control() => self.editor.insert(c),
                        _ => {},
                    }
                }
            },
            Mode::Profiles => {},
        }
    }

    fn handle_terminal_key(&mut self, key: KeyEvent) {
        if key.code != KeyCode::Tab {
            self.completer.reset();
        }
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Enter => self.submit(),
            KeyCode::Up if shift => self.scroll_output(true, 1),
            KeyCode::Down if shift => self.scroll_output(false, 1),
            KeyCode::PageUp => self.scroll_output(true, PAGE_SCROLL),
            KeyCode::PageDown => self.scroll_output(false, PAGE_SCROLL),
            KeyCode::Up => {
                if let Some(entry) = self.history.older() {
                    let entry = entry.to_owned();
                    self.registry.active_pane_mut().input.set(entry);
                }
            },
            KeyCode::Down => {
                let entry = self.history.newer().map(str::to_owned);
                let input = &mut self.registry.active_pane_mut().input;
                match entry {
                    Some(entry) => input.set(entry),
                    None => input.clear(),
                }
            },
            KeyCode::Tab => self.complete_input(),
            _ => {
                edit_line(&mut self.registry.active_pane_mut().input, &key);
            },
        }
    }

    /// Submit the active pane's input line.
    ///
    /// While a process runs the line goes to its stdin; otherwise it is
    /// recorded in history and executed.
    fn submit(&mut self) {
        let prompt = self.command_prompt();
        let width = self.output_size.0.max(1);
        let pane = self.registry.active_pane_mut();
        pane.scroll = 0;

        if pane.is_running() {
            let text = pane.input.take();
            pane.push_line(LineKind::Echo, format!("{prompt}{text}"));
            pane.write_stdin(format!("{text}\n").as_bytes());
            return;
        }

        let line = pane.input.value().trim().to_owned();
        if line.is_empty() {
            return;
        }
        pane.input.clear();
        if !pane.output().is_empty() {
            pane.push_line(LineKind::Muted, SEPARATOR.repeat(width));
        }
        pane.push_line(LineKind::Echo, format!("{prompt}{line}"));

        self.history.push(&line);
        if let Err(err) = self.history.save() {
            warn!("Failed to save history: {err}");
        }
        builtins::execute(self, &line);
    }

    fn scroll_output(&mut self, up: bool, lines: usize) {
        let height = self.output_size.1;
        let pane = self.registry.active_pane_mut();
        let max = pane.output().len().saturating_sub(height);
        pane.scroll = if up { (pane.scroll + lines).min(max) } else { pane.scroll.saturating_sub(lines) };
    }

    fn complete_input(&mut self) {
        let sources = Sources { profiles: &self.profiles, vars: &self.vars, cwd: &self.cwd };
        let pane = self.registry.active_pane_mut();
        if let Some(candidate) = self.completer.next(pane.input.value(), &sources) {
            pane.input.set(candidate.to_owned());
        }
    }

    /// Directory shown in the prompt: `~` for home, otherwise the basename.
    pub fn prompt_dir(&self) -> String {
        if self.home.as_deref() == Some(self.cwd.as_path()) {
            return "~".into();
        }
        self.cwd
            .file_name()
            .map_or_else(|| self.cwd.display().to_string(), |name| name.to_string_lossy().into_owned())
    }

    /// Full prompt text, as echoed before each submitted command.
    pub fn command_prompt(&self) -> String {
        let branch = self.git_branch.as_deref().map(|b| format!(" ({b})")).unwrap_or_default();
        format!("[{}] {}{branch} ➤ ", self.profile, self.prompt_dir())
    }

    fn handle_profile_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                if self.selected > 0 {
                    self.selected -= 1;
                    self.load_selected();
                }
            },
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.profiles.len() {
                    self.selected += 1;
                    self.load_selected();
                }
            },
            KeyCode::Enter => {
                if let Some(name) = self.profiles.get(self.selected).cloned() {
                    self.activate_profile(&name);
                    self.say(LineKind::Success, format!("✓ Switched to {name}"));
                    self.mode = Mode::Terminal;
                }
            },
            KeyCode::Char('n') => self.prompt = Some(Prompt::new(PromptKind::NewProfile)),
            KeyCode::Char('d') => {
                let Some(name) = self.profiles.get(self.selected).cloned() else {
                    return;
                };
                if name == self.profile {
                    self.say(LineKind::Error, "Cannot delete active profile");
                } else if name == DEFAULT_PROFILE {
                    self.say(LineKind::Error, "Cannot delete default");
                } else {
                    self.prompt = Some(Prompt::new(PromptKind::DeleteProfile(name)));
                }
            },
            KeyCode::Char('r') => {
                let Some(name) = self.profiles.get(self.selected).cloned() else {
                    return;
                };
                if name == DEFAULT_PROFILE {
                    self.say(LineKind::Error, "Cannot rename default");
                } else {
                    let mut prompt = Prompt::new(PromptKind::RenameProfile(name.clone()));
                    prompt.input.set(name);
                    self.prompt = Some(prompt);
                }
            },
            KeyCode::Tab => {
                if self.editor.profile().is_some() {
                    self.mode = Mode::Editor;
                }
            },
            KeyCode::Esc => self.mode = Mode::Terminal,
            _ => {},
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('s') {
            self.save_editor();
            return;
        }

        if self.editor.header_focus {
            match key.code {
                KeyCode::Esc | KeyCode::Tab => self.unfocus_header(),
                KeyCode::Enter | KeyCode::Down => self.rename_from_header(),
                _ => {
                    edit_line(&mut self.editor.header, &key);
                },
            }
            return;
        }

        if matches!(key.code, KeyCode::Esc | KeyCode::Tab) {
            self.leave_editor(Mode::Profiles);
            return;
        }

        let editor = &mut self.editor;
        match key.code {
            KeyCode::Up => {
                if !editor.move_up() {
                    editor.header_focus = true;
                }
            },
            KeyCode::Down => editor.move_down(),
            KeyCode::Left => editor.move_left(),
            KeyCode::Right => editor.move_right(),
            KeyCode::Home => editor.move_home(),
            KeyCode::End => editor.move_end(),
            KeyCode::Enter => editor.newline(),
            KeyCode::Backspace => editor.backspace(),
            KeyCode::Delete => editor.delete(),
            KeyCode::Char(c) if !keys::has_command_modifier(&key) => editor.insert(c),
            _ => {},
        }
    }

    fn unfocus_header(&mut self) {
        let name = self.editor.profile().unwrap_or_default().to_owned();
        self.editor.header.set(name);
        self.editor.header_focus = false;
    }

    fn rename_from_header(&mut self) {
        let new_name = self.editor.header.value().trim().to_owned();
        if let Some(old) = self.editor.profile().map(str::to_owned) {
            if !new_name.is_empty() && new_name != old {
                self.rename_profile(&old, &new_name);
            }
        }
        self.unfocus_header();
    }

    /// Leave the editor for `next`, asking first if there are unsaved edits.
    pub fn leave_editor(&mut self, next: Mode) {
        if self.editor.is_dirty() {
            self.prompt = Some(Prompt::new(PromptKind::ConfirmSave));
        } else {
            self.editor.header_focus = false;
            self.mode = next;
        }
    }

    /// Write the editor content to its profile file.
    fn save_editor(&mut self) -> bool {
        let Some(name) = self.editor.profile().map(str::to_owned) else {
            return false;
        };
        match self.store.write_raw(&name, &self.editor.value()) {
            Ok(()) => {
                self.editor.mark_saved();
                info!("Saved profile {name}");
                if name == self.profile {
                    self.reload_vars();
                }
                true
            },
            Err(err) => {
                warn!("Failed to save profile {name}: {err}");
                self.say(LineKind::Error, format!("Error saving {name}: {err}"));
                false
            },
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = &mut self.prompt else {
            return;
        };

        if key.code == KeyCode::Esc {
            let kind = prompt.kind.clone();
            self.prompt = None;
            self.mode = if kind == PromptKind::ConfirmSave { Mode::Editor } else { Mode::Profiles };
            return;
        }

        if prompt.is_confirmation() {
            let answer = match key.code {
                KeyCode::Char('y' | 'Y') => true,
                KeyCode::Char('n' | 'N') => false,
                _ => return,
            };
            if let Some(prompt) = self.prompt.take() {
                self.answer_confirmation(prompt.kind, answer);
            }
            return;
        }

        if key.code == KeyCode::Enter {
            if let Some(prompt) = self.prompt.take() {
                self.submit_prompt(prompt);
            }
            return;
        }
        if edit_line(&mut prompt.input, &key) {
            prompt.error = None;
        }
    }

    fn answer_confirmation(&mut self, kind: PromptKind, yes: bool) {
        match kind {
            PromptKind::DeleteProfile(name) => {
                if yes {
                    match self.store.delete(&name, &self.profile) {
                        Ok(()) => {
                            self.refresh_profiles();
                            self.load_selected();
                        },
                        Err(err) => self.say(LineKind::Error, err.to_string()),
                    }
                }
                self.mode = Mode::Profiles;
            },
            PromptKind::ConfirmSave => {
                let saved = if yes {
                    self.save_editor()
                } else {
                    self.editor.revert();
                    true
                };
                self.editor.header_focus = false;
                self.mode = if saved { Mode::Profiles } else { Mode::Editor };
            },
            PromptKind::NewProfile | PromptKind::RenameProfile(_) => {},
        }
    }

    /// Act on a typed prompt answer. Invalid answers reopen the prompt with
    /// an error.
    fn submit_prompt(&mut self, mut prompt: Prompt) {
        let value = prompt.input.value().trim().to_owned();
        match prompt.kind.clone() {
            PromptKind::NewProfile => {
                if value.is_empty() {
                    self.prompt = Some(prompt);
                    return;
                }
                match self.store.create(&value) {
                    Ok(()) => {
                        self.refresh_profiles();
                        self.select(&value);
                        self.load_selected();
                        self.mode = Mode::Editor;
                    },
                    Err(err) => {
                        prompt.error = Some(profile_error_text(&err));
                        self.prompt = Some(prompt);
                    },
                }
            },
            PromptKind::RenameProfile(old) => {
                if !value.is_empty() && value != old {
                    self.rename_profile(&old, &value);
                }
                self.mode = Mode::Profiles;
            },
            PromptKind::DeleteProfile(_) | PromptKind::ConfirmSave => {},
        }
    }

    /// Rename a profile, following it as the active and edited profile.
    pub fn rename_profile(&mut self, old: &str, new: &str) -> bool {
        if let Err(err) = self.store.rename(old, new) {
            self.say(LineKind::Error, profile_error_text(&err));
            return false;
        }
        info!("Renamed profile {old} to {new}");
        if self.profile == old {
            self.profile = new.to_owned();
            self.save_state();
        }
        if self.editor.profile() == Some(old) {
            self.editor.set_profile(new);
        }
        self.refresh_profiles();
        self.select(new);
        true
    }

    /// Make `name` the active profile and remember it for the next start.
    pub fn activate_profile(&mut self, name: &str) {
        self.profile = name.to_owned();
        self.reload_vars();
        self.save_state();
        info!("Switched to profile {name}");
    }

    /// Re-read the active profile's variables from disk.
    pub fn reload_vars(&mut self) {
        let loaded = self.store.load(&self.profile);
        self.vars = loaded.vars;
        if let Some(err) = loaded.error {
            self.say(LineKind::Error, err);
        }
    }

    /// Persist the active profile's variables.
    pub fn save_vars(&self) -> bool {
        match self.store.save_vars(&self.profile, &self.vars) {
            Ok(()) => true,
            Err(err) => {
                warn!("Failed to save profile {}: {err}", self.profile);
                self.say(LineKind::Error, format!("Error saving {}: {err}", self.profile));
                false
            },
        }
    }

    fn save_state(&self) {
        let state = AppState { last_profile: self.profile.clone() };
        if let Err(err) = state::save_state(self.store.dir(), &state) {
            warn!("Failed to save state: {err}");
        }
    }

    /// Re-list profiles, keeping the selection on the active profile.
    pub fn refresh_profiles(&mut self) {
        self.profiles = self.store.list().unwrap_or_else(|err| {
            warn!("Failed to list profiles: {err}");
            Vec::new()
        });
        let profile = self.profile.clone();
        self.select(&profile);
    }

    /// Highlight `name` if listed, otherwise keep the selection in range.
    fn select(&mut self, name: &str) {
        self.selected = match self.profiles.iter().position(|p| p == name) {
            Some(idx) => idx,
            None => self.selected.min(self.profiles.len().saturating_sub(1)),
        };
    }

    /// Load the highlighted profile into the editor.
    pub fn load_selected(&mut self) {
        match self.profiles.get(self.selected) {
            Some(name) => match self.store.read_raw(name) {
                Ok(content) => self.editor.load(name, &content),
                Err(err) => self.editor.load_placeholder(&format!("Error loading file: {err}")),
            },
            None => self.editor.load_placeholder(NO_PROFILES),
        }
    }
}

/// Message for a failed profile operation.
fn profile_error_text(err: &MuxError) -> String {
    match err {
        MuxError::InvalidProfileName(_) => "Invalid name".into(),
        MuxError::ProfileExists(_) => "Already exists".into(),
        MuxError::ProfileNotFound(name) => format!("Not found: {name}"),
        MuxError::ProtectedProfile(name) if name == DEFAULT_PROFILE => "Cannot rename default".into(),
        err => err.to_string(),
    }
}

/// Apply an editing key to a single-line input. Returns whether it was
/// consumed.
pub fn edit_line(input: &mut InputLine, key: &KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    match key.code {
        KeyCode::Char('u') if ctrl => input.clear(),
        KeyCode::Char('a') if ctrl => input.move_home(),
        KeyCode::Char(c) if !ctrl && !alt => input.insert(c),
        KeyCode::Backspace if alt || ctrl => input.delete_word(),
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        _ => return false,
    }
    true
}

/// Insert pasted text up to its first line break.
fn insert_text(input: &mut InputLine, text: &str) {
    for c in text.chars().take_while(|&c| c != '\n' && c != '\r') {
        if !c.is_control() {
            input.insert(c);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::fs;
    use std::sync::mpsc::{self, Receiver};
    use std::time::{Duration, Instant};

    use super::*;

    pub(crate) struct Harness {
        pub app: App,
        pub rx: Receiver<Event>,
        pub dir: tempfile::TempDir,
    }

    impl Harness {
        pub fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let (tx, rx) = mpsc::channel();
            let paths = Paths {
                env_dir: dir.path().join("envs"),
                history_file: dir.path().join(".envy_history"),
            };
            let app = App::new(paths, EnvyConfig::default(), EventProxy::new(tx), dir.path().into());
            Self { app, rx, dir }
        }

        pub fn press(&mut self, code: KeyCode) {
            self.app.handle_event(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
        }

        pub fn ctrl(&mut self, c: char) {
            self.app.handle_event(Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)));
        }

        pub fn type_str(&mut self, text: &str) {
            for c in text.chars() {
                self.press(KeyCode::Char(c));
            }
        }

        pub fn run(&mut self, line: &str) {
            self.type_str(line);
            self.press(KeyCode::Enter);
        }

        pub fn texts(&self) -> Vec<String> {
            self.app.registry.active_pane().output().lines().into_iter().map(|l| l.text).collect()
        }

        pub fn last(&self) -> String {
            self.app.registry.active_pane().output().last_text().unwrap_or_default()
        }

        /// Feed session events back until the active pane is idle.
        pub fn wait_idle(&mut self) {
            let deadline = Instant::now() + Duration::from_secs(10);
            while self.app.registry.active_pane().is_running() {
                let left = deadline.saturating_duration_since(Instant::now());
                let event = self.rx.recv_timeout(left).expect("session did not finish");
                self.app.handle_event(event);
            }
        }
    }

    #[test]
    fn starts_on_default_profile() {
        let h = Harness::new();
        assert_eq!(h.app.profile, DEFAULT_PROFILE);
        assert!(h.dir.path().join("envs/default.env").is_file());
        assert_eq!(h.app.profiles, ["default"]);
        assert_eq!(h.app.mode, Mode::Terminal);
    }

    #[test]
    fn restores_last_profile() {
        let dir = tempfile::tempdir().unwrap();
        let env_dir = dir.path().join("envs");
        fs::create_dir_all(&env_dir).unwrap();
        fs::write(env_dir.join("staging.env"), "A=1\n").unwrap();
        state::save_state(&env_dir, &AppState { last_profile: "staging".into() }).unwrap();

        let (tx, _rx) = mpsc::channel();
        let paths = Paths { env_dir, history_file: dir.path().join("h") };
        let app = App::new(paths, EnvyConfig::default(), EventProxy::new(tx), dir.path().into());
        assert_eq!(app.profile, "staging");
        assert_eq!(app.vars.get("A").map(String::as_str), Some("1"));
    }

    #[test]
    fn submit_echoes_and_records_history() {
        let mut h = Harness::new();
        h.run("pwd");
        let texts = h.texts();
        assert!(texts[0].ends_with("➤ pwd"), "{texts:?}");
        assert!(texts[0].starts_with("[default] "));
        assert_eq!(h.app.history.entries(), ["pwd"]);
        assert!(h.dir.path().join(".envy_history").is_file());

        h.run("pwd");
        let texts = h.texts();
        assert!(texts[2].chars().all(|c| c == '┈'), "{texts:?}");
        assert_eq!(h.app.history.entries(), ["pwd"]);
    }

    #[test]
    fn blank_submit_does_nothing() {
        let mut h = Harness::new();
        h.run("   ");
        assert!(h.texts().is_empty());
        assert!(h.app.history.entries().is_empty());
    }

    #[test]
    fn history_navigation() {
        let mut h = Harness::new();
        h.run("pwd");
        h.run("env");
        h.press(KeyCode::Up);
        assert_eq!(h.app.registry.active_pane().input.value(), "env");
        h.press(KeyCode::Up);
        assert_eq!(h.app.registry.active_pane().input.value(), "pwd");
        h.press(KeyCode::Down);
        assert_eq!(h.app.registry.active_pane().input.value(), "env");
        h.press(KeyCode::Down);
        assert_eq!(h.app.registry.active_pane().input.value(), "");
    }

    #[test]
    fn tab_completes_builtins() {
        let mut h = Harness::new();
        h.type_str("he");
        h.press(KeyCode::Tab);
        assert_eq!(h.app.registry.active_pane().input.value(), "help");
    }

    #[test]
    fn new_profile_prompt_opens_editor() {
        let mut h = Harness::new();
        h.ctrl('e');
        assert_eq!(h.app.mode, Mode::Profiles);
        h.press(KeyCode::Char('n'));
        assert_eq!(h.app.prompt.as_ref().map(Prompt::title), Some("Create Environment"));

        h.type_str("bad name");
        h.press(KeyCode::Enter);
        assert_eq!(h.app.prompt.as_ref().and_then(|p| p.error.as_deref()), Some("Invalid name"));

        for _ in 0..8 {
            h.press(KeyCode::Backspace);
        }
        h.type_str("dev");
        h.press(KeyCode::Enter);
        assert!(h.app.prompt.is_none());
        assert_eq!(h.app.mode, Mode::Editor);
        assert_eq!(h.app.editor.profile(), Some("dev"));
        assert_eq!(h.app.profiles, ["default", "dev"]);
    }

    #[test]
    fn editor_save_reloads_active_profile() {
        let mut h = Harness::new();
        h.ctrl('e');
        h.press(KeyCode::Tab);
        assert_eq!(h.app.mode, Mode::Editor);
        h.ctrl('e');
        // Clean editor leaves without asking.
        assert_eq!(h.app.mode, Mode::Terminal);

        h.ctrl('e');
        h.press(KeyCode::Tab);
        for _ in 0..10 {
            h.press(KeyCode::Down);
        }
        h.press(KeyCode::End);
        h.type_str("API=1");
        h.ctrl('s');
        assert!(!h.app.editor.is_dirty());
        assert_eq!(h.app.vars.get("API").map(String::as_str), Some("1"));
    }

    #[test]
    fn unsaved_changes_prompt() {
        let mut h = Harness::new();
        h.ctrl('e');
        h.press(KeyCode::Tab);
        h.type_str("X=1");
        h.press(KeyCode::Esc);
        assert_eq!(h.app.prompt.as_ref().map(|p| p.kind.clone()), Some(PromptKind::ConfirmSave));

        // Anything but y/n keeps asking.
        h.press(KeyCode::Char('x'));
        assert!(h.app.prompt.is_some());

        h.press(KeyCode::Esc);
        assert!(h.app.prompt.is_none());
        assert_eq!(h.app.mode, Mode::Editor);

        h.press(KeyCode::Esc);
        h.press(KeyCode::Char('n'));
        assert_eq!(h.app.mode, Mode::Profiles);
        assert!(!h.app.editor.is_dirty());
        assert!(!h.app.editor.value().contains("X=1"));
    }

    #[test]
    fn delete_refuses_active_and_confirms_others() {
        let mut h = Harness::new();
        h.app.store.create("old").unwrap();
        h.ctrl('e');
        h.press(KeyCode::Char('d'));
        assert!(h.app.prompt.is_none());
        assert_eq!(h.last(), "Cannot delete active profile");

        h.press(KeyCode::Down);
        assert_eq!(h.app.profiles[h.app.selected], "old");
        h.press(KeyCode::Char('d'));
        h.press(KeyCode::Char('y'));
        assert_eq!(h.app.profiles, ["default"]);
        assert!(!h.app.store.exists("old"));
    }

    #[test]
    fn rename_follows_active_profile() {
        let mut h = Harness::new();
        h.app.store.create("qa").unwrap();
        h.app.activate_profile("qa");
        h.ctrl('e');
        assert_eq!(h.app.profiles[h.app.selected], "qa");
        h.press(KeyCode::Char('r'));
        h.press(KeyCode::Backspace);
        h.press(KeyCode::Backspace);
        h.type_str("test");
        h.press(KeyCode::Enter);
        assert_eq!(h.app.profile, "test");
        assert_eq!(h.app.profiles, ["default", "test"]);
        assert_eq!(state::load_state(h.app.store.dir()).last_profile, "test");
    }

    #[test]
    fn header_rename() {
        let mut h = Harness::new();
        h.app.store.create("web").unwrap();
        h.ctrl('e');
        h.press(KeyCode::Down);
        h.press(KeyCode::Tab);
        h.press(KeyCode::Up);
        assert!(h.app.editor.header_focus);
        h.type_str("2");
        h.press(KeyCode::Enter);
        assert!(!h.app.editor.header_focus);
        assert_eq!(h.app.editor.profile(), Some("web2"));
        assert!(h.app.store.exists("web2"));
    }

    #[test]
    fn enter_in_panel_switches_profile() {
        let mut h = Harness::new();
        h.app.store.create("prod").unwrap();
        h.ctrl('e');
        h.app.refresh_profiles();
        h.press(KeyCode::Char('j'));
        h.press(KeyCode::Enter);
        assert_eq!(h.app.profile, "prod");
        assert_eq!(h.app.mode, Mode::Terminal);
        assert_eq!(h.last(), "✓ Switched to prod");
    }

    #[test]
    fn paste_stops_at_newline() {
        let mut h = Harness::new();
        h.app.handle_event(Event::Paste("echo hi\nrm -rf".into()));
        assert_eq!(h.app.registry.active_pane().input.value(), "echo hi");
    }

    #[test]
    fn shutdown_persists_state() {
        let mut h = Harness::new();
        h.app.shutdown();
        assert_eq!(state::load_state(h.app.store.dir()).last_profile, DEFAULT_PROFILE);
    }

    #[cfg(unix)]
    #[test]
    fn external_command_runs_in_cwd() {
        let mut h = Harness::new();
        fs::create_dir(h.dir.path().join("sub")).unwrap();
        fs::write(h.dir.path().join("sub/marker.txt"), "").unwrap();
        h.run("cd sub");
        h.run("ls");
        h.wait_idle();
        assert!(h.texts().iter().any(|t| t == "marker.txt"), "{:?}", h.texts());
        assert_eq!(h.app.registry.active_pane().display_name(), "Term 1");
    }

    #[cfg(unix)]
    #[test]
    fn stdin_is_forwarded_while_running() {
        let mut h = Harness::new();
        h.run("head -n 1");
        assert!(h.app.registry.active_pane().is_running());
        h.run("ping");
        h.wait_idle();
        let texts = h.texts();
        assert!(texts.iter().any(|t| t.ends_with("➤ ping")), "{texts:?}");
        assert_eq!(texts.last().map(String::as_str), Some("ping"));
    }

    #[cfg(unix)]
    #[test]
    fn flooding_pane_keeps_event_queue_short() {
        let mut h = Harness::new();
        h.run("yes");
        for _ in 0..3 {
            std::thread::sleep(Duration::from_millis(200));
            let queued: Vec<_> = h.rx.try_iter().collect();
            assert_eq!(queued.len(), 1, "{queued:?}");
            for event in queued {
                h.app.handle_event(event);
            }
        }

        h.ctrl('c');
        h.wait_idle();
        assert_eq!(h.app.registry.active_pane().output().len(), 1000);
        assert_eq!(h.last(), "killed");
    }

    #[cfg(unix)]
    #[test]
    fn profile_vars_reach_children() {
        let mut h = Harness::new();
        h.run("set GREETING hello");
        assert_eq!(h.last(), "✓ Set GREETING");
        h.run("sh -c 'echo $GREETING'");
        h.wait_idle();
        assert_eq!(h.last(), "hello");
    }
}
