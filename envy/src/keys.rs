//! Global key binding interception.
//!
//! Every key press is first converted to a key spec such as `"ctrl+n"` and
//! looked up in the bindings table. Bound keys become an [`AppCommand`];
//! everything else is handed to the focused view as text input.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use envy_multiplexer::command::AppCommand;

/// Map a key press to a bound command.
pub fn map_command_key(key: &KeyEvent, bindings: &HashMap<String, AppCommand>) -> Option<AppCommand> {
    let spec = key_to_spec(key)?;
    bindings.get(&spec).copied()
}

/// Convert a key event to its normalized spec.
///
/// Shift is only spelled out for non-character keys, since it is already part
/// of the character itself.
pub fn key_to_spec(key: &KeyEvent) -> Option<String> {
    let base: String = match key.code {
        KeyCode::Char(' ') => "space".into(),
        KeyCode::Char(c) => c.to_lowercase().collect(),
        KeyCode::Up => "up".into(),
        KeyCode::Down => "down".into(),
        KeyCode::Left => "left".into(),
        KeyCode::Right => "right".into(),
        KeyCode::Home => "home".into(),
        KeyCode::End => "end".into(),
        KeyCode::PageUp => "pageup".into(),
        KeyCode::PageDown => "pagedown".into(),
        KeyCode::Tab => "tab".into(),
        KeyCode::Enter => "enter".into(),
        KeyCode::Esc => "esc".into(),
        KeyCode::Backspace => "backspace".into(),
        KeyCode::Delete => "delete".into(),
        KeyCode::F(n) => format!("f{n}"),
        _ => return None,
    };

    let mut spec = String::new();
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        spec.push_str("ctrl+");
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        spec.push_str("alt+");
    }
    if key.modifiers.contains(KeyModifiers::SHIFT) && !matches!(key.code, KeyCode::Char(_)) {
        spec.push_str("shift+");
    }
    spec.push_str(&base);
    Some(spec)
}

/// Whether the key carries Control or Alt.
pub fn has_command_modifier(key: &KeyEvent) -> bool {
    key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

#[cfg(test)]
mod tests {
    use envy_multiplexer::config::KeybindingsConfig;

    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn specs() {
        assert_eq!(key_to_spec(&key(KeyCode::Char('n'), KeyModifiers::CONTROL)).unwrap(), "ctrl+n");
        assert_eq!(key_to_spec(&key(KeyCode::Char('N'), KeyModifiers::SHIFT)).unwrap(), "n");
        assert_eq!(
            key_to_spec(&key(KeyCode::Up, KeyModifiers::SHIFT | KeyModifiers::CONTROL)).unwrap(),
            "ctrl+shift+up"
        );
        assert_eq!(key_to_spec(&key(KeyCode::PageUp, KeyModifiers::NONE)).unwrap(), "pageup");
        assert_eq!(key_to_spec(&key(KeyCode::Null, KeyModifiers::NONE)), None);
    }

    #[test]
    fn default_bindings_resolve() {
        let bindings = KeybindingsConfig::default().to_bindings_map();
        let ctrl = |c| key(KeyCode::Char(c), KeyModifiers::CONTROL);

        assert_eq!(map_command_key(&ctrl('n'), &bindings), Some(AppCommand::NewPane));
        assert_eq!(map_command_key(&ctrl('w'), &bindings), Some(AppCommand::ClosePane));
        assert_eq!(map_command_key(&ctrl('h'), &bindings), Some(AppCommand::PrevPane));
        assert_eq!(map_command_key(&ctrl('l'), &bindings), Some(AppCommand::NextPane));
        assert_eq!(map_command_key(&ctrl('e'), &bindings), Some(AppCommand::ToggleProfiles));
        assert_eq!(map_command_key(&ctrl('c'), &bindings), Some(AppCommand::Interrupt));
        assert_eq!(map_command_key(&ctrl('d'), &bindings), Some(AppCommand::Quit));
        assert_eq!(
            map_command_key(&key(KeyCode::Right, KeyModifiers::CONTROL), &bindings),
            Some(AppCommand::NextPane)
        );
        assert_eq!(map_command_key(&key(KeyCode::Char('n'), KeyModifiers::NONE), &bindings), None);
    }
}
