//! Application command definitions and key spec normalization.

use serde::{Deserialize, Serialize};

/// A command dispatched by the key binding layer, before any text input
/// handling takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppCommand {
    /// Create a new pane and focus it.
    NewPane,
    /// Close the active pane.
    ClosePane,
    /// Focus the previous pane.
    PrevPane,
    /// Focus the next pane.
    NextPane,
    /// Show or hide the profile panel.
    ToggleProfiles,
    /// Kill the running process, or clear the input line when idle.
    Interrupt,
    /// Quit when the active pane is idle.
    Quit,
}

/// Modifier names in canonical order.
const MODIFIERS: [&str; 3] = ["ctrl", "alt", "shift"];

/// Normalize a key spec such as `"Ctrl+N"` or `"control+shift+left"` into
/// the canonical form used for binding lookup (`"ctrl+n"`,
/// `"ctrl+shift+left"`).
///
/// Returns `None` if the spec names no key or more than one key.
pub fn normalize_key_spec(spec: &str) -> Option<String> {
    let mut mods = [false; MODIFIERS.len()];
    let mut key = None;
    for part in spec.split('+').map(|p| p.trim().to_ascii_lowercase()) {
        let modifier = match part.as_str() {
            "ctrl" | "control" => Some(0),
            "alt" | "option" => Some(1),
            "shift" => Some(2),
            _ => None,
        };
        match modifier {
            Some(idx) => mods[idx] = true,
            None if part.is_empty() || key.is_some() => return None,
            None => key = Some(part),
        }
    }

    let mut parts: Vec<String> =
        MODIFIERS.iter().zip(mods).filter(|(_, on)| *on).map(|(m, _)| m.to_string()).collect();
    parts.push(key?);
    Some(parts.join("+"))
}
