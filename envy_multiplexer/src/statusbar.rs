//! Status bar content generation.

use crate::registry::PaneRegistry;

/// Key hints shown on the right side of the status bar.
pub const KEY_HINTS: &str = "^N new  ^W close  ^H/^L switch  ^E profiles  ^C stop  ^D quit";

/// Describes a pane entry for the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneEntry {
    /// 1-based position in tab order.
    pub number: usize,
    /// Pane display name.
    pub name: String,
    /// Whether this pane is focused.
    pub is_active: bool,
    /// Whether a process is running in this pane.
    pub is_running: bool,
}

/// Content to be rendered in the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBarContent {
    /// Active profile name.
    pub profile: String,
    /// Pane list with markers.
    pub panes: Vec<PaneEntry>,
    /// Current git branch, if the working directory is in a repository.
    pub git_branch: Option<String>,
}

/// Build the status bar content from the registry and controller state.
pub fn build_status(
    registry: &PaneRegistry,
    profile: &str,
    git_branch: Option<&str>,
) -> StatusBarContent {
    let panes = registry
        .panes()
        .iter()
        .enumerate()
        .map(|(i, p)| PaneEntry {
            number: i + 1,
            name: p.display_name().to_owned(),
            is_active: i == registry.active_index(),
            is_running: p.is_running(),
        })
        .collect();

    StatusBarContent {
        profile: profile.to_owned(),
        panes,
        git_branch: git_branch.map(str::to_owned),
    }
}

/// Format a pane entry: `*` marks the active pane, `+` a running one.
pub fn format_pane_entry(p: &PaneEntry) -> String {
    let running = if p.is_running { "+" } else { "" };
    let active = if p.is_active { "*" } else { "" };
    format!(" {}:{}{running}{active}", p.number, p.name)
}

/// Render the status bar content as a single line string.
pub fn render_status_line(content: &StatusBarContent, width: usize) -> String {
    let mut left = format!("[{}]", content.profile);
    if let Some(branch) = &content.git_branch {
        left.push_str(&format!(" ({branch})"));
    }
    let center: String = content.panes.iter().map(format_pane_entry).collect();

    let used = left.chars().count() + center.chars().count();
    let right = if used + KEY_HINTS.len() + 1 <= width { KEY_HINTS } else { "" };
    let padding = width.saturating_sub(used + right.len());

    format!("{left}{center}{:>padding$}{right}", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_status_single_pane() {
        let reg = PaneRegistry::new();
        let status = build_status(&reg, "default", None);
        assert_eq!(status.profile, "default");
        assert_eq!(status.panes.len(), 1);
        assert!(status.panes[0].is_active);
        assert!(!status.panes[0].is_running);
        assert_eq!(status.panes[0].name, "Term 1");
    }

    #[test]
    fn build_status_marks_one_active() {
        let mut reg = PaneRegistry::new();
        reg.create_pane();
        reg.create_pane();
        reg.set_active(1);

        let status = build_status(&reg, "prod", Some("main"));
        assert_eq!(status.panes.iter().filter(|p| p.is_active).count(), 1);
        assert!(status.panes[1].is_active);
        assert_eq!(status.git_branch.as_deref(), Some("main"));
    }

    #[test]
    fn entry_markers() {
        let entry = PaneEntry { number: 2, name: "cargo".into(), is_active: true, is_running: true };
        assert_eq!(format_pane_entry(&entry), " 2:cargo+*");
    }

    #[test]
    fn render_status_line_basic() {
        let content = StatusBarContent {
            profile: "dev".into(),
            panes: vec![PaneEntry { number: 1, name: "Term 1".into(), is_active: true, is_running: false }],
            git_branch: Some("main".into()),
        };
        let line = render_status_line(&content, 120);
        assert!(line.starts_with("[dev] (main) 1:Term 1*"));
        assert!(line.ends_with(KEY_HINTS));
        assert_eq!(line.chars().count(), 120);
    }

    #[test]
    fn narrow_width_drops_hints() {
        let content = StatusBarContent { profile: "dev".into(), panes: Vec::new(), git_branch: None };
        assert_eq!(render_status_line(&content, 10), "[dev]     ");
    }
}
