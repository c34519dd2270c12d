//! Multi-line text editor for raw profile files.

use envy_multiplexer::input::InputLine;

/// Text shown instead of a profile when none exist.
pub const NO_PROFILES: &str = "No profiles found";

/// Editable buffer over one profile file plus its filename header.
#[derive(Debug, Clone)]
pub struct Editor {
    lines: Vec<String>,
    /// Cursor line.
    row: usize,
    /// Cursor column in characters.
    col: usize,
    /// First visible line.
    pub scroll: usize,
    /// Content as last loaded or saved.
    original: String,
    /// Profile being edited, if any.
    profile: Option<String>,
    /// Filename header, edited to rename the profile.
    pub header: InputLine,
    /// Whether the filename header has focus instead of the text.
    pub header_focus: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self {
            lines: vec![String::new()],
            row: 0,
            col: 0,
            scroll: 0,
            original: String::new(),
            profile: None,
            header: InputLine::default(),
            header_focus: false,
        }
    }
}

impl Editor {
    /// Load `content` of `profile`, discarding any edits.
    pub fn load(&mut self, profile: &str, content: &str) {
        *self = Self::default();
        self.lines = split_lines(content);
        self.original = content.to_owned();
        self.profile = Some(profile.to_owned());
        self.header.set(profile);
    }

    /// Show a read-only placeholder message.
    pub fn load_placeholder(&mut self, message: &str) {
        *self = Self::default();
        self.lines = split_lines(message);
        self.original = message.to_owned();
    }

    /// Profile being edited.
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Current content.
    pub fn value(&self) -> String {
        self.lines.join("\n")
    }

    /// Lines of the current content.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Cursor as `(row, column)`.
    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Whether the content differs from what was loaded or last saved.
    pub fn is_dirty(&self) -> bool {
        self.profile.is_some() && self.value() != self.original
    }

    /// Record the current content as saved.
    pub fn mark_saved(&mut self) {
        self.original = self.value();
    }

    /// Throw away edits.
    pub fn revert(&mut self) {
        if let Some(profile) = self.profile.take() {
            let original = std::mem::take(&mut self.original);
            self.load(&profile, &original);
        }
    }

    /// Track a rename of the edited profile.
    pub fn set_profile(&mut self, profile: &str) {
        self.profile = Some(profile.to_owned());
        self.header.set(profile);
    }

    pub fn insert(&mut self, c: char) {
        let at = byte_index(&self.lines[self.row], self.col);
        self.lines[self.row].insert(at, c);
        self.col += 1;
    }

    /// Split the current line at the cursor.
    pub fn newline(&mut self) {
        let at = byte_index(&self.lines[self.row], self.col);
        let rest = self.lines[self.row].split_off(at);
        self.row += 1;
        self.lines.insert(self.row, rest);
        self.col = 0;
    }

    pub fn backspace(&mut self) {
        if self.col > 0 {
            self.col -= 1;
            let at = byte_index(&self.lines[self.row], self.col);
            self.lines[self.row].remove(at);
        } else if self.row > 0 {
            let line = self.lines.remove(self.row);
            self.row -= 1;
            self.col = char_len(&self.lines[self.row]);
            self.lines[self.row].push_str(&line);
        }
    }

    pub fn delete(&mut self) {
        if self.col < char_len(&self.lines[self.row]) {
            let at = byte_index(&self.lines[self.row], self.col);
            self.lines[self.row].remove(at);
        } else if self.row + 1 < self.lines.len() {
            let next = self.lines.remove(self.row + 1);
            self.lines[self.row].push_str(&next);
        }
    }

    pub fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = char_len(&self.lines[self.row]);
        }
    }

    pub fn move_right(&mut self) {
        if self.col < char_len(&self.lines[self.row]) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    /// Move up a line. Returns `false` when already on the first line.
    pub fn move_up(&mut self) -> bool {
        if self.row == 0 {
            return false;
        }
        self.row -= 1;
        self.clamp_col();
        true
    }

    pub fn move_down(&mut self) {
        if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.clamp_col();
        }
    }

    pub fn move_home(&mut self) {
        self.col = 0;
    }

    pub fn move_end(&mut self) {
        self.col = char_len(&self.lines[self.row]);
    }

    /// Keep the cursor line inside a viewport of `height` lines.
    pub fn scroll_to_cursor(&mut self, height: usize) {
        if self.row < self.scroll {
            self.scroll = self.row;
        } else if height > 0 && self.row >= self.scroll + height {
            self.scroll = self.row + 1 - height;
        }
    }

    fn clamp_col(&mut self) {
        self.col = self.col.min(char_len(&self.lines[self.row]));
    }
}

fn split_lines(content: &str) -> Vec<String> {
    content.split('\n').map(|line| line.trim_end_matches('\r').to_owned()).collect()
}

fn char_len(line: &str) -> usize {
    line.chars().count()
}

fn byte_index(line: &str, col: usize) -> usize {
    line.char_indices().nth(col).map_or(line.len(), |(i, _)| i)
}
