//! Conversion of child output carrying SGR color codes into styled spans.
//!
//! Only Select Graphic Rendition sequences change the style. Every other
//! escape sequence and control character is dropped, since a pane is a line
//! log and not a terminal grid.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Number of columns a tab expands to.
const TAB_WIDTH: usize = 4;

const STANDARD_COLORS: [Color; 8] = [
    Color::Black,
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::Gray,
];

const BRIGHT_COLORS: [Color; 8] = [
    Color::DarkGray,
    Color::LightRed,
    Color::LightGreen,
    Color::LightYellow,
    Color::LightBlue,
    Color::LightMagenta,
    Color::LightCyan,
    Color::White,
];

/// Parse `text` into a line whose spans start from `base`.
pub fn to_line(text: &str, base: Style) -> Line<'static> {
    let mut spans = Vec::new();
    let mut style = base;
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\x1b' => {
                let Some(sequence) = read_escape(&mut chars) else {
                    continue;
                };
                if let Some(params) = sequence.strip_suffix('m') {
                    if !current.is_empty() {
                        spans.push(Span::styled(std::mem::take(&mut current), style));
                    }
                    style = apply_sgr(style, base, params);
                }
            },
            '\t' => current.push_str(&" ".repeat(TAB_WIDTH)),
            c if c.is_control() => {},
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        spans.push(Span::styled(current, style));
    }
    Line::from(spans)
}

/// Consume an escape sequence after `ESC`.
///
/// Returns the parameters and final byte of a CSI sequence (`"1;31m"`), or
/// `None` for anything else.
fn read_escape(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    match chars.next()? {
        '[' => {
            let mut sequence = String::new();
            for c in chars.by_ref() {
                sequence.push(c);
                if ('@'..='~').contains(&c) {
                    return Some(sequence);
                }
            }
            None
        },
        ']' => {
            // Operating system command, terminated by BEL or ST.
            while let Some(c) = chars.next() {
                if c == '\x07' || (c == '\x1b' && chars.next_if_eq(&'\\').is_some()) {
                    break;
                }
            }
            None
        },
        _ => None,
    }
}

fn apply_sgr(mut style: Style, base: Style, params: &str) -> Style {
    let codes: Vec<u16> =
        params.split(';').map(|code| code.parse().unwrap_or(0)).collect();
    let mut codes = codes.into_iter();

    while let Some(code) = codes.next() {
        style = match code {
            0 => base,
            1 => style.add_modifier(Modifier::BOLD),
            2 => style.add_modifier(Modifier::DIM),
            3 => style.add_modifier(Modifier::ITALIC),
            4 => style.add_modifier(Modifier::UNDERLINED),
            7 => style.add_modifier(Modifier::REVERSED),
            9 => style.add_modifier(Modifier::CROSSED_OUT),
            22 => style.remove_modifier(Modifier::BOLD | Modifier::DIM),
            23 => style.remove_modifier(Modifier::ITALIC),
            24 => style.remove_modifier(Modifier::UNDERLINED),
            27 => style.remove_modifier(Modifier::REVERSED),
            29 => style.remove_modifier(Modifier::CROSSED_OUT),
            30..=37 => style.fg(STANDARD_COLORS[usize::from(code - 30)]),
            39 => style.fg(base.fg.unwrap_or(Color::Reset)),
            40..=47 => style.bg(STANDARD_COLORS[usize::from(code - 40)]),
            49 => style.bg(base.bg.unwrap_or(Color::Reset)),
            90..=97 => style.fg(BRIGHT_COLORS[usize::from(code - 90)]),
            100..=107 => style.bg(BRIGHT_COLORS[usize::from(code - 100)]),
            38 => match extended_color(&mut codes) {
                Some(color) => style.fg(color),
                None => style,
            },
            48 => match extended_color(&mut codes) {
                Some(color) => style.bg(color),
                None => style,
            },
            _ => style,
        };
    }
    style
}

/// Parse the `5;n` or `2;r;g;b` tail of an extended color code.
fn extended_color(codes: &mut impl Iterator<Item = u16>) -> Option<Color> {
    let byte = |code: Option<u16>| code.and_then(|c| u8::try_from(c).ok());
    match codes.next()? {
        5 => byte(codes.next()).map(Color::Indexed),
        2 => Some(Color::Rgb(byte(codes.next())?, byte(codes.next())?, byte(codes.next())?)),
        _ => None,
    }
}
