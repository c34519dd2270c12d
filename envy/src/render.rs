//! Drawing the interface with ratatui.
//!
//! The screen is a sidebar of panes and profiles next to either the active
//! pane or the profile editor, with a status bar underneath. Drawing reads a
//! snapshot of each buffer and records the output area size back into the
//! controller for scrolling and separators.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Clear, Paragraph};
use unicode_width::UnicodeWidthStr;

use envy_multiplexer::buffer::LineKind;
use envy_multiplexer::input::InputLine;
use envy_multiplexer::profile::PROFILE_EXTENSION;
use envy_multiplexer::statusbar;

use crate::ansi;
use crate::app::{App, Mode, Prompt};

/// Columns taken by the sidebar.
const SIDEBAR_WIDTH: u16 = 22;

const PROMPT_WIDTH: u16 = 50;
const PROMPT_HEIGHT: u16 = 8;

const PROFILE_HINTS: &str = "n: new │ d: delete │ r: rename │ Tab: edit";
const EDITOR_HINTS: &str = "Ctrl+S: save │ Esc/Tab: back";

fn title() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

fn muted() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn border(focused: bool) -> Style {
    if focused { Style::default().fg(Color::Cyan) } else { muted() }
}

/// Base style of an output line before its own color codes apply.
fn line_style(kind: LineKind) -> Style {
    match kind {
        LineKind::Stdout => Style::default(),
        LineKind::Stderr => Style::default().fg(Color::LightRed),
        LineKind::Echo => Style::default().add_modifier(Modifier::BOLD),
        LineKind::Info => Style::default().fg(Color::Cyan),
        LineKind::Success => Style::default().fg(Color::Green),
        LineKind::Error => Style::default().fg(Color::Red),
        LineKind::Muted => muted(),
    }
}

/// Draw one frame.
pub fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let status_height = u16::from(app.config.show_status_bar);
    let [main, status] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(status_height)]).areas(frame.area());
    let [sidebar, content] =
        Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(1)]).areas(main);

    draw_sidebar(frame, sidebar, app);
    match app.mode {
        Mode::Terminal => draw_terminal(frame, content, app),
        Mode::Profiles | Mode::Editor => draw_editor(frame, content, app),
    }
    if app.config.show_status_bar {
        draw_status(frame, status, app);
    }
    if let Some(prompt) = &app.prompt {
        draw_prompt(frame, prompt);
    }
}

fn draw_sidebar(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let mut lines = vec![Line::styled("Terminals", title())];
    for (idx, pane) in app.registry.panes().iter().enumerate() {
        let active = idx == app.registry.active_index();
        let marker = if active { "➤ " } else { "  " };
        let style = if active { Style::default().add_modifier(Modifier::BOLD) } else { Style::default() };
        let mut spans = vec![Span::styled(format!("{marker}{}", pane.display_name()), style)];
        if pane.is_running() {
            spans.push(Span::styled(" ●", Style::default().fg(Color::Yellow)));
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::default());
    lines.push(Line::styled("Environment", title()));
    for (idx, name) in app.profiles.iter().enumerate() {
        let cursor = match app.mode {
            Mode::Profiles if idx == app.selected => "➤ ",
            Mode::Editor if idx == app.selected => "✎ ",
            _ => "  ",
        };
        let (mark, style) = if *name == app.profile {
            ("● ", Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))
        } else {
            ("  ", Style::default())
        };
        lines.push(Line::from(vec![
            Span::raw(cursor),
            Span::styled(mark, Style::default().fg(Color::Green)),
            Span::styled(name.clone(), style),
        ]));
    }

    let block = Block::bordered().border_type(BorderType::Rounded).border_style(muted());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_terminal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let pane_title = format!(" {} ", app.registry.active_pane().display_name());
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(border(true))
        .title(Span::styled(pane_title, title()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [output_area, rule_area, input_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1), Constraint::Length(1)])
            .areas(inner);
    app.output_size = (usize::from(output_area.width), usize::from(output_area.height));

    let height = usize::from(output_area.height);
    let pane = app.registry.active_pane();
    let scroll = pane.scroll.min(pane.output().len().saturating_sub(height));
    let lines: Vec<Line<'static>> = pane
        .output()
        .window(height, scroll)
        .iter()
        .map(|line| ansi::to_line(&line.text, line_style(line.kind)))
        .collect();
    frame.render_widget(Paragraph::new(lines), output_area);

    let rule = if scroll > 0 {
        let label = format!("── ↑ {scroll} ");
        let fill = usize::from(rule_area.width).saturating_sub(label.width());
        format!("{label}{}", "─".repeat(fill))
    } else {
        "─".repeat(usize::from(rule_area.width))
    };
    frame.render_widget(Paragraph::new(rule).style(muted()), rule_area);

    let mut spans = vec![
        Span::styled(format!("[{}]", app.profile), Style::default().fg(Color::Magenta)),
        Span::raw(" "),
        Span::styled(app.prompt_dir(), Style::default().fg(Color::Blue)),
    ];
    if let Some(branch) = &app.git_branch {
        spans.push(Span::styled(format!(" ({branch})"), Style::default().fg(Color::Yellow)));
    }
    spans.push(Span::styled(" ➤ ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)));
    let prompt_width: usize = spans.iter().map(|span| span.content.width()).sum();
    spans.push(Span::raw(pane.input.value().to_owned()));
    frame.render_widget(Paragraph::new(Line::from(spans)), input_area);

    if app.prompt.is_none() {
        set_cursor(frame, input_area, prompt_width + cursor_offset(&pane.input), 0);
    }
}

fn draw_editor(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let editing = app.mode == Mode::Editor;
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(border(editing))
        .title(Span::styled(" Profiles ", title()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [header_area, text_area, hint_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(1), Constraint::Length(1)])
            .areas(inner);

    let editor = &mut app.editor;
    if editor.profile().is_some() {
        let name_style = if editor.header_focus {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::REVERSED)
        } else {
            Style::default().fg(Color::Magenta)
        };
        let mut spans = vec![
            Span::styled("Editor: ", title()),
            Span::styled(editor.header.value().to_owned(), name_style),
            Span::styled(format!(".{PROFILE_EXTENSION}"), muted()),
        ];
        if editor.is_dirty() {
            spans.push(Span::styled(" [modified]", Style::default().fg(Color::Yellow)));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), header_area);
        if editing && editor.header_focus {
            set_cursor(frame, header_area, "Editor: ".width() + cursor_offset(&editor.header), 0);
        }
    }

    let height = usize::from(text_area.height);
    editor.scroll_to_cursor(height);
    let lines: Vec<Line<'_>> = editor
        .lines()
        .iter()
        .skip(editor.scroll)
        .take(height)
        .map(|line| {
            let style = if line.trim_start().starts_with('#') { muted() } else { Style::default() };
            Line::styled(line.as_str(), style)
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), text_area);

    if editing && !editor.header_focus {
        let (row, col) = editor.cursor();
        let before: String = editor.lines()[row].chars().take(col).collect();
        set_cursor(frame, text_area, before.width(), row - editor.scroll);
    }

    let hints = if editing { EDITOR_HINTS } else { PROFILE_HINTS };
    frame.render_widget(Paragraph::new(hints).style(muted()), hint_area);
}

fn draw_status(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let content = statusbar::build_status(&app.registry, &app.profile, app.git_branch.as_deref());
    let text = statusbar::render_status_line(&content, usize::from(area.width));
    let style = Style::default().fg(Color::White).bg(Color::DarkGray);
    frame.render_widget(Paragraph::new(text).style(style), area);
}

fn draw_prompt(frame: &mut Frame<'_>, prompt: &Prompt) {
    let area = centered(frame.area(), PROMPT_WIDTH, PROMPT_HEIGHT);
    frame.render_widget(Clear, area);

    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(border(true))
        .title(Span::styled(format!(" {} ", prompt.title()), title()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![Line::raw(prompt.message()), Line::default()];
    if !prompt.is_confirmation() {
        lines.push(Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Green)),
            Span::raw(prompt.input.value()),
        ]));
    }
    match &prompt.error {
        Some(error) => lines.push(Line::styled(error.as_str(), Style::default().fg(Color::Red))),
        None => lines.push(Line::default()),
    }
    let hint = if prompt.is_confirmation() {
        "y: Yes • n: No • Esc: Cancel"
    } else {
        "Enter: Confirm • Esc: Cancel"
    };
    lines.push(Line::styled(hint, muted()));
    frame.render_widget(Paragraph::new(lines), inner);

    if !prompt.is_confirmation() {
        set_cursor(frame, inner, 2 + cursor_offset(&prompt.input), 2);
    }
}

/// Display width of the input text before its cursor.
fn cursor_offset(input: &InputLine) -> usize {
    input.value().chars().take(input.cursor()).collect::<String>().width()
}

/// Place the cursor at a column and row inside `area`, clamped to it.
fn set_cursor(frame: &mut Frame<'_>, area: Rect, col: usize, row: usize) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let col = u16::try_from(col).unwrap_or(u16::MAX).min(area.width - 1);
    let row = u16::try_from(row).unwrap_or(u16::MAX).min(area.height - 1);
    frame.set_cursor_position(Position::new(area.x + col, area.y + row));
}

/// A `width` × `height` rectangle centered in `area`.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
