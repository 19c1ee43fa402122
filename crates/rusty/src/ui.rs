use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::{App, Mode};
use crate::file_picker::Action;
use crate::request::RequestState;
use crate::status_manager::MessageType;
use crate::text_width::{char_width, display_col, pad_to_width, str_width};

const SAVE_AS_WIDTH: u16 = 40;
const SAVE_AS_HEIGHT: u16 = 5;

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Editor area
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Request status
            Constraint::Length(1), // Messages and command input
        ])
        .split(f.size());

    app.editor.set_viewport_height(chunks[0].height as usize);
    scroll_horizontally(app, chunks[0]);
    app.refresh_highlighting();

    draw_editor(f, app, chunks[0]);
    draw_status_line(f, app, chunks[1]);
    draw_request_line(f, app, chunks[2]);
    draw_message_line(f, app, chunks[3]);

    match app.mode() {
        Mode::Help => draw_help(f, chunks[0]),
        Mode::FilePicker if app.file_picker.action() == Action::Load => {
            draw_file_picker(f, app, chunks[0])
        }
        Mode::SaveAs => draw_save_as(f, app, chunks[0]),
        _ => {}
    }

    if app.menu.is_open() {
        draw_menu(f, app, chunks[0]);
    }
}

fn gutter_width(app: &App) -> u16 {
    if !app.config.editor.line_numbers {
        return 0;
    }
    let digits = app.editor.line_count().to_string().len().max(3);
    digits as u16 + 1
}

fn scroll_horizontally(app: &mut App, area: Rect) {
    let text_width = area.width.saturating_sub(gutter_width(app)) as usize;
    let (line, col) = app.editor.cursor_position();
    let text = app.editor.line(line).unwrap_or_default();
    let cursor_col = display_col(&text, col, app.editor.tab_size());
    app.editor.scroll_to_display_col(cursor_col, text_width);
}

fn draw_editor(f: &mut Frame, app: &App, area: Rect) {
    let gutter = gutter_width(app).min(area.width);
    let text_area = Rect {
        x: area.x + gutter,
        width: area.width - gutter,
        ..area
    };

    let offset = app.editor.get_viewport_offset();
    let last = app.editor.last_visible_line();
    let tab_size = app.editor.tab_size();
    let h_offset = app.editor.horizontal_offset();

    let mut numbers = Vec::new();
    let mut lines = Vec::new();
    for line_idx in offset..=last {
        let Some(text) = app.editor.line(line_idx) else {
            break;
        };
        numbers.push(Line::from(format!(
            "{:>width$} ",
            line_idx + 1,
            width = gutter.saturating_sub(1) as usize
        )));
        lines.push(styled_line(app, line_idx, &text, tab_size, h_offset));
    }

    if gutter > 0 {
        let gutter_area = Rect { width: gutter, ..area };
        let numbers_widget = Paragraph::new(numbers).style(Style::default().fg(Color::DarkGray));
        f.render_widget(numbers_widget, gutter_area);
    }
    f.render_widget(Paragraph::new(lines), text_area);

    if !matches!(app.mode(), Mode::Normal | Mode::Insert | Mode::Select) || app.menu.is_open() {
        return;
    }

    let (cursor_line, cursor_col) = app.editor.cursor_position();
    if cursor_line < offset || cursor_line > last || text_area.width == 0 {
        return;
    }
    let line = app.editor.line(cursor_line).unwrap_or_default();
    let col = display_col(&line, cursor_col, tab_size).saturating_sub(h_offset) as u16;
    let x = text_area.x + col.min(text_area.width - 1);
    let y = text_area.y + (cursor_line - offset) as u16;
    f.set_cursor(x, y);
}

/// Spans for one buffer line starting at display column `h_offset`:
/// syntax styles, the selection overlay and tabs expanded to spaces.
fn styled_line(
    app: &App,
    line_idx: usize,
    text: &str,
    tab_size: usize,
    h_offset: usize,
) -> Line<'static> {
    let styles = app.highlight_cache.line_styles(line_idx);
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut run = String::new();
    let mut run_style = Style::default();
    let mut col = 0;

    for (char_idx, c) in text.chars().enumerate() {
        let mut style = styles
            .and_then(|s| s.get(char_idx))
            .copied()
            .unwrap_or_default();
        if app.editor.is_selected(line_idx, char_idx) {
            style = style.add_modifier(Modifier::REVERSED);
        }

        if style != run_style && !run.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut run), run_style));
        }
        run_style = style;

        let width = char_width(c, col, tab_size);
        if col + width <= h_offset {
            // Scrolled out on the left
        } else if c == '\t' || col < h_offset {
            // Tabs and wide chars cut by the left edge become blanks
            run.push_str(&" ".repeat(col + width - col.max(h_offset)));
        } else if !c.is_control() {
            run.push(c);
        }
        col += width;
    }

    if !run.is_empty() {
        spans.push(Span::styled(run, run_style));
    }
    Line::from(spans)
}

fn draw_status_line(f: &mut Frame, app: &App, area: Rect) {
    let left = if app.menu.is_open() {
        " WAITING FOR COMMAND".to_string()
    } else {
        let modified = if app.is_modified() { " [+]" } else { "" };
        format!(
            " {}{} - {}",
            app.file_manager.display_name(),
            modified,
            app.mode().label()
        )
    };

    let model = match app.requests.state() {
        RequestState::Processing(model) => *model,
        _ => app.model,
    };
    let (line, col) = app.editor.cursor_position();
    let right = format!("{}  {}:{} ", model, line + 1, col + 1);

    let width = area.width as usize;
    let right_width = str_width(&right);
    let text = if right_width >= width {
        pad_to_width(&right, width)
    } else {
        format!("{}{}", pad_to_width(&left, width - right_width), right)
    };

    let status = Paragraph::new(text).style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_widget(status, area);
}

fn draw_request_line(f: &mut Frame, app: &App, area: Rect) {
    let state = app.requests.state();
    let color = match state {
        RequestState::Idle => Color::DarkGray,
        RequestState::Processing(_) => Color::Yellow,
        RequestState::Error(_) => Color::Red,
    };
    let line = Line::from(vec![
        Span::raw("Request Status: "),
        Span::styled(state.to_string(), Style::default().fg(color)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn draw_message_line(f: &mut Frame, app: &App, area: Rect) {
    if app.mode() == Mode::Command {
        let input = format!("{}{}", app.ui_state.command_prefix, app.ui_state.command_buffer);
        let cursor = (str_width(&input) as u16).min(area.width.saturating_sub(1));
        f.render_widget(Paragraph::new(input), area);
        f.set_cursor(area.x + cursor, area.y);
        return;
    }

    let paragraph = match app.ui_state.status_manager.current() {
        Some(message) => Paragraph::new(message.content.clone())
            .style(Style::default().fg(message_color(message.message_type))),
        None => Paragraph::new(mode_hint(app.mode())).style(Style::default().fg(Color::DarkGray)),
    };
    f.render_widget(paragraph, area);
}

fn message_color(message_type: MessageType) -> Color {
    match message_type {
        MessageType::Info => Color::White,
        MessageType::Success => Color::Green,
        MessageType::Warning => Color::Yellow,
        MessageType::Error => Color::Red,
    }
}

fn mode_hint(mode: Mode) -> &'static str {
    match mode {
        Mode::Normal => ": command  i insert  v select  Space menu  Alt-l/o/a ask  ? help",
        Mode::Insert => "Esc: back to normal mode",
        Mode::Select => "y copy  d delete  c change  Esc cancel",
        Mode::FilePicker => "Enter: open  Esc: cancel",
        Mode::SavePrompt => "y save and quit  n quit  c cancel",
        Mode::Command | Mode::SaveAs | Mode::Help => "",
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_file_picker(f: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(area.width * 3 / 5, area.height * 3 / 5, area);

    let items: Vec<ListItem> = app
        .file_picker
        .entries()
        .iter()
        .map(|entry| {
            let style = if entry.ends_with('/') {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            ListItem::new(entry.clone()).style(style)
        })
        .collect();

    let title = format!(" Pick a file: {} ", app.file_picker.dir().display());
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    state.select(Some(app.file_picker.selected_index()));

    f.render_widget(Clear, popup);
    f.render_stateful_widget(list, popup, &mut state);
}

fn draw_save_as(f: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(SAVE_AS_WIDTH, SAVE_AS_HEIGHT, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Save As: ")
        .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(popup);

    let input = app.file_picker.raw_input();
    let lines = vec![
        Line::from(input.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Enter: Save | Esc: Cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    f.render_widget(Clear, popup);
    f.render_widget(Paragraph::new(lines).block(block), popup);

    if inner.width > 0 && inner.height > 0 {
        let before: String = input.chars().take(app.file_picker.cursor_pos()).collect();
        let x = (str_width(&before) as u16).min(inner.width - 1);
        f.set_cursor(inner.x + x, inner.y);
    }
}

fn draw_menu(f: &mut Frame, app: &App, area: Rect) {
    let Some((title, entries)) = app.menu.entries() else {
        return;
    };

    let content_width = entries
        .iter()
        .map(|e| str_width(e))
        .chain(std::iter::once(str_width(title)))
        .max()
        .unwrap_or(0);
    let width = (content_width as u16 + 4).min(area.width);
    let height = (entries.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + area.width - width,
        y: area.y + area.height - height,
        width,
        height,
    };

    let lines: Vec<Line> = entries.into_iter().map(Line::from).collect();
    let menu = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", title))
            .border_style(Style::default().fg(Color::Yellow)),
    );

    f.render_widget(Clear, popup);
    f.render_widget(menu, popup);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let help_text = vec![
        Line::from(Span::styled(" Normal mode", bold)),
        Line::from("  h j k l / arrows   Move            G         End of file"),
        Line::from("  i a o O            Insert          v         Select"),
        Line::from("  x                  Delete char     dd / yy   Cut / copy line"),
        Line::from("  p                  Paste           u / C-r   Undo / redo"),
        Line::from("  s                  Save            q / C-q   Quit"),
        Line::from("  : /                Command, search Space     Menu"),
        Line::from(""),
        Line::from(Span::styled(" Assistant", bold)),
        Line::from("  Alt-l  Ask Ollama    Alt-o  Ask OpenAI    Alt-a  Ask Anthropic"),
        Line::from("  Type your question at the end of the buffer, below a User header."),
        Line::from(""),
        Line::from(Span::styled(" Commands", bold)),
        Line::from("  :w [file]  :q  :q!  :wq  :e <file>  :ls  :cd <dir>  :pwd"),
        Line::from("  :load <file>  :unload [file]  :context  :ask [model]"),
        Line::from("  :model [name]  :new [name]  :history [name]  :theme <name>  :help"),
        Line::from(""),
        Line::from(Span::styled(
            " Press Esc or ? to close",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .border_style(Style::default().fg(Color::Blue)),
        )
        .alignment(Alignment::Left);

    f.render_widget(Clear, area);
    f.render_widget(help, area);
}
