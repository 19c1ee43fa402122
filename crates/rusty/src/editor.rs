use ropey::Rope;
use std::cmp;

const HISTORY_LIMIT: usize = 100;

/// Rope-backed text buffer with a char-indexed cursor.
#[derive(Clone)]
pub struct Editor {
    rope: Rope,
    cursor_line: usize,
    cursor_col: usize,
    viewport_offset: usize,
    viewport_height: usize,
    // First visible display column
    horizontal_offset: usize,
    modified: bool,
    clipboard: String,
    // Undo/Redo support
    history: Vec<EditorState>,
    history_index: usize,
    // History entry matching the file on disk
    saved_index: Option<usize>,
    // Select mode anchor
    anchor: Option<(usize, usize)>,
    // First line touched since the highlighter last asked
    dirty_line: Option<usize>,
    tab_size: usize,
    use_spaces: bool,
}

#[derive(Clone)]
struct EditorState {
    content: String,
    cursor_line: usize,
    cursor_col: usize,
}

impl Editor {
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            cursor_line: 0,
            cursor_col: 0,
            viewport_offset: 0,
            viewport_height: 24, // Updated on every draw
            horizontal_offset: 0,
            modified: false,
            clipboard: String::new(),
            history: vec![EditorState {
                content: String::new(),
                cursor_line: 0,
                cursor_col: 0,
            }],
            history_index: 0,
            saved_index: Some(0),
            anchor: None,
            dirty_line: Some(0),
            tab_size: 4,
            use_spaces: true,
        }
    }

    pub fn set_content(&mut self, content: String) {
        self.rope = Rope::from_str(&content);
        self.cursor_line = 0;
        self.cursor_col = 0;
        self.viewport_offset = 0;
        self.horizontal_offset = 0;
        self.modified = false;
        self.anchor = None;
        self.dirty_line = Some(0);

        self.history = vec![EditorState {
            content,
            cursor_line: 0,
            cursor_col: 0,
        }];
        self.history_index = 0;
        self.saved_index = Some(0);
    }

    pub fn get_content(&self) -> String {
        self.rope.to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.chars().all(char::is_whitespace)
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
        self.saved_index = Some(self.history_index);
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line text without its line break.
    pub fn line(&self, line: usize) -> Option<String> {
        self.rope.get_line(line).map(|l| {
            let text = l.to_string();
            text.trim_end_matches(|c: char| c == '\n' || c == '\r')
                .to_string()
        })
    }

    pub fn cursor_position(&self) -> (usize, usize) {
        (self.cursor_line, self.cursor_col)
    }

    pub fn set_cursor_position(&mut self, line: usize, col: usize) {
        let max_line = self.rope.len_lines().saturating_sub(1);
        self.cursor_line = line.min(max_line);
        self.cursor_col = col.min(self.line_len(self.cursor_line));
        self.adjust_viewport();
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height.max(1);
        self.adjust_viewport();
    }

    pub fn viewport_height(&self) -> usize {
        self.viewport_height
    }

    pub fn get_viewport_offset(&self) -> usize {
        self.viewport_offset
    }

    pub fn horizontal_offset(&self) -> usize {
        self.horizontal_offset
    }

    /// Scrolls sideways so that display column `cursor_col` fits in a pane
    /// `width` cells wide. Returns the new offset.
    pub fn scroll_to_display_col(&mut self, cursor_col: usize, width: usize) -> usize {
        let width = width.max(1);
        if cursor_col < self.horizontal_offset {
            self.horizontal_offset = cursor_col;
        } else if cursor_col >= self.horizontal_offset + width {
            self.horizontal_offset = cursor_col + 1 - width;
        }
        self.horizontal_offset
    }

    /// Last buffer line inside the viewport.
    pub fn last_visible_line(&self) -> usize {
        cmp::min(
            self.viewport_offset + self.viewport_height,
            self.rope.len_lines(),
        )
        .saturating_sub(1)
    }

    pub fn get_viewport_lines(&self) -> Vec<String> {
        (self.viewport_offset..=self.last_visible_line())
            .filter_map(|i| self.line(i))
            .collect()
    }

    /// Returns the first line edited since the previous call.
    pub fn take_dirty_line(&mut self) -> Option<usize> {
        self.dirty_line.take()
    }

    fn touch(&mut self, line: usize) {
        self.dirty_line = Some(match self.dirty_line {
            Some(existing) => existing.min(line),
            None => line,
        });
        self.modified = true;
    }

    pub fn insert_char(&mut self, c: char) {
        if self.rope.len_chars() > 1_000_000 {
            log::warn!("Document size approaching limit, insert may be slow");
        }

        let char_idx = self.cursor_char_idx();
        self.rope.insert_char(char_idx, c);
        self.cursor_col += 1;
        self.touch(self.cursor_line);
        self.save_state();
    }

    pub fn insert_newline(&mut self) {
        let char_idx = self.cursor_char_idx();
        self.rope.insert_char(char_idx, '\n');
        self.touch(self.cursor_line);
        self.cursor_line += 1;
        self.cursor_col = 0;
        self.adjust_viewport();
        self.save_state();
    }

    pub fn insert_tab(&mut self) {
        if self.use_spaces {
            let char_idx = self.cursor_char_idx();
            let spaces = " ".repeat(self.tab_size);
            self.rope.insert(char_idx, &spaces);
            self.cursor_col += self.tab_size;
            self.touch(self.cursor_line);
            self.save_state();
        } else {
            self.insert_char('\t');
        }
    }

    pub fn set_tab_config(&mut self, tab_size: usize, use_spaces: bool) {
        self.tab_size = tab_size;
        self.use_spaces = use_spaces;
    }

    pub fn tab_size(&self) -> usize {
        self.tab_size
    }

    /// Backspace. At column 0 the line is joined onto the previous one.
    pub fn delete_char_backward(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
            let char_idx = self.cursor_char_idx();
            self.rope.remove(char_idx..char_idx + 1);
            self.touch(self.cursor_line);
            self.save_state();
        } else if self.cursor_line > 0 {
            let line_start = self.rope.line_to_char(self.cursor_line);
            self.cursor_line -= 1;
            self.cursor_col = self.line_len(self.cursor_line);
            let break_start = self.cursor_char_idx();
            self.rope.remove(break_start..line_start);
            self.touch(self.cursor_line);
            self.adjust_viewport();
            self.save_state();
        }
    }

    pub fn delete_char_forward(&mut self) {
        let char_idx = self.cursor_char_idx();
        if char_idx >= self.rope.len_chars() {
            return;
        }

        let end = if self.cursor_col == self.line_len(self.cursor_line)
            && self.cursor_line + 1 < self.rope.len_lines()
        {
            // Remove the whole line break, including "\r\n"
            self.rope.line_to_char(self.cursor_line + 1)
        } else {
            char_idx + 1
        };
        self.rope.remove(char_idx..end);
        self.touch(self.cursor_line);
        self.save_state();
    }

    /// Deletes the cursor line into the clipboard.
    pub fn delete_line(&mut self) {
        let Some(line) = self.rope.get_line(self.cursor_line) else {
            return;
        };
        self.clipboard = line.to_string();
        if !self.clipboard.ends_with('\n') {
            self.clipboard.push('\n');
        }

        let mut start_idx = self.rope.line_to_char(self.cursor_line);
        let end_idx = if self.cursor_line + 1 < self.rope.len_lines() {
            self.rope.line_to_char(self.cursor_line + 1)
        } else {
            // Last line: take the preceding line break with it
            if self.cursor_line > 0 {
                start_idx = start_idx.saturating_sub(1);
            }
            self.rope.len_chars()
        };
        self.rope.remove(start_idx..end_idx);

        let max_line = self.rope.len_lines().saturating_sub(1);
        self.cursor_line = self.cursor_line.min(max_line);
        self.cursor_col = 0;
        self.touch(self.cursor_line);
        self.adjust_viewport();
        self.save_state();
    }

    pub fn yank_line(&mut self) {
        if let Some(line) = self.line(self.cursor_line) {
            self.clipboard = line;
            self.clipboard.push('\n');
        }
    }

    /// Pastes the clipboard. Whole lines go below the cursor line, other
    /// text at the cursor.
    pub fn paste(&mut self) {
        if self.clipboard.is_empty() {
            return;
        }

        let text = self.clipboard.clone();
        if text.ends_with('\n') {
            let next_line = self.cursor_line + 1;
            if next_line < self.rope.len_lines() {
                let idx = self.rope.line_to_char(next_line);
                self.rope.insert(idx, &text);
            } else {
                let idx = self.rope.len_chars();
                let mut block = String::from("\n");
                block.push_str(text.trim_end_matches('\n'));
                self.rope.insert(idx, &block);
            }
            self.touch(self.cursor_line);
            self.cursor_line = next_line;
            self.cursor_col = 0;
        } else {
            let idx = self.cursor_char_idx();
            self.rope.insert(idx, &text);
            self.touch(self.cursor_line);
            let (line, col) = self.char_idx_to_line_col(idx + text.chars().count());
            self.cursor_line = line;
            self.cursor_col = col;
        }
        self.adjust_viewport();
        self.save_state();
    }

    pub fn clipboard(&self) -> &str {
        &self.clipboard
    }

    /// Inserts `text` at the end of the document and moves the cursor there.
    pub fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let first_line = self.rope.len_lines().saturating_sub(1);
        let end = self.rope.len_chars();
        self.rope.insert(end, text);
        self.touch(first_line);
        self.move_to_document_end();
        self.save_state();
    }

    pub fn move_cursor_up(&mut self) {
        if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.clamp_cursor_col();
            self.adjust_viewport();
        }
    }

    pub fn move_cursor_down(&mut self) {
        if self.cursor_line + 1 < self.rope.len_lines() {
            self.cursor_line += 1;
            self.clamp_cursor_col();
            self.adjust_viewport();
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
        } else if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = self.line_len(self.cursor_line);
            self.adjust_viewport();
        }
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor_col < self.line_len(self.cursor_line) {
            self.cursor_col += 1;
        } else if self.cursor_line + 1 < self.rope.len_lines() {
            self.cursor_line += 1;
            self.cursor_col = 0;
            self.adjust_viewport();
        }
    }

    pub fn move_to_line_start(&mut self) {
        self.cursor_col = 0;
    }

    pub fn move_to_line_end(&mut self) {
        self.cursor_col = self.line_len(self.cursor_line);
    }

    pub fn move_to_document_end(&mut self) {
        self.cursor_line = self.rope.len_lines().saturating_sub(1);
        self.cursor_col = self.line_len(self.cursor_line);
        self.adjust_viewport();
    }

    pub fn page_up(&mut self) {
        self.cursor_line = self.cursor_line.saturating_sub(self.viewport_height);
        self.viewport_offset = self.viewport_offset.saturating_sub(self.viewport_height);
        self.clamp_cursor_col();
        self.adjust_viewport();
    }

    pub fn page_down(&mut self) {
        let max_line = self.rope.len_lines().saturating_sub(1);
        self.cursor_line = cmp::min(self.cursor_line + self.viewport_height, max_line);
        self.viewport_offset = cmp::min(
            self.viewport_offset + self.viewport_height,
            self.rope.len_lines().saturating_sub(self.viewport_height),
        );
        self.clamp_cursor_col();
        self.adjust_viewport();
    }

    /// Moves to the next match after the cursor, wrapping to the top.
    pub fn search(&mut self, query: &str) -> bool {
        if query.is_empty() {
            return false;
        }

        let content = self.rope.to_string();
        let cursor = self.rope.char_to_byte(self.cursor_char_idx());
        let after = content
            .char_indices()
            .nth(self.cursor_char_idx() + 1)
            .map(|(byte, _)| byte)
            .unwrap_or(content.len());

        let found = content[after..]
            .find(query)
            .map(|pos| after + pos)
            .or_else(|| content[..cursor.min(content.len())].find(query))
            .or_else(|| content.find(query));

        match found {
            Some(byte) => {
                let char_idx = self.rope.byte_to_char(byte);
                let (line, col) = self.char_idx_to_line_col(char_idx);
                self.cursor_line = line;
                self.cursor_col = col;
                self.adjust_viewport();
                true
            }
            None => false,
        }
    }

    fn save_state(&mut self) {
        let current_state = EditorState {
            content: self.rope.to_string(),
            cursor_line: self.cursor_line,
            cursor_col: self.cursor_col,
        };

        if let Some(last_state) = self.history.get(self.history_index) {
            if last_state.content == current_state.content {
                return;
            }
        }

        self.history.truncate(self.history_index + 1);
        if self.saved_index.is_some_and(|i| i > self.history_index) {
            self.saved_index = None;
        }
        self.history.push(current_state);
        self.history_index += 1;

        if self.history.len() > HISTORY_LIMIT {
            self.history.remove(0);
            self.history_index -= 1;
            self.saved_index = self.saved_index.and_then(|i| i.checked_sub(1));
        }
    }

    pub fn undo(&mut self) -> bool {
        if self.history_index == 0 {
            return false;
        }
        self.history_index -= 1;
        self.restore_state();
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.history_index + 1 >= self.history.len() {
            return false;
        }
        self.history_index += 1;
        self.restore_state();
        true
    }

    fn restore_state(&mut self) {
        let state = &self.history[self.history_index];
        self.rope = Rope::from_str(&state.content);
        let (line, col) = (state.cursor_line, state.cursor_col);
        self.anchor = None;
        self.dirty_line = Some(0);
        self.modified = self.saved_index != Some(self.history_index);
        self.set_cursor_position(line, col);
    }

    // Select mode
    pub fn start_selection(&mut self) {
        self.anchor = Some((self.cursor_line, self.cursor_col));
    }

    pub fn clear_selection(&mut self) {
        self.anchor = None;
    }

    pub fn has_selection(&self) -> bool {
        self.anchor.is_some()
    }

    /// Ordered char range covered by the selection. The char under the
    /// cursor is included.
    pub fn selection_range(&self) -> Option<(usize, usize)> {
        let (line, col) = self.anchor?;
        let anchor = self.line_col_to_char_idx(line, col);
        let cursor = self.cursor_char_idx();
        let (start, end) = if anchor <= cursor {
            (anchor, cursor)
        } else {
            (cursor, anchor)
        };
        Some((start, cmp::min(end + 1, self.rope.len_chars())))
    }

    pub fn is_selected(&self, line: usize, col: usize) -> bool {
        match self.selection_range() {
            Some((start, end)) => {
                let idx = self.line_col_to_char_idx(line, col);
                idx >= start && idx < end
            }
            None => false,
        }
    }

    pub fn selected_text(&self) -> String {
        self.selection_range()
            .map(|(start, end)| self.rope.slice(start..end).to_string())
            .unwrap_or_default()
    }

    pub fn yank_selection(&mut self) {
        self.clipboard = self.selected_text();
    }

    /// Deletes the selection into the clipboard and leaves the cursor at
    /// its start.
    pub fn delete_selection(&mut self) {
        let Some((start, end)) = self.selection_range() else {
            return;
        };
        self.clipboard = self.rope.slice(start..end).to_string();
        self.rope.remove(start..end);

        let (line, col) = self.char_idx_to_line_col(start);
        self.anchor = None;
        self.touch(line);
        self.set_cursor_position(line, col);
        self.save_state();
    }

    fn line_len(&self, line: usize) -> usize {
        match self.rope.get_line(line) {
            Some(text) => {
                let mut len = text.len_chars();
                if len > 0 && text.char(len - 1) == '\n' {
                    len -= 1;
                    if len > 0 && text.char(len - 1) == '\r' {
                        len -= 1;
                    }
                }
                len
            }
            None => 0,
        }
    }

    fn cursor_char_idx(&self) -> usize {
        self.line_col_to_char_idx(self.cursor_line, self.cursor_col)
    }

    fn line_col_to_char_idx(&self, line: usize, col: usize) -> usize {
        let line = line.min(self.rope.len_lines().saturating_sub(1));
        self.rope.line_to_char(line) + col.min(self.line_len(line))
    }

    fn char_idx_to_line_col(&self, char_idx: usize) -> (usize, usize) {
        let char_idx = char_idx.min(self.rope.len_chars());
        let line = self.rope.char_to_line(char_idx);
        let col = char_idx - self.rope.line_to_char(line);
        (line, col.min(self.line_len(line)))
    }

    fn clamp_cursor_col(&mut self) {
        self.cursor_col = cmp::min(self.cursor_col, self.line_len(self.cursor_line));
    }

    fn adjust_viewport(&mut self) {
        if self.cursor_line < self.viewport_offset {
            self.viewport_offset = self.cursor_line;
        } else if self.cursor_line >= self.viewport_offset + self.viewport_height {
            self.viewport_offset = self.cursor_line + 1 - self.viewport_height;
        }
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor_with(content: &str) -> Editor {
        let mut editor = Editor::new();
        editor.set_content(content.to_string());
        editor
    }

    #[test]
    fn test_editor_creation() {
        let editor = Editor::new();
        assert_eq!(editor.cursor_position(), (0, 0));
        assert_eq!(editor.line_count(), 1);
        assert!(!editor.is_modified());
        assert!(editor.is_empty());
    }

    #[test]
    fn test_text_insertion() {
        let mut editor = Editor::new();
        editor.insert_char('H');
        editor.insert_char('i');
        editor.insert_newline();
        editor.insert_char('!');

        assert_eq!(editor.get_content(), "Hi\n!");
        assert_eq!(editor.cursor_position(), (1, 1));
        assert!(editor.is_modified());
    }

    #[test]
    fn test_insert_tab_uses_spaces() {
        let mut editor = Editor::new();
        editor.set_tab_config(2, true);
        editor.insert_tab();
        assert_eq!(editor.get_content(), "  ");
        assert_eq!(editor.cursor_position(), (0, 2));

        editor.set_tab_config(4, false);
        editor.insert_tab();
        assert_eq!(editor.get_content(), "  \t");
    }

    #[test]
    fn test_backspace_joins_lines() {
        let mut editor = editor_with("ab\ncd");
        editor.set_cursor_position(1, 0);
        editor.delete_char_backward();
        assert_eq!(editor.get_content(), "abcd");
        assert_eq!(editor.cursor_position(), (0, 2));

        editor.delete_char_backward();
        assert_eq!(editor.get_content(), "acd");
    }

    #[test]
    fn test_delete_forward_at_line_end_joins_crlf() {
        let mut editor = editor_with("ab\r\ncd");
        editor.move_to_line_end();
        assert_eq!(editor.cursor_position(), (0, 2));
        editor.delete_char_forward();
        assert_eq!(editor.get_content(), "abcd");
    }

    #[test]
    fn test_cursor_wraps_between_lines() {
        let mut editor = editor_with("Hello\nWorld");
        editor.move_to_line_end();
        assert_eq!(editor.cursor_position(), (0, 5));
        editor.move_cursor_right();
        assert_eq!(editor.cursor_position(), (1, 0));
        editor.move_cursor_left();
        assert_eq!(editor.cursor_position(), (0, 5));
    }

    #[test]
    fn test_vertical_moves_clamp_column() {
        let mut editor = editor_with("long line\nab\nanother long");
        editor.set_cursor_position(0, 8);
        editor.move_cursor_down();
        assert_eq!(editor.cursor_position(), (1, 2));
        editor.move_cursor_down();
        assert_eq!(editor.cursor_position(), (2, 2));
    }

    #[test]
    fn test_search_wraps_around() {
        let mut editor = editor_with("Hello World\nHi there");
        assert!(editor.search("World"));
        assert_eq!(editor.cursor_position(), (0, 6));
        assert!(editor.search("Hi"));
        assert_eq!(editor.cursor_position(), (1, 0));
        assert!(editor.search("Hello"));
        assert_eq!(editor.cursor_position(), (0, 0));
        assert!(!editor.search("absent"));
    }

    #[test]
    fn test_delete_line_and_paste_below() {
        let mut editor = editor_with("Line 1\nLine 2\nLine 3");
        editor.set_cursor_position(1, 3);
        editor.delete_line();
        assert_eq!(editor.get_content(), "Line 1\nLine 3");
        assert_eq!(editor.clipboard(), "Line 2\n");

        editor.paste();
        assert_eq!(editor.get_content(), "Line 1\nLine 3\nLine 2");
        assert_eq!(editor.cursor_position(), (2, 0));
    }

    #[test]
    fn test_delete_last_line() {
        let mut editor = editor_with("a\nb");
        editor.set_cursor_position(1, 0);
        editor.delete_line();
        assert_eq!(editor.get_content(), "a");
        assert_eq!(editor.cursor_position(), (0, 0));
    }

    #[test]
    fn test_yank_line_paste() {
        let mut editor = editor_with("one\ntwo");
        editor.yank_line();
        editor.paste();
        assert_eq!(editor.get_content(), "one\none\ntwo");
        assert!(editor.is_modified());
    }

    #[test]
    fn test_undo_redo_functionality() {
        let mut editor = Editor::new();
        assert!(!editor.undo());
        assert!(!editor.redo());

        editor.insert_char('H');
        editor.insert_char('i');
        assert!(editor.undo());
        assert_eq!(editor.get_content(), "H");
        assert!(editor.redo());
        assert_eq!(editor.get_content(), "Hi");

        assert!(editor.undo());
        assert!(editor.undo());
        assert_eq!(editor.get_content(), "");
        assert!(!editor.undo());
    }

    #[test]
    fn test_horizontal_scroll_follows_cursor() {
        let mut editor = editor_with("x");
        assert_eq!(editor.scroll_to_display_col(5, 10), 0);
        assert_eq!(editor.scroll_to_display_col(10, 10), 1);
        assert_eq!(editor.scroll_to_display_col(25, 10), 16);
        assert_eq!(editor.scroll_to_display_col(20, 10), 16);
        assert_eq!(editor.scroll_to_display_col(3, 10), 3);

        editor.set_content("y".to_string());
        assert_eq!(editor.horizontal_offset(), 0);
    }

    #[test]
    fn test_undo_back_to_saved_content_clears_modified() {
        let mut editor = editor_with("abc");
        editor.move_to_line_end();
        editor.insert_char('d');
        editor.mark_saved();
        editor.insert_char('e');
        assert!(editor.is_modified());

        assert!(editor.undo());
        assert_eq!(editor.get_content(), "abcd");
        assert!(!editor.is_modified());

        assert!(editor.undo());
        assert!(editor.is_modified());
        assert!(editor.redo());
        assert!(!editor.is_modified());

        // A new edit after undoing past the save drops the saved entry
        assert!(editor.undo());
        editor.insert_char('x');
        assert!(editor.undo());
        assert_eq!(editor.get_content(), "abc");
        assert!(editor.is_modified());
    }

    #[test]
    fn test_history_limit() {
        let mut editor = Editor::new();
        for i in 0..110 {
            editor.insert_char((b'a' + (i % 26) as u8) as char);
        }
        assert!(editor.history.len() <= HISTORY_LIMIT);

        let mut undone = 0;
        while editor.undo() {
            undone += 1;
        }
        assert_eq!(undone, HISTORY_LIMIT - 1);
    }

    #[test]
    fn test_set_content_resets_history() {
        let mut editor = Editor::new();
        editor.insert_char('H');
        editor.set_content("New content".to_string());
        assert!(!editor.undo());

        editor.insert_char('!');
        assert!(editor.undo());
        assert_eq!(editor.get_content(), "New content");
    }

    #[test]
    fn test_selection_includes_cursor_char() {
        let mut editor = editor_with("Hello World");
        editor.start_selection();
        for _ in 0..4 {
            editor.move_cursor_right();
        }
        assert_eq!(editor.selected_text(), "Hello");
        assert!(editor.is_selected(0, 4));
        assert!(!editor.is_selected(0, 5));

        editor.yank_selection();
        assert_eq!(editor.clipboard(), "Hello");
        assert_eq!(editor.get_content(), "Hello World");
    }

    #[test]
    fn test_backward_selection_delete() {
        let mut editor = editor_with("Line 1\nLine 2");
        editor.set_cursor_position(1, 1);
        editor.start_selection();
        editor.move_cursor_up();
        editor.move_to_line_start();

        editor.delete_selection();
        assert_eq!(editor.get_content(), "ne 2");
        assert_eq!(editor.clipboard(), "Line 1\nLi");
        assert!(!editor.has_selection());
        assert_eq!(editor.cursor_position(), (0, 0));
    }

    #[test]
    fn test_append_text_moves_cursor_to_end() {
        let mut editor = editor_with("Question");
        editor.take_dirty_line();
        editor.append_text("\n\nAssistant\nAnswer\n\nUser\n");

        assert!(editor.is_modified());
        assert_eq!(editor.cursor_position(), (6, 0));
        assert_eq!(editor.take_dirty_line(), Some(0));
        assert_eq!(editor.take_dirty_line(), None);
    }

    #[test]
    fn test_dirty_line_tracks_earliest_edit() {
        let mut editor = editor_with("a\nb\nc");
        assert_eq!(editor.take_dirty_line(), Some(0));

        editor.set_cursor_position(2, 1);
        editor.insert_char('x');
        editor.set_cursor_position(1, 0);
        editor.insert_char('y');
        assert_eq!(editor.take_dirty_line(), Some(1));
    }

    #[test]
    fn test_viewport_follows_cursor() {
        let content = (0..50).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let mut editor = editor_with(&content);
        editor.set_viewport_height(10);
        editor.move_to_document_end();
        assert_eq!(editor.get_viewport_offset(), 40);
        assert_eq!(editor.last_visible_line(), 49);

        editor.page_up();
        assert_eq!(editor.cursor_position().0, 39);
        assert_eq!(editor.get_viewport_lines().len(), 10);
    }

    #[test]
    fn test_wide_characters_are_single_columns() {
        let mut editor = editor_with("こんにちは");
        editor.move_cursor_right();
        editor.insert_char('!');
        assert_eq!(editor.get_content(), "こ!んにちは");
        assert_eq!(editor.cursor_position(), (0, 2));
    }
}
