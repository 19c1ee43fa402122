use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::file_manager::FileManager;

pub const PARENT_ENTRY: &str = "../";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Idle,
    Load,
    Save,
}

/// State of the "Pick a file" and "Save As" popups.
#[derive(Debug, Clone)]
pub struct FilePicker {
    action: Action,
    active: bool,
    dir: PathBuf,
    entries: Vec<String>,
    selected: usize,
    input: String,
    /// Char index into `input`.
    cursor_pos: usize,
}

impl FilePicker {
    pub fn new() -> Self {
        Self {
            action: Action::Idle,
            active: false,
            dir: PathBuf::new(),
            entries: Vec::new(),
            selected: 0,
            input: String::new(),
            cursor_pos: 0,
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lists `dir` as `../`, then `name/` directories, then files.
    pub async fn open_for_load(&mut self, dir: &Path) -> Result<()> {
        let (dirs, files) = FileManager::list_dir(dir).await?;

        let mut entries = Vec::with_capacity(dirs.len() + files.len() + 1);
        entries.push(PARENT_ENTRY.to_string());
        entries.extend(dirs.into_iter().map(|d| format!("{}/", d)));
        entries.extend(files);

        self.dir = dir.to_path_buf();
        self.entries = entries;
        self.selected = 0;
        self.active = true;
        self.action = Action::Load;
        Ok(())
    }

    /// Re-lists the picker for the selected directory entry. Returns the
    /// new directory, or `None` when the selection is a file.
    pub async fn enter_dir(&mut self) -> Result<Option<PathBuf>> {
        let Some(entry) = self.selected_entry() else {
            return Ok(None);
        };
        if !entry.ends_with('/') {
            return Ok(None);
        }

        let target = FileManager::change_dir(&self.dir, entry)?;
        self.open_for_load(&target).await?;
        Ok(Some(target))
    }

    pub fn open_for_save(&mut self, initial: &str) {
        self.active = true;
        self.action = Action::Save;
        self.input = initial.to_string();
        self.cursor_pos = self.input.chars().count();
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&str> {
        self.entries.get(self.selected).map(String::as_str)
    }

    /// Full path of the selected file entry.
    pub fn selected_path(&self) -> Option<PathBuf> {
        self.selected_entry()
            .filter(|entry| !entry.ends_with('/'))
            .map(|entry| self.dir.join(entry))
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.action = Action::Idle;
        self.dir = PathBuf::new();
        self.entries.clear();
        self.selected = 0;
        self.input.clear();
        self.cursor_pos = 0;
    }

    // Save As input line
    pub fn input(&self) -> &str {
        self.input.trim()
    }

    pub fn raw_input(&self) -> &str {
        &self.input
    }

    pub fn cursor_pos(&self) -> usize {
        self.cursor_pos
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    pub fn insert_char(&mut self, c: char) {
        let idx = self.byte_index(self.cursor_pos);
        self.input.insert(idx, c);
        self.cursor_pos += 1;
    }

    pub fn delete_previous_char(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
            let idx = self.byte_index(self.cursor_pos);
            self.input.remove(idx);
        }
    }

    pub fn delete_current_char(&mut self) {
        if self.cursor_pos < self.input.chars().count() {
            let idx = self.byte_index(self.cursor_pos);
            self.input.remove(idx);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor_pos < self.input.chars().count() {
            self.cursor_pos += 1;
        }
    }
}

impl Default for FilePicker {
    fn default() -> Self {
        Self::new()
    }
}
