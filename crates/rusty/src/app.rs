use anyhow::Result;
use assistant::{Assistant, ChatContext, Model};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::{Path, PathBuf};

use crate::command_processor::{CommandProcessor, Session};
use crate::config::Config;
use crate::editor::Editor;
use crate::file_manager::FileManager;
use crate::file_picker::FilePicker;
use crate::highlight::{HighlightCache, Highlighter};
use crate::history::History;
use crate::menu::{CommandsMenu, MenuType};
use crate::request::RequestHandler;
use crate::status_manager::MessageType;
use crate::ui_state::UIState;

const SAVE_PROMPT: &str = "Save changes before quitting? (y)es / (n)o / (c)ancel";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Insert,
    Select,
    Command,
    FilePicker,
    SaveAs,
    SavePrompt,
    Help,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Insert => "INSERT",
            Mode::Select => "SELECT",
            Mode::Command => "COMMAND",
            Mode::FilePicker => "OPEN",
            Mode::SaveAs => "SAVE AS",
            Mode::SavePrompt => "SAVE?",
            Mode::Help => "HELP",
        }
    }
}

pub struct App {
    pub editor: Editor,
    pub config: Config,
    pub ui_state: UIState,
    pub file_manager: FileManager,
    pub command_processor: CommandProcessor,
    pub context: ChatContext,
    pub requests: RequestHandler,
    pub history: History,
    /// Model used by `:ask` without an argument.
    pub model: Model,
    pub menu: CommandsMenu,
    pub file_picker: FilePicker,
    pub highlighter: Highlighter,
    pub highlight_cache: HighlightCache,
    last_key: Option<char>, // For two-key commands like dd and yy
    line_count: usize,
    quit_after_save: bool,
}

impl App {
    /// Loads the configuration and opens today's transcript.
    pub async fn new() -> Result<Self> {
        let config = Config::load().await?;
        let working_dir = std::env::current_dir()?;
        let mut app = Self::with_config(config, working_dir);

        if let Err(e) = app.open_today().await {
            log::warn!("Could not open today's history file: {}", e);
            app.ui_state
                .set_warning_message(format!("History unavailable: {}", e));
        }

        Ok(app)
    }

    /// An app with an empty untitled buffer.
    pub fn with_config(config: Config, working_dir: PathBuf) -> Self {
        let mut editor = Editor::new();
        editor.set_tab_config(config.editor.tab_size, config.editor.use_spaces);

        let history_root = if config.history_dir.is_absolute() {
            config.history_dir.clone()
        } else {
            working_dir.join(&config.history_dir)
        };

        let assistant = Assistant::new(config.assistant.clone());
        let model = assistant.default_model();
        let context = ChatContext::new(config.assistant.system_prompt.clone());
        let highlighter = Highlighter::new(&config.theme.syntax_theme);

        let mut app = Self {
            editor,
            ui_state: UIState::new(),
            file_manager: FileManager::with_working_dir(working_dir),
            command_processor: CommandProcessor::new(),
            context,
            requests: RequestHandler::new(assistant),
            history: History::new(history_root),
            model,
            menu: CommandsMenu::new(),
            file_picker: FilePicker::new(),
            highlighter,
            highlight_cache: HighlightCache::new(),
            config,
            last_key: None,
            line_count: 1,
            quit_after_save: false,
        };
        app.on_buffer_replaced();
        app
    }

    pub async fn open_today(&mut self) -> Result<()> {
        let path = self.history.open_today().await?;
        self.open_path(path).await?;
        self.editor.move_to_document_end();
        Ok(())
    }

    pub async fn open_path(&mut self, path: PathBuf) -> Result<()> {
        let content = self.file_manager.open_file(path).await?;
        self.editor.set_content(content);
        self.on_buffer_replaced();
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        self.ui_state.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.ui_state.set_mode(mode);
    }

    pub fn is_modified(&self) -> bool {
        self.editor.is_modified()
    }

    pub fn should_quit(&self) -> bool {
        self.ui_state.should_quit()
    }

    pub fn file_path(&self) -> Option<&PathBuf> {
        self.file_manager.get_current_path()
    }

    pub fn working_dir(&self) -> &Path {
        self.file_manager.working_dir()
    }

    /// Called once per loop iteration.
    pub fn tick(&mut self) {
        self.poll_requests();
        self.ui_state.update_status();
    }

    /// Appends finished answers to the transcript.
    pub fn poll_requests(&mut self) {
        while let Some(outcome) = self.requests.poll() {
            match outcome.result {
                Ok(answer) => {
                    self.editor.append_text(&mdcore::format_response(&answer));
                    self.ui_state
                        .set_success_message(format!("Response from {}", outcome.model));
                }
                Err(e) => {
                    self.ui_state
                        .set_error_message(format!("{} request failed: {}", outcome.model, e));
                }
            }
        }
    }

    /// Brings the highlight cache up to date for the visible lines.
    pub fn refresh_highlighting(&mut self) {
        if let Some(line) = self.editor.take_dirty_line() {
            let count = self.editor.line_count();
            if count != self.line_count {
                // Lines below the edit shifted
                self.highlight_cache.mark_from(line);
                self.line_count = count;
            } else {
                self.highlight_cache.mark_line_dirty(line);
            }
        }

        let last_visible = self.editor.last_visible_line();
        let editor = &self.editor;
        self.highlighter
            .refresh(&mut self.highlight_cache, last_visible, |i| editor.line(i));
    }

    fn on_buffer_replaced(&mut self) {
        let name = self
            .file_manager
            .get_current_path()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().to_string());
        let content = self.editor.get_content();
        self.highlighter.detect(name.as_deref(), &content);
        self.highlight_cache.mark_all_dirty();
        self.editor.take_dirty_line();
        self.line_count = self.editor.line_count();
    }

    pub async fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.request_quit();
            return Ok(());
        }

        match self.ui_state.mode {
            Mode::Normal if self.menu.is_open() => self.handle_menu_key(key).await?,
            Mode::Normal => self.handle_normal_mode_key(key).await?,
            Mode::Insert => self.handle_insert_mode_key(key),
            Mode::Select => self.handle_select_mode_key(key),
            Mode::Command => self.handle_command_key(key).await?,
            Mode::FilePicker => self.handle_file_picker_key(key).await?,
            Mode::SaveAs => self.handle_save_as_key(key).await?,
            Mode::SavePrompt => self.handle_save_prompt_key(key).await?,
            Mode::Help => self.handle_help_key(key),
        }
        Ok(())
    }

    fn request_quit(&mut self) {
        self.menu.reset();
        if self.editor.is_modified() {
            self.ui_state.set_mode(Mode::SavePrompt);
            self.ui_state
                .status_manager
                .set_sticky(SAVE_PROMPT.to_string(), MessageType::Warning);
        } else {
            log::info!("Quit requested");
            self.ui_state.quit();
        }
    }

    async fn handle_normal_mode_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::ALT) {
            match key.code {
                KeyCode::Char('l') => self.send_request(Model::Ollama),
                KeyCode::Char('o') => self.send_request(Model::OpenAi),
                KeyCode::Char('a') => self.send_request(Model::Anthropic),
                _ => {}
            }
            return Ok(());
        }

        if !matches!(key.code, KeyCode::Char('d') | KeyCode::Char('y')) {
            self.last_key = None;
        }

        match key.code {
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.handle_redo()
            }
            _ if key.modifiers.contains(KeyModifiers::CONTROL) => {}

            KeyCode::Char('h') | KeyCode::Left => self.editor.move_cursor_left(),
            KeyCode::Char('j') | KeyCode::Down => self.editor.move_cursor_down(),
            KeyCode::Char('k') | KeyCode::Up => self.editor.move_cursor_up(),
            KeyCode::Char('l') | KeyCode::Right => self.editor.move_cursor_right(),
            KeyCode::Home => self.editor.move_to_line_start(),
            KeyCode::End => self.editor.move_to_line_end(),
            KeyCode::PageUp => self.editor.page_up(),
            KeyCode::PageDown => self.editor.page_down(),
            KeyCode::Char('G') => self.editor.move_to_document_end(),

            KeyCode::Char('i') => self.ui_state.set_mode(Mode::Insert),
            KeyCode::Char('a') => {
                let (line, col) = self.editor.cursor_position();
                let len = self.editor.line(line).map_or(0, |l| l.chars().count());
                if col < len {
                    self.editor.move_cursor_right();
                }
                self.ui_state.set_mode(Mode::Insert);
            }
            KeyCode::Char('o') => {
                self.editor.move_to_line_end();
                self.editor.insert_newline();
                self.ui_state.set_mode(Mode::Insert);
            }
            KeyCode::Char('O') => {
                self.editor.move_to_line_start();
                self.editor.insert_newline();
                self.editor.move_cursor_up();
                self.ui_state.set_mode(Mode::Insert);
            }
            KeyCode::Char('v') => {
                self.editor.start_selection();
                self.ui_state.set_mode(Mode::Select);
            }

            KeyCode::Char('x') => self.editor.delete_char_forward(),
            KeyCode::Char('d') => self.handle_line_command('d'),
            KeyCode::Char('y') => self.handle_line_command('y'),
            KeyCode::Char('p') => {
                if self.editor.clipboard().is_empty() {
                    self.ui_state
                        .set_warning_message("Nothing to paste".to_string());
                } else {
                    self.editor.paste();
                    self.ui_state.set_success_message("Text pasted".to_string());
                }
            }
            KeyCode::Char('u') => self.handle_undo(),

            KeyCode::Char('s') => self.save().await,
            KeyCode::Char(':') => self.ui_state.enter_command_mode(),
            KeyCode::Char('/') => self.ui_state.enter_search_mode(),
            KeyCode::Char('?') => self.ui_state.set_mode(Mode::Help),
            KeyCode::Char(' ') => self.menu.set_active_menu(MenuType::Main),
            KeyCode::Char('q') => self.request_quit(),
            KeyCode::Esc => {
                self.requests.acknowledge_error();
                self.ui_state.status_manager.clear();
            }
            _ => {}
        }
        Ok(())
    }

    /// `dd` deletes the line, `yy` copies it.
    fn handle_line_command(&mut self, key: char) {
        if self.last_key != Some(key) {
            self.last_key = Some(key);
            return;
        }

        self.last_key = None;
        if key == 'd' {
            self.editor.delete_line();
            self.ui_state
                .set_success_message("Line deleted and yanked".to_string());
        } else {
            self.editor.yank_line();
            self.ui_state.set_success_message("Line yanked".to_string());
        }
    }

    fn handle_undo(&mut self) {
        if self.editor.undo() {
            self.highlight_cache.mark_all_dirty();
            self.ui_state.set_success_message("Undone".to_string());
        } else {
            self.ui_state
                .set_warning_message("Nothing to undo".to_string());
        }
    }

    fn handle_redo(&mut self) {
        if self.editor.redo() {
            self.highlight_cache.mark_all_dirty();
            self.ui_state.set_success_message("Redone".to_string());
        } else {
            self.ui_state
                .set_warning_message("Nothing to redo".to_string());
        }
    }

    fn handle_insert_mode_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.ui_state.enter_normal_mode(),
            KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => {}
            KeyCode::Char(c) => self.editor.insert_char(c),
            KeyCode::Enter => self.editor.insert_newline(),
            KeyCode::Backspace => self.editor.delete_char_backward(),
            KeyCode::Delete => self.editor.delete_char_forward(),
            KeyCode::Tab => self.editor.insert_tab(),

            KeyCode::Left => self.editor.move_cursor_left(),
            KeyCode::Right => self.editor.move_cursor_right(),
            KeyCode::Up => self.editor.move_cursor_up(),
            KeyCode::Down => self.editor.move_cursor_down(),
            KeyCode::Home => self.editor.move_to_line_start(),
            KeyCode::End => self.editor.move_to_line_end(),
            _ => {}
        }
    }

    fn handle_select_mode_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.editor.clear_selection();
                self.ui_state.enter_normal_mode();
            }

            // Movement extends the selection
            KeyCode::Char('h') | KeyCode::Left => self.editor.move_cursor_left(),
            KeyCode::Char('j') | KeyCode::Down => self.editor.move_cursor_down(),
            KeyCode::Char('k') | KeyCode::Up => self.editor.move_cursor_up(),
            KeyCode::Char('l') | KeyCode::Right => self.editor.move_cursor_right(),
            KeyCode::Home => self.editor.move_to_line_start(),
            KeyCode::End => self.editor.move_to_line_end(),
            KeyCode::Char('G') => self.editor.move_to_document_end(),

            KeyCode::Char('y') => {
                self.editor.yank_selection();
                self.editor.clear_selection();
                self.ui_state.enter_normal_mode();
                self.ui_state
                    .set_success_message("Selection yanked".to_string());
            }
            KeyCode::Char('d') | KeyCode::Char('x') => {
                self.editor.delete_selection();
                self.ui_state.enter_normal_mode();
                self.ui_state
                    .set_success_message("Selection deleted and yanked".to_string());
            }
            KeyCode::Char('c') => {
                self.editor.delete_selection();
                self.ui_state.set_mode(Mode::Insert);
            }
            _ => {}
        }
    }

    async fn handle_command_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Enter => {
                if self.ui_state.command_prefix == ':' {
                    let line = self.ui_state.command_buffer.clone();
                    self.ui_state.add_to_history(line);
                }
                let command = self.ui_state.take_command();
                self.ui_state.enter_normal_mode();
                self.execute_command(&command).await;
            }
            KeyCode::Esc => {
                self.ui_state.enter_normal_mode();
                self.ui_state.set_info_message("Cancelled".to_string());
            }
            KeyCode::Up => self.ui_state.history_up(),
            KeyCode::Down => self.ui_state.history_down(),
            KeyCode::Tab => {
                if !self.ui_state.complete_command() {
                    self.ui_state
                        .set_warning_message("No matching commands".to_string());
                }
            }
            KeyCode::Backspace => {
                if self.ui_state.command_buffer.is_empty() {
                    self.ui_state.enter_normal_mode();
                } else {
                    self.ui_state.pop_from_command_buffer();
                }
            }
            KeyCode::Char(c) => self.ui_state.push_to_command_buffer(c),
            _ => {}
        }
        Ok(())
    }

    /// Runs a `:` command and reports the outcome on the message line.
    pub async fn execute_command(&mut self, command: &str) {
        let mut session = Session::new(
            &mut self.editor,
            &mut self.file_manager,
            &mut self.context,
            &mut self.requests,
            &self.history,
            &mut self.model,
        );
        let result = self
            .command_processor
            .execute_command(command, &mut session)
            .await;
        let (should_quit, show_help, buffer_replaced) = (
            session.should_quit,
            session.show_help,
            session.buffer_replaced,
        );
        let theme_change = session.theme_change.take();

        match result {
            Ok(message) if message.contains("written") => {
                self.ui_state.set_success_message(message)
            }
            Ok(message) if !message.is_empty() => self.ui_state.set_info_message(message),
            Ok(_) => {}
            Err(e) => self.ui_state.set_error_message(e.to_string()),
        }

        if buffer_replaced {
            self.on_buffer_replaced();
        }
        if let Some(theme) = theme_change {
            self.apply_theme(theme).await;
        }
        if show_help {
            self.ui_state.set_mode(Mode::Help);
        }
        if should_quit {
            self.ui_state.quit();
        }
    }

    /// Switches the syntax theme and stores it in the config file.
    async fn apply_theme(&mut self, theme: String) {
        if let Err(e) = self.highlighter.set_theme(&theme) {
            self.ui_state.set_error_message(e.to_string());
            return;
        }
        self.highlight_cache.mark_all_dirty();
        self.config.theme.syntax_theme = theme;

        match self.config.save().await {
            Ok(()) => self.ui_state.set_success_message(format!(
                "Theme set to {}",
                self.config.theme.syntax_theme
            )),
            Err(e) => self
                .ui_state
                .set_warning_message(format!("Theme applied, config not saved: {}", e)),
        }
    }

    fn send_request(&mut self, model: Model) {
        match self
            .requests
            .send(self.editor.get_content(), model, self.context.clone())
        {
            Ok(()) => self
                .ui_state
                .set_info_message(format!("Sending request to {}", model)),
            Err(e) => self.ui_state.set_error_message(e.to_string()),
        }
    }

    /// `s` and the File menu: saves, or asks for a name when untitled.
    async fn save(&mut self) {
        if !self.file_manager.has_file() {
            self.open_save_as();
            return;
        }

        match self.file_manager.save_file(&mut self.editor).await {
            Ok(message) => self.ui_state.set_success_message(message),
            Err(e) => self.ui_state.set_error_message(e.to_string()),
        }
    }

    fn open_save_as(&mut self) {
        let initial = self
            .file_manager
            .get_current_path()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        self.file_picker.open_for_save(&initial);
        self.ui_state.set_mode(Mode::SaveAs);
    }

    async fn open_file_picker(&mut self) {
        let dir = self.file_manager.working_dir().to_path_buf();
        match self.file_picker.open_for_load(&dir).await {
            Ok(()) => self.ui_state.set_mode(Mode::FilePicker),
            Err(e) => self.ui_state.set_error_message(e.to_string()),
        }
    }

    async fn handle_menu_key(&mut self, key: KeyEvent) -> Result<()> {
        let menu = self.menu.menu_type();
        self.menu.reset();

        match (menu, key.code) {
            (MenuType::Main, KeyCode::Char('f')) => self.menu.set_active_menu(MenuType::File),
            (MenuType::Main, KeyCode::Char('a')) => self.menu.set_active_menu(MenuType::Ai),

            (MenuType::File, KeyCode::Char('o')) => self.open_file_picker().await,
            (MenuType::File, KeyCode::Char('s')) => self.save().await,
            (MenuType::File, KeyCode::Char('w')) => self.open_save_as(),
            (MenuType::File, KeyCode::Char('n')) => self.execute_command("new").await,

            (MenuType::Ai, KeyCode::Char('l')) => self.send_request(Model::Ollama),
            (MenuType::Ai, KeyCode::Char('o')) => self.send_request(Model::OpenAi),
            (MenuType::Ai, KeyCode::Char('a')) => self.send_request(Model::Anthropic),
            (MenuType::Ai, KeyCode::Char('e')) => self.send_request(Model::Echo),

            // Esc and unknown keys close the menu
            _ => {}
        }
        Ok(())
    }

    async fn handle_file_picker_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.file_picker.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.file_picker.move_down(),
            KeyCode::Enter => {
                if let Some(path) = self.file_picker.selected_path() {
                    self.open_picked_file(path).await;
                } else if let Err(e) = self.file_picker.enter_dir().await {
                    self.ui_state.set_error_message(e.to_string());
                }
            }
            KeyCode::Esc => {
                self.file_picker.reset();
                self.ui_state.enter_normal_mode();
            }
            _ => {}
        }
        Ok(())
    }

    async fn open_picked_file(&mut self, path: PathBuf) {
        if self.editor.is_modified() {
            self.ui_state.set_error_message(
                "E37: No write since last change, save before opening another file".to_string(),
            );
            return;
        }

        match self.open_path(path.clone()).await {
            Ok(()) => {
                self.file_picker.reset();
                self.ui_state.enter_normal_mode();
                self.ui_state
                    .set_info_message(format!("Opened {}", path.display()));
            }
            Err(e) => self.ui_state.set_error_message(e.to_string()),
        }
    }

    async fn handle_save_as_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Enter => self.confirm_save_as().await,
            KeyCode::Esc => {
                self.file_picker.reset();
                self.quit_after_save = false;
                self.ui_state.enter_normal_mode();
            }
            KeyCode::Char(c) => self.file_picker.insert_char(c),
            KeyCode::Backspace => self.file_picker.delete_previous_char(),
            KeyCode::Delete => self.file_picker.delete_current_char(),
            KeyCode::Left => self.file_picker.move_left(),
            KeyCode::Right => self.file_picker.move_right(),
            _ => {}
        }
        Ok(())
    }

    async fn confirm_save_as(&mut self) {
        let input = self.file_picker.input().to_string();
        if input.is_empty() {
            self.ui_state
                .set_error_message("E32: No file name".to_string());
            return;
        }

        let path = self.file_manager.resolve(&input);
        match self.file_manager.save_file_as(path, &mut self.editor).await {
            Ok(message) => {
                self.file_picker.reset();
                self.ui_state.enter_normal_mode();
                self.ui_state.set_success_message(message);
                self.on_buffer_replaced();
                if self.quit_after_save {
                    self.ui_state.quit();
                }
            }
            Err(e) => self.ui_state.set_error_message(e.to_string()),
        }
    }

    async fn handle_save_prompt_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.ui_state.status_manager.clear();
                if !self.file_manager.has_file() {
                    self.quit_after_save = true;
                    self.open_save_as();
                    return Ok(());
                }
                match self.file_manager.save_file(&mut self.editor).await {
                    Ok(_) => self.ui_state.quit(),
                    Err(e) => {
                        self.ui_state.enter_normal_mode();
                        self.ui_state
                            .set_error_message(format!("Error saving: {}", e));
                    }
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') => self.ui_state.quit(),
            KeyCode::Char('c') | KeyCode::Char('C') | KeyCode::Esc => {
                self.ui_state.enter_normal_mode();
                self.ui_state.status_manager.clear();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_help_key(&mut self, key: KeyEvent) {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
        ) {
            self.ui_state.enter_normal_mode();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestState;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_key_event(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn test_app(dir: &TempDir) -> App {
        App::with_config(Config::default(), dir.path().to_path_buf())
    }

    async fn press(app: &mut App, codes: &[KeyCode]) {
        for code in codes {
            app.handle_key_event(create_key_event(*code)).await.unwrap();
        }
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key_event(create_key_event(KeyCode::Char(c)))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_app_creation() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);
        assert_eq!(app.mode(), Mode::Normal);
        assert!(!app.is_modified());
        assert!(!app.should_quit());
        assert_eq!(app.file_path(), None);
        assert_eq!(app.model, Model::Ollama);
    }

    #[tokio::test]
    async fn test_open_today_loads_history_file() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.open_today().await.unwrap();

        let path = app.file_path().unwrap().clone();
        assert!(path.starts_with(dir.path().join(".rusty")));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_insert_and_escape() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);

        press(&mut app, &[KeyCode::Char('i')]).await;
        assert_eq!(app.mode(), Mode::Insert);
        type_text(&mut app, "hi q").await;
        press(&mut app, &[KeyCode::Esc]).await;

        assert_eq!(app.mode(), Mode::Normal);
        assert_eq!(app.editor.get_content(), "hi q");
        assert!(!app.should_quit());
    }

    #[tokio::test]
    async fn test_dd_and_yy_commands() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.editor.set_content("one\ntwo\nthree".to_string());

        press(&mut app, &[KeyCode::Char('y'), KeyCode::Char('y')]).await;
        assert_eq!(app.editor.clipboard(), "one\n");

        press(&mut app, &[KeyCode::Char('d'), KeyCode::Char('j')]).await;
        assert_eq!(app.editor.line_count(), 3);

        press(&mut app, &[KeyCode::Char('d'), KeyCode::Char('d')]).await;
        assert_eq!(app.editor.get_content(), "one\nthree");
    }

    #[tokio::test]
    async fn test_select_mode_yank() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.editor.set_content("hello world".to_string());

        press(
            &mut app,
            &[KeyCode::Char('v'), KeyCode::Char('l'), KeyCode::Char('l')],
        )
        .await;
        assert_eq!(app.mode(), Mode::Select);
        press(&mut app, &[KeyCode::Char('y')]).await;

        assert_eq!(app.mode(), Mode::Normal);
        assert_eq!(app.editor.clipboard(), "hel");
        assert!(!app.editor.has_selection());
    }

    #[tokio::test]
    async fn test_command_line_execution() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.editor.set_content("Hello World\nTest line".to_string());

        press(&mut app, &[KeyCode::Char('/')]).await;
        type_text(&mut app, "Test").await;
        press(&mut app, &[KeyCode::Enter]).await;
        assert_eq!(app.editor.cursor_position(), (1, 0));
        assert_eq!(app.mode(), Mode::Normal);

        press(&mut app, &[KeyCode::Char(':')]).await;
        type_text(&mut app, "model echo").await;
        press(&mut app, &[KeyCode::Enter]).await;
        assert_eq!(app.model, Model::Echo);
        assert_eq!(app.ui_state.command_history, vec!["model echo"]);

        press(&mut app, &[KeyCode::Char(':')]).await;
        type_text(&mut app, "bogus").await;
        press(&mut app, &[KeyCode::Enter]).await;
        let message = app.ui_state.status_manager.current().unwrap();
        assert_eq!(message.content, "E492: Not an editor command: bogus");
    }

    #[tokio::test]
    async fn test_quit_with_save_prompt() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);

        press(&mut app, &[KeyCode::Char('i'), KeyCode::Char('x'), KeyCode::Esc]).await;
        press(&mut app, &[KeyCode::Char('q')]).await;
        assert_eq!(app.mode(), Mode::SavePrompt);
        assert!(!app.should_quit());

        press(&mut app, &[KeyCode::Char('c')]).await;
        assert_eq!(app.mode(), Mode::Normal);

        app.handle_key_event(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL))
            .await
            .unwrap();
        assert_eq!(app.mode(), Mode::SavePrompt);
        press(&mut app, &[KeyCode::Char('n')]).await;
        assert!(app.should_quit());
    }

    #[tokio::test]
    async fn test_save_untitled_opens_save_as() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.editor.set_content("# Notes".to_string());

        press(&mut app, &[KeyCode::Char('s')]).await;
        assert_eq!(app.mode(), Mode::SaveAs);

        type_text(&mut app, "notes.md").await;
        press(&mut app, &[KeyCode::Enter]).await;

        assert_eq!(app.mode(), Mode::Normal);
        let saved = dir.path().join("notes.md");
        assert_eq!(std::fs::read_to_string(saved).unwrap(), "# Notes");
        assert_eq!(app.highlighter.kind(), &crate::highlight::DocumentKind::Markdown);
    }

    #[tokio::test]
    async fn test_menu_navigation_and_file_picker() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        let mut app = test_app(&dir);

        press(&mut app, &[KeyCode::Char(' ')]).await;
        assert!(app.menu.is_active(MenuType::Main));
        press(&mut app, &[KeyCode::Char('f')]).await;
        assert!(app.menu.is_active(MenuType::File));
        press(&mut app, &[KeyCode::Char('o')]).await;
        assert!(!app.menu.is_open());
        assert_eq!(app.mode(), Mode::FilePicker);

        // "../" first, then a.txt
        press(&mut app, &[KeyCode::Char('j'), KeyCode::Enter]).await;
        assert_eq!(app.mode(), Mode::Normal);
        assert_eq!(app.editor.get_content(), "alpha");
        assert_eq!(app.file_path(), Some(&dir.path().join("a.txt")));
    }

    #[tokio::test]
    async fn test_menu_closes_on_escape() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);

        press(&mut app, &[KeyCode::Char(' '), KeyCode::Esc]).await;
        assert!(!app.menu.is_open());
        assert_eq!(app.mode(), Mode::Normal);
    }

    #[tokio::test]
    async fn test_echo_request_appends_answer() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.editor.set_content("What is a lifetime?".to_string());

        press(&mut app, &[KeyCode::Char(' '), KeyCode::Char('a'), KeyCode::Char('e')]).await;
        assert_eq!(app.requests.state(), &RequestState::Processing(Model::Echo));

        for _ in 0..200 {
            app.tick();
            if !app.requests.is_processing() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(
            app.editor.get_content(),
            "What is a lifetime?\n\nAssistant\nWhat is a lifetime?\n\nUser\n"
        );
        assert!(app.is_modified());
        assert_eq!(app.editor.cursor_position(), (app.editor.line_count() - 1, 0));
    }

    #[tokio::test]
    async fn test_request_on_empty_buffer_reports_error() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);

        app.handle_key_event(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::ALT))
            .await
            .unwrap();
        assert!(matches!(app.requests.state(), RequestState::Error(_)));

        press(&mut app, &[KeyCode::Esc]).await;
        assert_eq!(app.requests.state(), &RequestState::Idle);
    }

    #[tokio::test]
    async fn test_theme_command_updates_and_saves_config() {
        let _guard = crate::config::tests::config_test_lock();
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.json");
        std::env::set_var("RUSTY_CONFIG_PATH", &config_path);

        let mut app = test_app(&dir);
        app.execute_command("theme InspiredGitHub").await;
        assert_eq!(app.config.theme.syntax_theme, "InspiredGitHub");
        let saved = Config::load_from(&config_path).await.unwrap();
        assert_eq!(saved.theme.syntax_theme, "InspiredGitHub");

        app.execute_command("theme no-such-theme").await;
        assert_eq!(app.config.theme.syntax_theme, "InspiredGitHub");
        let message = app.ui_state.status_manager.current().unwrap();
        assert_eq!(message.message_type, MessageType::Error);

        std::env::remove_var("RUSTY_CONFIG_PATH");
    }

    #[tokio::test]
    async fn test_highlight_cache_follows_edits() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.editor.set_content("text\n```rust\nlet x = 1;\n```".to_string());
        app.on_buffer_replaced();
        app.refresh_highlighting();
        assert!(app.highlight_cache.is_line_cached(3));

        press(&mut app, &[KeyCode::Char('j'), KeyCode::Char('o')]).await;
        app.refresh_highlighting();
        assert_eq!(app.editor.line_count(), 5);
        assert!(app.highlight_cache.is_line_cached(4));
    }
}
