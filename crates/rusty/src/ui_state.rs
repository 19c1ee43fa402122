use crate::app::Mode;
use crate::command_processor::COMMAND_NAMES;
use crate::status_manager::{MessageType, StatusManager};

const COMMAND_HISTORY_LIMIT: usize = 100;

/// Mode, message line and command line state.
#[derive(Clone)]
pub struct UIState {
    pub mode: Mode,
    pub status_manager: StatusManager,
    pub command_buffer: String,
    /// `:` for commands, `/` for searches.
    pub command_prefix: char,
    pub should_quit: bool,
    // Command history
    pub command_history: Vec<String>,
    pub history_index: Option<usize>,
    // Tab completion: typed prefix and index of the shown suggestion
    completion: Option<(String, usize)>,
}

impl UIState {
    pub fn new() -> Self {
        Self {
            mode: Mode::Normal,
            status_manager: StatusManager::new(),
            command_buffer: String::new(),
            command_prefix: ':',
            should_quit: false,
            command_history: Vec::new(),
            history_index: None,
            completion: None,
        }
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn enter_normal_mode(&mut self) {
        self.mode = Mode::Normal;
        self.command_buffer.clear();
        self.completion = None;
    }

    pub fn enter_command_mode(&mut self) {
        self.mode = Mode::Command;
        self.command_prefix = ':';
        self.command_buffer.clear();
        self.history_index = None;
        self.completion = None;
    }

    pub fn enter_search_mode(&mut self) {
        self.mode = Mode::Command;
        self.command_prefix = '/';
        self.command_buffer.clear();
        self.history_index = None;
        self.completion = None;
    }

    /// The command to execute for the current line; searches are
    /// rewritten to the `search` command.
    pub fn take_command(&mut self) -> String {
        let input = std::mem::take(&mut self.command_buffer);
        self.completion = None;
        if self.command_prefix == '/' {
            format!("search {}", input)
        } else {
            input
        }
    }

    pub fn push_to_command_buffer(&mut self, c: char) {
        self.command_buffer.push(c);
        self.completion = None;
    }

    pub fn pop_from_command_buffer(&mut self) {
        self.command_buffer.pop();
        self.completion = None;
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn set_info_message(&mut self, message: String) {
        self.status_manager.set(message, MessageType::Info);
    }

    pub fn set_success_message(&mut self, message: String) {
        self.status_manager.set(message, MessageType::Success);
    }

    pub fn set_warning_message(&mut self, message: String) {
        self.status_manager.set(message, MessageType::Warning);
    }

    pub fn set_error_message(&mut self, message: String) {
        self.status_manager.set(message, MessageType::Error);
    }

    pub fn update_status(&mut self) {
        self.status_manager.update();
    }

    // Command history methods
    pub fn add_to_history(&mut self, command: String) {
        if !command.is_empty() && self.command_history.last() != Some(&command) {
            self.command_history.push(command);
            if self.command_history.len() > COMMAND_HISTORY_LIMIT {
                self.command_history.remove(0);
            }
        }
        self.history_index = None;
    }

    pub fn history_up(&mut self) {
        if self.command_history.is_empty() {
            return;
        }

        let new_index = match self.history_index {
            None => self.command_history.len() - 1,
            Some(0) => 0,
            Some(i) => i - 1,
        };

        self.history_index = Some(new_index);
        self.command_buffer = self.command_history[new_index].clone();
        self.completion = None;
    }

    pub fn history_down(&mut self) {
        match self.history_index {
            None => {}
            Some(i) if i + 1 >= self.command_history.len() => {
                self.history_index = None;
                self.command_buffer.clear();
            }
            Some(i) => {
                self.history_index = Some(i + 1);
                self.command_buffer = self.command_history[i + 1].clone();
            }
        }
        self.completion = None;
    }

    pub fn get_command_suggestions(&self, prefix: &str) -> Vec<String> {
        let mut suggestions: Vec<String> = COMMAND_NAMES
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| cmd.to_string())
            .collect();

        for cmd in &self.command_history {
            if cmd.starts_with(prefix) && !suggestions.contains(cmd) {
                suggestions.push(cmd.clone());
            }
        }

        suggestions.sort();
        suggestions.dedup();
        suggestions
    }

    /// Tab completion. Repeated presses cycle through the suggestions for
    /// the prefix typed before the first press.
    pub fn complete_command(&mut self) -> bool {
        let (prefix, index) = match &self.completion {
            Some((prefix, index)) => (prefix.clone(), index + 1),
            None => (self.command_buffer.clone(), 0),
        };

        let suggestions = self.get_command_suggestions(&prefix);
        if suggestions.is_empty() {
            return false;
        }

        let index = index % suggestions.len();
        self.command_buffer = suggestions[index].clone();
        self.completion = Some((prefix, index));
        true
    }
}

impl Default for UIState {
    fn default() -> Self {
        Self::new()
    }
}
