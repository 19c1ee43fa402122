/// Which leader-key menu is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuType {
    Inactive,
    Main,
    File,
    Ai,
}

/// Leader-key menu opened with Space in Normal mode.
#[derive(Debug, Clone, Copy)]
pub struct CommandsMenu {
    menu_type: MenuType,
    active: bool,
}

impl CommandsMenu {
    pub fn new() -> Self {
        Self {
            menu_type: MenuType::Inactive,
            active: false,
        }
    }

    pub fn set_active_menu(&mut self, menu: MenuType) {
        self.menu_type = menu;
        self.active = menu != MenuType::Inactive;
    }

    pub fn is_active(&self, menu: MenuType) -> bool {
        self.active && self.menu_type == menu
    }

    pub fn is_open(&self) -> bool {
        self.active
    }

    pub fn menu_type(&self) -> MenuType {
        self.menu_type
    }

    pub fn reset(&mut self) {
        self.menu_type = MenuType::Inactive;
        self.active = false;
    }

    /// Title and key hints of the open menu.
    pub fn entries(&self) -> Option<(&'static str, Vec<String>)> {
        if !self.active {
            return None;
        }

        let (title, entries): (&str, &[&str]) = match self.menu_type {
            MenuType::Inactive => return None,
            MenuType::Main => ("Menu", &["f - File", "a - AI", "Esc - Close"]),
            MenuType::File => (
                "File",
                &[
                    "o - Open file",
                    "s - Save",
                    "w - Save as",
                    "n - New chat",
                    "Esc - Close",
                ],
            ),
            MenuType::Ai => (
                "AI",
                &[
                    "l - Send request to Ollama",
                    "o - Send request to OpenAI",
                    "a - Send request to Anthropic",
                    "e - Echo the question",
                    "Esc - Close",
                ],
            ),
        };

        Some((title, entries.iter().map(|e| e.to_string()).collect()))
    }
}

impl Default for CommandsMenu {
    fn default() -> Self {
        Self::new()
    }
}
