// Rusty library exports

pub mod app;
pub mod command_processor;
pub mod config;
pub mod editor;
pub mod file_manager;
pub mod file_picker;
pub mod highlight;
pub mod history;
pub mod menu;
pub mod request;
pub mod status_manager;
pub mod syntax_cache;
pub mod text_width;
pub mod ui;
pub mod ui_state;

pub use app::{App, Mode};
pub use config::Config;
pub use editor::Editor;
pub use ui_state::UIState;
