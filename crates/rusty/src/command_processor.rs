use anyhow::{anyhow, Result};
use assistant::{ChatContext, Model};

use crate::editor::Editor;
use crate::file_manager::FileManager;
use crate::history::History;
use crate::request::RequestHandler;

/// Names offered by Tab completion on the command line.
pub const COMMAND_NAMES: &[&str] = &[
    "ask", "cd", "context", "e", "help", "history", "load", "ls", "model", "new", "pwd", "q", "q!",
    "search", "theme", "unload", "w", "wq",
];

const NO_WRITE: &str = "E37: No write since last change (add ! to override)";

/// Everything a `:` command may touch.
pub struct Session<'a> {
    pub editor: &'a mut Editor,
    pub file_manager: &'a mut FileManager,
    pub context: &'a mut ChatContext,
    pub requests: &'a mut RequestHandler,
    pub history: &'a History,
    pub model: &'a mut Model,
    pub should_quit: bool,
    pub show_help: bool,
    /// Set when the buffer was replaced by another file.
    pub buffer_replaced: bool,
    /// Syntax theme requested with `:theme`, applied by the app.
    pub theme_change: Option<String>,
}

impl<'a> Session<'a> {
    pub fn new(
        editor: &'a mut Editor,
        file_manager: &'a mut FileManager,
        context: &'a mut ChatContext,
        requests: &'a mut RequestHandler,
        history: &'a History,
        model: &'a mut Model,
    ) -> Self {
        Self {
            editor,
            file_manager,
            context,
            requests,
            history,
            model,
            should_quit: false,
            show_help: false,
            buffer_replaced: false,
            theme_change: None,
        }
    }
}

pub struct CommandProcessor;

impl CommandProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Runs one command line and returns the message to show.
    pub async fn execute_command(&self, command: &str, session: &mut Session<'_>) -> Result<String> {
        let cmd = command.trim();
        if cmd.is_empty() {
            return Ok(String::new());
        }

        let (name, arg) = match cmd.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (cmd, ""),
        };
        log::debug!("Executing command '{}'", name);

        match name {
            "w" => {
                if !arg.is_empty() {
                    let path = session.file_manager.resolve(arg);
                    let result = session.file_manager.save_file_as(path, session.editor).await?;
                    session.buffer_replaced = true;
                    Ok(result)
                } else {
                    session.file_manager.save_file(session.editor).await
                }
            }
            "q" => {
                if session.editor.is_modified() {
                    Err(anyhow!(NO_WRITE))
                } else {
                    session.should_quit = true;
                    Ok("Quitting".to_string())
                }
            }
            "q!" => {
                session.should_quit = true;
                Ok("Quitting without saving".to_string())
            }
            "wq" | "x" => {
                let result = session.file_manager.save_file(session.editor).await?;
                session.should_quit = true;
                Ok(result)
            }
            "e" | "e!" => {
                if arg.is_empty() {
                    return Err(anyhow!("E471: Argument required"));
                }
                if name == "e" && session.editor.is_modified() {
                    return Err(anyhow!(NO_WRITE));
                }
                let path = session.file_manager.resolve(arg);
                let content = session.file_manager.open_file(path).await?;
                let lines = content.lines().count();
                session.editor.set_content(content);
                session.buffer_replaced = true;
                Ok(format!("\"{}\" {}L", arg, lines))
            }
            "search" => {
                if arg.is_empty() {
                    return Err(anyhow!("E35: No previous regular expression"));
                }
                if session.editor.search(arg) {
                    Ok(format!("/{}", arg))
                } else {
                    Err(anyhow!("E486: Pattern not found: {}", arg))
                }
            }
            "ls" => {
                let (dirs, files) =
                    FileManager::list_dir(session.file_manager.working_dir()).await?;
                let listing: Vec<String> = dirs
                    .into_iter()
                    .map(|d| format!("{}/", d))
                    .chain(files)
                    .collect();
                if listing.is_empty() {
                    Ok("(empty directory)".to_string())
                } else {
                    Ok(listing.join("  "))
                }
            }
            "cd" => {
                if arg.is_empty() {
                    return Ok(session.file_manager.working_dir().display().to_string());
                }
                let dir = session.file_manager.set_working_dir(arg)?;
                Ok(dir.display().to_string())
            }
            "pwd" => Ok(session.file_manager.working_dir().display().to_string()),
            "load" => {
                if arg.is_empty() {
                    return Err(anyhow!("E471: Argument required"));
                }
                let size = session
                    .context
                    .load_file(session.file_manager.working_dir(), arg)
                    .await?;
                Ok(format!("Loaded {} into context ({} bytes)", arg, size))
            }
            "unload" => {
                if arg.is_empty() {
                    session.context.clear();
                    Ok("Context cleared".to_string())
                } else if session.context.unload(arg) {
                    Ok(format!("Removed {} from context", arg))
                } else {
                    Err(anyhow!("Not in context: {}", arg))
                }
            }
            "context" => {
                if session.context.is_empty() {
                    Ok("No files in context".to_string())
                } else {
                    Ok(format!("Context: {}", session.context.loaded_files().join(", ")))
                }
            }
            "ask" => {
                let model = if arg.is_empty() {
                    *session.model
                } else {
                    arg.parse::<Model>()?
                };
                session
                    .requests
                    .send(session.editor.get_content(), model, session.context.clone())?;
                Ok(format!("Sending request to {}", model))
            }
            "model" => {
                if arg.is_empty() {
                    return Ok(format!("Current model: {}", session.model));
                }
                *session.model = arg.parse::<Model>()?;
                Ok(format!("Model set to {}", session.model))
            }
            "history" => {
                if arg.is_empty() {
                    let names = session.history.list().await?;
                    if names.is_empty() {
                        return Ok(format!(
                            "No transcripts in {}",
                            session.history.root().display()
                        ));
                    }
                    return Ok(names.join("  "));
                }
                if session.editor.is_modified() {
                    return Err(anyhow!(NO_WRITE));
                }
                let path = session.history.path_for(arg)?;
                let content = session.file_manager.open_file(path.clone()).await?;
                session.editor.set_content(content);
                session.editor.move_to_document_end();
                session.buffer_replaced = true;
                Ok(format!("Opened {}", path.display()))
            }
            "theme" => {
                if arg.is_empty() {
                    return Err(anyhow!("E471: Argument required"));
                }
                session.theme_change = Some(arg.to_string());
                Ok(String::new())
            }
            "new" => {
                if session.editor.is_modified() {
                    return Err(anyhow!(NO_WRITE));
                }
                let name = if arg.is_empty() { None } else { Some(arg) };
                let path = session.history.new_file(name).await?;
                let content = session.file_manager.open_file(path.clone()).await?;
                session.editor.set_content(content);
                session.buffer_replaced = true;
                Ok(format!("New chat: {}", path.display()))
            }
            "help" | "h" => {
                session.show_help = true;
                Ok(String::new())
            }
            _ => Err(anyhow!("E492: Not an editor command: {}", cmd)),
        }
    }
}

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}
