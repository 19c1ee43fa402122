use anyhow::{anyhow, Result};
use assistant::AssistantConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::try_exists;

const CONFIG_PATH_ENV: &str = "RUSTY_CONFIG_PATH";
const CONFIG_DIR_ENV: &str = "RUSTY_CONFIG_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: Theme,
    pub editor: EditorConfig,
    pub assistant: AssistantConfig,
    pub history_dir: PathBuf,
    pub tick_rate_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub syntax_theme: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    pub tab_size: usize,
    pub use_spaces: bool,
    pub line_numbers: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: String::from("dark"),
            syntax_theme: String::from("base16-ocean.dark"),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tab_size: 4,
            use_spaces: true,
            line_numbers: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            editor: EditorConfig::default(),
            assistant: AssistantConfig::default(),
            history_dir: PathBuf::from(".rusty"),
            tick_rate_ms: 100,
        }
    }
}

impl Config {
    pub async fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path).await,
            None => {
                log::warn!("No config directory available, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reads `path`, falling back to defaults (and rewriting the file) when
    /// it is missing, empty or unparsable.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if try_exists(path).await? {
            match tokio::fs::read_to_string(path).await {
                Ok(content) if content.trim().is_empty() => {
                    log::warn!("Config file is empty, creating new one");
                }
                Ok(content) => match serde_json::from_str::<Self>(&content) {
                    Ok(mut config) => {
                        config.validate()?;
                        log::info!("Loaded config from: {}", path.display());
                        return Ok(config);
                    }
                    Err(json_err) => {
                        log::error!("Failed to parse config file: {}", json_err);

                        let backup_path = path.with_extension("bak");
                        match tokio::fs::copy(path, &backup_path).await {
                            Ok(_) => log::info!(
                                "Backed up broken config to: {}",
                                backup_path.display()
                            ),
                            Err(e) => log::warn!("Failed to backup broken config: {}", e),
                        }
                    }
                },
                Err(io_err) => {
                    log::error!("Failed to read config file: {}", io_err);
                    return Ok(Self::default());
                }
            }
        } else {
            log::info!("Config file does not exist, creating default");
        }

        let default_config = Self::default();
        if let Err(e) = default_config.save_to(path).await {
            log::warn!("Failed to write default config: {}", e);
        }
        Ok(default_config)
    }

    pub async fn save(&self) -> Result<()> {
        match Self::config_path() {
            Some(path) => self.save_to(&path).await,
            None => Ok(()),
        }
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let mut config_to_save = self.clone();
        config_to_save.validate()?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                anyhow!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
        }

        let content = serde_json::to_string_pretty(&config_to_save)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config {}: {}", path.display(), e))?;

        log::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values and fix invalid ones
    pub fn validate(&mut self) -> Result<()> {
        let mut has_issues = false;

        if self.editor.tab_size == 0 || self.editor.tab_size > 16 {
            log::warn!("Invalid tab size: {}, using default", self.editor.tab_size);
            self.editor.tab_size = 4;
            has_issues = true;
        }

        if !(10..=1000).contains(&self.tick_rate_ms) {
            log::warn!("Invalid tick rate: {}ms, using default", self.tick_rate_ms);
            self.tick_rate_ms = 100;
            has_issues = true;
        }

        if self.theme.name.trim().is_empty() {
            log::warn!("Empty theme name, using default");
            self.theme.name = Theme::default().name;
            has_issues = true;
        }

        if self.theme.syntax_theme.trim().is_empty() {
            log::warn!("Empty syntax theme, using default");
            self.theme.syntax_theme = Theme::default().syntax_theme;
            has_issues = true;
        }

        if self.history_dir.as_os_str().is_empty() {
            log::warn!("Empty history directory, using default");
            self.history_dir = PathBuf::from(".rusty");
            has_issues = true;
        }

        if let Err(e) = self.assistant.validate() {
            log::warn!("{}, using default assistant settings", e);
            self.assistant = AssistantConfig::default();
            has_issues = true;
        }

        if has_issues {
            log::info!("Configuration validation completed with corrections");
        }

        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }

        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Some(PathBuf::from(dir).join("config.json"));
        }

        project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Directory for the log file.
    pub fn data_dir() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "rusty", "rusty")
}
