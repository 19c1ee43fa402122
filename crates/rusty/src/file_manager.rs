use anyhow::{anyhow, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::editor::Editor;

const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024;
const LARGE_CONTENT_THRESHOLD: usize = 50 * 1024 * 1024;
const MAX_SAVE_ATTEMPTS: u32 = 3;

/// Tracks the file behind the buffer and the directory used to resolve
/// relative paths.
pub struct FileManager {
    pub current_path: Option<PathBuf>,
    pub is_readonly: bool,
    working_dir: PathBuf,
}

impl FileManager {
    pub fn new() -> Self {
        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_working_dir(working_dir)
    }

    pub fn with_working_dir(working_dir: PathBuf) -> Self {
        Self {
            current_path: None,
            is_readonly: false,
            working_dir,
        }
    }

    pub fn get_current_path(&self) -> Option<&PathBuf> {
        self.current_path.as_ref()
    }

    pub fn has_file(&self) -> bool {
        self.current_path.is_some()
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// File name shown in the status line.
    pub fn display_name(&self) -> String {
        self.current_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "[No Name]".to_string())
    }

    /// Resolves `path` against the working directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    pub async fn open_file(&mut self, path: PathBuf) -> Result<String> {
        if !path.exists() {
            return Err(anyhow!("File not found: {}", path.display()));
        }

        if !path.is_file() {
            return Err(anyhow!("Not a file: {}", path.display()));
        }

        match fs::metadata(&path).await {
            Ok(metadata) => {
                self.is_readonly = metadata.permissions().readonly();
                if metadata.len() > LARGE_FILE_THRESHOLD {
                    log::warn!(
                        "Large file detected ({} bytes): {}",
                        metadata.len(),
                        path.display()
                    );
                }
            }
            Err(e) => {
                log::warn!("Failed to get file metadata: {}", e);
                self.is_readonly = false;
            }
        }

        let content = fs::read_to_string(&path).await.map_err(|e| {
            let message = match e.kind() {
                ErrorKind::PermissionDenied => format!("Permission denied: {}", path.display()),
                ErrorKind::InvalidData => format!("File is not valid UTF-8: {}", path.display()),
                _ => format!("Failed to read {}: {}", path.display(), e),
            };
            anyhow!(message)
        })?;

        if content.contains('\0') {
            return Err(anyhow!("File looks binary: {}", path.display()));
        }

        log::info!("Opened file: {}", path.display());
        self.current_path = Some(path);
        Ok(content)
    }

    pub async fn save_file(&self, editor: &mut Editor) -> Result<String> {
        let path = self
            .current_path
            .as_ref()
            .ok_or_else(|| anyhow!("E32: No file name"))?;

        if self.is_readonly {
            return Err(anyhow!("File is read-only: {}", path.display()));
        }

        let content = editor.get_content();
        check_content_size(&content)?;

        if let Ok(metadata) = fs::metadata(path).await {
            if metadata.is_file() && metadata.len() > 0 {
                let backup_path = path.with_extension("bak");
                match fs::copy(path, &backup_path).await {
                    Ok(_) => log::info!("Created backup: {}", backup_path.display()),
                    Err(e) => log::warn!("Failed to create backup: {}", e),
                }
            }
        }

        let mut attempts = 0;
        loop {
            match fs::write(path, content.as_bytes()).await {
                Ok(_) => {
                    editor.mark_saved();
                    log::info!("Saved file: {}", path.display());
                    return Ok(format!(
                        "\"{}\" {}L written",
                        path.display(),
                        editor.line_count()
                    ));
                }
                Err(e) => {
                    attempts += 1;
                    if attempts >= MAX_SAVE_ATTEMPTS {
                        return Err(write_error(path, e));
                    }
                    log::warn!(
                        "Save attempt {} failed for {}, retrying...",
                        attempts,
                        path.display()
                    );
                    tokio::time::sleep(tokio::time::Duration::from_millis(100 * attempts as u64))
                        .await;
                }
            }
        }
    }

    pub async fn save_file_as(&mut self, path: PathBuf, editor: &mut Editor) -> Result<String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow!("Failed to create directory {}: {}", parent.display(), e)
                })?;
                log::info!("Created directory: {}", parent.display());
            }
        }

        if path.is_dir() {
            return Err(anyhow!("Is a directory: {}", path.display()));
        }

        if let Ok(metadata) = fs::metadata(&path).await {
            if metadata.permissions().readonly() {
                return Err(anyhow!("Target file is read-only: {}", path.display()));
            }
        }

        let content = editor.get_content();
        check_content_size(&content)?;

        fs::write(&path, content.as_bytes())
            .await
            .map_err(|e| write_error(&path, e))?;

        editor.mark_saved();
        self.is_readonly = false;
        log::info!("Saved file as: {}", path.display());
        let message = format!("\"{}\" {}L written", path.display(), editor.line_count());
        self.current_path = Some(path);
        Ok(message)
    }

    /// Sorted directory and file names inside `path`.
    pub async fn list_dir(path: &Path) -> Result<(Vec<String>, Vec<String>)> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();

        let mut entries = fs::read_dir(path)
            .await
            .map_err(|e| anyhow!("Cannot read directory {}: {}", path.display(), e))?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            match entry.file_type().await {
                Ok(file_type) if file_type.is_dir() => dirs.push(name),
                Ok(_) => files.push(name),
                Err(e) => log::debug!("Skipping {}: {}", name, e),
            }
        }

        dirs.sort();
        files.sort();
        Ok((dirs, files))
    }

    /// Directory reached from `current` by `target`; `..` is the parent.
    pub fn change_dir(current: &Path, target: &str) -> Result<PathBuf> {
        let target = target.trim().trim_end_matches('/');
        let next = match target {
            "" | "." => current.to_path_buf(),
            ".." => current
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| current.to_path_buf()),
            other => {
                let candidate = current.join(other);
                if !candidate.is_dir() {
                    return Err(anyhow!("Not a directory: {}", candidate.display()));
                }
                candidate
            }
        };
        Ok(next)
    }

    pub fn set_working_dir(&mut self, target: &str) -> Result<&Path> {
        self.working_dir = Self::change_dir(&self.working_dir, target)?;
        log::debug!("Working directory: {}", self.working_dir.display());
        Ok(&self.working_dir)
    }
}

impl Default for FileManager {
    fn default() -> Self {
        Self::new()
    }
}

fn check_content_size(content: &str) -> Result<()> {
    if content.len() > LARGE_CONTENT_THRESHOLD {
        return Err(anyhow!(
            "Content too large to save ({} bytes)",
            content.len()
        ));
    }
    Ok(())
}

fn write_error(path: &Path, e: std::io::Error) -> anyhow::Error {
    match e.kind() {
        ErrorKind::PermissionDenied => anyhow!("Permission denied: {}", path.display()),
        ErrorKind::WriteZero => anyhow!("Disk may be full: {}", path.display()),
        _ => anyhow!("Failed to write {}: {}", path.display(), e),
    }
}
