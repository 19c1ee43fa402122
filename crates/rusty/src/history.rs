use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};

/// Directory of chat transcripts, one Markdown file per day by default.
#[derive(Debug, Clone)]
pub struct History {
    root: PathBuf,
}

impl History {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_name_for(date: NaiveDate) -> String {
        format!("rusty_{}.md", date.format("%d.%m.%Y"))
    }

    /// Path of `name` inside the history directory; `.md` is appended when
    /// the name has no extension.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("Empty history file name"));
        }
        if name.contains('/') || name.contains('\\') || name == ".." {
            return Err(anyhow!("History file name must not contain a path: {}", name));
        }

        let path = self.root.join(name);
        Ok(if path.extension().is_none() {
            path.with_extension("md")
        } else {
            path
        })
    }

    /// Today's transcript, created if missing.
    pub async fn open_today(&self) -> Result<PathBuf> {
        let name = Self::file_name_for(Local::now().date_naive());
        self.touch(self.root.join(name)).await
    }

    /// Creates a new transcript file. Without a name a timestamped one is used.
    pub async fn new_file(&self, name: Option<&str>) -> Result<PathBuf> {
        let path = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => self.path_for(name)?,
            None => {
                let stamp = Local::now().format("%d.%m.%Y_%H-%M-%S");
                self.root.join(format!("rusty_{}.md", stamp))
            }
        };
        self.touch(path).await
    }

    /// Transcript file names, sorted.
    pub async fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn touch(&self, path: PathBuf) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create {}", self.root.display()))?;

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;

        log::debug!("History file ready: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_for_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(History::file_name_for(date), "rusty_07.03.2024.md");
    }

    #[test]
    fn test_path_for() {
        let history = History::new("/tmp/h");
        assert_eq!(history.path_for("ideas").unwrap(), PathBuf::from("/tmp/h/ideas.md"));
        assert_eq!(history.path_for("log.txt").unwrap(), PathBuf::from("/tmp/h/log.txt"));
        assert!(history.path_for("  ").is_err());
        assert!(history.path_for("../escape").is_err());
    }

    #[tokio::test]
    async fn test_open_today_creates_dir_and_keeps_content() {
        let dir = TempDir::new().unwrap();
        let history = History::new(dir.path().join(".rusty"));

        let path = history.open_today().await.unwrap();
        assert!(path.exists());
        let expected = History::file_name_for(Local::now().date_naive());
        assert_eq!(path.file_name().unwrap().to_string_lossy(), expected);

        std::fs::write(&path, "kept").unwrap();
        let again = history.open_today().await.unwrap();
        assert_eq!(std::fs::read_to_string(again).unwrap(), "kept");
    }

    #[tokio::test]
    async fn test_new_file_and_list() {
        let dir = TempDir::new().unwrap();
        let history = History::new(dir.path());
        assert!(history.list().await.unwrap().is_empty());

        history.new_file(Some("zeta")).await.unwrap();
        history.new_file(Some("alpha.md")).await.unwrap();
        let stamped = history.new_file(None).await.unwrap();
        std::fs::write(dir.path().join("skip.txt"), "").unwrap();

        let names = history.list().await.unwrap();
        assert_eq!(names.len(), 3);
        assert_eq!(names[0], "alpha.md");
        assert!(names.contains(&stamped.file_name().unwrap().to_string_lossy().to_string()));
    }
}
