use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

use mdcore::transcript;

pub const QUESTION_PREFIX: &str = "Current question: ";
pub const EMPTY_BUFFER_ERROR: &str = "Cannot send empty buffer. Please write the question";

/// Files attached to the conversation plus the system prompt sent with
/// every request.
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    files: BTreeMap<String, String>,
    pub system_prompt: String,
}

impl ChatContext {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            files: BTreeMap::new(),
            system_prompt: system_prompt.into(),
        }
    }

    /// Read `name` relative to `base` and attach it under `name`.
    pub async fn load_file(&mut self, base: &Path, name: &str) -> Result<usize> {
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("No file name given"));
        }

        let path = base.join(name);
        if !path.is_file() {
            return Err(anyhow!("Not a file: {}", path.display()));
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let size = content.len();

        log::info!("Loaded context file {} ({} bytes)", path.display(), size);
        self.files.insert(name.to_string(), content);
        Ok(size)
    }

    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.files.insert(name.into(), content.into());
    }

    pub fn unload(&mut self, name: &str) -> bool {
        self.files.remove(name.trim()).is_some()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn loaded_files(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Build the prompt for the question pending at the end of `buffer_text`.
    pub fn build_prompt(&self, buffer_text: &str) -> Result<String> {
        if buffer_text.trim().is_empty() {
            return Err(anyhow!(EMPTY_BUFFER_ERROR));
        }

        let turns = transcript::parse(buffer_text);
        let (history, question) = transcript::split_question(&turns)
            .ok_or_else(|| anyhow!("No question found after the last answer"))?;

        let mut prompt = String::new();
        for (name, content) in &self.files {
            prompt.push_str(&format!("Path '{}'\nContent: {}\n\n", name, content));
        }
        for exchange in &history {
            prompt.push_str(&format!(
                "User: {}\nAssistant: {}\n\n",
                exchange.question, exchange.answer
            ));
        }
        prompt.push_str(QUESTION_PREFIX);
        prompt.push_str(&question);

        Ok(prompt)
    }
}
