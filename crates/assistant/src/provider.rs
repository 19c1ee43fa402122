use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

use crate::context::QUESTION_PREFIX;
use crate::model::Model;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: Model,
    pub system_prompt: String,
    pub prompt: String,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// Provider that pipes the prompt through an external program, for example
/// `ollama run llama3.2` or `llm -m gpt-4o-mini`.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    name: String,
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandProvider {
    pub fn new(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl ChatProvider for CommandProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        log::info!(
            "Sending {} byte prompt to {} via '{}'",
            request.prompt.len(),
            request.model,
            self.command_line()
        );

        let mut child = TokioCommand::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => anyhow!("Command '{}' not found", self.command),
                _ => anyhow!("Failed to start '{}': {}", self.command, e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let mut input = String::new();
            if !request.system_prompt.trim().is_empty() {
                input.push_str(request.system_prompt.trim());
                input.push_str("\n\n");
            }
            input.push_str(&request.prompt);

            // Fed while the output is read, inside the timeout below
            let command = self.command.clone();
            tokio::spawn(async move {
                // The program may exit without reading its input
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    log::warn!("Failed to write prompt to '{}': {}", command, e);
                }
            });
        }

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                anyhow!(
                    "'{}' timed out after {}s",
                    self.command,
                    self.timeout.as_secs_f32()
                )
            })?
            .with_context(|| format!("Failed to wait for '{}'", self.command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(anyhow!(
                "'{}' failed ({}): {}",
                self.command,
                code,
                stderr.trim()
            ));
        }

        let answer = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if answer.is_empty() {
            return Err(anyhow!("'{}' returned an empty response", self.command));
        }

        log::debug!("Received {} byte response from {}", answer.len(), self.name);
        Ok(answer)
    }
}

/// Offline provider that answers with the question it was asked.
#[derive(Debug, Clone, Default)]
pub struct EchoProvider;

#[async_trait]
impl ChatProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let question = request
            .prompt
            .rsplit_once(QUESTION_PREFIX)
            .map(|(_, question)| question)
            .unwrap_or(&request.prompt)
            .trim();

        if question.is_empty() {
            return Err(anyhow!("Nothing to echo"));
        }
        Ok(question.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> ChatRequest {
        ChatRequest {
            model: Model::Echo,
            system_prompt: String::new(),
            prompt: prompt.to_string(),
        }
    }

    fn sh(script: &str) -> CommandProvider {
        CommandProvider::new("test", "sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_echo_returns_current_question() {
        let prompt = "User: a\nAssistant: b\n\nCurrent question: what now?";
        let answer = EchoProvider.complete(&request(prompt)).await.unwrap();
        assert_eq!(answer, "what now?");
    }

    #[tokio::test]
    async fn test_echo_rejects_blank_prompt() {
        assert!(EchoProvider.complete(&request("   ")).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_receives_system_prompt_and_prompt() {
        let provider = CommandProvider::new("cat", "cat", Vec::new());
        let mut req = request("Current question: hi");
        req.system_prompt = "Be brief.".to_string();

        let answer = provider.complete(&req).await.unwrap();
        assert_eq!(answer, "Be brief.\n\nCurrent question: hi");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_large_prompt_does_not_block() {
        let provider = CommandProvider::new("cat", "cat", Vec::new())
            .with_timeout(Duration::from_secs(5));
        let prompt = "x".repeat(4 * 1024 * 1024);

        let answer = timeout(Duration::from_secs(10), provider.complete(&request(&prompt)))
            .await
            .expect("request must finish within the provider timeout")
            .unwrap();
        assert_eq!(answer.len(), prompt.len());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_covers_unread_input() {
        let provider = sh("sleep 5").with_timeout(Duration::from_millis(200));
        let prompt = "x".repeat(4 * 1024 * 1024);

        let result = timeout(Duration::from_secs(3), provider.complete(&request(&prompt)))
            .await
            .expect("timeout must include writing the prompt");
        assert!(result.unwrap_err().to_string().contains("timed out"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_failure_reports_stderr() {
        let provider = sh("echo boom >&2; exit 3");
        let err = provider.complete(&request("q")).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("boom"));
        assert!(message.contains('3'));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_empty_output_is_error() {
        let provider = sh("cat > /dev/null");
        let err = provider.complete(&request("q")).await.unwrap_err();
        assert!(err.to_string().contains("empty response"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_timeout() {
        let provider = sh("sleep 5").with_timeout(Duration::from_millis(100));
        let err = provider.complete(&request("q")).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_missing_command() {
        let provider = CommandProvider::new("none", "rusty-no-such-command-1b2c", Vec::new());
        let err = provider.complete(&request("q")).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_command_line() {
        let provider = CommandProvider::new("ollama", "ollama", vec!["run".into(), "llama3.2".into()]);
        assert_eq!(provider.command_line(), "ollama run llama3.2");
        assert_eq!(provider.name(), "ollama");
    }
}
