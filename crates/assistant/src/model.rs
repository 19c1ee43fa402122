use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Model backends a question can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Ollama,
    OpenAi,
    Anthropic,
    Echo,
}

impl Model {
    pub const ALL: [Model; 4] = [Model::Ollama, Model::OpenAi, Model::Anthropic, Model::Echo];

    pub fn name(&self) -> &'static str {
        match self {
            Model::Ollama => "ollama",
            Model::OpenAi => "openai",
            Model::Anthropic => "anthropic",
            Model::Echo => "echo",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Model {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" | "llama" => Ok(Model::Ollama),
            "openai" | "gpt" => Ok(Model::OpenAi),
            "anthropic" | "claude" => Ok(Model::Anthropic),
            "echo" => Ok(Model::Echo),
            other => Err(anyhow!(
                "Unknown model '{}'. Available: ollama, openai, anthropic, echo",
                other
            )),
        }
    }
}
