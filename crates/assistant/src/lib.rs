use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub mod context;
pub mod model;
pub mod provider;

pub use context::ChatContext;
pub use model::Model;
pub use provider::{ChatProvider, ChatRequest, CommandProvider, EchoProvider};

/// External program used to answer questions for one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ProviderConfig {
    fn new(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub default_model: Model,
    pub system_prompt: String,
    pub timeout_secs: u64,
    pub providers: BTreeMap<Model, ProviderConfig>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(Model::Ollama, ProviderConfig::new("ollama", &["run", "llama3.2"]));
        providers.insert(Model::OpenAi, ProviderConfig::new("llm", &["-m", "gpt-4o-mini"]));
        providers.insert(
            Model::Anthropic,
            ProviderConfig::new("llm", &["-m", "claude-3.5-sonnet"]),
        );

        Self {
            default_model: Model::Ollama,
            system_prompt: "Questions related to Rust language".to_string(),
            timeout_secs: 120,
            providers,
        }
    }
}

impl AssistantConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 || self.timeout_secs > 3600 {
            return Err(anyhow!(
                "Assistant timeout must be between 1 and 3600 seconds"
            ));
        }
        for (model, provider) in &self.providers {
            if provider.command.trim().is_empty() {
                return Err(anyhow!("Empty command configured for {}", model));
            }
        }
        Ok(())
    }
}

/// Routes questions to the provider configured for each model.
#[derive(Debug, Clone)]
pub struct Assistant {
    config: AssistantConfig,
}

impl Assistant {
    pub fn new(config: AssistantConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn default_model(&self) -> Model {
        self.config.default_model
    }

    pub fn set_default_model(&mut self, model: Model) {
        self.config.default_model = model;
    }

    pub fn provider(&self, model: Model) -> Result<Box<dyn ChatProvider>> {
        if model == Model::Echo {
            return Ok(Box::new(EchoProvider));
        }

        let provider = self
            .config
            .providers
            .get(&model)
            .ok_or_else(|| anyhow!("No provider configured for {}", model))?;

        Ok(Box::new(
            CommandProvider::new(model.name(), &provider.command, provider.args.clone())
                .with_timeout(Duration::from_secs(self.config.timeout_secs)),
        ))
    }

    /// Answer the question pending at the end of `buffer_text`.
    pub async fn ask(&self, model: Model, context: &ChatContext, buffer_text: &str) -> Result<String> {
        let prompt = context.build_prompt(buffer_text)?;
        let provider = self.provider(model)?;
        let request = ChatRequest {
            model,
            system_prompt: context.system_prompt.clone(),
            prompt,
        };

        provider.complete(&request).await
    }
}
