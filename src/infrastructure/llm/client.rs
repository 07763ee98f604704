//! # LLM Client
//!
//! Provides the `Client` struct, the `LlmProvider` used by the service. It merges the
//! configured endpoint settings with per-request overrides and returns the completion text.

use async_trait::async_trait;

use super::Context;
use super::openai::{self, ProviderConfig};
use crate::domain::config::LlmConfig;
use crate::domain::errors::LlmError;
use crate::domain::traits::{CompletionRequest, LlmProvider};

/// Simple LLM client
#[derive(Debug, Clone)]
pub struct Client {
    config: LlmConfig,
    api_key: Option<String>,
}

impl Client {
    /// Create a new client from the `llm` configuration section
    pub fn new(config: LlmConfig) -> Self {
        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            tracing::warn!("No LLM API key configured; requests are sent without authorization");
        }
        Self { config, api_key }
    }

    fn provider_config(&self, request: &CompletionRequest) -> ProviderConfig {
        ProviderConfig {
            api_key: self.api_key.clone(),
            url: request
                .endpoint
                .clone()
                .unwrap_or_else(|| self.config.api_url.clone()),
            default_model: self.config.model.clone(),
            timeout: Some(self.config.timeout_secs),
        }
    }

    fn context(&self, request: CompletionRequest) -> Context {
        let mut context = Context::prompt(request.prompt)
            .with_temperature(self.config.temperature)
            .with_max_tokens(request.max_tokens.or(self.config.max_tokens));
        if let Some(model) = request.model {
            context = context.with_model(model);
        }
        if let Some(system) = &self.config.system_prompt {
            context = context.with_system(system.clone());
        }
        context
    }
}

#[async_trait]
impl LlmProvider for Client {
    async fn completion(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let provider_config = self.provider_config(&request);
        let context = self.context(request);
        tracing::debug!(
            "Completion request to {} ({} prompt bytes)",
            provider_config.url,
            context.messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        let response = openai::chat(&provider_config, context).await?;
        tracing::debug!(
            "Completion from model '{}': {} tokens ({} prompt, {} completion)",
            response.model,
            response.usage.total_tokens,
            response.usage.prompt_tokens,
            response.usage.completion_tokens
        );
        Ok(response.content)
    }
}
