//! # Domain Traits
//!
//! Abstract interfaces for the pluggable collaborators of the agent.
//! Allows the completion endpoint to be swapped for a scripted fake in tests.

use async_trait::async_trait;

use crate::domain::errors::LlmError;

/// A single-prompt completion request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Overrides the provider's configured model.
    pub model: Option<String>,
    /// Overrides the provider's configured endpoint URL.
    pub endpoint: Option<String>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Applies a model override; empty strings keep the configured model.
    pub fn with_model(mut self, model: &str) -> Self {
        if !model.trim().is_empty() {
            self.model = Some(model.trim().to_string());
        }
        self
    }

    /// Applies an endpoint override; empty strings keep the configured endpoint.
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        if !endpoint.trim().is_empty() {
            self.endpoint = Some(endpoint.trim().to_string());
        }
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }
}

/// Abstract interface for an LLM Provider
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion
    async fn completion(&self, request: CompletionRequest) -> Result<String, LlmError>;
}
