//! OpenAI-compatible chat completions API
//!
//! Works with OpenAI and the many self-hosted servers that mimic its wire format.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Context, Response, TokenUsage};
use crate::domain::errors::LlmError;

const PROVIDER: &str = "openai";
const COMPLETIONS_PATH: &str = "/chat/completions";

/// HTTP client reused across requests
fn http_client() -> Result<&'static Client, LlmError> {
    use std::sync::OnceLock;
    static CLIENT: OnceLock<Client> = OnceLock::new();
    if let Some(client) = CLIENT.get() {
        return Ok(client);
    }
    let client = Client::builder()
        .build()
        .map_err(|e| LlmError::new(PROVIDER, format!("Failed to create HTTP client: {}", e)))?;
    Ok(CLIENT.get_or_init(|| client))
}

/// Endpoint settings for one call.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    /// Either the full chat completions URL or an API base such as `https://host/v1`.
    pub url: String,
    pub default_model: String,
    pub timeout: Option<u64>,
}

/// OpenAI API request format
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

/// OpenAI API response format
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    model: String,
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

/// Accepts a full completions URL or an API base and returns the completions URL.
pub fn completions_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.ends_with(COMPLETIONS_PATH) {
        url.to_string()
    } else {
        format!("{}{}", url, COMPLETIONS_PATH)
    }
}

fn build_request(config: &ProviderConfig, context: Context) -> OpenAIRequest {
    let model = context
        .model
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| config.default_model.clone());
    OpenAIRequest {
        model,
        messages: context
            .messages
            .into_iter()
            .map(|msg| OpenAIMessage {
                role: msg.role.as_str().to_string(),
                content: msg.content,
            })
            .collect(),
        temperature: context.temperature,
        max_tokens: context.max_tokens,
    }
}

fn parse_response(body: &str) -> Result<Response, LlmError> {
    let openai_response: OpenAIResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::new(PROVIDER, format!("Failed to parse response: {}", e)))?;

    let Some(choice) = openai_response.choices.into_iter().next() else {
        return Err(LlmError::new(PROVIDER, "No choices in response"));
    };
    let usage = openai_response
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(Response {
        content: choice.message.content.unwrap_or_default(),
        model: openai_response.model,
        usage,
    })
}

/// Extracts the provider's error message from a failed response body.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body))
}

/// Execute a chat request using OpenAI-compatible API
pub async fn chat(config: &ProviderConfig, context: Context) -> Result<Response, LlmError> {
    if config.url.trim().is_empty() {
        return Err(LlmError::new(PROVIDER, "No completion endpoint configured"));
    }
    let url = completions_url(&config.url);
    let request = build_request(config, context);

    let mut request_builder = http_client()?
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&request);

    if let Some(key) = &config.api_key {
        request_builder = request_builder.bearer_auth(key);
    }
    if let Some(timeout_secs) = config.timeout {
        request_builder = request_builder.timeout(std::time::Duration::from_secs(timeout_secs));
    }

    let response = request_builder
        .send()
        .await
        .map_err(|e| LlmError::new(PROVIDER, format!("HTTP request to {} failed: {}", url, e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| LlmError::new(PROVIDER, format!("Failed to read response body: {}", e)))?;

    if !status.is_success() {
        return Err(LlmError::new(PROVIDER, error_message(status, &body)));
    }

    parse_response(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProviderConfig {
        ProviderConfig {
            api_key: None,
            url: "http://localhost:8000/v1".into(),
            default_model: "qwen".into(),
            timeout: None,
        }
    }

    #[test]
    fn test_completions_url() {
        assert_eq!(
            completions_url("http://h/v1/chat/completions"),
            "http://h/v1/chat/completions"
        );
        assert_eq!(completions_url("http://h/v1/"), "http://h/v1/chat/completions");
    }

    #[test]
    fn test_request_uses_default_model_and_skips_unset_fields() {
        let request = build_request(&config(), Context::prompt("hi").with_model(""));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "qwen");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert!(json.get("max_tokens").is_none());

        let request = build_request(
            &config(),
            Context::prompt("hi")
                .with_model("big")
                .with_temperature(Some(0.0))
                .with_system("be terse"),
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "big");
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{"id":"x","model":"qwen","choices":[{"index":0,"message":{"role":"assistant","content":"[1/2]\nfoo"},"finish_reason":"length"}],"usage":{"prompt_tokens":3,"completion_tokens":4,"total_tokens":7}}"#;
        let response = parse_response(body).unwrap();
        assert_eq!(response.content, "[1/2]\nfoo");
        assert_eq!(response.usage.total_tokens, 7);

        let bare = r#"{"choices":[{"message":{"content":"ok"}}]}"#;
        assert_eq!(parse_response(bare).unwrap().content, "ok");
        assert!(parse_response(r#"{"choices":[]}"#).is_err());
    }

    #[test]
    fn test_error_message() {
        let status = reqwest::StatusCode::UNAUTHORIZED;
        assert_eq!(
            error_message(status, r#"{"error":{"message":"bad key"}}"#),
            "bad key"
        );
        assert_eq!(error_message(status, r#"{"error":"nope"}"#), "nope");
        assert!(error_message(status, "<html>").contains("401"));
    }
}
