//! # Configuration
//!
//! Manages the loading and parsing of the service configuration file (`data/config.yaml`).
//! Defines the structs for the server, workspace, LLM endpoint, execution policy and logging.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding `workspace.working_dir`.
pub const WORKING_DIR_ENV: &str = "PROJECT_HELPER_WORKING_DIR";

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Reads and parses the YAML file, then applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(WORKING_DIR_ENV)
            && !dir.trim().is_empty()
        {
            self.workspace.working_dir = Some(dir);
        }
    }
}

/// gRPC server settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Upper bound on simultaneously running streaming calls.
    #[serde(default = "default_max_concurrent_calls")]
    pub max_concurrent_calls: usize,
    /// Capacity of the per-call feedback channel.
    #[serde(default = "default_feedback_buffer")]
    pub feedback_buffer: usize,
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    #[serde(default = "default_keepalive_timeout_secs")]
    pub keepalive_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_concurrent_calls: default_max_concurrent_calls(),
            feedback_buffer: default_feedback_buffer(),
            keepalive_secs: default_keepalive_secs(),
            keepalive_timeout_secs: default_keepalive_timeout_secs(),
        }
    }
}

fn default_listen_addr() -> String {
    "[::]:50051".to_string()
}
fn default_max_concurrent_calls() -> usize {
    10
}
fn default_feedback_buffer() -> usize {
    64
}
fn default_keepalive_secs() -> u64 {
    30
}
fn default_keepalive_timeout_secs() -> u64 {
    120
}

/// Where project directories live.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct WorkspaceConfig {
    /// Base directory; every project gets `{working_dir}/{project_id}`.
    #[serde(default)]
    pub working_dir: Option<String>,
}

impl WorkspaceConfig {
    /// Configured base directory, or `$HOME/ai_project_helper_workspaces`.
    pub fn base_dir(&self) -> PathBuf {
        match &self.working_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ai_project_helper_workspaces"),
        }
    }
}

/// Completion endpoint used for plan fetching, step translation and script generation.
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Full URL of an OpenAI-compatible chat completions endpoint.
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>, // e.g. "LLM_API_KEY"
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f32>,
    #[serde(default = "default_script_max_tokens")]
    pub script_max_tokens: u32,
    /// Optional system message sent ahead of every prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            model: String::new(),
            api_key: None,
            api_key_env: None,
            timeout_secs: default_llm_timeout(),
            max_tokens: None,
            temperature: default_temperature(),
            script_max_tokens: default_script_max_tokens(),
            system_prompt: None,
        }
    }
}

impl LlmConfig {
    /// Resolves the API key from `api_key` or the environment variable named by `api_key_env`.
    /// A missing key is not an error: local endpoints often run without one.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            return Some(key.clone());
        }
        self.api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

fn default_llm_timeout() -> u64 {
    600
}
fn default_temperature() -> Option<f32> {
    Some(0.0)
}
fn default_script_max_tokens() -> u32 {
    2048
}

/// What a `Failed` action stops.
#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the current step and every step after it.
    #[default]
    AbortPlan,
    /// Stop the current step only; later steps still run.
    AbortStep,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub on_failure: FailurePolicy,
    /// Send natural-language steps (no function blocks) through the LLM parser prompt.
    #[serde(default = "default_true")]
    pub translate_steps: bool,
    /// Capacity of the channel between child-process pipe readers and the agent.
    #[serde(default = "default_output_buffer")]
    pub output_buffer: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            on_failure: FailurePolicy::default(),
            translate_steps: true,
            output_buffer: default_output_buffer(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_output_buffer() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Hard cap on the `[k/n]` total announced by the first part.
    #[serde(default = "default_max_parts")]
    pub max_parts: usize,
    /// Directory for the request/response audit trail. `None` disables it.
    #[serde(default = "default_archive_dir")]
    pub archive_dir: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_parts: default_max_parts(),
            archive_dir: default_archive_dir(),
        }
    }
}

fn default_max_parts() -> usize {
    20
}
fn default_archive_dir() -> Option<String> {
    Some("llm_coding_plans".to_string())
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_log_prefix")]
    pub file_prefix: String,
    /// Used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            file_prefix: default_log_prefix(),
            filter: default_log_filter(),
        }
    }
}

fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_log_prefix() -> String {
    "project-helper.log".to_string()
}
fn default_log_filter() -> String {
    "info,h2=warn,hyper=warn,tower=warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config.server.listen_addr, "[::]:50051");
        assert_eq!(config.server.max_concurrent_calls, 10);
        assert_eq!(config.execution.on_failure, FailurePolicy::AbortPlan);
        assert!(config.execution.translate_steps);
        assert_eq!(config.fetch.max_parts, 20);
        assert_eq!(config.fetch.archive_dir.as_deref(), Some("llm_coding_plans"));
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
server:
  listen_addr: "127.0.0.1:6000"
  max_concurrent_calls: 2
workspace:
  working_dir: /tmp/ws
llm:
  api_url: http://localhost:8000/v1/chat/completions
  model: qwen
  api_key: secret
execution:
  on_failure: abort_step
  translate_steps: false
fetch:
  max_parts: 5
  archive_dir: null
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:6000");
        assert_eq!(config.server.max_concurrent_calls, 2);
        assert_eq!(config.workspace.base_dir(), PathBuf::from("/tmp/ws"));
        assert_eq!(config.llm.model, "qwen");
        assert_eq!(config.llm.resolve_api_key().as_deref(), Some("secret"));
        assert_eq!(config.execution.on_failure, FailurePolicy::AbortStep);
        assert!(!config.execution.translate_steps);
        assert_eq!(config.fetch.max_parts, 5);
        assert!(config.fetch.archive_dir.is_none());
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let yaml = "execution:\n  on_failure: keep_going\n";
        assert!(AppConfig::from_yaml(yaml).is_err());
    }
}
