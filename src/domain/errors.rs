//! # Domain Errors
//!
//! Typed failures raised by the sandbox, the action parser, the plan fetcher, the
//! completion client and the project workspace registry. Application code wraps them in `anyhow` where
//! only a message is needed; the agent and the gRPC layer match on them.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SandboxError {
    #[error("path '{requested}' escapes the working directory {}", working_dir.display())]
    PathEscape {
        requested: String,
        working_dir: PathBuf,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown action '{name}' (canonical: {canonical})")]
    UnknownAction { name: String, canonical: String },

    #[error("missing required parameters for {action}: {}", missing.join(", "))]
    MissingParameters { action: String, missing: Vec<String> },

    #[error("invalid value '{value}' for {action}.{parameter}, expected one of: {}", allowed.join(", "))]
    InvalidValue {
        action: String,
        parameter: String,
        value: String,
        allowed: Vec<String>,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport or HTTP failure while talking to the completion endpoint.
    #[error("completion request for part {part} failed: {message}")]
    Upstream { part: usize, message: String },

    #[error("completion endpoint returned an empty response for part {part}")]
    EmptyResponse { part: usize },
}

/// Failure reported by a completion provider.
#[derive(Debug, Error, Clone)]
#[error("[{provider}] {message}")]
pub struct LlmError {
    pub provider: String,
    pub message: String,
}

impl LlmError {
    pub fn new(provider: &str, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("invalid project id '{0}'")]
    InvalidProjectId(String),

    #[error("failed to create project directory {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
