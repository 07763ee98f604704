//! # LLM Client
//!
//! OpenAI-compatible chat completion client behind the `LlmProvider` seam.
//! Used for multi-part plan fetching, step translation and project script generation.

mod client;
pub mod openai;
mod types;

pub use client::Client;
pub use types::{Context, Message, MessageRole, Response, TokenUsage};
