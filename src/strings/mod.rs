//! # Strings Module
//!
//! Centralizes feedback text, log templates and LLM prompts.
//! Keeps wording consistent between the executors, the agent and the service.

pub mod logs;
pub mod messages;
pub mod prompts;
