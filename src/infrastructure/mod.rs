//! # Infrastructure Layer
//!
//! Handles interactions with the operating system and external services.
//! Implements the traits defined in the Domain layer (e.g., LlmProvider).

pub mod llm;
pub mod tools;
