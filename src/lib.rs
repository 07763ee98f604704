//! # Project Helper
//!
//! A gRPC service that turns LLM-authored plans into sandboxed shell, file and directory
//! actions inside per-project working directories, streaming feedback as they run.
//!
//! Layers:
//! - `domain`: configuration, errors, action schemas, core records, traits
//! - `application`: parser, step splitter, sandbox, agent, plan fetcher, workspaces
//! - `infrastructure`: executors and the completion client
//! - `interface`: the gRPC service
//! - `strings`: prompt templates and feedback/log text

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interface;
pub mod strings;
