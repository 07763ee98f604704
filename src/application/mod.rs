//! # Application Layer
//!
//! Contains the core logic of the service: plan parsing and step splitting, the sandbox,
//! the agent that executes plans, the multi-part plan fetcher and the project workspaces.

pub mod agent;
pub mod archive;
pub mod fetcher;
pub mod logging;
pub mod parsing;
pub mod project;
pub mod sandbox;
pub mod steps;
pub mod workspace;
