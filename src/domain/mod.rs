//! # Domain Layer
//!
//! Core definitions, types, and traits that define the business domain of the service.
//! Independent of transport and process plumbing, serving as the contract for other layers.

pub mod config;
pub mod errors;
pub mod schema;
pub mod traits;
pub mod types;
