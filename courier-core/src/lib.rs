// courier-core/src/lib.rs

//! Core library for Courier: a local-LLM assistant for Outlook mail and
//! Planner tasks.

pub mod assistant;
pub mod auth;
pub mod completion;
pub mod config;
pub mod directive;
pub mod errors;
pub mod graph;
pub mod prompt;
pub mod tools;

pub mod models {
    pub mod chat;
    pub mod graph;
    pub mod tools;
}

#[cfg(test)]
mod assistant_tests;

pub use assistant::Assistant;
pub use auth::{ClientCredentialProvider, TokenSource};
pub use completion::{CompletionService, OllamaClient};
pub use config::{CourierConfig, Credentials};
pub use errors::{AuthError, CompletionError, ConfigError, GraphError, ToolError};
pub use graph::{GraphClient, Productivity};
pub use models::chat::{ChatMessage, Role};
