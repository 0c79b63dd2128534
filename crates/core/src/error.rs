//! Workspace-level error type
//!
//! Crate-specific errors (`RagError`, `LlmError`, `ToolError`, `AgentError`)
//! convert into this type at crate boundaries.

use thiserror::Error;

/// Top-level error for the retail assistant
#[derive(Error, Debug)]
pub enum Error {
    #[error("Retrieval error: {0}")]
    Rag(String),

    #[error("Model error: {0}")]
    Llm(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the workspace
pub type Result<T> = std::result::Result<T, Error>;
