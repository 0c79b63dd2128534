//! Language-model backends
//!
//! Implements the `core::LanguageModel` seam over two providers:
//! - OpenAI-compatible chat completions with native tool calling
//! - Ollama, with a text-marker tool-call protocol for models without
//!   native tool support
//!
//! All backends run at temperature 0 so planner and verifier JSON stays
//! parseable run to run.

pub mod factory;
pub mod ollama;
pub mod openai;

pub use factory::build_backend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

use std::time::Duration;
use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<LlmError> for retail_assist_core::Error {
    fn from(err: LlmError) -> Self {
        retail_assist_core::Error::Llm(err.to_string())
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Request(err.to_string())
    }
}

/// Backend configuration shared by both providers
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// API endpoint
    pub endpoint: String,
    /// API key (hosted backends)
    pub api_key: Option<String>,
    /// Sampling temperature; 0.0 keeps structured outputs deterministic
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            endpoint: retail_assist_config::constants::endpoints::OPENAI_DEFAULT.to_string(),
            api_key: None,
            temperature: 0.0,
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&retail_assist_config::LlmSettings> for LlmConfig {
    fn from(settings: &retail_assist_config::LlmSettings) -> Self {
        Self {
            model: settings.model.clone(),
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            temperature: 0.0,
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}
