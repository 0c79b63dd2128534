//! Configuration for the retail assistant
//!
//! Layers defaults, an optional TOML file and `RETAIL_ASSIST_`-prefixed
//! environment variables into a single validated [`Settings`] value.

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, AgentConfig, DatabaseConfig, LlmSettings, MailConfig, RagConfig, Settings,
    StoreApiConfig,
};

use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("config error: {0}")]
    Source(#[from] config::ConfigError),
}

impl From<ConfigError> for retail_assist_core::Error {
    fn from(err: ConfigError) -> Self {
        retail_assist_core::Error::Config(err.to_string())
    }
}
