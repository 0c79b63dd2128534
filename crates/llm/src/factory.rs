//! Backend factory

use std::sync::Arc;

use retail_assist_config::LlmSettings;
use retail_assist_core::LanguageModel;

use crate::{LlmConfig, LlmError, OllamaBackend, OpenAiBackend};

/// Build the configured backend
pub fn build_backend(settings: &LlmSettings) -> Result<Arc<dyn LanguageModel>, LlmError> {
    let config = LlmConfig::from(settings);

    match settings.backend.as_str() {
        "openai" => Ok(Arc::new(OpenAiBackend::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaBackend::new(config)?)),
        other => Err(LlmError::Configuration(format!(
            "Unknown LLM backend: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_backend_is_rejected() {
        let settings = LlmSettings {
            backend: "bedrock".to_string(),
            ..Default::default()
        };
        assert!(build_backend(&settings).is_err());
    }

    #[test]
    fn test_ollama_backend_builds_without_key() {
        let settings = LlmSettings {
            backend: "ollama".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            ..Default::default()
        };
        let backend = build_backend(&settings).unwrap();
        assert_eq!(backend.model_name(), settings.model);
    }
}
