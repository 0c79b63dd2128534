//! Main settings module
//!
//! Settings load from an optional TOML file layered with environment
//! variables using the `RETAIL_ASSIST_` prefix, e.g.
//! `RETAIL_ASSIST_AGENT__CONFIDENCE_THRESHOLD=0.6`.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{agent, endpoints, ingest, retrieval};
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Retrieval and ranking configuration
    #[serde(default)]
    pub rag: RagConfig,

    /// Agent pipeline configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Language-model backend configuration
    #[serde(default)]
    pub llm: LlmSettings,

    /// Demo store API configuration
    #[serde(default)]
    pub store_api: StoreApiConfig,

    /// Relational demo store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Mail transport configuration
    #[serde(default)]
    pub mail: MailConfig,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Qdrant endpoint
    #[serde(default = "default_qdrant_endpoint")]
    pub qdrant_endpoint: String,

    /// Qdrant collection holding the knowledge base
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Documents returned by the hybrid retriever
    #[serde(default = "default_top_k_retrieve")]
    pub top_k_retrieve: usize,

    /// Documents kept after re-ranking
    #[serde(default = "default_top_k_rerank")]
    pub top_k_rerank: usize,

    /// RRF weight for the lexical source
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f64,

    /// RRF weight for the vector source
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f64,

    /// RRF smoothing constant
    #[serde(default = "default_rrf_k0")]
    pub rrf_k0: usize,

    /// Cross-encoder model path (ONNX); fallback pass-through when unset
    /// or the model fails to load
    #[serde(default)]
    pub reranker_model_path: Option<String>,

    /// Tokenizer path for the cross-encoder
    #[serde(default)]
    pub reranker_tokenizer_path: Option<String>,

    /// Ingestion chunk size (characters)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Ingestion chunk overlap (characters)
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            qdrant_endpoint: default_qdrant_endpoint(),
            collection: default_collection(),
            embedding_dim: default_embedding_dim(),
            top_k_retrieve: default_top_k_retrieve(),
            top_k_rerank: default_top_k_rerank(),
            lexical_weight: default_lexical_weight(),
            vector_weight: default_vector_weight(),
            rrf_k0: default_rrf_k0(),
            reranker_model_path: None,
            reranker_tokenizer_path: None,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Agent pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard cap on executor tool-loop iterations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Confidence threshold for the verifier policy override
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

/// Language-model backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Backend kind: "openai" or "ollama"
    #[serde(default = "default_llm_backend")]
    pub backend: String,

    /// Model name/ID
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API endpoint
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// API key (optional; required for hosted backends)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout (seconds)
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            backend: default_llm_backend(),
            model: default_llm_model(),
            endpoint: default_llm_endpoint(),
            api_key: None,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Demo store API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreApiConfig {
    #[serde(default = "default_store_api_base_url")]
    pub base_url: String,

    /// Request timeout (seconds)
    #[serde(default = "default_store_api_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_store_api_base_url(),
            timeout_secs: default_store_api_timeout_secs(),
        }
    }
}

/// Relational demo store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Mail transport configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MailConfig {
    /// HTTP mail relay endpoint
    #[serde(default)]
    pub relay_url: Option<String>,

    /// Relay API token; sending fails while this is unset
    #[serde(default)]
    pub api_token: Option<String>,

    /// From address
    #[serde(default)]
    pub from_address: Option<String>,
}

fn default_qdrant_endpoint() -> String {
    endpoints::QDRANT_DEFAULT.to_string()
}

fn default_collection() -> String {
    "retail_kb".to_string()
}

fn default_embedding_dim() -> usize {
    384
}

fn default_top_k_retrieve() -> usize {
    retrieval::TOP_K_RETRIEVE
}

fn default_top_k_rerank() -> usize {
    retrieval::TOP_K_RERANK
}

fn default_lexical_weight() -> f64 {
    retrieval::LEXICAL_WEIGHT
}

fn default_vector_weight() -> f64 {
    retrieval::VECTOR_WEIGHT
}

fn default_rrf_k0() -> usize {
    retrieval::RRF_K0
}

fn default_chunk_size() -> usize {
    ingest::CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    ingest::CHUNK_OVERLAP
}

fn default_max_iterations() -> usize {
    agent::MAX_ITERATIONS
}

fn default_confidence_threshold() -> f64 {
    agent::CONFIDENCE_THRESHOLD
}

fn default_llm_backend() -> String {
    "openai".to_string()
}

fn default_llm_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_llm_endpoint() -> String {
    endpoints::OPENAI_DEFAULT.to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_store_api_base_url() -> String {
    endpoints::STORE_API_DEFAULT.to_string()
}

fn default_store_api_timeout_secs() -> u64 {
    10
}

fn default_db_path() -> String {
    "./data/retail.db".to_string()
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rag.top_k_retrieve == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rag.top_k_retrieve".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.rag.lexical_weight < 0.0 || self.rag.vector_weight < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "rag.lexical_weight/vector_weight".to_string(),
                message: "RRF weights must be non-negative".to_string(),
            });
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "agent.max_iterations".to_string(),
                message: "executor loop needs at least one iteration".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.agent.confidence_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "agent.confidence_threshold".to_string(),
                message: "must be within [0, 1]".to_string(),
            });
        }

        Ok(())
    }
}

/// Load settings from an optional TOML file plus environment overrides
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        builder = builder.add_source(File::from(path));
    }

    let config = builder
        .add_source(Environment::with_prefix("RETAIL_ASSIST").separator("__"))
        .build()?;

    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;

    tracing::debug!(
        top_k = settings.rag.top_k_retrieve,
        max_iterations = settings.agent.max_iterations,
        "settings loaded"
    );

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.rag.top_k_retrieve, 10);
        assert_eq!(settings.rag.rrf_k0, 60);
        assert!((settings.rag.lexical_weight - 0.4).abs() < f64::EPSILON);
        assert!((settings.rag.vector_weight - 0.6).abs() < f64::EPSILON);
        assert_eq!(settings.agent.max_iterations, 6);
        assert!((settings.agent.confidence_threshold - 0.55).abs() < f64::EPSILON);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut settings = Settings::default();
        settings.rag.top_k_retrieve = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut settings = Settings::default();
        settings.agent.confidence_threshold = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[agent]\nmax_iterations = 4\nconfidence_threshold = 0.6\n"
        )
        .unwrap();

        let settings = load_settings(Some(file.path())).unwrap();
        assert_eq!(settings.agent.max_iterations, 4);
        assert!((settings.agent.confidence_threshold - 0.6).abs() < f64::EPSILON);
        // Untouched sections keep their defaults
        assert_eq!(settings.rag.top_k_retrieve, 10);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_settings(Some(Path::new("/nonexistent/retail.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
