//! Language-model capability seam
//!
//! The pipeline treats the model as an opaque capability: given a transcript
//! and the available tool schemas, it produces either free text or a list of
//! named tool-call requests. Backends live in the `llm` crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::message::Message;

/// Tool schema advertised to the model (JSON Schema parameters)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema object describing the arguments
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// One tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned call id, echoed back with the tool result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Must match a registered tool name
    pub name: String,
    /// Named arguments
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments,
        }
    }
}

/// Model output: free text or tool-call requests
#[derive(Debug, Clone)]
pub enum ModelResponse {
    Text(String),
    ToolCalls(Vec<ToolCallRequest>),
}

impl ModelResponse {
    pub fn is_text(&self) -> bool {
        matches!(self, ModelResponse::Text(_))
    }
}

/// Opaque language-model capability
///
/// Implementations must support deterministic (temperature-zero) completion
/// and the free-text-or-tool-calls protocol above.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete the transcript; an empty `tools` slice disables tool calling
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelResponse>;

    /// Model name for logging
    fn model_name(&self) -> &str;
}
