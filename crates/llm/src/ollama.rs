//! Ollama backend
//!
//! Local models behind the Ollama chat API. Most local models lack native
//! tool calling, so tool use rides on a text marker: the model is told to
//! emit `[TOOL_CALL: {"name": ..., "arguments": {...}}]` and the marker is
//! parsed back out of the completion.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use retail_assist_core::{
    LanguageModel, Message, ModelResponse, Result, Role, ToolCallRequest, ToolDefinition,
};

use crate::{LlmConfig, LlmError};

const TOOL_CALL_MARKER: &str = "[TOOL_CALL:";

/// Ollama chat backend
pub struct OllamaBackend {
    client: Client,
    config: LlmConfig,
}

impl OllamaBackend {
    pub fn new(config: LlmConfig) -> std::result::Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn api_url(&self) -> String {
        format!("{}/api/chat", self.config.endpoint.trim_end_matches('/'))
    }

    /// System message teaching the marker protocol for the given tools
    fn tool_instructions(tools: &[ToolDefinition]) -> String {
        let mut out = String::from(
            "You can call tools. To call one, reply with exactly one line of the form\n\
             [TOOL_CALL: {\"name\": \"<tool>\", \"arguments\": {...}}]\n\
             and nothing else. Available tools:\n",
        );
        for tool in tools {
            out.push_str(&format!(
                "- {}: {} (arguments schema: {})\n",
                tool.name, tool.description, tool.parameters
            ));
        }
        out.push_str("When you have enough information, answer in plain text instead.");
        out
    }

    fn wire_messages(messages: &[Message], tools: &[ToolDefinition]) -> Vec<WireMessage> {
        let mut wire = Vec::with_capacity(messages.len() + 1);

        if !tools.is_empty() {
            wire.push(WireMessage {
                role: "system".to_string(),
                content: Self::tool_instructions(tools),
            });
        }

        for m in messages {
            let content = match (&m.role, &m.tool_calls) {
                // Replay an assistant tool-call turn as its marker line
                (Role::Assistant, Some(calls)) if !calls.is_empty() => {
                    let call = &calls[0];
                    format!(
                        "{} {}]",
                        TOOL_CALL_MARKER,
                        serde_json::json!({"name": call.name, "arguments": call.arguments})
                    )
                }
                _ => m.content.clone(),
            };
            wire.push(WireMessage {
                role: m.role.to_string(),
                content,
            });
        }

        wire
    }
}

/// Extract a tool call from a completion containing the marker
///
/// Returns `None` when the marker is absent or its JSON does not parse;
/// the completion is then treated as plain text.
pub(crate) fn parse_tool_call(content: &str) -> Option<ToolCallRequest> {
    let start = content.find(TOOL_CALL_MARKER)?;
    let rest = &content[start + TOOL_CALL_MARKER.len()..];

    // Balanced-brace scan; the JSON may contain nested objects
    let open = rest.find('{')?;
    let mut depth = 0usize;
    let mut end = None;
    for (i, c) in rest[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(open + i + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    let raw = &rest[open..end?];
    let parsed: Value = serde_json::from_str(raw).ok()?;
    let name = parsed.get("name")?.as_str()?.to_string();
    let arguments = parsed
        .get("arguments")
        .cloned()
        .unwrap_or(Value::Object(Default::default()));

    Some(ToolCallRequest {
        id: None,
        name,
        arguments,
    })
}

#[async_trait]
impl LanguageModel for OllamaBackend {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelResponse> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": Self::wire_messages(messages, tools),
            "stream": false,
            "options": { "temperature": self.config.temperature },
        });

        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            tools = tools.len(),
            "chat request"
        );

        let response = self
            .client
            .post(self.api_url())
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "chat request failed");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let completion: ChatResponse = response.json().await.map_err(LlmError::from)?;
        let content = completion.message.content;

        if !tools.is_empty() {
            if let Some(call) = parse_tool_call(&content) {
                return Ok(ModelResponse::ToolCalls(vec![call]));
            }
        }

        Ok(ModelResponse::Text(content))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool_call() {
        let content =
            r#"[TOOL_CALL: {"name": "store_hours", "arguments": {"store_id": "ST-CHI-01"}}]"#;
        let call = parse_tool_call(content).unwrap();
        assert_eq!(call.name, "store_hours");
        assert_eq!(call.arguments["store_id"], "ST-CHI-01");
    }

    #[test]
    fn test_parse_tool_call_with_surrounding_text() {
        let content = "Sure, let me check.\n[TOOL_CALL: {\"name\": \"retrieve_kb\", \"arguments\": {\"query\": \"return policy\"}}]\n";
        let call = parse_tool_call(content).unwrap();
        assert_eq!(call.name, "retrieve_kb");
    }

    #[test]
    fn test_parse_nested_arguments() {
        let content = r#"[TOOL_CALL: {"name": "db_select", "arguments": {"sql": "select 1", "opts": {"limit": 5}}}]"#;
        let call = parse_tool_call(content).unwrap();
        assert_eq!(call.arguments["opts"]["limit"], 5);
    }

    #[test]
    fn test_plain_text_is_not_a_tool_call() {
        assert!(parse_tool_call("The return window is 14 days.").is_none());
    }

    #[test]
    fn test_malformed_marker_is_plain_text() {
        assert!(parse_tool_call("[TOOL_CALL: {\"name\": ]").is_none());
    }

    #[test]
    fn test_tool_instructions_list_tools() {
        let tools = vec![ToolDefinition::new(
            "store_hours",
            "Get store hours",
            serde_json::json!({"type": "object"}),
        )];
        let text = OllamaBackend::tool_instructions(&tools);
        assert!(text.contains("store_hours"));
        assert!(text.contains("[TOOL_CALL:"));
    }
}
