//! OpenAI-compatible backend
//!
//! Chat completions with native tool calling. Works against api.openai.com
//! or any server exposing the same surface.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use retail_assist_core::{
    LanguageModel, Message, ModelResponse, Result, ToolCallRequest, ToolDefinition,
};

use crate::{LlmConfig, LlmError};

/// OpenAI chat completions backend
pub struct OpenAiBackend {
    client: Client,
    config: LlmConfig,
}

impl OpenAiBackend {
    pub fn new(config: LlmConfig) -> std::result::Result<Self, LlmError> {
        if config.api_key.is_none() {
            return Err(LlmError::Configuration(
                "OpenAI backend requires an API key".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        )
    }

    fn wire_messages(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.to_string(),
                content: if m.content.is_empty() && m.tool_calls.is_some() {
                    None
                } else {
                    Some(m.content.clone())
                },
                tool_calls: m.tool_calls.as_ref().map(|calls| {
                    calls
                        .iter()
                        .map(|c| WireToolCall {
                            id: c.id.clone().unwrap_or_default(),
                            r#type: "function".to_string(),
                            function: WireFunction {
                                name: c.name.clone(),
                                arguments: c.arguments.to_string(),
                            },
                        })
                        .collect()
                }),
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    fn wire_tools(tools: &[ToolDefinition]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect()
    }
}

#[async_trait]
impl LanguageModel for OpenAiBackend {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelResponse> {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": Self::wire_messages(messages),
            "temperature": self.config.temperature,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(Self::wire_tools(tools));
        }

        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            tools = tools.len(),
            "chat completion request"
        );

        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::Configuration("Missing API key".to_string()))?;

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "chat completion request failed");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let completion: ChatCompletion = response.json().await.map_err(LlmError::from)?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Parse("Empty choices in completion".to_string()))?;

        if let Some(calls) = choice.message.tool_calls {
            let requests = calls
                .into_iter()
                .map(|c| {
                    let arguments: Value = serde_json::from_str(&c.function.arguments)
                        .unwrap_or(Value::Object(Default::default()));
                    ToolCallRequest {
                        id: Some(c.id),
                        name: c.function.name,
                        arguments,
                    }
                })
                .collect();
            return Ok(ModelResponse::ToolCalls(requests));
        }

        Ok(ModelResponse::Text(
            choice.message.content.unwrap_or_default(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    r#type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use retail_assist_core::Role;

    #[test]
    fn test_requires_api_key() {
        let config = LlmConfig::default();
        assert!(OpenAiBackend::new(config).is_err());
    }

    #[test]
    fn test_wire_messages_carry_tool_plumbing() {
        let calls = vec![ToolCallRequest {
            id: Some("call_1".to_string()),
            name: "retrieve_kb".to_string(),
            arguments: serde_json::json!({"query": "returns"}),
        }];
        let messages = vec![
            Message::user("what is the return window"),
            Message::assistant_tool_calls(calls),
            Message::tool(r#"{"citations":[]}"#, "call_1"),
        ];

        let wire = OpenAiBackend::wire_messages(&messages);
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[1].role, "assistant");
        assert!(wire[1].content.is_none());
        assert_eq!(wire[1].tool_calls.as_ref().unwrap()[0].id, "call_1");
        assert_eq!(wire[2].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_completion_parses_tool_calls() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_7",
                        "type": "function",
                        "function": {"name": "db_select", "arguments": "{\"sql\": \"select 1\"}"}
                    }]
                }
            }]
        }"#;
        let completion: ChatCompletion = serde_json::from_str(raw).unwrap();
        let calls = completion.choices[0].message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "db_select");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
