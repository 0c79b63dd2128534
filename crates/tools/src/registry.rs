//! Tool registry
//!
//! Name-to-handler dispatch with per-tool timeouts.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use retail_assist_core::ToolDefinition;

use crate::db::SqliteStore;
use crate::mail::MailTransport;
use crate::retail::{
    AppointmentSlotsTool, DbSelectTool, InventoryLookupTool, RetrieveKbTool, SendEmailTool,
    StoreHoursTool,
};
use crate::store_api::StoreApi;
use crate::{Tool, ToolError};

/// Tool registry
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Schemas advertised to the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool by name with timeout protection
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::Unknown(name.to_string()))?;

        let seconds = tool.timeout_secs();

        tracing::debug!(tool = name, timeout_secs = seconds, "executing tool");

        match tokio::time::timeout(Duration::from_secs(seconds), tool.execute(arguments)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ToolError::Timeout {
                tool: name.to_string(),
                seconds,
            }),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Collaborators the standard registry wires into tools
pub struct RegistryDeps {
    pub retriever: Arc<retail_assist_rag::HybridRetriever>,
    pub reranker: Arc<retail_assist_rag::CrossEncoderReranker>,
    pub store: Arc<SqliteStore>,
    pub store_api: Arc<dyn StoreApi>,
    pub mailer: Arc<dyn MailTransport>,
}

/// Build the standard six-tool registry
pub fn build_registry(deps: RegistryDeps) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(RetrieveKbTool::new(deps.retriever, deps.reranker));
    registry.register(DbSelectTool::new(deps.store));
    registry.register(StoreHoursTool::new(Arc::clone(&deps.store_api)));
    registry.register(InventoryLookupTool::new(Arc::clone(&deps.store_api)));
    registry.register(AppointmentSlotsTool::new(deps.store_api));
    registry.register(SendEmailTool::new(deps.mailer));

    tracing::info!(tools = registry.len(), "tool registry created");

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the arguments back"
        }

        fn parameters(&self) -> Value {
            serde_json::json!({"type": "object"})
        }

        async fn execute(&self, args: Value) -> Result<Value, ToolError> {
            Ok(args)
        }
    }

    struct StallTool;

    #[async_trait]
    impl Tool for StallTool {
        fn name(&self) -> &str {
            "stall"
        }

        fn description(&self) -> &str {
            "Never finishes"
        }

        fn parameters(&self) -> Value {
            serde_json::json!({"type": "object"})
        }

        fn timeout_secs(&self) -> u64 {
            1
        }

        async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn test_execute_dispatches_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let out = registry
            .execute("echo", serde_json::json!({"k": "v"}))
            .await
            .unwrap();
        assert_eq!(out["k"], "v");
    }

    #[tokio::test]
    async fn test_unknown_tool_errors() {
        let registry = ToolRegistry::new();
        let err = registry.execute("nope", Value::Null).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool nope");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_enforced() {
        let mut registry = ToolRegistry::new();
        registry.register(StallTool);

        let err = registry.execute("stall", Value::Null).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }

    #[test]
    fn test_definitions_are_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(StallTool);
        registry.register(EchoTool);

        let defs = registry.definitions();
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[1].name, "stall");
    }
}
