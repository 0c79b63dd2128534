//! Tools for the retail assistant
//!
//! A closed set of named capabilities the executor can dispatch into:
//! knowledge-base retrieval, a read-only SQL window over the demo store,
//! three store-API lookups and outbound email. Tools take JSON arguments
//! and return JSON outcomes.

pub mod db;
pub mod mail;
pub mod registry;
pub mod retail;
pub mod store_api;

pub use db::SqliteStore;
pub use mail::{HttpMailer, MailConfig, MailTransport, RecordingMailer};
pub use registry::{build_registry, RegistryDeps, ToolRegistry};
pub use retail::{
    AppointmentSlotsTool, DbSelectTool, InventoryLookupTool, RetrieveKbTool, SendEmailTool,
    StoreHoursTool,
};
pub use store_api::{HttpStoreApi, StoreApi, StubStoreApi};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use retail_assist_core::ToolDefinition;

/// Tool errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool {0}")]
    Unknown(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Guardrail violation: {0}")]
    Guardrail(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Tool {tool} timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },
}

impl From<ToolError> for retail_assist_core::Error {
    fn from(err: ToolError) -> Self {
        retail_assist_core::Error::Tool(err.to_string())
    }
}

/// A named capability with a JSON-arguments interface
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry name, also what the model calls
    fn name(&self) -> &str;

    /// One-line description shown to the model
    fn description(&self) -> &str;

    /// JSON Schema for the arguments object
    fn parameters(&self) -> Value;

    /// Per-tool execution timeout
    fn timeout_secs(&self) -> u64 {
        30
    }

    /// Run the tool
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;

    /// Schema advertised to the model
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }
}

/// Pull a required string argument out of a JSON object
pub(crate) fn require_str(args: &Value, key: &str) -> Result<String, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing string argument '{}'", key)))
}
