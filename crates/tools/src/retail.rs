//! The six retail tools
//!
//! Thin adapters from JSON tool arguments onto the retrieval stack, the
//! demo store, the store API and the mail transport. Output shapes are
//! part of the contract; the executor and eval metrics key on them.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use retail_assist_rag::{format_citations, CrossEncoderReranker, HybridRetriever};

use crate::db::SqliteStore;
use crate::mail::MailTransport;
use crate::store_api::StoreApi;
use crate::{require_str, Tool, ToolError};

fn string_param(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

/// Retrieve knowledge-base snippets with citations
pub struct RetrieveKbTool {
    retriever: Arc<HybridRetriever>,
    reranker: Arc<CrossEncoderReranker>,
}

impl RetrieveKbTool {
    pub fn new(retriever: Arc<HybridRetriever>, reranker: Arc<CrossEncoderReranker>) -> Self {
        Self {
            retriever,
            reranker,
        }
    }
}

#[async_trait]
impl Tool for RetrieveKbTool {
    fn name(&self) -> &str {
        "retrieve_kb"
    }

    fn description(&self) -> &str {
        "Retrieve KB snippets with citations"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": string_param("Search query for the knowledge base")
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let query = require_str(&args, "query")?;

        let docs = self
            .retriever
            .search(&query)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        // Cross-encoder scoring is CPU-bound when the model is loaded
        let reranker = Arc::clone(&self.reranker);
        let rerank_query = query.clone();
        let ranked = tokio::task::spawn_blocking(move || reranker.rerank(&rerank_query, docs))
            .await
            .map_err(|e| ToolError::Execution(format!("Rerank task failed: {}", e)))?;

        let citations = format_citations(&ranked);

        Ok(json!({ "citations": citations }))
    }
}

/// Read-only SQL over the demo store
pub struct DbSelectTool {
    store: Arc<SqliteStore>,
}

impl DbSelectTool {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DbSelectTool {
    fn name(&self) -> &str {
        "db_select"
    }

    fn description(&self) -> &str {
        "Run SELECT query against DB (guardrail: SELECT only)"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sql": string_param("SELECT statement to run")
            },
            "required": ["sql"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let sql = require_str(&args, "sql")?;
        let rows = self.store.run_select(&sql).await?;
        Ok(json!({ "rows": rows }))
    }
}

/// Store hours lookup
pub struct StoreHoursTool {
    api: Arc<dyn StoreApi>,
}

impl StoreHoursTool {
    pub fn new(api: Arc<dyn StoreApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for StoreHoursTool {
    fn name(&self) -> &str {
        "store_hours"
    }

    fn description(&self) -> &str {
        "Get store hours from the store API"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "store_id": string_param("Store identifier, e.g. ST-CHI-01")
            },
            "required": ["store_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let store_id = require_str(&args, "store_id")?;
        self.api.store_hours(&store_id).await
    }
}

/// Inventory lookup
pub struct InventoryLookupTool {
    api: Arc<dyn StoreApi>,
}

impl InventoryLookupTool {
    pub fn new(api: Arc<dyn StoreApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for InventoryLookupTool {
    fn name(&self) -> &str {
        "inventory_lookup"
    }

    fn description(&self) -> &str {
        "Get inventory from the store API"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "store_id": string_param("Store identifier"),
                "sku": string_param("Product SKU")
            },
            "required": ["store_id", "sku"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let store_id = require_str(&args, "store_id")?;
        let sku = require_str(&args, "sku")?;
        self.api.inventory(&store_id, &sku).await
    }
}

/// Appointment slot lookup
pub struct AppointmentSlotsTool {
    api: Arc<dyn StoreApi>,
}

impl AppointmentSlotsTool {
    pub fn new(api: Arc<dyn StoreApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for AppointmentSlotsTool {
    fn name(&self) -> &str {
        "appointment_slots"
    }

    fn description(&self) -> &str {
        "Get appointment slots from the store API"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "store_id": string_param("Store identifier"),
                "service": string_param("Service to book, e.g. tech-support")
            },
            "required": ["store_id", "service"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let store_id = require_str(&args, "store_id")?;
        let service = require_str(&args, "service")?;
        self.api.appointment_slots(&store_id, &service).await
    }
}

/// Outbound email
pub struct SendEmailTool {
    mailer: Arc<dyn MailTransport>,
}

impl SendEmailTool {
    pub fn new(mailer: Arc<dyn MailTransport>) -> Self {
        Self { mailer }
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Send email via the mail relay"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "to_email": string_param("Recipient address"),
                "subject": string_param("Subject line"),
                "body": string_param("Message body")
            },
            "required": ["to_email", "subject", "body"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let to_email = require_str(&args, "to_email")?;
        let subject = require_str(&args, "subject")?;
        let body = require_str(&args, "body")?;

        let status = self.mailer.send(&to_email, &subject, &body).await?;
        Ok(json!({ "status": status }))
    }
}
