//! End-to-end pipeline behavior with a scripted model
//!
//! The model is a FIFO queue of canned responses, so each test scripts the
//! planner reply, the executor turns and the verifier reply in order.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;

use retail_assist_agent::Pipeline;
use retail_assist_config::AgentConfig;
use retail_assist_core::{
    Intent, LanguageModel, Message, ModelResponse, RecommendedAction, Result, ToolCallRequest,
    ToolDefinition,
};
use retail_assist_tools::{SqliteStore, DbSelectTool, Tool, ToolError, ToolRegistry};

struct ScriptedModel {
    responses: Mutex<VecDeque<ModelResponse>>,
}

impl ScriptedModel {
    fn new(responses: Vec<ModelResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
        })
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<ModelResponse> {
        Ok(self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| ModelResponse::Text(String::new())))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

fn text(s: &str) -> ModelResponse {
    ModelResponse::Text(s.to_string())
}

fn call(name: &str, arguments: Value) -> ModelResponse {
    ModelResponse::ToolCalls(vec![ToolCallRequest::new(name, arguments)])
}

fn plan_json() -> ModelResponse {
    text(
        r#"{"intent": "returns", "needs_retrieval": true, "needs_db": false,
            "needs_api": false, "needs_email": false, "sensitivity": "low", "sql_hint": null}"#,
    )
}

fn verdict_json(confidence: f64, action: &str) -> ModelResponse {
    text(&format!(
        r#"{{"grounded": true, "issues": [], "confidence": {}, "recommended_action": "{}"}}"#,
        confidence, action
    ))
}

/// Knowledge-base tool that replays canned citation batches
struct CannedKbTool {
    batches: Mutex<VecDeque<Value>>,
}

impl CannedKbTool {
    fn new(batches: Vec<Value>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
        }
    }
}

#[async_trait]
impl Tool for CannedKbTool {
    fn name(&self) -> &str {
        "retrieve_kb"
    }

    fn description(&self) -> &str {
        "Retrieve KB snippets with citations"
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {"query": {"type": "string"}}})
    }

    async fn execute(&self, _args: Value) -> std::result::Result<Value, ToolError> {
        let citations = self.batches.lock().pop_front().unwrap_or_else(|| json!([]));
        Ok(json!({ "citations": citations }))
    }
}

fn kb_registry(batches: Vec<Value>) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(CannedKbTool::new(batches));
    Arc::new(registry)
}

fn pipeline(model: Arc<ScriptedModel>, registry: Arc<ToolRegistry>) -> Pipeline {
    Pipeline::new(model, registry, AgentConfig::default())
}

#[tokio::test]
async fn test_end_to_end_cited_answer() {
    let model = ScriptedModel::new(vec![
        plan_json(),
        call("retrieve_kb", json!({"query": "return window"})),
        text("The return window is 14 days for in-store pickup orders."),
        verdict_json(0.9, "answer"),
    ]);
    let registry = kb_registry(vec![json!([
        {"id": 1, "source": "returns-policy.md", "excerpt": "Returns accepted within 14 days..."}
    ])]);

    let response = pipeline(model, registry)
        .run("  What is the return window?  ")
        .await
        .unwrap();

    assert_eq!(response.plan.intent, Intent::Returns);
    assert_eq!(response.citations.len(), 1);
    assert_eq!(response.citations[0].source, "returns-policy.md");
    assert_eq!(response.tool_outcomes.len(), 1);
    assert_eq!(response.tool_outcomes[0].tool, "retrieve_kb");
    assert_eq!(response.recommended_action, RecommendedAction::Answer);

    assert!(response
        .answer
        .starts_with("The return window is 14 days for in-store pickup orders."));
    assert!(response
        .answer
        .contains("Sources (sanitized):\n- [1] returns-policy.md"));
    assert!(response.answer.ends_with("Confidence: 0.90 | Next: answer"));
}

#[tokio::test]
async fn test_unparseable_plan_falls_back() {
    let model = ScriptedModel::new(vec![
        text("I think this is about returns."),
        text("Could you tell me more?"),
        verdict_json(0.6, "ask_clarify"),
    ]);

    let response = pipeline(model, kb_registry(vec![]))
        .run("hmm")
        .await
        .unwrap();

    assert_eq!(response.plan.intent, Intent::Other);
    assert!(response.plan.needs_retrieval);
}

#[tokio::test]
async fn test_tool_loop_stops_at_iteration_cap() {
    let mut script = vec![plan_json()];
    for _ in 0..6 {
        script.push(call("retrieve_kb", json!({"query": "again"})));
    }
    // Verifier still runs on the empty draft
    script.push(text("not json"));

    let model = ScriptedModel::new(script);
    let batches = (0..6).map(|_| json!([])).collect();

    let response = pipeline(model, kb_registry(batches))
        .run("loop forever")
        .await
        .unwrap();

    assert_eq!(response.tool_outcomes.len(), 6);
    assert_eq!(response.confidence, 0.3);
    assert_eq!(response.recommended_action, RecommendedAction::AskClarify);
    assert!(response
        .answer
        .ends_with("Confidence: 0.30 | Next: ask_clarify"));
}

#[tokio::test]
async fn test_unknown_tool_becomes_error_outcome() {
    let model = ScriptedModel::new(vec![
        plan_json(),
        call("track_shipment", json!({"order_id": "ORD-1001"})),
        text("I could not track that shipment."),
        verdict_json(0.7, "answer"),
    ]);

    let response = pipeline(model, kb_registry(vec![]))
        .run("Where is my order?")
        .await
        .unwrap();

    assert_eq!(response.tool_outcomes.len(), 1);
    assert_eq!(
        response.tool_outcomes[0].output["error"],
        "Unknown tool track_shipment"
    );
    assert_eq!(response.recommended_action, RecommendedAction::Answer);
}

#[tokio::test]
async fn test_guardrail_failure_is_recorded_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::new(dir.path().join("retail.db")));
    store
        .execute_script("CREATE TABLE orders (id TEXT); INSERT INTO orders VALUES ('ORD-1001');")
        .await
        .unwrap();

    let mut registry = ToolRegistry::new();
    registry.register(DbSelectTool::new(store));

    let model = ScriptedModel::new(vec![
        plan_json(),
        call("db_select", json!({"sql": "DROP TABLE orders"})),
        text("I can only read order data."),
        verdict_json(0.8, "answer"),
    ]);

    let response = pipeline(model, Arc::new(registry))
        .run("Delete my order history")
        .await
        .unwrap();

    let error = response.tool_outcomes[0].output["error"].as_str().unwrap();
    assert!(error.contains("Only SELECT queries are allowed"));
    assert!(response.answer.starts_with("I can only read order data."));
}

#[tokio::test]
async fn test_last_retrieval_wins() {
    let model = ScriptedModel::new(vec![
        plan_json(),
        call("retrieve_kb", json!({"query": "returns"})),
        call("retrieve_kb", json!({"query": "returns for electronics"})),
        text("Electronics can be returned within 30 days."),
        verdict_json(0.85, "answer"),
    ]);
    let registry = kb_registry(vec![
        json!([{"id": 1, "source": "returns-policy.md", "excerpt": "..."}]),
        json!([{"id": 1, "source": "electronics-returns.md", "excerpt": "..."}]),
    ]);

    let response = pipeline(model, registry).run("electronics returns").await.unwrap();

    assert_eq!(response.tool_outcomes.len(), 2);
    assert_eq!(response.citations.len(), 1);
    assert_eq!(response.citations[0].source, "electronics-returns.md");
}

#[tokio::test]
async fn test_low_confidence_answer_downgraded_to_clarify() {
    let model = ScriptedModel::new(vec![
        plan_json(),
        text("It might be 14 days."),
        verdict_json(0.5, "answer"),
    ]);

    let response = pipeline(model, kb_registry(vec![]))
        .run("return window?")
        .await
        .unwrap();

    assert_eq!(response.confidence, 0.5);
    assert_eq!(response.recommended_action, RecommendedAction::AskClarify);
    assert!(response.answer.ends_with("Next: ask_clarify"));
}

#[tokio::test]
async fn test_partial_verdict_json_uses_field_defaults() {
    let model = ScriptedModel::new(vec![plan_json(), text("Sure."), text("{}")]);

    let response = pipeline(model, kb_registry(vec![]))
        .run("hi")
        .await
        .unwrap();

    // An empty object parses with per-field defaults, then the threshold
    // policy downgrades the default answer action
    assert_eq!(response.confidence, 0.4);
    assert_eq!(response.recommended_action, RecommendedAction::AskClarify);
}

#[tokio::test]
async fn test_unparseable_verdict_falls_back() {
    let model = ScriptedModel::new(vec![
        plan_json(),
        text("Here you go."),
        text("looks fine to me"),
    ]);

    let response = pipeline(model, kb_registry(vec![]))
        .run("hi")
        .await
        .unwrap();

    assert_eq!(response.confidence, 0.3);
    assert_eq!(response.recommended_action, RecommendedAction::AskClarify);
}
