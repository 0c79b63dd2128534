//! Agent pipeline state types
//!
//! `AgentState` threads through the three stages. Each stage writes only its
//! own fields: the planner sets `plan` and seeds the transcript, the executor
//! sets `draft_answer`, `citations` and `tool_outcomes`, the verifier sets
//! `confidence`, `recommended_action` and the final `answer`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Citation;
use crate::message::Message;

/// Classified user intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    StoreHours,
    Inventory,
    OrderStatus,
    Returns,
    Appointment,
    ProductAdvice,
    PolicyQuestion,
    Other,
}

/// Request sensitivity assessed by the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    Medium,
    High,
}

/// Planner output; read-only after the planner stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub intent: Intent,
    pub needs_retrieval: bool,
    #[serde(default)]
    pub needs_db: bool,
    #[serde(default)]
    pub needs_api: bool,
    #[serde(default)]
    pub needs_email: bool,
    pub sensitivity: Sensitivity,
    /// SELECT statement the planner would run, if any
    #[serde(default)]
    pub sql_hint: Option<String>,
}

impl Plan {
    /// Safe default substituted when planner output fails to parse
    pub fn fallback() -> Self {
        Self {
            intent: Intent::Other,
            needs_retrieval: true,
            needs_db: false,
            needs_api: false,
            needs_email: false,
            sensitivity: Sensitivity::Medium,
            sql_hint: None,
        }
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Action the verifier recommends for the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Answer,
    AskClarify,
    Escalate,
}

impl std::fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendedAction::Answer => write!(f, "answer"),
            RecommendedAction::AskClarify => write!(f, "ask_clarify"),
            RecommendedAction::Escalate => write!(f, "escalate"),
        }
    }
}

/// Verifier output
///
/// Fields default individually so any valid JSON object parses; only
/// non-JSON output falls back to [`Verdict::fallback`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(default)]
    pub grounded: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_action")]
    pub recommended_action: RecommendedAction,
}

fn default_confidence() -> f64 {
    0.4
}

fn default_action() -> RecommendedAction {
    RecommendedAction::Answer
}

impl Verdict {
    /// Conservative default substituted when verifier output fails to parse
    pub fn fallback() -> Self {
        Self {
            grounded: false,
            issues: vec!["verifier_parse_error".to_string()],
            confidence: 0.3,
            recommended_action: RecommendedAction::AskClarify,
        }
    }
}

/// Recorded result of one tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub tool: String,
    pub args: Value,
    pub output: Value,
}

/// Mutable record threading through the three pipeline stages
///
/// Owned exclusively by one pipeline invocation; discarded after the
/// response is returned.
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub user_input: String,
    pub messages: Vec<Message>,
    pub plan: Plan,
    pub citations: Vec<Citation>,
    pub tool_outcomes: Vec<ToolOutcome>,
    pub draft_answer: String,
    pub confidence: f64,
    pub recommended_action: Option<RecommendedAction>,
}

impl AgentState {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            ..Default::default()
        }
    }
}

/// Public pipeline output contract consumed by evaluators and UIs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub answer: String,
    pub plan: Plan,
    pub citations: Vec<Citation>,
    pub tool_outcomes: Vec<ToolOutcome>,
    pub confidence: f64,
    pub recommended_action: RecommendedAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_fallback() {
        let plan = Plan::fallback();
        assert_eq!(plan.intent, Intent::Other);
        assert!(plan.needs_retrieval);
        assert!(!plan.needs_db);
        assert!(!plan.needs_api);
        assert!(!plan.needs_email);
        assert_eq!(plan.sensitivity, Sensitivity::Medium);
        assert!(plan.sql_hint.is_none());
    }

    #[test]
    fn test_verdict_fallback() {
        let verdict = Verdict::fallback();
        assert!(!verdict.grounded);
        assert_eq!(verdict.issues, vec!["verifier_parse_error".to_string()]);
        assert_eq!(verdict.confidence, 0.3);
        assert_eq!(verdict.recommended_action, RecommendedAction::AskClarify);
    }

    #[test]
    fn test_plan_parses_planner_json() {
        let raw = r#"{
            "intent": "policy_question",
            "needs_retrieval": true,
            "needs_db": false,
            "needs_api": false,
            "needs_email": false,
            "sensitivity": "low",
            "sql_hint": null
        }"#;
        let plan: Plan = serde_json::from_str(raw).unwrap();
        assert_eq!(plan.intent, Intent::PolicyQuestion);
        assert_eq!(plan.sensitivity, Sensitivity::Low);
    }

    #[test]
    fn test_verdict_parses_verifier_json() {
        let raw = r#"{
            "grounded": true,
            "issues": [],
            "confidence": 0.87,
            "recommended_action": "answer"
        }"#;
        let verdict: Verdict = serde_json::from_str(raw).unwrap();
        assert!(verdict.grounded);
        assert_eq!(verdict.recommended_action, RecommendedAction::Answer);
    }

    #[test]
    fn test_recommended_action_display() {
        assert_eq!(RecommendedAction::AskClarify.to_string(), "ask_clarify");
    }
}
