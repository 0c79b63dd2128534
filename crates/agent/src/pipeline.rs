//! Planner -> Executor -> Verifier pipeline
//!
//! Each stage writes its own slice of `AgentState`. Stage-local model
//! failures degrade: a planner reply that is not valid JSON becomes
//! `Plan::fallback()`, a verifier reply that is not valid JSON becomes
//! `Verdict::fallback()`, and tool failures are recorded as structured
//! `{"error": ...}` outcomes while the loop continues. Only model transport
//! errors propagate to the caller.

use serde_json::json;
use std::sync::Arc;

use retail_assist_config::AgentConfig;
use retail_assist_core::{
    AgentResponse, AgentState, Citation, LanguageModel, Message, ModelResponse, Plan,
    RecommendedAction, Result, ToolOutcome, Verdict,
};
use retail_assist_tools::ToolRegistry;

use crate::prompts::{PLANNER_INSTRUCTIONS, SYSTEM_BRAND_TONE, VERIFIER_INSTRUCTIONS};

/// The three-stage chat pipeline
pub struct Pipeline {
    model: Arc<dyn LanguageModel>,
    registry: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Pipeline {
    pub fn new(model: Arc<dyn LanguageModel>, registry: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            model,
            registry,
            config,
        }
    }

    /// Run one request through all three stages
    pub async fn run(&self, user_input: &str) -> Result<AgentResponse> {
        let mut state = AgentState::new(user_input.trim());

        tracing::info!(model = self.model.model_name(), "pipeline start");

        self.plan(&mut state).await?;
        self.execute(&mut state).await?;
        self.verify(&mut state).await
    }

    /// Planner: classify the request and seed the working transcript
    async fn plan(&self, state: &mut AgentState) -> Result<()> {
        let prompt = vec![
            Message::system(SYSTEM_BRAND_TONE),
            Message::system(PLANNER_INSTRUCTIONS),
            Message::user(state.user_input.clone()),
        ];

        state.plan = match self.model.complete(&prompt, &[]).await? {
            ModelResponse::Text(raw) => serde_json::from_str(raw.trim()).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "planner reply did not parse, using fallback plan");
                Plan::fallback()
            }),
            ModelResponse::ToolCalls(_) => {
                tracing::warn!("planner replied with tool calls, using fallback plan");
                Plan::fallback()
            }
        };

        tracing::debug!(
            intent = ?state.plan.intent,
            sensitivity = ?state.plan.sensitivity,
            needs_retrieval = state.plan.needs_retrieval,
            "plan ready"
        );

        state.messages = vec![
            Message::system(SYSTEM_BRAND_TONE),
            Message::user(state.user_input.clone()),
        ];

        Ok(())
    }

    /// Executor: bounded tool loop until the model answers in plain text
    async fn execute(&self, state: &mut AgentState) -> Result<()> {
        let tools = self.registry.definitions();

        for iteration in 0..self.config.max_iterations {
            let calls = match self.model.complete(&state.messages, &tools).await? {
                ModelResponse::Text(text) => {
                    tracing::debug!(iteration, "draft answer produced");
                    state.messages.push(Message::assistant(text.clone()));
                    state.draft_answer = text;
                    break;
                }
                ModelResponse::ToolCalls(calls) => calls,
            };

            state.messages.push(Message::assistant_tool_calls(calls.clone()));

            for call in calls {
                tracing::debug!(iteration, tool = %call.name, "tool call requested");

                let output = match self.registry.execute(&call.name, call.arguments.clone()).await {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::warn!(tool = %call.name, error = %e, "tool call failed");
                        json!({ "error": e.to_string() })
                    }
                };

                state.tool_outcomes.push(ToolOutcome {
                    tool: call.name.clone(),
                    args: call.arguments,
                    output: output.clone(),
                });

                state.messages.push(Message::tool(
                    serde_json::to_string(&output)?,
                    call.id.unwrap_or_default(),
                ));
            }
        }

        // Last retrieval wins: a later search refines an earlier one
        for outcome in &state.tool_outcomes {
            if outcome.tool == "retrieve_kb" {
                state.citations = outcome
                    .output
                    .get("citations")
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or_default();
            }
        }

        Ok(())
    }

    /// Verifier: judge the draft, apply the confidence policy, assemble the answer
    async fn verify(&self, state: &mut AgentState) -> Result<AgentResponse> {
        let payload = serde_json::to_string(&json!({
            "draft_answer": state.draft_answer,
            "citations": state.citations,
            "tool_outputs": state.tool_outcomes,
        }))?;

        let prompt = vec![Message::system(VERIFIER_INSTRUCTIONS), Message::user(payload)];

        let verdict = match self.model.complete(&prompt, &[]).await? {
            ModelResponse::Text(raw) => {
                serde_json::from_str::<Verdict>(raw.trim()).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "verifier reply did not parse, using fallback verdict");
                    Verdict::fallback()
                })
            }
            ModelResponse::ToolCalls(_) => {
                tracing::warn!("verifier replied with tool calls, using fallback verdict");
                Verdict::fallback()
            }
        };

        let mut action = verdict.recommended_action;
        if verdict.confidence < self.config.confidence_threshold
            && action == RecommendedAction::Answer
        {
            tracing::info!(
                confidence = verdict.confidence,
                threshold = self.config.confidence_threshold,
                "confidence below threshold, downgrading to ask_clarify"
            );
            action = RecommendedAction::AskClarify;
        }

        state.confidence = verdict.confidence;
        state.recommended_action = Some(action);

        let answer = assemble_answer(&state.draft_answer, &state.citations, verdict.confidence, action);

        tracing::info!(
            confidence = verdict.confidence,
            action = %action,
            citations = state.citations.len(),
            tools_used = state.tool_outcomes.len(),
            "pipeline done"
        );

        Ok(AgentResponse {
            answer,
            plan: state.plan.clone(),
            citations: state.citations.clone(),
            tool_outcomes: state.tool_outcomes.clone(),
            confidence: verdict.confidence,
            recommended_action: action,
        })
    }
}

/// Append the sources block and the confidence/action footer
fn assemble_answer(
    draft: &str,
    citations: &[Citation],
    confidence: f64,
    action: RecommendedAction,
) -> String {
    let mut answer = draft.to_string();

    if !citations.is_empty() {
        let lines: Vec<String> = citations
            .iter()
            .map(|c| format!("- [{}] {}", c.id, c.source))
            .collect();
        answer.push_str("\n\nSources (sanitized):\n");
        answer.push_str(&lines.join("\n"));
    }

    format!(
        "{}\n\nConfidence: {:.2} | Next: {}",
        answer.trim(),
        confidence,
        action
    )
}
