//! Three-stage customer-service pipeline
//!
//! `Pipeline::run` executes Planner -> Executor -> Verifier over a shared
//! [`retail_assist_core::AgentState`] and always produces an
//! [`retail_assist_core::AgentResponse`]: malformed model output degrades to
//! documented fallbacks rather than failing the request. The `eval` module
//! scores responses with rule-based metrics over the same public contract.

pub mod eval;
pub mod pipeline;
pub mod prompts;

use thiserror::Error;

/// Agent crate errors
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Evaluation error: {0}")]
    Eval(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<AgentError> for retail_assist_core::Error {
    fn from(err: AgentError) -> Self {
        retail_assist_core::Error::Agent(err.to_string())
    }
}

pub use eval::{
    citation_presence, escalation_when_low_confidence, grounded_numeric_claims, run_eval,
    EvalSummary,
};
pub use pipeline::Pipeline;
