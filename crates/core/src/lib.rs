//! Core traits and types for the retail assistant
//!
//! This crate provides foundational types used across all other crates:
//! - Retrieval types (`Document`, `ScoredDocument`, `Citation`)
//! - Agent pipeline types (`Plan`, `Verdict`, `AgentState`, `AgentResponse`)
//! - Chat transcript types (`Message`, `Role`)
//! - The `LanguageModel` trait seam for pluggable model backends
//! - PII redaction helpers
//! - Error types

pub mod document;
pub mod error;
pub mod message;
pub mod model;
pub mod pii;
pub mod state;

pub use document::{Citation, Document, ScoredDocument};
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use model::{LanguageModel, ModelResponse, ToolCallRequest, ToolDefinition};
pub use pii::redact_pii;
pub use state::{
    AgentResponse, AgentState, Intent, Plan, RecommendedAction, Sensitivity, ToolOutcome, Verdict,
};
