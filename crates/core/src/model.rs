//! Model backend trait — the abstraction over the reasoning model.
//!
//! The backend is consulted once per loop cycle: given the conversation so
//! far and the operation catalog, it proposes either the next action or a
//! final answer. Requests are pinned to a deterministic temperature so loop
//! behavior is reproducible under test.

use crate::error::ModelError;
use crate::operation::OperationDescriptor;
use crate::turn::Turn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single propose-next-step request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Standing instructions for the agent persona.
    pub system_prompt: String,

    /// The conversation history, oldest first.
    pub turns: Vec<Turn>,

    /// The operation catalog the model may choose from.
    pub operations: Vec<OperationDescriptor>,

    /// Sampling temperature. 0.0 keeps the loop deterministic.
    #[serde(default)]
    pub temperature: f32,

    /// Maximum tokens for the model's reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// What the model proposes for the current cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Call one operation from the catalog.
    Act {
        operation: String,
        arguments: serde_json::Value,
    },

    /// Stop and answer the user.
    Answer { text: String },
}

/// The model backend trait.
///
/// The reasoning loop calls `propose()` without knowing which backend is in
/// use; tests substitute a scripted implementation.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// Propose the next action or a final answer.
    async fn propose(&self, request: ModelRequest) -> std::result::Result<Decision, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_serialization_roundtrip() {
        let decision = Decision::Act {
            operation: "lookup_symbol".into(),
            arguments: serde_json::json!({"query": "AAPL"}),
        };
        let json = serde_json::to_string(&decision).unwrap();
        assert!(json.contains("lookup_symbol"));

        let back: Decision = serde_json::from_str(&json).unwrap();
        assert_eq!(back, decision);
    }

    #[test]
    fn answer_decision_carries_text() {
        let decision = Decision::Answer {
            text: "You hold 3 positions.".into(),
        };
        match decision {
            Decision::Answer { text } => assert!(text.contains("3 positions")),
            other => panic!("Expected Answer, got {other:?}"),
        }
    }
}
