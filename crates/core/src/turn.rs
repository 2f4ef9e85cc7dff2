//! Conversation turns and per-conversation state.
//!
//! A conversation is an ordered sequence of turns: user messages, action
//! requests chosen by the model, observations produced by executing those
//! actions, and final answers. The reasoning loop only ever appends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation. Opaque to the core; callers may
/// supply their own or let the gateway generate one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single turn in a conversation.
///
/// Every action request is paired, by `call_id`, with exactly one
/// observation before the next user message arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Turn {
    /// A message from the end user.
    User {
        content: String,
        timestamp: DateTime<Utc>,
    },

    /// The model requested an operation call.
    Action {
        call_id: String,
        operation: String,
        arguments: serde_json::Value,
        timestamp: DateTime<Utc>,
    },

    /// The result (or structured failure) of an action request.
    Observation {
        call_id: String,
        operation: String,
        success: bool,
        /// Human/model-readable result text.
        output: String,
        /// Structured payload, when the operation produced one
        /// (e.g. the echoed activities of an import preview).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        timestamp: DateTime<Utc>,
    },

    /// The model's final answer for the current user message.
    Answer {
        content: String,
        timestamp: DateTime<Utc>,
    },
}

impl Turn {
    /// Create a user-message turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an action-request turn.
    pub fn action(
        call_id: impl Into<String>,
        operation: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self::Action {
            call_id: call_id.into(),
            operation: operation.into(),
            arguments,
            timestamp: Utc::now(),
        }
    }

    /// Create a successful observation turn.
    pub fn observation(
        call_id: impl Into<String>,
        operation: impl Into<String>,
        output: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self::Observation {
            call_id: call_id.into(),
            operation: operation.into(),
            success: true,
            output: output.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    /// Create a failed observation turn.
    pub fn failed_observation(
        call_id: impl Into<String>,
        operation: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::Observation {
            call_id: call_id.into(),
            operation: operation.into(),
            success: false,
            output: output.into(),
            data: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a final-answer turn.
    pub fn answer(content: impl Into<String>) -> Self {
        Self::Answer {
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_observation(&self) -> bool {
        matches!(self, Turn::Observation { .. })
    }
}

/// Ordered, append-only state of one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub id: ConversationId,
    pub turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// Create a new empty conversation with the given id.
    pub fn new(id: ConversationId) -> Self {
        let now = Utc::now();
        Self {
            id,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a turn.
    pub fn push(&mut self, turn: Turn) {
        self.updated_at = Utc::now();
        self.turns.push(turn);
    }

    /// The last final answer, if the most recent loop invocation produced one.
    pub fn last_answer(&self) -> Option<&str> {
        self.turns.iter().rev().find_map(|t| match t {
            Turn::Answer { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }

    /// Every action must be matched by a later observation with the same
    /// call id. Used by tests to assert the loop keeps the sequence coherent.
    pub fn is_coherent(&self) -> bool {
        let mut open: Vec<&str> = Vec::new();
        for turn in &self.turns {
            match turn {
                Turn::Action { call_id, .. } => open.push(call_id.as_str()),
                Turn::Observation { call_id, .. } => {
                    match open.iter().position(|c| *c == call_id.as_str()) {
                        Some(i) => {
                            open.remove(i);
                        }
                        None => return false,
                    }
                }
                Turn::User { .. } | Turn::Answer { .. } => {
                    if !open.is_empty() {
                        return false;
                    }
                }
            }
        }
        open.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_updates_timestamp() {
        let mut state = ConversationState::new(ConversationId::from("c1"));
        let created = state.created_at;

        state.push(Turn::user("What do I own?"));
        assert_eq!(state.turns.len(), 1);
        assert!(state.updated_at >= created);
    }

    #[test]
    fn turn_serialization_roundtrip() {
        let turn = Turn::action(
            "call_1",
            "get_portfolio_holdings",
            serde_json::json!({}),
        );
        let json = serde_json::to_string(&turn).unwrap();
        let back: Turn = serde_json::from_str(&json).unwrap();
        match back {
            Turn::Action { operation, .. } => assert_eq!(operation, "get_portfolio_holdings"),
            other => panic!("Expected Action, got {other:?}"),
        }
    }

    #[test]
    fn coherent_sequence_validates() {
        let mut state = ConversationState::new(ConversationId::new());
        state.push(Turn::user("holdings?"));
        state.push(Turn::action("c1", "get_portfolio_holdings", serde_json::json!({})));
        state.push(Turn::observation("c1", "get_portfolio_holdings", "3 positions", None));
        state.push(Turn::answer("You hold 3 positions."));
        assert!(state.is_coherent());
    }

    #[test]
    fn unmatched_action_is_incoherent() {
        let mut state = ConversationState::new(ConversationId::new());
        state.push(Turn::user("holdings?"));
        state.push(Turn::action("c1", "get_portfolio_holdings", serde_json::json!({})));
        state.push(Turn::answer("done"));
        assert!(!state.is_coherent());
    }

    #[test]
    fn last_answer_finds_most_recent() {
        let mut state = ConversationState::new(ConversationId::new());
        state.push(Turn::user("hi"));
        state.push(Turn::answer("hello"));
        state.push(Turn::user("bye"));
        state.push(Turn::answer("goodbye"));
        assert_eq!(state.last_answer(), Some("goodbye"));
    }
}
