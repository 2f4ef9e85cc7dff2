//! Conversation store trait — per-conversation memory.
//!
//! Guarantees read-your-writes within a single conversation id and full
//! isolation between ids. Implementations: in-memory (process lifetime)
//! and SQLite (survives restarts).

use crate::error::StoreError;
use crate::turn::{ConversationId, ConversationState, Turn};
use async_trait::async_trait;

/// The conversation store trait.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The backend name (e.g. "in_memory", "sqlite").
    fn name(&self) -> &str;

    /// Fetch the state for a conversation id, creating an empty
    /// conversation on first reference.
    async fn get(&self, id: &ConversationId) -> std::result::Result<ConversationState, StoreError>;

    /// Append a turn to a conversation, creating it if absent.
    async fn append(
        &self,
        id: &ConversationId,
        turn: Turn,
    ) -> std::result::Result<(), StoreError>;
}
