//! In-memory conversation store. Holds the contractual minimum: state is
//! retrievable by id for the lifetime of the process.

use async_trait::async_trait;
use foliant_core::store::ConversationStore;
use foliant_core::turn::{ConversationId, ConversationState, Turn};
use foliant_core::StoreError;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A store that keeps every conversation in a process-local map.
pub struct InMemoryStore {
    conversations: RwLock<HashMap<String, ConversationState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Number of conversations currently held.
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, id: &ConversationId) -> Result<ConversationState, StoreError> {
        let mut conversations = self.conversations.write().await;
        Ok(conversations
            .entry(id.0.clone())
            .or_insert_with(|| ConversationState::new(id.clone()))
            .clone())
    }

    async fn append(&self, id: &ConversationId, turn: Turn) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(id.0.clone())
            .or_insert_with(|| ConversationState::new(id.clone()))
            .push(turn);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_creates_empty_state_on_first_reference() {
        let store = InMemoryStore::new();
        let id = ConversationId::from("fresh");

        let state = store.get(&id).await.unwrap();
        assert!(state.turns.is_empty());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn read_your_writes() {
        let store = InMemoryStore::new();
        let id = ConversationId::from("c1");

        store.append(&id, Turn::user("hello")).await.unwrap();
        store.append(&id, Turn::answer("hi there")).await.unwrap();

        let state = store.get(&id).await.unwrap();
        assert_eq!(state.turns.len(), 2);
        assert_eq!(state.last_answer(), Some("hi there"));
    }

    #[tokio::test]
    async fn conversations_are_isolated() {
        let store = InMemoryStore::new();
        let a = ConversationId::from("conversation-a");
        let b = ConversationId::from("conversation-b");

        store.append(&a, Turn::user("only in A")).await.unwrap();

        let state_b = store.get(&b).await.unwrap();
        assert!(state_b.turns.is_empty());

        let state_a = store.get(&a).await.unwrap();
        assert_eq!(state_a.turns.len(), 1);
    }
}
