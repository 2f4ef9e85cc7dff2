//! SQLite conversation store.
//!
//! Two tables: `conversations` (one row per conversation) and
//! `conversation_turns` (ordered turns as JSON). Turns survive process
//! restarts; sequence order reconstructs the conversation exactly.

use async_trait::async_trait;
use chrono::Utc;
use foliant_core::store::ConversationStore;
use foliant_core::turn::{ConversationId, ConversationState, Turn};
use foliant_core::StoreError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A durable conversation store backed by a single SQLite file.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at the given path.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite conversation store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id         TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("conversations table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_turns (
                conversation_id TEXT NOT NULL REFERENCES conversations(id),
                seq             INTEGER NOT NULL,
                turn            TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                PRIMARY KEY (conversation_id, seq)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("turns table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Insert the conversation row if it does not exist yet.
    async fn ensure_conversation(&self, id: &ConversationId) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO conversations (id, created_at) VALUES (?, ?)")
            .bind(&id.0)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("ensure conversation: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, id: &ConversationId) -> Result<ConversationState, StoreError> {
        self.ensure_conversation(id).await?;

        let created_at: String =
            sqlx::query("SELECT created_at FROM conversations WHERE id = ?")
                .bind(&id.0)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StoreError::QueryFailed(format!("conversation row: {e}")))?
                .try_get("created_at")
                .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;

        let rows = sqlx::query(
            "SELECT turn FROM conversation_turns WHERE conversation_id = ? ORDER BY seq",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("turn rows: {e}")))?;

        let mut state = ConversationState::new(id.clone());
        state.created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        state.updated_at = state.created_at;

        for row in rows {
            let raw: String = row
                .try_get("turn")
                .map_err(|e| StoreError::QueryFailed(format!("turn column: {e}")))?;
            let turn: Turn = serde_json::from_str(&raw)
                .map_err(|e| StoreError::QueryFailed(format!("turn payload: {e}")))?;
            state.push(turn);
        }

        Ok(state)
    }

    async fn append(&self, id: &ConversationId, turn: Turn) -> Result<(), StoreError> {
        self.ensure_conversation(id).await?;

        let payload = serde_json::to_string(&turn)
            .map_err(|e| StoreError::Storage(format!("turn serialization: {e}")))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::QueryFailed(format!("begin: {e}")))?;

        let seq: i64 = sqlx::query(
            "SELECT COALESCE(MAX(seq) + 1, 0) AS seq FROM conversation_turns WHERE conversation_id = ?",
        )
        .bind(&id.0)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("next seq: {e}")))?
        .try_get("seq")
        .map_err(|e| StoreError::QueryFailed(format!("seq column: {e}")))?;

        sqlx::query(
            "INSERT INTO conversation_turns (conversation_id, seq, turn, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id.0)
        .bind(seq)
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("insert turn: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::QueryFailed(format!("commit: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversations.db");
        let store = SqliteStore::new(path.to_str().unwrap()).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn get_creates_empty_conversation() {
        let (store, _dir) = temp_store().await;
        let id = ConversationId::from("fresh");
        let state = store.get(&id).await.unwrap();
        assert!(state.turns.is_empty());
    }

    #[tokio::test]
    async fn turns_roundtrip_in_order() {
        let (store, _dir) = temp_store().await;
        let id = ConversationId::from("c1");

        store.append(&id, Turn::user("holdings?")).await.unwrap();
        store
            .append(
                &id,
                Turn::action("call_1", "get_portfolio_holdings", serde_json::json!({})),
            )
            .await
            .unwrap();
        store
            .append(
                &id,
                Turn::observation("call_1", "get_portfolio_holdings", "3 positions", None),
            )
            .await
            .unwrap();
        store.append(&id, Turn::answer("You hold 3 positions.")).await.unwrap();

        let state = store.get(&id).await.unwrap();
        assert_eq!(state.turns.len(), 4);
        assert!(state.is_coherent());
        assert_eq!(state.last_answer(), Some("You hold 3 positions."));
    }

    #[tokio::test]
    async fn conversations_are_isolated() {
        let (store, _dir) = temp_store().await;
        let a = ConversationId::from("a");
        let b = ConversationId::from("b");

        store.append(&a, Turn::user("only in A")).await.unwrap();

        assert!(store.get(&b).await.unwrap().turns.is_empty());
        assert_eq!(store.get(&a).await.unwrap().turns.len(), 1);
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversations.db");
        let id = ConversationId::from("durable");

        {
            let store = SqliteStore::new(path.to_str().unwrap()).await.unwrap();
            store.append(&id, Turn::user("remember me")).await.unwrap();
        }

        let store = SqliteStore::new(path.to_str().unwrap()).await.unwrap();
        let state = store.get(&id).await.unwrap();
        assert_eq!(state.turns.len(), 1);
    }
}
