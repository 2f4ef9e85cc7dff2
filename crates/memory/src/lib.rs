//! Conversation stores for Foliant.
//!
//! Two backends behind the core `ConversationStore` trait:
//! - in-memory for tests and ephemeral sessions (process lifetime)
//! - SQLite for durable chat history across restarts

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
