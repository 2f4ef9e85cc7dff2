//! CLI command implementations.

pub mod chat;
pub mod doctor;
pub mod serve;

use anyhow::Result;
use foliant_agent::AgentLoop;
use foliant_client::RemoteClient;
use foliant_config::AppConfig;
use foliant_core::store::ConversationStore;
use foliant_memory::{InMemoryStore, SqliteStore};
use std::sync::Arc;
use std::time::Duration;

/// Build the agent stack (remote client, registry, model, store, loop)
/// from configuration. Shared by `chat` and `doctor`.
pub(crate) async fn build_agent(
    config: &AppConfig,
) -> Result<(Arc<AgentLoop>, Arc<RemoteClient>)> {
    let remote = Arc::new(RemoteClient::new(
        &config.remote.base_url,
        &config.remote.security_token,
        Duration::from_secs(config.remote.timeout_secs),
    ));

    let registry = Arc::new(foliant_ops::default_registry(remote.clone())?);

    let model = Arc::new(foliant_model::OpenAiCompatModel::new(
        &config.model.base_url,
        &config.model.api_key,
        &config.model.name,
    ));

    let store: Arc<dyn ConversationStore> = match config.memory.backend.as_str() {
        "sqlite" => Arc::new(SqliteStore::new(&config.memory.path).await?),
        _ => Arc::new(InMemoryStore::new()),
    };

    let mut agent = AgentLoop::new(model, registry, store)
        .with_max_iterations(config.agent.max_iterations)
        .with_max_tokens(config.model.max_tokens);
    if let Some(prompt) = &config.model.system_prompt_override {
        agent = agent.with_system_prompt(prompt);
    }

    Ok((Arc::new(agent), remote))
}
