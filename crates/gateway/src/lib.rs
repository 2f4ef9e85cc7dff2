//! HTTP gateway for the Foliant portfolio agent.
//!
//! Two endpoints:
//! - `POST /query` — run one user message through cache → reasoning loop →
//!   verifier and return the `VerifiedAnswer` with its conversation id
//! - `GET /health` — gateway status plus remote-service reachability
//!
//! A request that fails internally still returns a structured response: a
//! degraded low-confidence answer with an explanatory warning, never a raw
//! error body.
//!
//! Built on Axum.

pub mod cache;

use axum::extract::DefaultBodyLimit;
use axum::{extract::State, response::Json, routing::get, routing::post, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use cache::ResponseCache;
use foliant_agent::AgentLoop;
use foliant_client::{RemoteApi, RemoteClient};
use foliant_core::answer::{Confidence, VerifiedAnswer};
use foliant_core::store::ConversationStore;
use foliant_core::turn::ConversationId;
use foliant_memory::{InMemoryStore, SqliteStore};
use foliant_verify::{Verifier, VerifierConfig};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<AgentLoop>,
    pub verifier: Arc<Verifier>,
    pub remote: Arc<dyn RemoteApi>,
    pub cache: Option<ResponseCache<QueryResponse>>,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/query", post(query_handler))
        .layer(DefaultBodyLimit::max(256 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server from configuration.
///
/// Builds the remote client, operation registry, model backend,
/// conversation store, and verifier once; everything is shared via Arc.
pub async fn start(
    config: foliant_config::AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let remote: Arc<RemoteClient> = Arc::new(RemoteClient::new(
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

    let cache = config.cache.enabled.then(|| {
        ResponseCache::new(
            Duration::from_secs(config.cache.ttl_secs),
            config.cache.max_entries,
        )
    });

    let state = Arc::new(GatewayState {
        agent: Arc::new(agent),
        verifier: Arc::new(Verifier::new(VerifierConfig::default())),
        remote,
        cache,
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    remote_reachable: bool,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        remote_reachable: state.remote.reachable().await,
    })
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: VerifiedAnswer,
    pub conversation_id: String,
}

async fn query_handler(
    State(state): State<SharedState>,
    Json(payload): Json<QueryRequest>,
) -> Json<QueryResponse> {
    let conversation_id = payload
        .conversation_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if let Some(cache) = &state.cache
        && let Some(cached) = cache.get(&conversation_id, &payload.message)
    {
        info!(conversation_id = %conversation_id, "Cache hit");
        return Json(cached);
    }

    let id = ConversationId::from(&conversation_id);
    let response = match state.agent.process(&id, &payload.message).await {
        Ok(result) => {
            let verified = state.verifier.verify(&result.answer, &result.traces);
            QueryResponse {
                response: verified,
                conversation_id: conversation_id.clone(),
            }
        }
        Err(e) => {
            error!(conversation_id = %conversation_id, error = %e, "Loop invocation failed");
            QueryResponse {
                response: VerifiedAnswer {
                    answer: "I ran into an internal problem while working on this \
                             request. Nothing was changed. Please try again."
                        .into(),
                    citations: vec![],
                    confidence: Confidence::Low,
                    warnings: vec![format!("internal error: {e}")],
                },
                conversation_id: conversation_id.clone(),
            }
        }
    };

    if let Some(cache) = &state.cache {
        cache.put(&conversation_id, &payload.message, response.clone());
    }

    Json(response)
}
