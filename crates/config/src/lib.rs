//! Configuration loading, validation, and management for Foliant.
//!
//! Loads configuration from `~/.foliant/config.toml` with environment
//! variable overrides (`FOLIANT_*`). Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure.
///
/// Maps directly to `~/.foliant/config.toml`.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Remote portfolio service connection
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Reasoning model backend
    #[serde(default)]
    pub model: ModelConfig,

    /// Reasoning loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Conversation store settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &str) -> &'static str {
    if s.is_empty() { "(unset)" } else { "[REDACTED]" }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("remote", &self.remote)
            .field("model", &self.model)
            .field("agent", &self.agent)
            .field("memory", &self.memory)
            .field("gateway", &self.gateway)
            .field("cache", &self.cache)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the portfolio service.
    #[serde(default = "default_remote_url")]
    pub base_url: String,

    /// Security token exchanged for a bearer token on first call.
    #[serde(default)]
    pub security_token: String,

    /// Per-request read timeout in seconds.
    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
}

fn default_remote_url() -> String {
    "http://localhost:3333".into()
}
fn default_remote_timeout() -> u64 {
    30
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_remote_url(),
            security_token: String::new(),
            timeout_secs: default_remote_timeout(),
        }
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("security_token", &redact(&self.security_token))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// OpenAI-compatible endpoint base URL.
    #[serde(default = "default_model_url")]
    pub base_url: String,

    /// API key for the model endpoint.
    #[serde(default)]
    pub api_key: String,

    /// Model name.
    #[serde(default = "default_model_name")]
    pub name: String,

    /// Sampling temperature. Kept at 0.0 so loop behavior is reproducible.
    #[serde(default)]
    pub temperature: f32,

    /// Maximum tokens per model reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Replace the built-in system prompt entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_model_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model_name() -> String {
    "gpt-4o".into()
}
fn default_max_tokens() -> u32 {
    4096
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_model_url(),
            api_key: String::new(),
            name: default_model_name(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            system_prompt_override: None,
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("name", &self.name)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum decide→act→observe cycles per loop invocation.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_max_iterations() -> u32 {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Conversation store backend: "memory" or "sqlite".
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// SQLite database path (used when backend = "sqlite").
    #[serde(default = "default_memory_path")]
    pub path: String,
}

fn default_memory_backend() -> String {
    "memory".into()
}
fn default_memory_path() -> String {
    "foliant.db".into()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            path: default_memory_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entry time-to-live in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Maximum cached entries before oldest-entry eviction.
    #[serde(default = "default_cache_size")]
    pub max_entries: usize,
}

fn default_true() -> bool {
    true
}
fn default_cache_ttl() -> u64 {
    300
}
fn default_cache_size() -> usize {
    128
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_size(),
        }
    }
}

impl AppConfig {
    /// Default config file location: `~/.foliant/config.toml`.
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(".foliant").join("config.toml")
    }

    /// Load configuration: file (if present) → env overrides → validation.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    /// Load from an explicit path. A missing file yields defaults; env
    /// overrides always apply.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
                path: path.display().to_string(),
                source: e,
            })?;
            toml::from_str(&raw)?
        } else {
            debug!(path = %path.display(), "No config file found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse from a TOML string (no env overrides).
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `FOLIANT_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("FOLIANT_REMOTE_URL") {
            self.remote.base_url = v;
        }
        if let Ok(v) = std::env::var("FOLIANT_SECURITY_TOKEN") {
            self.remote.security_token = v;
        }
        if let Ok(v) = std::env::var("FOLIANT_MODEL_URL") {
            self.model.base_url = v;
        }
        if let Ok(v) = std::env::var("FOLIANT_MODEL_API_KEY") {
            self.model.api_key = v;
        }
        if let Ok(v) = std::env::var("FOLIANT_MODEL_NAME") {
            self.model.name = v;
        }
        if let Ok(v) = std::env::var("FOLIANT_GATEWAY_PORT")
            && let Ok(port) = v.parse()
        {
            self.gateway.port = port;
        }
        if let Ok(v) = std::env::var("FOLIANT_MEMORY_BACKEND") {
            self.memory.backend = v;
        }
    }

    /// Validate settings that would otherwise fail deep inside a request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote.base_url.is_empty() {
            return Err(ConfigError::Invalid("remote.base_url cannot be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::Invalid(format!(
                "model.temperature must be in [0.0, 2.0], got {}",
                self.model.temperature
            )));
        }
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "agent.max_iterations must be at least 1".into(),
            ));
        }
        match self.memory.backend.as_str() {
            "memory" | "sqlite" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "memory.backend must be 'memory' or 'sqlite', got '{other}'"
                )));
            }
        }
        Ok(())
    }
}
