//! The remote portfolio service client.
//!
//! Resilience contract:
//! - Authentication is lazy: the security token is exchanged for a bearer
//!   token before the first authenticated call, serialized so concurrent
//!   first calls authenticate once.
//! - A 401 invalidates the session, triggers exactly one re-authentication,
//!   and replays the original request exactly once. A second 401 surfaces
//!   as `RemoteError::Unauthorized`.
//! - Connection failures and read timeouts are retried up to 3 total
//!   attempts with exponential backoff (1 s base, doubling, 10 s cap,
//!   jittered). 4xx and malformed payloads are never retried.

use async_trait::async_trait;
use foliant_core::RemoteError;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Total attempts for the transient error class (connect/timeout).
const MAX_ATTEMPTS: u32 = 3;

/// The remote operation surface consumed by the operation catalog.
///
/// One method per endpoint; results are the raw JSON payloads — the
/// operations layer owns summarization.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn health_check(&self) -> Result<Value, RemoteError>;
    async fn portfolio_holdings(&self) -> Result<Value, RemoteError>;
    async fn portfolio_performance(&self, range: &str) -> Result<Value, RemoteError>;
    async fn portfolio_details(&self, range: &str) -> Result<Value, RemoteError>;
    async fn orders(&self) -> Result<Value, RemoteError>;
    async fn accounts(&self) -> Result<Value, RemoteError>;
    async fn lookup_symbol(&self, query: &str) -> Result<Value, RemoteError>;
    async fn user_settings(&self) -> Result<Value, RemoteError>;
    async fn import_activities(&self, activities: &Value) -> Result<Value, RemoteError>;

    /// Whether the remote service currently answers its health endpoint.
    async fn reachable(&self) -> bool {
        matches!(
            self.health_check().await,
            Ok(v) if v.get("status").and_then(Value::as_str) == Some("OK")
        )
    }
}

/// The authentication session. Owned exclusively by the client; replaced
/// wholesale on invalidation, never partially mutated.
struct AuthSession {
    token: Option<String>,
}

/// Concrete client over reqwest.
pub struct RemoteClient {
    base_url: String,
    security_token: String,
    http: reqwest::Client,
    session: Mutex<AuthSession>,
    backoff_base: Duration,
    backoff_cap: Duration,
}

impl RemoteClient {
    /// Create a new client for the given base URL and security token.
    pub fn new(
        base_url: impl Into<String>,
        security_token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            security_token: security_token.into(),
            http,
            session: Mutex::new(AuthSession { token: None }),
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(10),
        }
    }

    /// Override the backoff schedule (tests run in milliseconds).
    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }

    /// Exchange the security token for a bearer token.
    async fn authenticate(&self) -> Result<String, RemoteError> {
        let url = format!("{}/api/v1/auth/anonymous", self.base_url);
        let body = serde_json::json!({ "accessToken": self.security_token });

        debug!("Authenticating with the remote service");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    RemoteError::Transient {
                        attempts: 1,
                        message: format!("authentication: {e}"),
                    }
                } else {
                    RemoteError::Upstream(format!("authentication: {e}"))
                }
            })?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            return Err(RemoteError::Unauthorized(
                "security token rejected".into(),
            ));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Upstream(format!(
                "authentication returned status {status}: {body}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Upstream(format!("authentication payload: {e}")))?;

        payload
            .get("authToken")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| RemoteError::Upstream("authentication payload missing authToken".into()))
    }

    /// Get the current bearer token, authenticating lazily.
    ///
    /// The session mutex is held across authentication so concurrent first
    /// calls perform exactly one token exchange.
    async fn bearer(&self) -> Result<String, RemoteError> {
        let mut session = self.session.lock().await;
        if let Some(token) = &session.token {
            return Ok(token.clone());
        }
        let token = self.authenticate().await?;
        info!("Remote session established");
        session.token = Some(token.clone());
        Ok(token)
    }

    /// Drop the current session. The next call re-authenticates.
    async fn invalidate_session(&self) {
        let mut session = self.session.lock().await;
        session.token = None;
    }

    /// Backoff delay before retry number `attempt` (1-based), without jitter.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        (self.backoff_base * factor).min(self.backoff_cap)
    }

    /// Perform one request with the full resilience policy.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
        authed: bool,
    ) -> Result<Value, RemoteError> {
        let url = format!("{}{}", self.base_url, path);
        let mut transient_attempts: u32 = 0;
        let mut reauth_done = false;

        loop {
            let mut request = self.http.request(method.clone(), &url);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            if authed {
                let token = self.bearer().await?;
                request = request.bearer_auth(token);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    transient_attempts += 1;
                    if transient_attempts >= MAX_ATTEMPTS {
                        warn!(path, attempts = transient_attempts, "Remote retries exhausted");
                        return Err(RemoteError::Transient {
                            attempts: transient_attempts,
                            message: e.to_string(),
                        });
                    }
                    let delay = jitter(self.backoff_delay(transient_attempts));
                    warn!(
                        path,
                        attempt = transient_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Transient remote failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(RemoteError::Upstream(e.to_string())),
            };

            let status = response.status().as_u16();

            if status == 401 && authed {
                if reauth_done {
                    warn!(path, "Authorization rejected after re-authentication");
                    return Err(RemoteError::Unauthorized(
                        "rejected again after re-authentication".into(),
                    ));
                }
                debug!(path, "Session expired, re-authenticating once");
                reauth_done = true;
                self.invalidate_session().await;
                continue;
            }

            if (400..500).contains(&status) {
                let message = response.text().await.unwrap_or_default();
                return Err(RemoteError::BadRequest { status, message });
            }

            if status >= 500 {
                let message = response.text().await.unwrap_or_default();
                return Err(RemoteError::Upstream(format!("status {status}: {message}")));
            }

            return response
                .json()
                .await
                .map_err(|e| RemoteError::Upstream(format!("invalid JSON payload: {e}")));
        }
    }
}

/// Add up to 10% random jitter so synchronized clients don't retry in step.
fn jitter(delay: Duration) -> Duration {
    use rand::Rng;
    let extra = rand::rng().random_range(0.0..=0.1);
    delay.mul_f64(1.0 + extra)
}

#[async_trait]
impl RemoteApi for RemoteClient {
    async fn health_check(&self) -> Result<Value, RemoteError> {
        self.send(Method::GET, "/api/v1/health", &[], None, false).await
    }

    async fn portfolio_holdings(&self) -> Result<Value, RemoteError> {
        self.send(Method::GET, "/api/v1/portfolio/holdings", &[], None, true)
            .await
    }

    async fn portfolio_performance(&self, range: &str) -> Result<Value, RemoteError> {
        self.send(
            Method::GET,
            "/api/v1/portfolio/performance",
            &[("range", range)],
            None,
            true,
        )
        .await
    }

    async fn portfolio_details(&self, range: &str) -> Result<Value, RemoteError> {
        self.send(
            Method::GET,
            "/api/v1/portfolio/details",
            &[("range", range)],
            None,
            true,
        )
        .await
    }

    async fn orders(&self) -> Result<Value, RemoteError> {
        self.send(Method::GET, "/api/v1/order", &[], None, true).await
    }

    async fn accounts(&self) -> Result<Value, RemoteError> {
        self.send(Method::GET, "/api/v1/account", &[], None, true).await
    }

    async fn lookup_symbol(&self, query: &str) -> Result<Value, RemoteError> {
        self.send(
            Method::GET,
            "/api/v1/symbol/lookup",
            &[("query", query)],
            None,
            true,
        )
        .await
    }

    async fn user_settings(&self) -> Result<Value, RemoteError> {
        self.send(Method::GET, "/api/v1/user", &[], None, true).await
    }

    async fn import_activities(&self, activities: &Value) -> Result<Value, RemoteError> {
        let body = serde_json::json!({ "activities": activities });
        self.send(Method::POST, "/api/v1/import", &[], Some(&body), true)
            .await
    }
}
