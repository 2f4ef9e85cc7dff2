//! A stub remote service for tests.
//!
//! Records every invocation so tests can assert that denial paths never
//! reach the wire, and returns canned payloads per endpoint.

use async_trait::async_trait;
use foliant_client::RemoteApi;
use foliant_core::RemoteError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// A scriptable stand-in for the remote portfolio service.
pub struct StubRemote {
    responses: HashMap<String, Value>,
    failures: HashMap<String, RemoteError>,
    calls: Mutex<Vec<String>>,
    import_payloads: Mutex<Vec<Value>>,
}

impl StubRemote {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            failures: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            import_payloads: Mutex::new(Vec::new()),
        }
    }

    /// Set the canned payload for an endpoint.
    pub fn with_response(mut self, endpoint: &str, value: Value) -> Self {
        self.responses.insert(endpoint.to_string(), value);
        self
    }

    /// Make an endpoint fail with the given error.
    pub fn with_failure(mut self, endpoint: &str, error: RemoteError) -> Self {
        self.failures.insert(endpoint.to_string(), error);
        self
    }

    /// Every endpoint invocation, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// How many times an endpoint was invoked.
    pub fn count(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == endpoint)
            .count()
    }

    /// Activities payloads passed to `import_activities`.
    pub fn import_payloads(&self) -> Vec<Value> {
        self.import_payloads.lock().unwrap().clone()
    }

    fn respond(&self, endpoint: &str) -> Result<Value, RemoteError> {
        self.calls.lock().unwrap().push(endpoint.to_string());
        if let Some(error) = self.failures.get(endpoint) {
            return Err(error.clone());
        }
        Ok(self
            .responses
            .get(endpoint)
            .cloned()
            .unwrap_or_else(|| serde_json::json!({})))
    }
}

impl Default for StubRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteApi for StubRemote {
    async fn health_check(&self) -> Result<Value, RemoteError> {
        self.respond("health_check")
    }

    async fn portfolio_holdings(&self) -> Result<Value, RemoteError> {
        self.respond("portfolio_holdings")
    }

    async fn portfolio_performance(&self, _range: &str) -> Result<Value, RemoteError> {
        self.respond("portfolio_performance")
    }

    async fn portfolio_details(&self, _range: &str) -> Result<Value, RemoteError> {
        self.respond("portfolio_details")
    }

    async fn orders(&self) -> Result<Value, RemoteError> {
        self.respond("orders")
    }

    async fn accounts(&self) -> Result<Value, RemoteError> {
        self.respond("accounts")
    }

    async fn lookup_symbol(&self, _query: &str) -> Result<Value, RemoteError> {
        self.respond("lookup_symbol")
    }

    async fn user_settings(&self) -> Result<Value, RemoteError> {
        self.respond("user_settings")
    }

    async fn import_activities(&self, activities: &Value) -> Result<Value, RemoteError> {
        self.import_payloads.lock().unwrap().push(activities.clone());
        self.respond("import_activities")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_and_payloads() {
        let stub = StubRemote::new()
            .with_response("health_check", serde_json::json!({"status": "OK"}));

        stub.health_check().await.unwrap();
        stub.import_activities(&serde_json::json!([{"symbol": "AAPL"}]))
            .await
            .unwrap();

        assert_eq!(stub.calls(), vec!["health_check", "import_activities"]);
        assert_eq!(stub.count("import_activities"), 1);
        assert_eq!(stub.import_payloads().len(), 1);
    }

    #[tokio::test]
    async fn configured_failure_is_returned() {
        let stub = StubRemote::new().with_failure(
            "orders",
            RemoteError::Upstream("boom".into()),
        );
        assert!(matches!(
            stub.orders().await,
            Err(RemoteError::Upstream(_))
        ));
        assert_eq!(stub.count("orders"), 1);
    }
}
