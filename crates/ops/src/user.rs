//! User settings operation.

use async_trait::async_trait;
use foliant_client::RemoteApi;
use foliant_core::{Operation, OperationError, OperationOutput};
use serde_json::Value;
use std::sync::Arc;

/// The user's profile and preferences.
pub struct UserSettingsOp {
    client: Arc<dyn RemoteApi>,
}

impl UserSettingsOp {
    pub fn new(client: Arc<dyn RemoteApi>) -> Self {
        Self { client }
    }
}

fn setting(payload: &Value, pointer: &str) -> String {
    payload
        .pointer(pointer)
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| "N/A".into())
}

#[async_trait]
impl Operation for UserSettingsOp {
    fn name(&self) -> &str {
        "get_user_settings"
    }

    fn description(&self) -> &str {
        "Retrieve the user's profile and settings: base currency, default \
         date range, locale, and subscription status. Use this to learn \
         preferences (e.g. base currency) before an analysis."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: Value) -> Result<OperationOutput, OperationError> {
        let payload = self.client.user_settings().await?;

        Ok(OperationOutput::text(format!(
            "User Settings:\n\
             - Base Currency: {}\n\
             - Default Date Range: {}\n\
             - Locale: {}\n\
             - Subscription: {}",
            setting(&payload, "/settings/baseCurrency"),
            setting(&payload, "/settings/dateRange"),
            setting(&payload, "/settings/locale"),
            setting(&payload, "/subscription/type"),
        )))
    }
}
