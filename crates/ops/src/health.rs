//! Health-check operation.

use crate::util::display_or_na;
use async_trait::async_trait;
use foliant_client::RemoteApi;
use foliant_core::{Operation, OperationError, OperationOutput};
use std::sync::Arc;

/// Checks whether the remote portfolio service is up. Requires no
/// authentication and provides no user data.
pub struct HealthCheckOp {
    client: Arc<dyn RemoteApi>,
}

impl HealthCheckOp {
    pub fn new(client: Arc<dyn RemoteApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Operation for HealthCheckOp {
    fn name(&self) -> &str {
        "health_check"
    }

    fn description(&self) -> &str {
        "Check if the portfolio service is running and healthy. \
         Does not require authentication and returns no portfolio data."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
    ) -> Result<OperationOutput, OperationError> {
        let payload = self.client.health_check().await?;
        let status = display_or_na(&payload, "status");
        Ok(OperationOutput::text(format!(
            "Portfolio service status: {status}"
        )))
    }
}
