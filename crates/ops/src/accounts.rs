//! Account listing operation.

use crate::util::{as_list, display_or_empty, display_or_na};
use async_trait::async_trait;
use foliant_client::RemoteApi;
use foliant_core::{Operation, OperationError, OperationOutput};
use serde_json::Value;
use std::sync::Arc;

/// All investment accounts with balances and platforms.
pub struct AccountsOp {
    client: Arc<dyn RemoteApi>,
}

impl AccountsOp {
    pub fn new(client: Arc<dyn RemoteApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Operation for AccountsOp {
    fn name(&self) -> &str {
        "get_accounts"
    }

    fn description(&self) -> &str {
        "Retrieve all investment accounts: name, platform, balance, \
         currency, and whether the account is excluded from analysis. Use \
         this when the user asks about their accounts or brokers."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: Value) -> Result<OperationOutput, OperationError> {
        let payload = self.client.accounts().await?;
        let accounts = as_list(&payload, "accounts");

        if accounts.is_empty() {
            return Ok(OperationOutput::text("No accounts found."));
        }

        let lines: Vec<String> = accounts
            .iter()
            .map(|acc| {
                let platform = acc
                    .pointer("/Platform/name")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| display_or_na(acc, "platformId"));
                let currency = display_or_empty(acc, "currency");
                format!(
                    "- {} ({platform}): Balance {currency} {} | Value: {currency} {} | Excluded: {}",
                    display_or_na(acc, "name"),
                    display_or_na(acc, "balance"),
                    display_or_na(acc, "value"),
                    acc.get("isExcluded").and_then(Value::as_bool).unwrap_or(false),
                )
            })
            .collect();

        Ok(OperationOutput::text(format!(
            "Accounts ({}):\n{}",
            lines.len(),
            lines.join("\n")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubRemote;
    use serde_json::json;

    #[tokio::test]
    async fn accounts_are_summarized() {
        let remote = Arc::new(StubRemote::new().with_response(
            "accounts",
            json!({
                "accounts": [{
                    "name": "Main Brokerage",
                    "Platform": { "name": "Interactive Brokers" },
                    "balance": 1200.5,
                    "currency": "USD",
                    "value": 54000,
                    "isExcluded": false
                }]
            }),
        ));

        let out = AccountsOp::new(remote).execute(json!({})).await.unwrap();
        assert!(out.output.contains("Accounts (1):"));
        assert!(out.output.contains("Main Brokerage (Interactive Brokers)"));
        assert!(out.output.contains("Excluded: false"));
    }

    #[tokio::test]
    async fn empty_accounts_report_no_data() {
        let remote =
            Arc::new(StubRemote::new().with_response("accounts", json!({"accounts": []})));
        let out = AccountsOp::new(remote).execute(json!({})).await.unwrap();
        assert_eq!(out.output, "No accounts found.");
    }
}
