//! Transaction operations — history, import preview, and import.
//!
//! `preview_import` is the read-only half of the two-step import protocol:
//! it validates the payload locally, echoes the normalized activities, and
//! never touches the wire. `import_activities` is the only mutating
//! operation in the catalog and declares the preview as its pair.

use crate::util::{as_list, display_or_empty, display_or_na};
use crate::validate::validate_activities;
use async_trait::async_trait;
use foliant_client::RemoteApi;
use foliant_core::{Operation, OperationError, OperationOutput};
use serde_json::Value;
use std::sync::Arc;

const MAX_LISTED_ORDERS: usize = 50;

/// Full transaction history.
pub struct OrdersOp {
    client: Arc<dyn RemoteApi>,
}

impl OrdersOp {
    pub fn new(client: Arc<dyn RemoteApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Operation for OrdersOp {
    fn name(&self) -> &str {
        "get_orders"
    }

    fn description(&self) -> &str {
        "Retrieve the full transaction history: BUY, SELL, DIVIDEND, \
         INTEREST, FEE, and LIABILITY activities with date, symbol, \
         quantity, unit price, and fee. Use this for questions about past \
         trades, dividend income, or fees."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: Value) -> Result<OperationOutput, OperationError> {
        let payload = self.client.orders().await?;
        let orders = as_list(&payload, "activities");

        if orders.is_empty() {
            return Ok(OperationOutput::text("No transactions found."));
        }

        let lines: Vec<String> = orders
            .iter()
            .map(|o| {
                let date = o
                    .get("date")
                    .and_then(Value::as_str)
                    .map(|d| d.chars().take(10).collect::<String>())
                    .unwrap_or_else(|| "N/A".into());
                let symbol = o
                    .pointer("/SymbolProfile/symbol")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| display_or_na(o, "symbol"));
                let currency = o
                    .pointer("/SymbolProfile/currency")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| display_or_empty(o, "currency"));
                format!(
                    "- {date} | {:>8} | {symbol:<8} | Qty: {} @ {currency} {} | Fee: {}",
                    display_or_na(o, "type"),
                    display_or_na(o, "quantity"),
                    display_or_na(o, "unitPrice"),
                    display_or_na(o, "fee"),
                )
            })
            .collect();

        let shown = lines.len().min(MAX_LISTED_ORDERS);
        let mut output = format!(
            "Transaction History ({} activities):\n{}",
            lines.len(),
            lines[lines.len() - shown..].join("\n")
        );
        if lines.len() > MAX_LISTED_ORDERS {
            output.push_str(&format!(
                "\n\n(Showing last {MAX_LISTED_ORDERS} of {})",
                lines.len()
            ));
        }

        Ok(OperationOutput::text(output))
    }
}

/// Validate an import payload and echo it back — the read-only first step
/// of the two-step import protocol.
pub struct PreviewImportOp;

#[async_trait]
impl Operation for PreviewImportOp {
    fn name(&self) -> &str {
        "preview_import"
    }

    fn description(&self) -> &str {
        "Validate a list of activities before importing them. Returns a \
         summary of what would be imported. ALWAYS call this first, show \
         the summary to the user, and only call import_activities with \
         confirm=true after they explicitly approve."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "activities": {
                    "type": "array",
                    "description": "Activity objects to validate. Each needs \
                        currency, dataSource, date, fee, quantity, symbol, \
                        type (BUY/SELL/DIVIDEND/INTEREST/FEE/LIABILITY), and unitPrice.",
                    "items": { "type": "object" }
                }
            },
            "required": ["activities"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<OperationOutput, OperationError> {
        let raw = arguments.get("activities").ok_or_else(|| {
            OperationError::InvalidArguments("missing required argument 'activities'".into())
        })?;
        let activities = validate_activities(raw)?;

        let lines: Vec<String> = activities
            .iter()
            .map(|a| {
                format!(
                    "- {} {} x {} @ {} {} (fee {})",
                    display_or_na(a, "type"),
                    display_or_na(a, "quantity"),
                    display_or_na(a, "symbol"),
                    display_or_empty(a, "currency"),
                    display_or_na(a, "unitPrice"),
                    display_or_na(a, "fee"),
                )
            })
            .collect();

        let output = format!(
            "Import preview — {} activit{} validated:\n{}\n\nNothing has been \
             imported yet. Ask the user to approve, then call \
             import_activities with the same activities and confirm=true.",
            activities.len(),
            if activities.len() == 1 { "y" } else { "ies" },
            lines.join("\n")
        );

        Ok(OperationOutput::with_data(output, Value::Array(activities)))
    }
}

/// Commit previously previewed activities to the remote service.
pub struct ImportActivitiesOp {
    client: Arc<dyn RemoteApi>,
}

impl ImportActivitiesOp {
    pub fn new(client: Arc<dyn RemoteApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Operation for ImportActivitiesOp {
    fn name(&self) -> &str {
        "import_activities"
    }

    fn description(&self) -> &str {
        "Import activities into the portfolio. Requires a successful \
         preview_import of the same activities earlier in this conversation \
         and confirm=true after the user approved."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "activities": {
                    "type": "array",
                    "description": "The exact activities that were previewed",
                    "items": { "type": "object" }
                },
                "confirm": {
                    "type": "boolean",
                    "description": "Must be true; set only after the user explicitly approved the preview"
                }
            },
            "required": ["activities", "confirm"]
        })
    }

    fn mutating(&self) -> bool {
        true
    }

    fn preview_operation(&self) -> Option<&str> {
        Some("preview_import")
    }

    async fn execute(&self, arguments: Value) -> Result<OperationOutput, OperationError> {
        let raw = arguments.get("activities").ok_or_else(|| {
            OperationError::InvalidArguments("missing required argument 'activities'".into())
        })?;
        let activities = validate_activities(raw)?;
        let count = activities.len();

        self.client
            .import_activities(&Value::Array(activities))
            .await?;

        Ok(OperationOutput::text(format!(
            "Successfully imported {count} activit{}.",
            if count == 1 { "y" } else { "ies" }
        )))
    }
}
