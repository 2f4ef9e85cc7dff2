//! Symbol / market-data lookup operation.

use crate::util::{as_list, display_or_empty, display_or_na};
use crate::validate::{sanitize_query, MAX_SYMBOL_QUERY};
use async_trait::async_trait;
use foliant_client::RemoteApi;
use foliant_core::{Operation, OperationError, OperationOutput};
use serde_json::Value;
use std::sync::Arc;

const MAX_LISTED_RESULTS: usize = 20;

/// Search for an instrument by ticker, ISIN, or partial name.
pub struct LookupSymbolOp {
    client: Arc<dyn RemoteApi>,
}

impl LookupSymbolOp {
    pub fn new(client: Arc<dyn RemoteApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Operation for LookupSymbolOp {
    fn name(&self) -> &str {
        "lookup_symbol"
    }

    fn description(&self) -> &str {
        "Search for a financial instrument by ticker, ISIN, or partial name. \
         Returns symbol, name, asset class, data source, and currency. Does \
         NOT return market prices — holdings already include marketPrice."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Ticker (e.g. AAPL), ISIN, or partial name (e.g. Apple)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<OperationOutput, OperationError> {
        let raw = arguments
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                OperationError::InvalidArguments("missing required argument 'query'".into())
            })?;
        let query = sanitize_query(raw, MAX_SYMBOL_QUERY)?;

        let payload = self.client.lookup_symbol(&query).await?;
        let items = as_list(&payload, "items");

        if items.is_empty() {
            return Ok(OperationOutput::text(format!(
                "No results found for '{query}'."
            )));
        }

        let lines: Vec<String> = items
            .iter()
            .take(MAX_LISTED_RESULTS)
            .map(|item| {
                format!(
                    "- {} | {} | {}/{} | Source: {} | {}",
                    display_or_na(item, "symbol"),
                    display_or_na(item, "name"),
                    display_or_empty(item, "assetClass"),
                    display_or_empty(item, "assetSubClass"),
                    display_or_empty(item, "dataSource"),
                    display_or_empty(item, "currency"),
                )
            })
            .collect();

        Ok(OperationOutput::text(format!(
            "Symbol lookup results for '{query}' ({} found):\n{}",
            items.len(),
            lines.join("\n")
        )))
    }
}
