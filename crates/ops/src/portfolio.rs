//! Portfolio analysis operations — holdings, performance, details.

use crate::util::{as_list, display_or_empty, display_or_na};
use crate::validate::validate_range;
use async_trait::async_trait;
use foliant_client::RemoteApi;
use foliant_core::{Operation, OperationError, OperationOutput};
use serde_json::Value;
use std::sync::Arc;

const DETAILS_MAX_CHARS: usize = 8_000;

fn range_argument(arguments: &Value) -> Result<String, OperationError> {
    match arguments.get("range").and_then(Value::as_str) {
        Some(raw) => validate_range(raw),
        None => Ok("max".into()),
    }
}

/// Current positions with market values and allocation.
pub struct HoldingsOp {
    client: Arc<dyn RemoteApi>,
}

impl HoldingsOp {
    pub fn new(client: Arc<dyn RemoteApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Operation for HoldingsOp {
    fn name(&self) -> &str {
        "get_portfolio_holdings"
    }

    fn description(&self) -> &str {
        "Retrieve current portfolio holdings with market values: symbol, \
         name, asset class, quantity, market value, currency, and allocation \
         percentage. Use this when the user asks what they own or wants a \
         breakdown of their positions."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: Value) -> Result<OperationOutput, OperationError> {
        let payload = self.client.portfolio_holdings().await?;
        let holdings = as_list(&payload, "holdings");

        if holdings.is_empty() {
            return Ok(OperationOutput::text("No holdings found in the portfolio."));
        }

        let mut lines = Vec::with_capacity(holdings.len());
        for h in &holdings {
            let symbol = display_or_empty(h, "symbol");
            let name = match h.get("name").and_then(Value::as_str) {
                Some(n) => n.to_string(),
                None => symbol.clone(),
            };
            let currency = display_or_empty(h, "currency");
            let value = ["valueInBaseCurrency", "marketValue", "value"]
                .iter()
                .find_map(|k| h.get(*k))
                .map(|v| match v {
                    Value::Number(n) => n.to_string(),
                    Value::String(s) => s.clone(),
                    _ => "N/A".into(),
                })
                .unwrap_or_else(|| "N/A".into());
            let performance = h
                .get("netPerformancePercent")
                .and_then(Value::as_f64)
                .map(|p| format!(" | Performance: {:.2}%", p * 100.0))
                .unwrap_or_default();

            lines.push(format!(
                "- {name} ({symbol}): Price: {currency} {} | Qty: {} | Value: {currency} {value} | Allocation: {}% | Class: {}/{}{performance}",
                display_or_na(h, "marketPrice"),
                display_or_na(h, "quantity"),
                display_or_na(h, "allocationInPercentage"),
                display_or_empty(h, "assetClass"),
                display_or_empty(h, "assetSubClass"),
            ));
        }

        Ok(OperationOutput::text(format!(
            "Portfolio Holdings ({} positions):\n{}",
            lines.len(),
            lines.join("\n")
        )))
    }
}

/// Return metrics over a time range.
pub struct PerformanceOp {
    client: Arc<dyn RemoteApi>,
}

impl PerformanceOp {
    pub fn new(client: Arc<dyn RemoteApi>) -> Self {
        Self { client }
    }
}

fn percent_or_na(payload: &Value, key: &str) -> String {
    match payload.get(key) {
        Some(Value::Number(n)) => n
            .as_f64()
            .map(|p| format!("{:.2}%", p * 100.0))
            .unwrap_or_else(|| "N/A".into()),
        _ => "N/A".into(),
    }
}

#[async_trait]
impl Operation for PerformanceOp {
    fn name(&self) -> &str {
        "get_portfolio_performance"
    }

    fn description(&self) -> &str {
        "Get portfolio performance metrics for a time range: current value, \
         total invested, net and gross performance. Use this when the user \
         asks how their portfolio performed, or about gains and losses."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "range": {
                    "type": "string",
                    "description": "Time range for the calculation",
                    "enum": crate::validate::VALID_RANGES
                }
            }
        })
    }

    async fn execute(&self, arguments: Value) -> Result<OperationOutput, OperationError> {
        let range = range_argument(&arguments)?;
        let payload = self.client.portfolio_performance(&range).await?;

        let output = format!(
            "Portfolio Performance (range: {range}):\n\
             - Current Value: {}\n\
             - Total Invested: {}\n\
             - Net Performance: {} ({})\n\
             - Gross Performance: {} ({})",
            display_or_na(&payload, "currentValue"),
            display_or_na(&payload, "totalInvestment"),
            display_or_na(&payload, "netPerformance"),
            percent_or_na(&payload, "netPerformancePercentage"),
            display_or_na(&payload, "grossPerformance"),
            percent_or_na(&payload, "grossPerformancePercentage"),
        );

        Ok(OperationOutput::text(output))
    }
}

/// Full allocation breakdown by asset class, sector, region, and account.
pub struct DetailsOp {
    client: Arc<dyn RemoteApi>,
}

impl DetailsOp {
    pub fn new(client: Arc<dyn RemoteApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Operation for DetailsOp {
    fn name(&self) -> &str {
        "get_portfolio_details"
    }

    fn description(&self) -> &str {
        "Get the detailed portfolio breakdown: allocation by asset class, \
         sector, and region, plus the account split. Use this for \
         diversification, exposure, or concentration questions."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "range": {
                    "type": "string",
                    "description": "Time range",
                    "enum": crate::validate::VALID_RANGES
                }
            }
        })
    }

    async fn execute(&self, arguments: Value) -> Result<OperationOutput, OperationError> {
        let range = range_argument(&arguments)?;
        let payload = self.client.portfolio_details(&range).await?;

        let mut raw = serde_json::to_string_pretty(&payload)
            .unwrap_or_else(|_| payload.to_string());
        if raw.len() > DETAILS_MAX_CHARS {
            let mut cut = DETAILS_MAX_CHARS;
            while !raw.is_char_boundary(cut) {
                cut -= 1;
            }
            raw.truncate(cut);
            raw.push_str("\n\n... (truncated)");
        }

        Ok(OperationOutput::text(format!(
            "Portfolio Details (range: {range}):\n{raw}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubRemote;
    use serde_json::json;

    #[tokio::test]
    async fn holdings_are_summarized() {
        let remote = Arc::new(StubRemote::new().with_response(
            "portfolio_holdings",
            json!({
                "holdings": [{
                    "symbol": "AAPL",
                    "name": "Apple Inc.",
                    "quantity": 10,
                    "marketPrice": 185.5,
                    "valueInBaseCurrency": 1855,
                    "currency": "USD",
                    "allocationInPercentage": 30,
                    "assetClass": "EQUITY",
                    "assetSubClass": "STOCK",
                    "netPerformancePercent": 0.12
                }]
            }),
        ));

        let out = HoldingsOp::new(remote).execute(json!({})).await.unwrap();
        assert!(out.output.starts_with("Portfolio Holdings (1 positions):"));
        assert!(out.output.contains("Apple Inc. (AAPL)"));
        assert!(out.output.contains("Allocation: 30%"));
        assert!(out.output.contains("Performance: 12.00%"));
    }

    #[tokio::test]
    async fn empty_holdings_report_no_data() {
        let remote = Arc::new(
            StubRemote::new().with_response("portfolio_holdings", json!({"holdings": []})),
        );
        let out = HoldingsOp::new(remote).execute(json!({})).await.unwrap();
        assert_eq!(out.output, "No holdings found in the portfolio.");
    }

    #[tokio::test]
    async fn performance_formats_percentages() {
        let remote = Arc::new(StubRemote::new().with_response(
            "portfolio_performance",
            json!({
                "currentValue": 50000,
                "totalInvestment": 45000,
                "netPerformance": 5000,
                "netPerformancePercentage": 0.1111,
                "grossPerformance": 5500,
                "grossPerformancePercentage": 0.1222
            }),
        ));

        let out = PerformanceOp::new(remote.clone())
            .execute(json!({"range": "ytd"}))
            .await
            .unwrap();
        assert!(out.output.contains("range: ytd"));
        assert!(out.output.contains("Net Performance: 5000 (11.11%)"));
        assert!(out.output.contains("Gross Performance: 5500 (12.22%)"));
    }

    #[tokio::test]
    async fn performance_rejects_bad_range() {
        let remote = Arc::new(StubRemote::new());
        let err = PerformanceOp::new(remote.clone())
            .execute(json!({"range": "decade"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid range"));
        // Validation failures never reach the wire
        assert_eq!(remote.count("portfolio_performance"), 0);
    }

    #[tokio::test]
    async fn details_truncate_large_payloads() {
        let big: Vec<Value> = (0..1000)
            .map(|i| json!({"sector": format!("sector-{i}"), "weight": i}))
            .collect();
        let remote = Arc::new(
            StubRemote::new().with_response("portfolio_details", json!({"sectors": big})),
        );

        let out = DetailsOp::new(remote).execute(json!({})).await.unwrap();
        assert!(out.output.contains("(truncated)"));
        assert!(out.output.len() < DETAILS_MAX_CHARS + 200);
    }
}
