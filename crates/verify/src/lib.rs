//! Answer verification and formatting.
//!
//! Every answer the loop produces passes through here before it reaches a
//! front end. Three families of checks:
//! 1. Numeric consistency — allocation sums, negative-value sanity
//! 2. Prohibited advisory language — flagged and disclaimed, never blocked
//! 3. Traceability — answers presenting data must be backed by executed
//!    operations; citations and a confidence rating are derived
//!
//! `verify` is a pure function: same answer + traces in, same
//! `VerifiedAnswer` out. Warnings degrade confidence, they never discard
//! model output.

use foliant_core::answer::{Citation, Confidence, OperationTrace, VerifiedAnswer};
use regex_lite::Regex;
use tracing::{debug, info};

/// Default disclaimer appended when advisory phrasing slips through.
pub const DISCLAIMER: &str = "\n\n*Disclaimer: This is informational only and not \
investment advice. Consult a licensed financial advisor before making \
investment decisions.*";

/// Phrase patterns that constitute financial advice (case-insensitive).
const PROHIBITED_PATTERNS: [&str; 9] = [
    r"(?i)\bi recommend (buying|selling|investing|holding)\b",
    r"(?i)\byou should (buy|sell|invest in|hold|dump|short)\b",
    r"(?i)\bmy advice is\b",
    r"(?i)\bi advise you to\b",
    r"(?i)\byou must (buy|sell|invest)\b",
    r"(?i)\bguaranteed returns?\b",
    r"(?i)\brisk[- ]free (investment|return)\b",
    r"(?i)\bcan'?t lose\b",
    r"(?i)\bsure thing\b",
];

/// Markers indicating an operation returned no usable data.
const EMPTY_DATA_MARKERS: [&str; 10] = [
    "no holdings found",
    "no transactions found",
    "no data available",
    "no accounts found",
    "empty portfolio",
    "could not retrieve",
    "error fetching",
    "unable to fetch",
    "error:",
    "n/a",
];

/// Operations that never carry user data and are excluded from citations.
const UNCITED_OPERATIONS: [&str; 1] = ["health_check"];

/// Tunable knobs. The exact tolerance and phrase lists are configuration,
/// not contract.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Allowed deviation, in percentage points, of an allocation breakdown
    /// from 100%.
    pub allocation_tolerance: f64,

    /// Advisory phrasing patterns (regex, case-insensitive).
    pub prohibited_patterns: Vec<String>,

    /// Empty/error markers scanned in operation outputs.
    pub empty_data_markers: Vec<String>,

    /// Disclaimer appended when advisory phrasing is found.
    pub disclaimer: String,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            allocation_tolerance: 5.0,
            prohibited_patterns: PROHIBITED_PATTERNS.iter().map(|p| p.to_string()).collect(),
            empty_data_markers: EMPTY_DATA_MARKERS.iter().map(|m| m.to_string()).collect(),
            disclaimer: DISCLAIMER.to_string(),
        }
    }
}

/// The verifier. Compiles its patterns once; `verify` is then pure.
pub struct Verifier {
    config: VerifierConfig,
    prohibited: Vec<Regex>,
    percent: Regex,
    dollar: Regex,
    negative_value: Regex,
    negative_shares: Regex,
}

impl Verifier {
    pub fn new(config: VerifierConfig) -> Self {
        let prohibited = config
            .prohibited_patterns
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();

        Self {
            config,
            prohibited,
            percent: Regex::new(r"(\d+\.?\d*)\s*%").expect("percent pattern"),
            dollar: Regex::new(r"\$[\d,]+\.?\d*").expect("dollar pattern"),
            negative_value: Regex::new(r"(?i)(value|worth|balance)[^\n]*-\$[\d,]+")
                .expect("negative value pattern"),
            negative_shares: Regex::new(r"(?i)-\d+\.?\d*\s*shares?")
                .expect("negative shares pattern"),
        }
    }

    /// Run all checks and derive the final `VerifiedAnswer`.
    pub fn verify(&self, answer: &str, traces: &[OperationTrace]) -> VerifiedAnswer {
        let mut text = answer.to_string();
        let mut warnings: Vec<String> = Vec::new();

        // 1. Prohibited advisory language — warn and disclaim, never block.
        let violations: Vec<&Regex> =
            self.prohibited.iter().filter(|p| p.is_match(&text)).collect();
        if !violations.is_empty() {
            warnings.push(format!(
                "Advisory phrasing detected ({} pattern{})",
                violations.len(),
                if violations.len() == 1 { "" } else { "s" }
            ));
            if !text.to_lowercase().contains("not investment advice") {
                text.push_str(&self.config.disclaimer);
            }
        }

        // 2. Numeric consistency.
        if let Some(warning) = self.check_allocation_sum(answer) {
            warnings.push(warning);
        }
        if self.negative_value.is_match(answer) {
            warnings.push("Negative portfolio value detected".into());
        }
        if self.negative_shares.is_match(answer) {
            warnings.push("Negative share quantity detected".into());
        }

        // 3. Traceability: citations from executed observations.
        let citations = self.build_citations(traces);
        let claims_data = self.claims_data(answer);

        if claims_data && self.has_empty_data(traces) {
            warnings.push(
                "Answer presents data but one or more operations returned empty or error results"
                    .into(),
            );
        }

        let confidence = if citations.is_empty() {
            if claims_data {
                warnings.push(
                    "Answer presents figures but no data operation was executed".into(),
                );
                Confidence::Low
            } else {
                Confidence::Medium
            }
        } else {
            match warnings.len() {
                0 => Confidence::High,
                1 => Confidence::Medium,
                _ => Confidence::Low,
            }
        };

        if warnings.is_empty() {
            debug!("All verification checks passed");
        } else {
            info!(count = warnings.len(), "Verification produced warnings");
        }

        VerifiedAnswer {
            answer: text,
            citations,
            confidence,
            warnings,
        }
    }

    /// Percentages that look like an allocation breakdown must sum to
    /// ~100%. Fewer than three values, or a sum far outside the plausible
    /// band, means the answer isn't a breakdown and the check is skipped.
    fn check_allocation_sum(&self, answer: &str) -> Option<String> {
        let values: Vec<f64> = self
            .percent
            .captures_iter(answer)
            .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
            .filter(|v| *v > 0.0 && *v <= 100.0)
            .collect();

        if values.len() < 3 {
            return None;
        }

        let total: f64 = values.iter().sum();
        let tolerance = self.config.allocation_tolerance;

        if (100.0 - tolerance..=100.0 + tolerance).contains(&total) {
            return None;
        }
        if (50.0..=200.0).contains(&total) {
            return Some(format!(
                "Allocation percentages sum to {total:.1}% (expected ~100%)"
            ));
        }
        None
    }

    /// Does the answer present concrete financial data?
    fn claims_data(&self, answer: &str) -> bool {
        let has_dollar = self.dollar.is_match(answer);
        let has_percent = self.percent.is_match(answer);
        let has_list = answer.matches("\n- ").count() >= 2;
        has_dollar || (has_percent && has_list)
    }

    /// Did any cited operation come back empty or failed?
    fn has_empty_data(&self, traces: &[OperationTrace]) -> bool {
        traces.iter().any(|t| {
            let lower = t.output.to_lowercase();
            !t.success
                || self
                    .config
                    .empty_data_markers
                    .iter()
                    .any(|marker| lower.contains(marker))
        })
    }

    /// Deduplicated citations for every successful data-bearing
    /// observation, in execution order.
    fn build_citations(&self, traces: &[OperationTrace]) -> Vec<Citation> {
        let mut seen: Vec<&str> = Vec::new();
        let mut citations = Vec::new();

        for trace in traces {
            if !trace.success || UNCITED_OPERATIONS.contains(&trace.operation.as_str()) {
                continue;
            }
            if seen.contains(&trace.operation.as_str()) {
                continue;
            }
            seen.push(&trace.operation);
            citations.push(Citation {
                operation: trace.operation.clone(),
                label: source_label(&trace.operation).to_string(),
                turn: trace.turn,
            });
        }

        citations
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(VerifierConfig::default())
    }
}

/// Human-readable source label for an operation.
pub fn source_label(operation: &str) -> &str {
    match operation {
        "get_portfolio_holdings" => "Portfolio Holdings",
        "get_portfolio_performance" => "Performance Metrics",
        "get_portfolio_details" => "Portfolio Details",
        "get_orders" => "Transaction History",
        "get_accounts" => "Account Data",
        "lookup_symbol" => "Market Data Lookup",
        "get_user_settings" => "User Settings",
        "preview_import" => "Import Preview (Validation)",
        "import_activities" => "Activity Import",
        "health_check" => "Health Check",
        other => other,
    }
}
