//! Verified answer types — the final shape every response takes.

use serde::{Deserialize, Serialize};

/// Ordered confidence rating for a verified answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

/// A source citation: which operation backed the answer, and where in the
/// conversation its observation landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Operation name, e.g. "get_portfolio_holdings".
    pub operation: String,

    /// Human-readable source label, e.g. "Portfolio Holdings".
    pub label: String,

    /// Index of the backing observation in the conversation's turns.
    pub turn: usize,
}

/// Record of one executed observation, handed from the reasoning loop to
/// the verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationTrace {
    pub operation: String,
    /// Index of the observation turn in the conversation.
    pub turn: usize,
    pub success: bool,
    pub output: String,
}

/// The final response: answer text plus everything the verifier derived.
/// Constructed once per completed loop invocation; never mutated after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub confidence: Confidence,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_ordered() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
    }

    #[test]
    fn confidence_serializes_lowercase() {
        let json = serde_json::to_string(&Confidence::High).unwrap();
        assert_eq!(json, "\"high\"");
    }

    #[test]
    fn verified_answer_serialization() {
        let answer = VerifiedAnswer {
            answer: "Your portfolio holds 3 positions.".into(),
            citations: vec![Citation {
                operation: "get_portfolio_holdings".into(),
                label: "Portfolio Holdings".into(),
                turn: 2,
            }],
            confidence: Confidence::High,
            warnings: vec![],
        };
        let json = serde_json::to_string(&answer).unwrap();
        assert!(json.contains("get_portfolio_holdings"));
        assert!(json.contains("\"high\""));
    }
}
