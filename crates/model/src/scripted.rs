//! Scripted model backend for deterministic tests.
//!
//! Replays a fixed sequence of decisions, or repeats a single decision
//! forever (useful for exercising the loop's iteration ceiling).

use async_trait::async_trait;
use foliant_core::model::{Decision, ModelBackend, ModelRequest};
use foliant_core::ModelError;
use std::collections::VecDeque;
use std::sync::Mutex;

enum Script {
    Sequence(Mutex<VecDeque<Decision>>),
    Repeat(Decision),
}

/// A model backend that returns scripted decisions.
pub struct ScriptedModel {
    script: Script,
    calls: Mutex<usize>,
}

impl ScriptedModel {
    /// Replay the given decisions in order. Running past the end yields
    /// `ModelError::Exhausted`.
    pub fn new(decisions: Vec<Decision>) -> Self {
        Self {
            script: Script::Sequence(Mutex::new(decisions.into())),
            calls: Mutex::new(0),
        }
    }

    /// Return the same decision on every call.
    pub fn repeating(decision: Decision) -> Self {
        Self {
            script: Script::Repeat(decision),
            calls: Mutex::new(0),
        }
    }

    /// Convenience: a single final answer.
    pub fn answer(text: &str) -> Self {
        Self::new(vec![Decision::Answer { text: text.into() }])
    }

    /// Convenience: one action followed by a final answer.
    pub fn act_then_answer(
        operation: &str,
        arguments: serde_json::Value,
        answer: &str,
    ) -> Self {
        Self::new(vec![
            Decision::Act {
                operation: operation.into(),
                arguments,
            },
            Decision::Answer {
                text: answer.into(),
            },
        ])
    }

    /// How many times the loop consulted this backend.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ModelBackend for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn propose(&self, _request: ModelRequest) -> Result<Decision, ModelError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        match &self.script {
            Script::Sequence(queue) => queue.lock().unwrap().pop_front().ok_or_else(|| {
                ModelError::Exhausted(format!("scripted backend drained after {} calls", *calls))
            }),
            Script::Repeat(decision) => Ok(decision.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ModelRequest {
        ModelRequest {
            system_prompt: "sys".into(),
            turns: vec![],
            operations: vec![],
            temperature: 0.0,
            max_tokens: None,
        }
    }

    #[tokio::test]
    async fn sequence_replays_in_order() {
        let model = ScriptedModel::act_then_answer(
            "get_orders",
            serde_json::json!({}),
            "All done.",
        );

        match model.propose(request()).await.unwrap() {
            Decision::Act { operation, .. } => assert_eq!(operation, "get_orders"),
            other => panic!("Expected Act, got {other:?}"),
        }
        match model.propose(request()).await.unwrap() {
            Decision::Answer { text } => assert_eq!(text, "All done."),
            other => panic!("Expected Answer, got {other:?}"),
        }
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn drained_sequence_errors() {
        let model = ScriptedModel::answer("hi");
        model.propose(request()).await.unwrap();
        assert!(matches!(
            model.propose(request()).await,
            Err(ModelError::Exhausted(_))
        ));
    }

    #[tokio::test]
    async fn repeating_never_drains() {
        let model = ScriptedModel::repeating(Decision::Act {
            operation: "health_check".into(),
            arguments: serde_json::json!({}),
        });
        for _ in 0..20 {
            assert!(model.propose(request()).await.is_ok());
        }
        assert_eq!(model.call_count(), 20);
    }
}
