//! The confirmation gate — the two-step protocol in front of every
//! mutating operation.
//!
//! A mutating call is allowed only when an earlier successful preview
//! observation in the same conversation echoes the identical payload AND
//! the call carries an explicit `confirm: true`. The check is a pure
//! function of conversation state: zero side effects, re-evaluated on
//! every call, never cached.

use foliant_core::operation::OperationDescriptor;
use foliant_core::turn::{ConversationState, Turn};
use serde_json::Value;
use std::collections::HashMap;

/// Outcome of the gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Deny(GateDenial),
}

/// Why a mutating call was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDenial {
    /// No unconsumed successful preview with a matching payload exists.
    MissingPreview { preview: String },

    /// A matching preview exists but the call lacks `confirm: true`.
    NotConfirmed,
}

impl GateDenial {
    /// Guidance fed back into the conversation so the model (and user)
    /// can complete the protocol.
    pub fn guidance(&self, operation: &str) -> String {
        match self {
            GateDenial::MissingPreview { preview } => format!(
                "Refused: '{operation}' mutates the portfolio and requires a \
                 successful '{preview}' of the same payload earlier in this \
                 conversation. Call '{preview}' first, show the user the \
                 summary, and retry after they approve."
            ),
            GateDenial::NotConfirmed => format!(
                "Refused: '{operation}' requires confirm=true. Ask the user \
                 to approve the previewed changes, then retry with \
                 confirm=true and the identical payload."
            ),
        }
    }
}

/// Check a call against the two-step protocol.
///
/// Non-mutating operations pass unconditionally. For mutating operations
/// the pending previews are derived from the conversation on every call:
/// successful preview observations whose echoed payload has not been
/// consumed by a later successful call of the mutating operation.
pub fn check(
    state: &ConversationState,
    descriptor: &OperationDescriptor,
    arguments: &Value,
) -> GateDecision {
    if !descriptor.mutating {
        return GateDecision::Allow;
    }

    // The registry guarantees mutating operations declare a preview.
    let preview_name = descriptor.preview.as_deref().unwrap_or_default();
    let payload = normalized_payload(arguments);
    let pending = pending_previews(state, preview_name, &descriptor.name);

    if !pending.contains(&payload) {
        return GateDecision::Deny(GateDenial::MissingPreview {
            preview: preview_name.to_string(),
        });
    }

    match arguments.get("confirm").and_then(Value::as_bool) {
        Some(true) => GateDecision::Allow,
        _ => GateDecision::Deny(GateDenial::NotConfirmed),
    }
}

/// Extract the payload a mutating call wants to commit. A JSON-encoded
/// string is parsed so it can match the preview's echoed array.
fn normalized_payload(arguments: &Value) -> Value {
    match arguments.get("activities") {
        Some(Value::String(s)) => serde_json::from_str(s).unwrap_or(Value::Null),
        Some(other) => other.clone(),
        None => Value::Null,
    }
}

/// Derive the unconsumed preview payloads from conversation state.
fn pending_previews(
    state: &ConversationState,
    preview_name: &str,
    mutating_name: &str,
) -> Vec<Value> {
    let mut actions: HashMap<&str, &Value> = HashMap::new();
    let mut pending: Vec<Value> = Vec::new();

    for turn in &state.turns {
        match turn {
            Turn::Action {
                call_id, arguments, ..
            } => {
                actions.insert(call_id, arguments);
            }
            Turn::Observation {
                call_id,
                operation,
                success: true,
                data,
                ..
            } => {
                if operation == preview_name {
                    if let Some(payload) = data {
                        pending.push(payload.clone());
                    }
                } else if operation == mutating_name {
                    // A successful mutating call consumes its preview.
                    if let Some(arguments) = actions.get(call_id.as_str()) {
                        let payload = normalized_payload(arguments);
                        if let Some(pos) = pending.iter().position(|p| *p == payload) {
                            pending.remove(pos);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use foliant_core::turn::ConversationId;
    use serde_json::json;

    fn import_descriptor() -> OperationDescriptor {
        OperationDescriptor {
            name: "import_activities".into(),
            description: String::new(),
            parameters: json!({"type": "object"}),
            mutating: true,
            preview: Some("preview_import".into()),
        }
    }

    fn read_descriptor() -> OperationDescriptor {
        OperationDescriptor {
            name: "get_orders".into(),
            description: String::new(),
            parameters: json!({"type": "object"}),
            mutating: false,
            preview: None,
        }
    }

    fn activities() -> Value {
        json!([{
            "currency": "USD",
            "dataSource": "YAHOO",
            "date": "2024-01-15T00:00:00.000Z",
            "fee": 0,
            "quantity": 10,
            "symbol": "AAPL",
            "type": "BUY",
            "unitPrice": 185.50
        }])
    }

    fn state_with_preview(payload: &Value) -> ConversationState {
        let mut state = ConversationState::new(ConversationId::from("c1"));
        state.push(Turn::user("import this trade"));
        state.push(Turn::action(
            "call_1",
            "preview_import",
            json!({"activities": payload}),
        ));
        state.push(Turn::Observation {
            call_id: "call_1".into(),
            operation: "preview_import".into(),
            success: true,
            output: "Import preview — 1 activity validated".into(),
            data: Some(payload.clone()),
            timestamp: chrono::Utc::now(),
        });
        state
    }

    #[test]
    fn non_mutating_is_always_allowed() {
        let state = ConversationState::new(ConversationId::new());
        let decision = check(&state, &read_descriptor(), &json!({}));
        assert_eq!(decision, GateDecision::Allow);
    }

    #[test]
    fn missing_preview_is_denied() {
        let state = ConversationState::new(ConversationId::new());
        let decision = check(
            &state,
            &import_descriptor(),
            &json!({"activities": activities(), "confirm": true}),
        );
        assert_eq!(
            decision,
            GateDecision::Deny(GateDenial::MissingPreview {
                preview: "preview_import".into()
            })
        );
    }

    #[test]
    fn preview_without_confirm_is_denied() {
        let state = state_with_preview(&activities());
        let decision = check(
            &state,
            &import_descriptor(),
            &json!({"activities": activities(), "confirm": false}),
        );
        assert_eq!(decision, GateDecision::Deny(GateDenial::NotConfirmed));

        // Omitting the flag entirely is the same denial
        let decision = check(
            &state,
            &import_descriptor(),
            &json!({"activities": activities()}),
        );
        assert_eq!(decision, GateDecision::Deny(GateDenial::NotConfirmed));
    }

    #[test]
    fn matching_preview_with_confirm_is_allowed() {
        let state = state_with_preview(&activities());
        let decision = check(
            &state,
            &import_descriptor(),
            &json!({"activities": activities(), "confirm": true}),
        );
        assert_eq!(decision, GateDecision::Allow);
    }

    #[test]
    fn mismatched_payload_counts_as_missing_preview() {
        let state = state_with_preview(&activities());
        let mut other = activities();
        other[0]["quantity"] = json!(999);

        let decision = check(
            &state,
            &import_descriptor(),
            &json!({"activities": other, "confirm": true}),
        );
        assert!(matches!(
            decision,
            GateDecision::Deny(GateDenial::MissingPreview { .. })
        ));
    }

    #[test]
    fn string_encoded_activities_match_preview() {
        let state = state_with_preview(&activities());
        let decision = check(
            &state,
            &import_descriptor(),
            &json!({"activities": activities().to_string(), "confirm": true}),
        );
        assert_eq!(decision, GateDecision::Allow);
    }

    #[test]
    fn successful_import_consumes_the_preview() {
        let mut state = state_with_preview(&activities());

        // A confirmed import executed against the previewed payload
        state.push(Turn::action(
            "call_2",
            "import_activities",
            json!({"activities": activities(), "confirm": true}),
        ));
        state.push(Turn::observation(
            "call_2",
            "import_activities",
            "Successfully imported 1 activity.",
            None,
        ));

        // Replaying the same import now needs a fresh preview
        let decision = check(
            &state,
            &import_descriptor(),
            &json!({"activities": activities(), "confirm": true}),
        );
        assert!(matches!(
            decision,
            GateDecision::Deny(GateDenial::MissingPreview { .. })
        ));
    }

    #[test]
    fn failed_preview_does_not_authorize() {
        let mut state = ConversationState::new(ConversationId::new());
        state.push(Turn::action(
            "call_1",
            "preview_import",
            json!({"activities": activities()}),
        ));
        state.push(Turn::failed_observation(
            "call_1",
            "preview_import",
            "Error: activity 0 is missing required fields: unitPrice",
        ));

        let decision = check(
            &state,
            &import_descriptor(),
            &json!({"activities": activities(), "confirm": true}),
        );
        assert!(matches!(
            decision,
            GateDecision::Deny(GateDenial::MissingPreview { .. })
        ));
    }

    #[test]
    fn guidance_names_the_operation() {
        let denial = GateDenial::MissingPreview {
            preview: "preview_import".into(),
        };
        let text = denial.guidance("import_activities");
        assert!(text.contains("import_activities"));
        assert!(text.contains("preview_import"));

        let text = GateDenial::NotConfirmed.guidance("import_activities");
        assert!(text.contains("confirm=true"));
    }
}
