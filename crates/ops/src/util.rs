//! Small helpers for summarizing loosely-shaped remote payloads.

use serde_json::Value;

/// Render a field as display text, falling back to "N/A" when absent.
pub(crate) fn display_or_na(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => "N/A".into(),
    }
}

/// Render a field as display text, falling back to "" when absent.
pub(crate) fn display_or_empty(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Coerce a payload into a list: an array stays as-is, the named key is
/// unwrapped when present, a bare object becomes a one-element list.
pub(crate) fn as_list(payload: &Value, key: &str) -> Vec<Value> {
    match payload {
        Value::Array(items) => items.clone(),
        Value::Object(map) => match map.get(key) {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => {
                if map.is_empty() {
                    vec![]
                } else {
                    vec![payload.clone()]
                }
            }
        },
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_falls_back_to_na() {
        let v = json!({"symbol": "AAPL", "quantity": 10});
        assert_eq!(display_or_na(&v, "symbol"), "AAPL");
        assert_eq!(display_or_na(&v, "quantity"), "10");
        assert_eq!(display_or_na(&v, "missing"), "N/A");
    }

    #[test]
    fn as_list_unwraps_named_key() {
        let v = json!({"holdings": [{"symbol": "AAPL"}]});
        assert_eq!(as_list(&v, "holdings").len(), 1);

        let bare = json!([{"symbol": "VTI"}]);
        assert_eq!(as_list(&bare, "holdings").len(), 1);

        let empty = json!({});
        assert!(as_list(&empty, "holdings").is_empty());
    }
}
