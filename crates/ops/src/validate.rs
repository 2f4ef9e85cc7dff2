//! Input validation and sanitization for operation arguments.
//!
//! Ensures model-supplied strings are safe before reaching the remote
//! service: no control characters, bounded lengths, valid enums.

use foliant_core::OperationError;
use serde_json::Value;

pub const MAX_SYMBOL_QUERY: usize = 30;
pub const MAX_ACTIVITIES_JSON: usize = 10_000;

/// Accepted time ranges for performance and details queries.
pub const VALID_RANGES: [&str; 11] = [
    "1d", "wtd", "1w", "mtd", "1m", "3m", "ytd", "1y", "3y", "5y", "max",
];

/// Activity types the remote service understands.
pub const ACTIVITY_TYPES: [&str; 6] = [
    "BUY", "SELL", "DIVIDEND", "INTEREST", "FEE", "LIABILITY",
];

/// Fields every activity object must carry.
pub const ACTIVITY_REQUIRED_FIELDS: [&str; 8] = [
    "currency", "dataSource", "date", "fee", "quantity", "symbol", "type", "unitPrice",
];

/// Validate a portfolio time-range parameter.
pub fn validate_range(raw: &str) -> Result<String, OperationError> {
    let cleaned = raw.trim().to_lowercase();
    if !VALID_RANGES.contains(&cleaned.as_str()) {
        return Err(OperationError::InvalidArguments(format!(
            "Invalid range '{raw}'. Valid options: {}",
            VALID_RANGES.join(", ")
        )));
    }
    Ok(cleaned)
}

/// Strip control characters, trim, and cap the length of a free-text query.
pub fn sanitize_query(raw: &str, max_length: usize) -> Result<String, OperationError> {
    let cleaned: String = raw.trim().chars().filter(|c| !c.is_control()).collect();
    if cleaned.is_empty() {
        return Err(OperationError::InvalidArguments(
            "query cannot be empty".into(),
        ));
    }
    Ok(cleaned.chars().take(max_length).collect())
}

/// Validate and normalize an activities payload.
///
/// Accepts an array, a single object, or a JSON string encoding either.
/// Returns the normalized list of activity objects.
pub fn validate_activities(raw: &Value) -> Result<Vec<Value>, OperationError> {
    let parsed: Value = match raw {
        Value::String(s) => {
            if s.len() > MAX_ACTIVITIES_JSON {
                return Err(OperationError::InvalidArguments(format!(
                    "activities payload is too large ({} chars, max {MAX_ACTIVITIES_JSON})",
                    s.len()
                )));
            }
            serde_json::from_str(s).map_err(|e| {
                OperationError::InvalidArguments(format!("activities is not valid JSON: {e}"))
            })?
        }
        other => {
            let serialized = other.to_string();
            if serialized.len() > MAX_ACTIVITIES_JSON {
                return Err(OperationError::InvalidArguments(format!(
                    "activities payload is too large ({} chars, max {MAX_ACTIVITIES_JSON})",
                    serialized.len()
                )));
            }
            other.clone()
        }
    };

    let activities = match parsed {
        Value::Array(items) => items,
        Value::Object(_) => vec![parsed],
        _ => {
            return Err(OperationError::InvalidArguments(
                "activities must be an object or an array of objects".into(),
            ));
        }
    };

    if activities.is_empty() {
        return Err(OperationError::InvalidArguments(
            "activities must not be empty".into(),
        ));
    }

    for (i, activity) in activities.iter().enumerate() {
        let obj = activity.as_object().ok_or_else(|| {
            OperationError::InvalidArguments(format!("activity {i} is not an object"))
        })?;

        let missing: Vec<&str> = ACTIVITY_REQUIRED_FIELDS
            .iter()
            .filter(|f| !obj.contains_key(**f))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(OperationError::InvalidArguments(format!(
                "activity {i} is missing required fields: {}",
                missing.join(", ")
            )));
        }

        let activity_type = obj.get("type").and_then(Value::as_str).unwrap_or("");
        if !ACTIVITY_TYPES.contains(&activity_type) {
            return Err(OperationError::InvalidArguments(format!(
                "activity {i} has invalid type '{activity_type}'. Valid types: {}",
                ACTIVITY_TYPES.join(", ")
            )));
        }

        for field in ["fee", "quantity", "unitPrice"] {
            if !obj.get(field).map(Value::is_number).unwrap_or(false) {
                return Err(OperationError::InvalidArguments(format!(
                    "activity {i} field '{field}' must be a number"
                )));
            }
        }
    }

    Ok(activities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn activity() -> Value {
        json!({
            "currency": "USD",
            "dataSource": "YAHOO",
            "date": "2024-01-15T00:00:00.000Z",
            "fee": 0,
            "quantity": 10,
            "symbol": "AAPL",
            "type": "BUY",
            "unitPrice": 185.50
        })
    }

    #[test]
    fn valid_ranges_pass() {
        for range in VALID_RANGES {
            assert_eq!(validate_range(range).unwrap(), range);
        }
        assert_eq!(validate_range(" YTD ").unwrap(), "ytd");
    }

    #[test]
    fn invalid_range_rejected() {
        let err = validate_range("2w").unwrap_err();
        assert!(err.to_string().contains("Invalid range"));
    }

    #[test]
    fn sanitize_strips_control_chars_and_truncates() {
        let cleaned = sanitize_query("  AA\x00PL\x1f  ", 30).unwrap();
        assert_eq!(cleaned, "AAPL");

        let long = "a".repeat(100);
        assert_eq!(sanitize_query(&long, 30).unwrap().len(), 30);
    }

    #[test]
    fn empty_query_rejected() {
        assert!(sanitize_query("  \x07 ", 30).is_err());
    }

    #[test]
    fn single_object_is_wrapped() {
        let normalized = validate_activities(&activity()).unwrap();
        assert_eq!(normalized.len(), 1);
    }

    #[test]
    fn json_string_payload_is_parsed() {
        let raw = Value::String(json!([activity()]).to_string());
        let normalized = validate_activities(&raw).unwrap();
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0]["symbol"], "AAPL");
    }

    #[test]
    fn missing_fields_are_reported() {
        let mut broken = activity();
        broken.as_object_mut().unwrap().remove("unitPrice");
        let err = validate_activities(&json!([broken])).unwrap_err();
        assert!(err.to_string().contains("unitPrice"));
    }

    #[test]
    fn invalid_type_rejected() {
        let mut broken = activity();
        broken["type"] = json!("SHORT");
        let err = validate_activities(&json!([broken])).unwrap_err();
        assert!(err.to_string().contains("SHORT"));
    }

    #[test]
    fn non_numeric_quantity_rejected() {
        let mut broken = activity();
        broken["quantity"] = json!("ten");
        assert!(validate_activities(&json!([broken])).is_err());
    }

    #[test]
    fn empty_array_rejected() {
        assert!(validate_activities(&json!([])).is_err());
    }

    #[test]
    fn oversized_payload_rejected() {
        let raw = Value::String("x".repeat(MAX_ACTIVITIES_JSON + 1));
        let err = validate_activities(&raw).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }
}
