//! Core types for Drawsy

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Variables the user assigned earlier, keyed by name
pub type VariableMapping = serde_json::Map<String, Value>;

/// One solved expression, solved variable, or assignment read from the sketch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnswerRecord {
    /// The expression, variable name, or drawing explanation
    #[serde(rename = "expr", deserialize_with = "scalar_as_string")]
    pub expression: String,
    /// The computed answer or detected concept
    #[serde(deserialize_with = "scalar_as_string")]
    pub result: String,
    /// True when the record assigns a value to a variable
    #[serde(rename = "assign", default, deserialize_with = "null_as_false")]
    pub is_assignment: bool,
}

impl AnswerRecord {
    pub fn new(expression: impl Into<String>, result: impl Into<String>, is_assignment: bool) -> Self {
        Self {
            expression: expression.into(),
            result: result.into(),
            is_assignment,
        }
    }

    /// Sentinel returned when the model reply cannot be parsed
    pub fn parse_error() -> Self {
        Self::new("Error parsing response", "Error", false)
    }
}

/// Accepts strings, numbers, and booleans; the model often writes `"result": 2`
fn scalar_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or scalar, found {other}"
        ))),
    }
}

/// `"assign": null` reads the same as a missing key
fn null_as_false<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let record = AnswerRecord::new("x", "4", true);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"expr": "x", "result": "4", "assign": true}));
    }

    #[test]
    fn test_assign_defaults_to_false() {
        let record: AnswerRecord =
            serde_json::from_str(r#"{"expr": "2 + 2", "result": "4"}"#).unwrap();
        assert!(!record.is_assignment);
    }

    #[test]
    fn test_null_assign_is_false() {
        let record: AnswerRecord =
            serde_json::from_str(r#"{"expr": "2 + 2", "result": "4", "assign": null}"#).unwrap();
        assert!(!record.is_assignment);
    }

    #[test]
    fn test_numeric_result_becomes_text() {
        let record: AnswerRecord =
            serde_json::from_str(r#"{"expr": "y", "result": 2.5, "assign": true}"#).unwrap();
        assert_eq!(record.result, "2.5");
    }

    #[test]
    fn test_nested_result_rejected() {
        let parsed = serde_json::from_str::<AnswerRecord>(r#"{"expr": "x", "result": [1, 2]}"#);
        assert!(parsed.is_err());
    }
}
