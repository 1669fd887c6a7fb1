//! Decoders for the server's loosely-typed field values.
//!
//! Unset fields come back as `false` rather than `null`, and relational
//! (many2one) fields come back as `[id, "display name"]`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::Value;

/// Timestamp layout used by the server for datetime fields.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether a raw value counts as "set".
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// `false`, `null` and `""` become `None`.
pub(crate) fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Ok(Some(s)),
        Value::String(_) | Value::Null | Value::Bool(false) => Ok(None),
        other => Err(D::Error::custom(format!("expected a string, got {other}"))),
    }
}

/// Like [`optional_string`], but collapses to an empty string.
pub(crate) fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    optional_string(deserializer).map(Option::unwrap_or_default)
}

/// Extracts the id of a many2one value (`[id, name]`), or a bare id.
pub(crate) fn many2one<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .first()
            .and_then(Value::as_i64)
            .map(Some)
            .ok_or_else(|| D::Error::custom("many2one value without an id")),
        Value::Number(n) => Ok(n.as_i64()),
        Value::Null | Value::Bool(false) => Ok(None),
        other => Err(D::Error::custom(format!(
            "expected a many2one value, got {other}"
        ))),
    }
}

pub(crate) fn optional_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_string(deserializer)?
        .map(|s| NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT).map_err(D::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "optional_string")]
        text: Option<String>,
        #[serde(default, deserialize_with = "many2one")]
        relation: Option<i64>,
        #[serde(default, deserialize_with = "optional_datetime")]
        when: Option<NaiveDateTime>,
    }

    #[test_case(json!(false) => None; "false")]
    #[test_case(json!(null) => None; "null")]
    #[test_case(json!("") => None; "empty")]
    #[test_case(json!("saas-17.4") => Some("saas-17.4".to_string()); "value")]
    fn optional_string_treats_false_as_unset(value: Value) -> Option<String> {
        serde_json::from_value::<Probe>(json!({ "text": value }))
            .unwrap()
            .text
    }

    #[test_case(json!([42, "Acme"]) => Some(42); "pair")]
    #[test_case(json!(7) => Some(7); "bare id")]
    #[test_case(json!(false) => None; "unset")]
    fn many2one_extracts_the_id(value: Value) -> Option<i64> {
        serde_json::from_value::<Probe>(json!({ "relation": value }))
            .unwrap()
            .relation
    }

    #[test]
    fn missing_fields_use_defaults() {
        let probe: Probe = serde_json::from_value(json!({})).unwrap();
        assert!(probe.text.is_none());
        assert!(probe.relation.is_none());
        assert!(probe.when.is_none());
    }

    #[test]
    fn datetimes_use_server_layout() {
        let probe: Probe =
            serde_json::from_value(json!({ "when": "2024-03-01 12:30:00" })).unwrap();
        assert_eq!(
            probe.when.unwrap().format("%d-%m-%Y").to_string(),
            "01-03-2024"
        );

        let bad = serde_json::from_value::<Probe>(json!({ "when": "01/03/2024" }));
        assert!(bad.is_err());
    }

    #[test]
    fn truthiness_follows_server_conventions() {
        assert!(is_truthy(&json!([1, "x"])));
        assert!(is_truthy(&json!("17.0")));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(null)));
    }
}
