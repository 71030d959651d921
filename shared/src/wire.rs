//! Lenient decoding of gateway rows.
//!
//! Rows come back from the relational store with nullable columns, numeric
//! columns that may arrive as JSON strings, and JSON columns that older
//! writers stored as text. These helpers fold all of that into the internal
//! shape so one odd row never fails a whole refetch.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

/// Number, numeric string or null → `Decimal` (unparseable → 0)
pub fn decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(decimal_from_value).unwrap_or_default())
}

pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            // Going through the textual form keeps 12.5 as exactly 12.5
            Decimal::from_str(&n.to_string())
                .ok()
                .or_else(|| n.as_f64().and_then(Decimal::from_f64))
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// String or null → `String` (null → empty)
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

/// Blank strings become `None`
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = string(deserializer)?;
    Ok(if value.trim().is_empty() {
        None
    } else {
        Some(value)
    })
}

/// Bool, "true"/"false", 0/1 or null → `bool`
pub fn boolean<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|v| v != 0),
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
        _ => false,
    })
}

/// Integer, numeric string or null → `i32` (null → 0)
pub fn int<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default() as i32,
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

/// JSON array, JSON text of an array, or null → `Vec<T>`
pub fn json_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let array = match value {
        Some(Value::String(text)) if !text.trim().is_empty() => {
            serde_json::from_str::<Value>(&text).map_err(serde::de::Error::custom)?
        }
        Some(v @ Value::Array(_)) => v,
        _ => return Ok(Vec::new()),
    };
    serde_json::from_value(array).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    #[derive(Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "decimal")]
        amount: Decimal,
        #[serde(default, deserialize_with = "string")]
        name: String,
        #[serde(default, deserialize_with = "opt_string")]
        hanger: Option<String>,
        #[serde(default, deserialize_with = "boolean")]
        flag: bool,
        #[serde(default, deserialize_with = "int")]
        position: i32,
        #[serde(default, deserialize_with = "json_list")]
        tags: Vec<String>,
    }

    #[test]
    fn test_numbers_and_strings() {
        let row: Row = serde_json::from_str(
            r#"{"amount": "12.50", "name": null, "hanger": "  ", "flag": 1, "position": "3", "tags": "[\"a\",\"b\"]"}"#,
        )
        .unwrap();
        assert_eq!(row.amount, d("12.50"));
        assert_eq!(row.name, "");
        assert_eq!(row.hanger, None);
        assert!(row.flag);
        assert_eq!(row.position, 3);
        assert_eq!(row.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_and_null_fields() {
        let row: Row = serde_json::from_str(r#"{"amount": null, "tags": null}"#).unwrap();
        assert_eq!(row.amount, Decimal::ZERO);
        assert!(!row.flag);
        assert_eq!(row.position, 0);
        assert!(row.tags.is_empty());
    }

    #[test]
    fn test_float_keeps_decimal_text() {
        let row: Row = serde_json::from_str(r#"{"amount": 8.1}"#).unwrap();
        assert_eq!(row.amount, d("8.1"));
    }
}
