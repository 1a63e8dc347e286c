//! Numeric coercion from heterogeneous JSON
//!
//! Venues send the same quantity as a JSON number, a numeric string, or an
//! element of a mixed-type array. Two policies apply:
//!
//! - **lossy**: market data. Unparsable or missing values become zero so the
//!   rest of the payload stays usable.
//! - **strict**: order and account money fields. A bad value is an
//!   [`ExchangeError::Normalization`] naming the field.
//!
//! Both are available as value-level functions and as serde
//! `deserialize_with` adapters in [`de`].

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::error::{ExchangeError, ExchangeResult};

/// Parse a decimal string, including scientific notation like `5e-6`
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Decimal from a JSON number or numeric string
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => parse_decimal(s),
        Value::Number(n) => {
            let s = n.to_string();
            if s.contains('e') || s.contains('E') {
                n.as_f64().and_then(Decimal::from_f64)
            } else {
                Decimal::from_str(&s).ok()
            }
        }
        _ => None,
    }
}

pub fn lossy_decimal(value: &Value) -> Decimal {
    decimal_from_value(value).unwrap_or(Decimal::ZERO)
}

pub fn strict_decimal(value: &Value, field: &str) -> ExchangeResult<Decimal> {
    decimal_from_value(value).ok_or_else(|| {
        ExchangeError::normalization(field, format!("expected a decimal, got {}", value))
    })
}

/// Integer from a JSON number or numeric string; fractional parts are dropped
pub fn i64_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

pub fn lossy_i64(value: &Value) -> i64 {
    i64_from_value(value).unwrap_or(0)
}

pub fn strict_i64(value: &Value, field: &str) -> ExchangeResult<i64> {
    i64_from_value(value).ok_or_else(|| {
        ExchangeError::normalization(field, format!("expected an integer, got {}", value))
    })
}

/// Text form of a scalar; ids arrive as numbers on some venues and strings on others
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Column of a mixed-type array row, zero when absent or malformed
pub fn lossy_decimal_at(row: &[Value], index: usize) -> Decimal {
    row.get(index).map(lossy_decimal).unwrap_or(Decimal::ZERO)
}

pub fn lossy_i64_at(row: &[Value], index: usize) -> i64 {
    row.get(index).map(lossy_i64).unwrap_or(0)
}

/// Serde adapters for typed venue schemas
pub mod de {
    use super::*;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    impl StringOrNumber {
        fn into_value(self) -> Value {
            match self {
                Self::String(s) => Value::String(s),
                Self::Number(n) => Value::Number(n),
            }
        }
    }

    /// Market data: anything unparsable becomes zero
    pub fn lossy_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(super::lossy_decimal(&value))
    }

    /// Money fields: a string or number that must parse
    pub fn strict_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = StringOrNumber::deserialize(deserializer)?.into_value();
        decimal_from_value(&raw)
            .ok_or_else(|| D::Error::custom(format!("expected a decimal, got {}", raw)))
    }

    /// Money field that may be null, missing or an empty string
    ///
    /// Pair with `#[serde(default)]`. Anything else must parse.
    pub fn strict_opt_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            _ => decimal_from_value(&value)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("expected a decimal, got {}", value))),
        }
    }

    pub fn lossy_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(super::lossy_i64(&value))
    }

    /// Id that arrives as either a JSON string or a JSON number
    pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(_) | Value::Number(_) => Ok(value_to_string(&value)),
            Value::Null => Ok(String::new()),
            other => Err(D::Error::custom(format!("expected an id, got {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_accepts_numbers_and_strings() {
        assert_eq!(lossy_decimal(&json!("104.5")), dec!(104.5));
        assert_eq!(lossy_decimal(&json!(104.5)), dec!(104.5));
        assert_eq!(lossy_decimal(&json!(1200)), dec!(1200));
        assert_eq!(lossy_decimal(&json!(" 0.00460208 ")), dec!(0.00460208));
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(lossy_decimal(&json!("5e-6")), dec!(0.000005));
        assert!(lossy_decimal(&json!(5e-6)) > Decimal::ZERO);
    }

    #[test]
    fn test_lossy_fails_soft() {
        assert_eq!(lossy_decimal(&json!("n/a")), Decimal::ZERO);
        assert_eq!(lossy_decimal(&Value::Null), Decimal::ZERO);
        assert_eq!(lossy_decimal_at(&[json!("1")], 4), Decimal::ZERO);
    }

    #[test]
    fn test_strict_propagates() {
        let err = strict_decimal(&json!("abc"), "executedQty").unwrap_err();
        assert!(matches!(err, ExchangeError::Normalization { ref field, .. } if field == "executedQty"));
        assert_eq!(strict_decimal(&json!("0.5"), "qty").unwrap(), dec!(0.5));
    }

    #[test]
    fn test_integers() {
        assert_eq!(lossy_i64(&json!(1625097600000i64)), 1625097600000);
        assert_eq!(lossy_i64(&json!("1574.12")), 1574);
        assert!(strict_i64(&json!(null), "ts").is_err());
    }

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "de::lossy_decimal", default)]
        last: Decimal,
        #[serde(deserialize_with = "de::strict_decimal")]
        qty: Decimal,
        #[serde(deserialize_with = "de::strict_opt_decimal", default)]
        avg: Option<Decimal>,
        #[serde(deserialize_with = "de::string_or_number")]
        id: String,
    }

    #[test]
    fn test_serde_adapters() {
        let row: Row =
            serde_json::from_value(json!({"last": "bad", "qty": 2, "avg": "", "id": 42})).unwrap();
        assert_eq!(row.last, Decimal::ZERO);
        assert_eq!(row.qty, dec!(2));
        assert_eq!(row.avg, None);
        assert_eq!(row.id, "42");

        let row: Row = serde_json::from_value(json!({"qty": "1.5", "avg": "3", "id": "x"})).unwrap();
        assert_eq!(row.last, Decimal::ZERO);
        assert_eq!(row.avg, Some(dec!(3)));

        let bad = serde_json::from_value::<Row>(json!({"qty": "oops", "id": "x"}));
        assert!(bad.is_err());
    }
}
