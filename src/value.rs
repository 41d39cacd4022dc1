//! Scalar values carried by filters, parameters and result rows.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;

/// Values that can be bound to a statement or returned in a row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
}

impl Value {
    /// Transform a value into the form the storage engine binds.
    ///
    /// Timestamps and dates become ISO-8601 text, booleans become 1/0.
    /// Everything else passes through unchanged.
    pub fn to_param(&self) -> Value {
        match self {
            Value::Boolean(b) => Value::Integer(i64::from(*b)),
            Value::Timestamp(ts) => Value::Text(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
            other => other.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view of the value, accepting integral reals and numeric text
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(r) if r.fract() == 0.0 => Some(*r as i64),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON scalar. Arrays and objects are not scalars and yield None.
    pub fn from_json(json: &serde_json::Value) -> Option<Value> {
        match json {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Integer)
                .or_else(|| n.as_f64().map(Value::Real)),
            serde_json::Value::String(s) => Some(Value::Text(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_param_transform() {
        assert_eq!(Value::Boolean(true).to_param(), Value::Integer(1));
        assert_eq!(Value::Boolean(false).to_param(), Value::Integer(0));

        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 0).unwrap();
        assert_eq!(
            Value::Timestamp(ts).to_param(),
            Value::Text("2024-03-05T12:30:00.000Z".to_string())
        );

        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(
            Value::Date(date).to_param(),
            Value::Text("2024-03-05".to_string())
        );

        // Scalars pass through
        assert_eq!(Value::Integer(7).to_param(), Value::Integer(7));
        assert_eq!(Value::from("x").to_param(), Value::from("x"));
        assert_eq!(Value::Null.to_param(), Value::Null);
    }

    #[test]
    fn test_serialize_untagged() -> serde_json::Result<()> {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let values = vec![
            Value::Null,
            Value::Boolean(true),
            Value::Integer(3),
            Value::from("a"),
            Value::Date(date),
        ];
        assert_eq!(
            serde_json::to_string(&values)?,
            r#"[null,true,3,"a","2024-03-05"]"#
        );
        Ok(())
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Value::from_json(&serde_json::json!(null)), Some(Value::Null));
        assert_eq!(
            Value::from_json(&serde_json::json!(3)),
            Some(Value::Integer(3))
        );
        assert_eq!(
            Value::from_json(&serde_json::json!(1.5)),
            Some(Value::Real(1.5))
        );
        assert_eq!(
            Value::from_json(&serde_json::json!("a")),
            Some(Value::from("a"))
        );
        assert_eq!(Value::from_json(&serde_json::json!([1, 2])), None);
    }

    #[test]
    fn test_as_i64() {
        assert_eq!(Value::Integer(4).as_i64(), Some(4));
        assert_eq!(Value::Real(4.0).as_i64(), Some(4));
        assert_eq!(Value::Real(4.5).as_i64(), None);
        assert_eq!(Value::from("12").as_i64(), Some(12));
        assert_eq!(Value::Null.as_i64(), None);
    }
}
