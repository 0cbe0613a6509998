use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A typed field value, as read from or written to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Text input is parsed by the target field's kind rather than taken as-is.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Convert a document value. `null` and maps have no field representation.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null | Value::Object(_) => None,
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Int(i)),
                None => n.as_f64().map(Self::Float),
            },
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Array(items) => Some(Self::List(
                items.iter().filter_map(Self::from_json).collect(),
            )),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::Text(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// The value's textual pieces: list elements one by one, anything else as
    /// a single element.
    pub fn to_tokens(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.iter().map(ToString::to_string).collect(),
            Self::Text(s) => split_delimited(s),
            other => vec![other.to_string()],
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => {
                for (ix, item) in items.iter().enumerate() {
                    if ix > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

/// Split delimited text on runs of `,`, `;` and whitespace.
pub fn split_delimited(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_literals() {
        assert_eq!(FieldValue::Bool(true).to_string(), "True");
        assert_eq!(FieldValue::Int(-4).to_string(), "-4");
        assert_eq!(FieldValue::Float(3.0).to_string(), "3.0");
        assert_eq!(FieldValue::from(vec![1, 2, 3]).to_string(), "1 2 3");
    }

    #[test]
    fn split_on_mixed_delimiters() {
        assert_eq!(split_delimited("1, 2;3  4"), vec!["1", "2", "3", "4"]);
        assert!(split_delimited(" ;, ").is_empty());
    }

    #[test]
    fn json_conversion() {
        assert_eq!(FieldValue::from_json(&json!(3)), Some(FieldValue::Int(3)));
        assert_eq!(FieldValue::from_json(&json!(2.5)), Some(FieldValue::Float(2.5)));
        assert_eq!(FieldValue::from_json(&json!(null)), None);
        assert_eq!(
            FieldValue::from_json(&json!(["a", true])),
            Some(FieldValue::List(vec!["a".into(), true.into()]))
        );
        assert_eq!(FieldValue::from(vec!["x"]).to_json(), json!(["x"]));
    }

    #[test]
    fn untagged_deserialization_keeps_number_kinds() {
        let v: Vec<FieldValue> = serde_json::from_value(json!([1, 1.5, "s", false])).unwrap();
        assert_eq!(
            v,
            vec![
                FieldValue::Int(1),
                FieldValue::Float(1.5),
                FieldValue::Text("s".into()),
                FieldValue::Bool(false)
            ]
        );
    }
}
