use serde::{Deserialize, Serialize};
use std::fmt;

/// A single attribute value of a case
///
/// Cases are heterogeneous: a column may hold numbers, categories (as text or
/// booleans) or free text. `Null` marks a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Name of the variant, used in type mismatch errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
        }
    }

    /// Hashable key for category lookups. `None` for missing values.
    pub fn key(&self) -> Option<ValueKey> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(ValueKey::Bool(*b)),
            // -0.0 and 0.0 must land on the same category
            Value::Number(n) => Some(ValueKey::Number(if *n == 0.0 { 0 } else { n.to_bits() })),
            Value::Text(s) => Some(ValueKey::Text(s.clone())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Hashable, totally comparable image of a non-missing [`Value`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Bool(bool),
    Number(u64),
    Text(String),
}

/// Outcome of comparing two attribute values
///
/// `Undefined` means the values are not comparable for that attribute. It is
/// excluded from any average instead of counting as zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Similarity {
    Defined(f64),
    Undefined,
}

impl Similarity {
    #[inline]
    pub fn value(self) -> Option<f64> {
        match self {
            Similarity::Defined(s) => Some(s),
            Similarity::Undefined => None,
        }
    }

    #[inline]
    pub fn is_undefined(self) -> bool {
        matches!(self, Similarity::Undefined)
    }

    /// Similarity that corresponds to a (possibly undefined) distance
    #[inline]
    pub fn from_distance(distance: Option<f64>) -> Self {
        match distance {
            Some(d) if d.is_finite() => Similarity::Defined(1.0 - d),
            _ => Similarity::Undefined,
        }
    }
}

impl From<Option<f64>> for Similarity {
    fn from(v: Option<f64>) -> Self {
        v.map(Similarity::Defined).unwrap_or(Similarity::Undefined)
    }
}
