use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use crate::value::Value;

/// Attribute name to value mapping for one row
pub type Record = HashMap<String, Value>;

/// A case of the case base: a record with a stable identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub values: Record,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaseId {
    Integer(u64),
    Uuid(Uuid),
    String(String),
}

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseId::String(s) => write!(f, "{}", s),
            CaseId::Uuid(u) => write!(f, "{}", u),
            CaseId::Integer(i) => write!(f, "{}", i),
        }
    }
}

impl From<String> for CaseId {
    fn from(s: String) -> Self {
        CaseId::String(s)
    }
}

impl From<&str> for CaseId {
    fn from(s: &str) -> Self {
        CaseId::String(s.to_string())
    }
}

impl From<u64> for CaseId {
    fn from(i: u64) -> Self {
        CaseId::Integer(i)
    }
}

impl From<Uuid> for CaseId {
    fn from(u: Uuid) -> Self {
        CaseId::Uuid(u)
    }
}

impl Case {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<CaseId>, values: Record) -> Self {
        Self { id: id.into(), values }
    }

    /// Value of an attribute; absent attributes read as `Null`
    #[inline]
    pub fn get(&self, attribute: &str) -> &Value {
        self.values.get(attribute).unwrap_or(&Value::Null)
    }

    #[inline]
    #[must_use]
    pub fn with_value(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(attribute.into(), value.into());
        self
    }
}

/// Build a [`Record`] from `(name, value)` pairs
pub fn record<K, V, I>(pairs: I) -> Record
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_attribute_reads_null() {
        let case = Case::new(1u64, record([("a", 1.0)]));
        assert_eq!(case.get("a"), &Value::Number(1.0));
        assert_eq!(case.get("b"), &Value::Null);
    }

    #[test]
    fn test_case_id_serialization() {
        assert_eq!(serde_json::to_string(&CaseId::Integer(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&CaseId::from("c-1")).unwrap(), "\"c-1\"");
        let parsed: CaseId = serde_json::from_str("\"c-1\"").unwrap();
        assert_eq!(parsed, CaseId::from("c-1"));
    }
}
