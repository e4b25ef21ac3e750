//! Missing-value handling applied before fit and query

use cbrx_core::{Case, CaseTable, Error, Record, Result, Value};
use cbrx_similarity::{AttributeDef, DEFAULT_UNDEFINED};
use serde::{Deserialize, Serialize};

fn default_fill() -> Value {
    Value::Text(DEFAULT_UNDEFINED.to_string())
}

/// What to do with missing values in the configured attribute columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Leave rows with any missing attribute out of the index
    #[default]
    Drop,
    /// Substitute `fill` for every missing attribute value
    Replace {
        #[serde(default = "default_fill")]
        fill: Value,
    },
}

impl MissingPolicy {
    /// Policy from its name, case-insensitively. `fill` is only used by
    /// `replace`.
    pub fn parse(strategy: &str, fill: Value) -> Result<Self> {
        let policy = match strategy.to_ascii_lowercase().as_str() {
            "drop" => Self::Drop,
            "replace" => Self::Replace { fill },
            other => {
                return Err(Error::InvalidConfig(format!(
                    "invalid missing-value strategy '{}', expected 'drop' or 'replace'",
                    other
                )))
            }
        };
        policy.validate()?;
        Ok(policy)
    }

    /// `replace` with the default `"n.a."` fill
    pub fn replace() -> Self {
        Self::Replace { fill: default_fill() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Replace { .. } => "replace",
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Self::Replace { fill: Value::Null } = self {
            return Err(Error::InvalidConfig("replace fill value cannot be null".to_string()));
        }
        Ok(())
    }

    /// A replaced value must still compare as undefined, so the fill has to
    /// be one of the undefined sentinels of every attribute.
    pub fn validate_for(&self, attributes: &[AttributeDef]) -> Result<()> {
        self.validate()?;
        let Self::Replace { fill } = self else {
            return Ok(());
        };
        let key = fill.key();
        for def in attributes {
            if !def.similarity.undefined().iter().any(|u| u.key() == key) {
                return Err(Error::InvalidConfig(format!(
                    "replace fill {} is not an undefined value of attribute '{}'",
                    fill, def.name
                )));
            }
        }
        Ok(())
    }

    /// Cases of `table` that go into the index, in table order
    pub fn apply_to_table(&self, table: &CaseTable, attributes: &[&str]) -> Vec<Case> {
        match self {
            Self::Drop => table
                .iter()
                .filter(|case| attributes.iter().all(|a| !case.get(a).is_null()))
                .cloned()
                .collect(),
            Self::Replace { fill } => table
                .iter()
                .map(|case| Case::new(case.id.clone(), fill_missing(&case.values, attributes, fill)))
                .collect(),
        }
    }

    /// Query rows are never dropped: under `drop` missing values stay
    /// missing and compare as undefined.
    pub fn apply_to_query(&self, query: &Record, attributes: &[&str]) -> Record {
        match self {
            Self::Drop => query.clone(),
            Self::Replace { fill } => fill_missing(query, attributes, fill),
        }
    }
}

fn fill_missing(values: &Record, attributes: &[&str], fill: &Value) -> Record {
    let mut filled = values.clone();
    for attribute in attributes {
        let slot = filled.entry(attribute.to_string()).or_default();
        if slot.is_null() {
            *slot = fill.clone();
        }
    }
    filled
}
