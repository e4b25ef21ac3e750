//! Attribute configuration records
//!
//! Declares which attributes take part in retrieval, how each one is compared
//! and, optionally, how much it weighs. These records are what a retrieval
//! model serializes when it describes itself.

use cbrx_core::{Error, Result, Value, ValueKey};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default sentinel recognised as "value present but not comparable"
pub const DEFAULT_UNDEFINED: &str = "n.a.";

/// Default number of reference quantiles for quantile attributes
pub const DEFAULT_N_QUANTILES: usize = 1000;

fn default_undefined() -> Vec<Value> {
    vec![Value::Text(DEFAULT_UNDEFINED.to_string())]
}

fn default_n_quantiles() -> usize {
    DEFAULT_N_QUANTILES
}

fn default_true() -> bool {
    true
}

/// One attribute taking part in retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Column name in the case base
    pub name: String,

    /// How values of this attribute are transformed and compared
    pub similarity: AttributeKind,

    /// Relative weight. Either every attribute has one or none does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>, similarity: AttributeKind) -> Self {
        Self {
            name: name.into(),
            similarity,
            weight: None,
        }
    }

    #[must_use]
    pub fn weighted(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// Similarity strategy of an attribute, with its construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeKind {
    /// `max(1 - |x - y| / max_value, 0)`
    Linear {
        #[serde(default)]
        max_value: Option<f64>,
        #[serde(default = "default_undefined")]
        undefined: Vec<Value>,
    },
    /// `base^|x - y|` with `base` in [0, 1]
    Exponential {
        base: f64,
        #[serde(default = "default_undefined")]
        undefined: Vec<Value>,
    },
    /// `1 - |Q(x) - Q(y)|` over the fitted empirical quantile function
    QuantileLinear {
        #[serde(default = "default_n_quantiles")]
        n_quantiles: usize,
        #[serde(default = "default_undefined")]
        undefined: Vec<Value>,
    },
    /// 1 if equal, 0 otherwise
    Kronecker {
        #[serde(default = "default_true")]
        encode: bool,
        #[serde(default = "default_undefined")]
        undefined: Vec<Value>,
    },
    /// `1 - |rank(x) - rank(y)| / (n - 1)` over an explicit order
    LinearOrdinal {
        order: Vec<Value>,
        #[serde(default = "default_undefined")]
        undefined: Vec<Value>,
    },
    /// `matrix[rank(x)][rank(y)]`
    MatrixOrdinal {
        values: Vec<Value>,
        matrix: Vec<Vec<f64>>,
        #[serde(default = "default_undefined")]
        undefined: Vec<Value>,
    },
    /// Vector-space closeness of weighted term vectors
    Text {
        #[serde(default)]
        vectorizer: TextConfig,
        #[serde(default = "default_undefined")]
        undefined: Vec<Value>,
    },
}

impl AttributeKind {
    pub fn linear(max_value: Option<f64>) -> Result<Self> {
        Self::Linear {
            max_value,
            undefined: default_undefined(),
        }
        .validated()
    }

    pub fn exponential(base: f64) -> Result<Self> {
        Self::Exponential {
            base,
            undefined: default_undefined(),
        }
        .validated()
    }

    pub fn quantile_linear() -> Self {
        Self::QuantileLinear {
            n_quantiles: DEFAULT_N_QUANTILES,
            undefined: default_undefined(),
        }
    }

    pub fn kronecker() -> Self {
        Self::Kronecker {
            encode: true,
            undefined: default_undefined(),
        }
    }

    pub fn linear_ordinal(order: Vec<Value>) -> Result<Self> {
        Self::LinearOrdinal {
            order,
            undefined: default_undefined(),
        }
        .validated()
    }

    pub fn matrix_ordinal(values: Vec<Value>, matrix: Vec<Vec<f64>>) -> Result<Self> {
        Self::MatrixOrdinal {
            values,
            matrix,
            undefined: default_undefined(),
        }
        .validated()
    }

    pub fn text(vectorizer: TextConfig) -> Self {
        Self::Text {
            vectorizer,
            undefined: default_undefined(),
        }
    }

    /// Replace the undefined sentinels, re-validating the configuration
    pub fn with_undefined(mut self, sentinels: Vec<Value>) -> Result<Self> {
        match &mut self {
            Self::Linear { undefined, .. }
            | Self::Exponential { undefined, .. }
            | Self::QuantileLinear { undefined, .. }
            | Self::Kronecker { undefined, .. }
            | Self::LinearOrdinal { undefined, .. }
            | Self::MatrixOrdinal { undefined, .. }
            | Self::Text { undefined, .. } => *undefined = sentinels,
        }
        self.validated()
    }

    pub fn undefined(&self) -> &[Value] {
        match self {
            Self::Linear { undefined, .. }
            | Self::Exponential { undefined, .. }
            | Self::QuantileLinear { undefined, .. }
            | Self::Kronecker { undefined, .. }
            | Self::LinearOrdinal { undefined, .. }
            | Self::MatrixOrdinal { undefined, .. }
            | Self::Text { undefined, .. } => undefined,
        }
    }

    /// Short name of the variant, as used in the serialized `type` tag
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Linear { .. } => "linear",
            Self::Exponential { .. } => "exponential",
            Self::QuantileLinear { .. } => "quantile_linear",
            Self::Kronecker { .. } => "kronecker",
            Self::LinearOrdinal { .. } => "linear_ordinal",
            Self::MatrixOrdinal { .. } => "matrix_ordinal",
            Self::Text { .. } => "text",
        }
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Check construction-time parameters.
    ///
    /// A missing `max_value` is accepted here and only rejected when the
    /// attribute is fitted.
    pub fn validate(&self) -> Result<()> {
        if self.undefined().iter().any(Value::is_null) {
            return Err(Error::InvalidConfig(
                "null is always undefined and cannot be listed as a sentinel".to_string(),
            ));
        }

        match self {
            Self::Linear { max_value, .. } => {
                if let Some(max) = max_value {
                    if !max.is_finite() || *max <= 0.0 {
                        return Err(Error::InvalidConfig(format!(
                            "linear max_value must be positive and finite, got {}",
                            max
                        )));
                    }
                }
            }
            Self::Exponential { base, .. } => {
                if !(0.0..=1.0).contains(base) {
                    return Err(Error::InvalidConfig(format!(
                        "exponential base must lie in [0, 1], got {}",
                        base
                    )));
                }
            }
            Self::QuantileLinear { n_quantiles, .. } => {
                if *n_quantiles == 0 {
                    return Err(Error::InvalidConfig(
                        "n_quantiles must be at least 1".to_string(),
                    ));
                }
            }
            Self::Kronecker { .. } | Self::Text { .. } => {}
            Self::LinearOrdinal { order, undefined } => {
                validate_categories(order, undefined)?;
            }
            Self::MatrixOrdinal { values, matrix, undefined } => {
                validate_categories(values, undefined)?;
                let n = values.len();
                if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
                    return Err(Error::InvalidConfig(format!(
                        "similarity matrix must be {}x{} to match the declared values",
                        n, n
                    )));
                }
                if matrix.iter().flatten().any(|s| !(0.0..=1.0).contains(s)) {
                    return Err(Error::InvalidConfig(
                        "similarity matrix entries must lie in [0, 1]".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn validate_categories(categories: &[Value], undefined: &[Value]) -> Result<()> {
    if categories.is_empty() {
        return Err(Error::InvalidConfig(
            "ordinal attributes need at least one category".to_string(),
        ));
    }

    let mut seen: HashSet<ValueKey> = HashSet::with_capacity(categories.len());
    for value in categories {
        let key = value.key().ok_or_else(|| {
            Error::InvalidConfig("null cannot be an ordinal category".to_string())
        })?;
        if !seen.insert(key) {
            return Err(Error::InvalidConfig(format!("duplicate category {}", value)));
        }
    }

    for sentinel in undefined {
        if sentinel.key().is_some_and(|k| seen.contains(&k)) {
            return Err(Error::InvalidConfig(format!(
                "{} is both a category and an undefined sentinel",
                sentinel
            )));
        }
    }
    Ok(())
}

/// Validate an attribute list and extract its weights.
///
/// Returns `None` when no attribute carries a weight.
pub fn validate_attributes(attributes: &[AttributeDef]) -> Result<Option<Vec<f64>>> {
    if attributes.is_empty() {
        return Err(Error::InvalidConfig("at least one attribute is required".to_string()));
    }

    let mut names = HashSet::with_capacity(attributes.len());
    for attribute in attributes {
        if !names.insert(attribute.name.as_str()) {
            return Err(Error::InvalidConfig(format!(
                "attribute '{}' is declared twice",
                attribute.name
            )));
        }
        attribute.similarity.validate().map_err(|e| match e {
            Error::InvalidConfig(msg) => {
                Error::InvalidConfig(format!("attribute '{}': {}", attribute.name, msg))
            }
            other => other,
        })?;
    }

    let weighted = attributes.iter().filter(|a| a.weight.is_some()).count();
    if weighted == 0 {
        return Ok(None);
    }
    if weighted != attributes.len() {
        return Err(Error::InconsistentWeights);
    }

    let weights: Vec<f64> = attributes.iter().filter_map(|a| a.weight).collect();
    for (attribute, w) in attributes.iter().zip(&weights) {
        if !w.is_finite() || *w < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "attribute '{}' has invalid weight {}",
                attribute.name, w
            )));
        }
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(Error::InvalidConfig("total weight cannot be zero".to_string()));
    }
    Ok(Some(weights))
}

/// Configuration of the default TF-IDF text vectorizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextConfig {
    #[serde(default)]
    pub tokenizer: TokenizerConfig,

    /// Use `ln((1 + n) / (1 + df)) + 1` instead of `ln(n / df) + 1`
    #[serde(default = "default_true")]
    pub smooth_idf: bool,

    /// Use `1 + ln(tf)` instead of raw term counts
    #[serde(default)]
    pub sublinear_tf: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerConfig::default(),
            smooth_idf: true,
            sublinear_tf: false,
        }
    }
}

fn default_min_token_length() -> usize {
    2
}

/// How documents are broken into terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenizerConfig {
    /// Lowercase, then split on whitespace
    #[default]
    Whitespace,
    /// Lowercase, split on whitespace and punctuation, then filter
    Word {
        #[serde(default = "default_min_token_length")]
        min_token_length: usize,
        #[serde(default = "default_true")]
        ignore_numbers: bool,
        #[serde(default)]
        stopwords: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_base_range() {
        assert!(AttributeKind::exponential(0.5).is_ok());
        assert!(AttributeKind::exponential(0.0).is_ok());
        assert!(matches!(AttributeKind::exponential(1.5), Err(Error::InvalidConfig(_))));
        assert!(matches!(AttributeKind::exponential(-0.1), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_linear_max_value() {
        assert!(AttributeKind::linear(None).is_ok());
        assert!(AttributeKind::linear(Some(100.0)).is_ok());
        assert!(AttributeKind::linear(Some(0.0)).is_err());
    }

    #[test]
    fn test_matrix_shape() {
        let values: Vec<Value> = vec!["A".into(), "B".into()];
        assert!(AttributeKind::matrix_ordinal(values.clone(), vec![vec![1.0, 0.5], vec![0.2, 1.0]]).is_ok());
        assert!(AttributeKind::matrix_ordinal(values.clone(), vec![vec![1.0, 0.5]]).is_err());
        assert!(AttributeKind::matrix_ordinal(values, vec![vec![1.0, 1.5], vec![0.2, 1.0]]).is_err());
    }

    #[test]
    fn test_ordinal_rejects_sentinel_overlap() {
        let order: Vec<Value> = vec!["low".into(), "n.a.".into()];
        assert!(AttributeKind::linear_ordinal(order).is_err());
        let dup: Vec<Value> = vec!["low".into(), "low".into()];
        assert!(AttributeKind::linear_ordinal(dup).is_err());
    }

    #[test]
    fn test_weights_all_or_none() {
        let kind = AttributeKind::kronecker();
        let none = vec![AttributeDef::new("a", kind.clone()), AttributeDef::new("b", kind.clone())];
        assert_eq!(validate_attributes(&none).unwrap(), None);

        let all = vec![
            AttributeDef::new("a", kind.clone()).weighted(2.0),
            AttributeDef::new("b", kind.clone()).weighted(1.0),
        ];
        assert_eq!(validate_attributes(&all).unwrap(), Some(vec![2.0, 1.0]));

        let mixed = vec![
            AttributeDef::new("a", kind.clone()).weighted(2.0),
            AttributeDef::new("b", kind),
        ];
        assert!(matches!(validate_attributes(&mixed), Err(Error::InconsistentWeights)));
    }

    #[test]
    fn test_duplicate_attribute_names() {
        let kind = AttributeKind::kronecker();
        let defs = vec![AttributeDef::new("a", kind.clone()), AttributeDef::new("a", kind)];
        assert!(matches!(validate_attributes(&defs), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_serde_roundtrip() {
        let defs = vec![
            AttributeDef::new("price", AttributeKind::linear(Some(100.0)).unwrap()).weighted(0.5),
            AttributeDef::new(
                "grade",
                AttributeKind::matrix_ordinal(
                    vec!["A".into(), "B".into()],
                    vec![vec![1.0, 0.3], vec![0.6, 1.0]],
                )
                .unwrap(),
            )
            .weighted(0.5),
        ];
        let json = serde_json::to_string(&defs).unwrap();
        let parsed: Vec<AttributeDef> = serde_json::from_str(&json).unwrap();
        assert_eq!(defs, parsed);
    }

    #[test]
    fn test_defaults_from_json() {
        let def: AttributeDef =
            serde_json::from_str(r#"{"name": "color", "similarity": {"type": "kronecker"}}"#).unwrap();
        assert_eq!(def.similarity, AttributeKind::kronecker());
        assert_eq!(def.weight, None);

        let text: AttributeKind = serde_json::from_str(
            r#"{"type": "text", "vectorizer": {"tokenizer": {"kind": "word"}}}"#,
        )
        .unwrap();
        match text {
            AttributeKind::Text { vectorizer, .. } => {
                assert!(vectorizer.smooth_idf);
                assert_eq!(
                    vectorizer.tokenizer,
                    TokenizerConfig::Word {
                        min_token_length: 2,
                        ignore_numbers: true,
                        stopwords: vec![],
                    }
                );
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }
}
