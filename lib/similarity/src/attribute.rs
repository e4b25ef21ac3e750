//! Attribute similarity strategies
//!
//! Every strategy follows the same contract: `fit` learns whatever it needs
//! from the attribute's column, `transform` encodes single values, and
//! `similarity` compares two encoded values. Missing values and configured
//! sentinels encode as [`Encoded::Undefined`] and compare as
//! [`Similarity::Undefined`].

use crate::distance::{
    cosine_similarity, exact_similarity, exponential_similarity, linear_similarity,
    quantile_similarity, rank_similarity,
};
use crate::quantile::QuantileMap;
use crate::schema::{AttributeKind, TextConfig};
use crate::text::{TextVectorizer, TfidfVectorizer};
use ahash::{AHashMap, AHashSet};
use cbrx_core::{Error, Result, Similarity, SparseVector, Value, ValueKey};
use std::fmt::Debug;

/// A value after attribute-specific encoding
#[derive(Debug, Clone, PartialEq)]
pub enum Encoded {
    /// Missing value or undefined sentinel
    Undefined,
    Number(f64),
    /// Index into a fitted or declared category list
    Category(usize),
    /// Unencoded categorical value
    Raw(ValueKey),
    Terms(SparseVector),
}

/// Per-attribute fit / transform / similarity capability
pub trait AttributeSimilarity: Send + Sync + Debug {
    /// Attribute (column) name
    fn name(&self) -> &str;

    /// Learn parameters from the attribute's column. Refitting replaces
    /// everything learned before.
    fn fit(&mut self, column: &[&Value]) -> Result<()>;

    fn transform(&self, value: &Value) -> Result<Encoded>;

    fn similarity(&self, x: &Encoded, y: &Encoded) -> Similarity;

    /// Configuration record this attribute was built from
    fn kind(&self) -> AttributeKind;
}

/// Values that encode as undefined: `Null` plus the configured sentinels
#[derive(Debug, Clone, Default)]
struct Sentinels(AHashSet<ValueKey>);

impl Sentinels {
    fn new(values: &[Value]) -> Self {
        Self(values.iter().filter_map(Value::key).collect())
    }

    #[inline]
    fn matches(&self, value: &Value) -> bool {
        match value.key() {
            None => true,
            Some(key) => self.0.contains(&key),
        }
    }
}

fn type_mismatch(attribute: &str, expected: &'static str, value: &Value) -> Error {
    Error::TypeMismatch {
        attribute: attribute.to_string(),
        expected,
        actual: format!("{} {}", value.type_name(), value),
    }
}

fn unseen(attribute: &str, value: &Value) -> Error {
    Error::UnseenCategory {
        attribute: attribute.to_string(),
        value: value.to_string(),
    }
}

/// Build an unfitted attribute from its configuration
pub fn build_attribute(name: &str, kind: &AttributeKind) -> Result<Box<dyn AttributeSimilarity>> {
    kind.validate()?;
    let attribute: Box<dyn AttributeSimilarity> = match kind {
        AttributeKind::Linear { max_value, undefined } => {
            Box::new(LinearAttribute::new(name, *max_value, undefined))
        }
        AttributeKind::Exponential { base, undefined } => {
            Box::new(ExponentialAttribute::new(name, *base, undefined))
        }
        AttributeKind::QuantileLinear { n_quantiles, undefined } => {
            Box::new(QuantileLinearAttribute::new(name, *n_quantiles, undefined))
        }
        AttributeKind::Kronecker { encode, undefined } => {
            Box::new(KroneckerAttribute::new(name, *encode, undefined))
        }
        AttributeKind::LinearOrdinal { order, undefined } => {
            Box::new(LinearOrdinalAttribute::new(name, order, undefined))
        }
        AttributeKind::MatrixOrdinal { values, matrix, undefined } => {
            Box::new(MatrixOrdinalAttribute::new(name, values, matrix, undefined))
        }
        AttributeKind::Text { vectorizer, undefined } => Box::new(TextAttribute::new(
            name,
            vectorizer.clone(),
            Box::new(TfidfVectorizer::new(vectorizer)),
            undefined,
        )),
    };
    Ok(attribute)
}

/// Shared numeric encoding: sentinel -> undefined, number -> number
fn encode_number(name: &str, sentinels: &Sentinels, value: &Value) -> Result<Encoded> {
    if sentinels.matches(value) {
        return Ok(Encoded::Undefined);
    }
    value
        .as_f64()
        .map(Encoded::Number)
        .ok_or_else(|| type_mismatch(name, "number", value))
}

/// Numbers compared by `max(1 - |x - y| / max_value, 0)`
#[derive(Debug, Clone)]
pub struct LinearAttribute {
    name: String,
    max_value: Option<f64>,
    undefined: Vec<Value>,
    sentinels: Sentinels,
}

impl LinearAttribute {
    pub fn new(name: &str, max_value: Option<f64>, undefined: &[Value]) -> Self {
        Self {
            name: name.to_string(),
            max_value,
            undefined: undefined.to_vec(),
            sentinels: Sentinels::new(undefined),
        }
    }
}

impl AttributeSimilarity for LinearAttribute {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, column: &[&Value]) -> Result<()> {
        // Ranges are never inferred from data
        if self.max_value.is_none() {
            return Err(Error::MissingParameter {
                attribute: self.name.clone(),
                parameter: "max_value".to_string(),
            });
        }
        for value in column {
            encode_number(&self.name, &self.sentinels, value)?;
        }
        Ok(())
    }

    fn transform(&self, value: &Value) -> Result<Encoded> {
        encode_number(&self.name, &self.sentinels, value)
    }

    fn similarity(&self, x: &Encoded, y: &Encoded) -> Similarity {
        match (x, y, self.max_value) {
            (Encoded::Number(a), Encoded::Number(b), Some(max)) => {
                Similarity::Defined(linear_similarity(*a, *b, max))
            }
            _ => Similarity::Undefined,
        }
    }

    fn kind(&self) -> AttributeKind {
        AttributeKind::Linear {
            max_value: self.max_value,
            undefined: self.undefined.clone(),
        }
    }
}

/// Numbers compared by `base^|x - y|`
#[derive(Debug, Clone)]
pub struct ExponentialAttribute {
    name: String,
    base: f64,
    undefined: Vec<Value>,
    sentinels: Sentinels,
}

impl ExponentialAttribute {
    pub fn new(name: &str, base: f64, undefined: &[Value]) -> Self {
        Self {
            name: name.to_string(),
            base,
            undefined: undefined.to_vec(),
            sentinels: Sentinels::new(undefined),
        }
    }
}

impl AttributeSimilarity for ExponentialAttribute {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, column: &[&Value]) -> Result<()> {
        for value in column {
            encode_number(&self.name, &self.sentinels, value)?;
        }
        Ok(())
    }

    fn transform(&self, value: &Value) -> Result<Encoded> {
        encode_number(&self.name, &self.sentinels, value)
    }

    fn similarity(&self, x: &Encoded, y: &Encoded) -> Similarity {
        match (x, y) {
            (Encoded::Number(a), Encoded::Number(b)) => {
                Similarity::Defined(exponential_similarity(*a, *b, self.base))
            }
            _ => Similarity::Undefined,
        }
    }

    fn kind(&self) -> AttributeKind {
        AttributeKind::Exponential {
            base: self.base,
            undefined: self.undefined.clone(),
        }
    }
}

/// Numbers compared by the distance between their quantile ranks
#[derive(Debug, Clone)]
pub struct QuantileLinearAttribute {
    name: String,
    n_quantiles: usize,
    undefined: Vec<Value>,
    sentinels: Sentinels,
    quantiles: Option<QuantileMap>,
}

impl QuantileLinearAttribute {
    pub fn new(name: &str, n_quantiles: usize, undefined: &[Value]) -> Self {
        Self {
            name: name.to_string(),
            n_quantiles,
            undefined: undefined.to_vec(),
            sentinels: Sentinels::new(undefined),
            quantiles: None,
        }
    }
}

impl AttributeSimilarity for QuantileLinearAttribute {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, column: &[&Value]) -> Result<()> {
        let mut sample = Vec::with_capacity(column.len());
        for value in column {
            if let Encoded::Number(n) = encode_number(&self.name, &self.sentinels, value)? {
                sample.push(n);
            }
        }
        self.quantiles = Some(QuantileMap::fit(sample, self.n_quantiles, &self.name)?);
        Ok(())
    }

    fn transform(&self, value: &Value) -> Result<Encoded> {
        let quantiles = self.quantiles.as_ref().ok_or(Error::NotFitted)?;
        Ok(match encode_number(&self.name, &self.sentinels, value)? {
            Encoded::Number(n) => Encoded::Number(quantiles.rank(n)),
            other => other,
        })
    }

    fn similarity(&self, x: &Encoded, y: &Encoded) -> Similarity {
        match (x, y) {
            (Encoded::Number(a), Encoded::Number(b)) => {
                Similarity::Defined(quantile_similarity(*a, *b))
            }
            _ => Similarity::Undefined,
        }
    }

    fn kind(&self) -> AttributeKind {
        AttributeKind::QuantileLinear {
            n_quantiles: self.n_quantiles,
            undefined: self.undefined.clone(),
        }
    }
}

/// Categories compared for equality
#[derive(Debug, Clone)]
pub struct KroneckerAttribute {
    name: String,
    encode: bool,
    undefined: Vec<Value>,
    sentinels: Sentinels,
    // Fitted category universe, only used when encoding
    categories: AHashMap<ValueKey, usize>,
    fitted: bool,
}

impl KroneckerAttribute {
    pub fn new(name: &str, encode: bool, undefined: &[Value]) -> Self {
        Self {
            name: name.to_string(),
            encode,
            undefined: undefined.to_vec(),
            sentinels: Sentinels::new(undefined),
            categories: AHashMap::new(),
            fitted: false,
        }
    }

    pub fn categories(&self) -> usize {
        self.categories.len()
    }
}

impl AttributeSimilarity for KroneckerAttribute {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, column: &[&Value]) -> Result<()> {
        let mut categories = AHashMap::new();
        if self.encode {
            for key in column.iter().filter_map(|v| v.key()) {
                let next = categories.len();
                categories.entry(key).or_insert(next);
            }
        }
        self.categories = categories;
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, value: &Value) -> Result<Encoded> {
        if !self.fitted {
            return Err(Error::NotFitted);
        }
        if self.sentinels.matches(value) {
            return Ok(Encoded::Undefined);
        }
        // Null is a sentinel, so the key exists past this point
        let key = value.key().ok_or_else(|| unseen(&self.name, value))?;
        if !self.encode {
            return Ok(Encoded::Raw(key));
        }
        self.categories
            .get(&key)
            .map(|&i| Encoded::Category(i))
            .ok_or_else(|| unseen(&self.name, value))
    }

    fn similarity(&self, x: &Encoded, y: &Encoded) -> Similarity {
        match (x, y) {
            (Encoded::Category(a), Encoded::Category(b)) => Similarity::Defined(exact_similarity(a, b)),
            (Encoded::Raw(a), Encoded::Raw(b)) => Similarity::Defined(exact_similarity(a, b)),
            _ => Similarity::Undefined,
        }
    }

    fn kind(&self) -> AttributeKind {
        AttributeKind::Kronecker {
            encode: self.encode,
            undefined: self.undefined.clone(),
        }
    }
}

/// Declared categories mapped to their rank
#[derive(Debug, Clone)]
struct Ranks(AHashMap<ValueKey, usize>);

impl Ranks {
    fn new(categories: &[Value]) -> Self {
        Self(
            categories
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.key().map(|k| (k, i)))
                .collect(),
        )
    }

    fn encode(&self, name: &str, sentinels: &Sentinels, value: &Value) -> Result<Encoded> {
        if sentinels.matches(value) {
            return Ok(Encoded::Undefined);
        }
        value
            .key()
            .and_then(|k| self.0.get(&k))
            .map(|&rank| Encoded::Category(rank))
            .ok_or_else(|| unseen(name, value))
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

/// Ordered categories compared linearly by rank
#[derive(Debug, Clone)]
pub struct LinearOrdinalAttribute {
    name: String,
    order: Vec<Value>,
    undefined: Vec<Value>,
    sentinels: Sentinels,
    ranks: Ranks,
}

impl LinearOrdinalAttribute {
    pub fn new(name: &str, order: &[Value], undefined: &[Value]) -> Self {
        Self {
            name: name.to_string(),
            order: order.to_vec(),
            undefined: undefined.to_vec(),
            sentinels: Sentinels::new(undefined),
            ranks: Ranks::new(order),
        }
    }
}

impl AttributeSimilarity for LinearOrdinalAttribute {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, column: &[&Value]) -> Result<()> {
        // The universe is declared, fitting only checks the column against it
        for value in column {
            self.ranks.encode(&self.name, &self.sentinels, value)?;
        }
        Ok(())
    }

    fn transform(&self, value: &Value) -> Result<Encoded> {
        self.ranks.encode(&self.name, &self.sentinels, value)
    }

    fn similarity(&self, x: &Encoded, y: &Encoded) -> Similarity {
        match (x, y) {
            (Encoded::Category(a), Encoded::Category(b)) => {
                Similarity::Defined(rank_similarity(*a, *b, self.ranks.len()))
            }
            _ => Similarity::Undefined,
        }
    }

    fn kind(&self) -> AttributeKind {
        AttributeKind::LinearOrdinal {
            order: self.order.clone(),
            undefined: self.undefined.clone(),
        }
    }
}

/// Categories compared through a declared similarity matrix
#[derive(Debug, Clone)]
pub struct MatrixOrdinalAttribute {
    name: String,
    values: Vec<Value>,
    matrix: Vec<Vec<f64>>,
    undefined: Vec<Value>,
    sentinels: Sentinels,
    ranks: Ranks,
}

impl MatrixOrdinalAttribute {
    pub fn new(name: &str, values: &[Value], matrix: &[Vec<f64>], undefined: &[Value]) -> Self {
        Self {
            name: name.to_string(),
            values: values.to_vec(),
            matrix: matrix.to_vec(),
            undefined: undefined.to_vec(),
            sentinels: Sentinels::new(undefined),
            ranks: Ranks::new(values),
        }
    }
}

impl AttributeSimilarity for MatrixOrdinalAttribute {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, column: &[&Value]) -> Result<()> {
        for value in column {
            self.ranks.encode(&self.name, &self.sentinels, value)?;
        }
        Ok(())
    }

    fn transform(&self, value: &Value) -> Result<Encoded> {
        self.ranks.encode(&self.name, &self.sentinels, value)
    }

    fn similarity(&self, x: &Encoded, y: &Encoded) -> Similarity {
        match (x, y) {
            (Encoded::Category(a), Encoded::Category(b)) => self
                .matrix
                .get(*a)
                .and_then(|row| row.get(*b))
                .copied()
                .into(),
            _ => Similarity::Undefined,
        }
    }

    fn kind(&self) -> AttributeKind {
        AttributeKind::MatrixOrdinal {
            values: self.values.clone(),
            matrix: self.matrix.clone(),
            undefined: self.undefined.clone(),
        }
    }
}

/// Free text compared by the cosine of its term vectors
#[derive(Debug)]
pub struct TextAttribute {
    name: String,
    config: TextConfig,
    undefined: Vec<Value>,
    sentinels: Sentinels,
    vectorizer: Box<dyn TextVectorizer>,
    fitted: bool,
}

impl TextAttribute {
    /// Text attribute backed by any vectorizer. `config` is only reported back
    /// by [`AttributeSimilarity::kind`].
    pub fn new(
        name: &str,
        config: TextConfig,
        vectorizer: Box<dyn TextVectorizer>,
        undefined: &[Value],
    ) -> Self {
        Self {
            name: name.to_string(),
            config,
            undefined: undefined.to_vec(),
            sentinels: Sentinels::new(undefined),
            vectorizer,
            fitted: false,
        }
    }

    fn document<'a>(&self, value: &'a Value) -> Result<Option<&'a str>> {
        if self.sentinels.matches(value) {
            return Ok(None);
        }
        value
            .as_str()
            .map(Some)
            .ok_or_else(|| type_mismatch(&self.name, "text", value))
    }
}

impl AttributeSimilarity for TextAttribute {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, column: &[&Value]) -> Result<()> {
        let mut corpus = Vec::with_capacity(column.len());
        for value in column {
            if let Some(doc) = self.document(value)? {
                corpus.push(doc);
            }
        }
        self.vectorizer.fit(&corpus)?;
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, value: &Value) -> Result<Encoded> {
        if !self.fitted {
            return Err(Error::NotFitted);
        }
        Ok(match self.document(value)? {
            Some(doc) => Encoded::Terms(self.vectorizer.transform(doc)),
            None => Encoded::Undefined,
        })
    }

    fn similarity(&self, x: &Encoded, y: &Encoded) -> Similarity {
        match (x, y) {
            (Encoded::Terms(a), Encoded::Terms(b)) => cosine_similarity(a, b).into(),
            _ => Similarity::Undefined,
        }
    }

    fn kind(&self) -> AttributeKind {
        AttributeKind::Text {
            vectorizer: self.config.clone(),
            undefined: self.undefined.clone(),
        }
    }
}
