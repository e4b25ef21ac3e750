//! # cbrx Similarity
//!
//! Attribute-level similarity for case-based retrieval.
//!
//! Each attribute of a case is compared by its own strategy, and the
//! per-attribute scores are combined into one distance that the
//! neighbour index searches under.
//!
//! ## Features
//!
//! - **Attribute configuration**: Serializable [`AttributeDef`] / [`AttributeKind`] records, validated on construction
//! - **Attribute strategies**: Linear, exponential, quantile, Kronecker, ordinal (linear or matrix) and text similarity
//! - **Feature transformation**: Column-wise fit and row-wise encoding with [`FeatureTransformer`]
//! - **Weighted distance**: Undefined comparisons drop out of the weighted mean instead of counting as 0
//!
//! ## Example
//!
//! ```rust
//! use cbrx_core::{record, CaseTable, Metric, Value};
//! use cbrx_similarity::{AttributeDef, AttributeKind, FeatureTransformer, WeightedDistance};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! let attributes = vec![
//!     AttributeDef::new("price", AttributeKind::linear(Some(100.0)).unwrap()),
//!     AttributeDef::new("color", AttributeKind::kronecker()),
//! ];
//!
//! let table = CaseTable::from_records(vec![
//!     record([("price", Value::from(50.0)), ("color", Value::from("red"))]),
//!     record([("price", Value::from(0.0)), ("color", Value::from("n.a."))]),
//! ]);
//!
//! let mut transformer = FeatureTransformer::new(&attributes, &HashMap::new()).unwrap();
//! let rows = transformer.fit(&table).unwrap();
//!
//! // color is not comparable, so only price counts: 1 - 0.5
//! let distance = WeightedDistance::new(Arc::new(transformer), None);
//! assert_eq!(distance.distance(&rows[0], &rows[1]), Some(0.5));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │ AttributeDef│────>│  Attribute   │────>│   Encoded   │
//! │  (config)   │     │ (fit/transf.)│     │    rows     │
//! └─────────────┘     └──────────────┘     └─────────────┘
//!                            │                    │
//!                     ┌──────────────┐            │
//!                     │   Weighted   │<───────────┘
//!                     │   Distance   │
//!                     └──────────────┘
//! ```

pub mod attribute;
pub mod distance;
pub mod quantile;
pub mod schema;
pub mod text;
pub mod transformer;
pub mod weighted;

pub use attribute::{
    build_attribute, AttributeSimilarity, Encoded, ExponentialAttribute, KroneckerAttribute,
    LinearAttribute, LinearOrdinalAttribute, MatrixOrdinalAttribute, QuantileLinearAttribute,
    TextAttribute,
};
pub use quantile::QuantileMap;
pub use schema::{
    validate_attributes, AttributeDef, AttributeKind, TextConfig, TokenizerConfig,
    DEFAULT_N_QUANTILES, DEFAULT_UNDEFINED,
};
pub use text::{TextVectorizer, TfidfVectorizer, Tokenizer, VectorizerFactory};
pub use transformer::{EncodedRow, FeatureTransformer};
pub use weighted::{combine, WeightedDistance};
