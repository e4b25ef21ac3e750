//! # cbrx
//!
//! Case-based reasoning retrieval in Rust.
//!
//! cbrx finds the cases of a case base most similar to a query, comparing
//! each attribute with its own similarity strategy, and proposes a solution
//! from the retrieved neighbours.
//!
//! ## Quick Start
//!
//! ### From the command line
//!
//! ```bash
//! cargo install cbrx
//! cbrx --config app.json --cases cases.json --query query.json -k 5 --recommend
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use cbrx::prelude::*;
//!
//! let config = RecoveryConfig::new(vec![
//!     AttributeDef::new("price", AttributeKind::linear(Some(100.0)).unwrap()),
//!     AttributeDef::new("color", AttributeKind::kronecker()),
//! ]);
//! let recovery = Recovery::new(config).unwrap();
//!
//! let case_base = MemoryCaseBase::from_records(vec![
//!     record([("price", Value::from(20.0)), ("color", Value::from("red"))]),
//!     record([("price", Value::from(80.0)), ("color", Value::from("blue"))]),
//! ]);
//! let cbr = Cbr::new(case_base, recovery, None, true).unwrap();
//!
//! let hits = cbr.retrieve(&record([("price", Value::from(25.0)), ("color", Value::from("red"))]), 1).unwrap();
//! assert_eq!(hits[0].case.id, CaseId::Integer(0));
//! ```
//!
//! ## Crate Structure
//!
//! - [`cbrx-core`](https://docs.rs/cbrx-core) - Case model, case base provider, k-NN index
//! - [`cbrx-similarity`](https://docs.rs/cbrx-similarity) - Attribute similarity and weighted distance
//! - [`cbrx-retrieval`](https://docs.rs/cbrx-retrieval) - Recovery model, aggregation, CBR application
//!
//! ## Features
//!
//! - **Attribute similarity**: Linear, exponential, quantile, Kronecker, ordinal and TF-IDF text
//! - **Undefined-aware distance**: Incomparable attributes drop out of the weighted mean
//! - **Exact search**: Brute force by default, vantage-point tree for metric configurations
//! - **Aggregation**: Majority vote and column ranking, optionally similarity-weighted

pub mod config;

// Re-export core types
pub use cbrx_core::{
    record, Case, CaseBase, CaseId, CaseTable, Error, ErrorKind, MemoryCaseBase, Record, Result,
    SearchAlgorithm, Similarity, Value,
};

// Re-export similarity configuration
pub use cbrx_similarity::{AttributeDef, AttributeKind, TextConfig, TokenizerConfig};

// Re-export retrieval
pub use cbrx_retrieval::{
    Aggregator, Cbr, MissingPolicy, RankedCase, Recommendation, Recovery, RecoveryConfig, Solution,
};

pub use config::AppConfig;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        record, Aggregator, AppConfig, AttributeDef, AttributeKind, Case, CaseBase, CaseId,
        CaseTable, Cbr, Error, ErrorKind, MemoryCaseBase, MissingPolicy, RankedCase,
        Recommendation, Record, Recovery, RecoveryConfig, Result, SearchAlgorithm, Similarity,
        Solution, TextConfig, TokenizerConfig, Value,
    };
}
