//! # cbrx Retrieval
//!
//! Case retrieval and solution aggregation for cbrx.
//!
//! - [`Recovery`] - Retrieval model: fit on a case base snapshot, then find
//!   the k most similar cases for each query
//! - [`MissingPolicy`] - Drop or fill missing attribute values before fit
//! - [`Aggregator`] - Majority vote or column ranking over the neighbours
//! - [`Cbr`] - Case base, recovery model and aggregator wired together,
//!   refit whenever the case base changes
//!
//! ## Example
//!
//! ```rust
//! use cbrx_core::{record, CaseId, MemoryCaseBase, Value};
//! use cbrx_retrieval::{Aggregator, Cbr, Recovery, RecoveryConfig, Solution};
//! use cbrx_similarity::{AttributeDef, AttributeKind};
//!
//! let case_base = MemoryCaseBase::from_records(vec![
//!     record([("x", Value::from(10.0)), ("label", Value::from("a"))]),
//!     record([("x", Value::from(20.0)), ("label", Value::from("b"))]),
//!     record([("x", Value::from(30.0)), ("label", Value::from("b"))]),
//!     record([("x", Value::from(40.0)), ("label", Value::from("a"))]),
//! ]);
//! let recovery = Recovery::new(RecoveryConfig::new(vec![AttributeDef::new(
//!     "x",
//!     AttributeKind::linear(Some(30.0)).unwrap(),
//! )]))
//! .unwrap();
//!
//! let cbr = Cbr::new(case_base, recovery, Some(Aggregator::majority("label", true)), true).unwrap();
//!
//! let query = record([("x", 25.0)]);
//! let hits = cbr.retrieve(&query, 2).unwrap();
//! assert_eq!(hits[0].case.id, CaseId::Integer(1));
//! assert_eq!(hits[1].case.id, CaseId::Integer(2));
//!
//! let recommendation = cbr.recommend(&query, 2).unwrap();
//! assert_eq!(recommendation.solution, Solution::Value(Value::from("b")));
//! ```

pub mod aggregate;
pub mod cbr;
pub mod policy;
pub mod recovery;

pub use aggregate::{Aggregator, ColumnRankAggregate, ColumnScore, MajorityAggregate, Solution};
pub use cbr::{Cbr, Recommendation};
pub use policy::MissingPolicy;
pub use recovery::{AttributeScore, RankedCase, Recovery, RecoveryConfig};
