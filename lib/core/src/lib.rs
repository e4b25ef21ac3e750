//! # cbrx Core
//!
//! Core library for the cbrx case-based reasoning engine.
//!
//! This crate provides the fundamental data structures and algorithms:
//!
//! - [`Value`] / [`Similarity`] - Heterogeneous attribute values and the
//!   defined-or-undefined outcome of comparing two of them
//! - [`Case`] / [`CaseTable`] - Cases keyed by a stable [`CaseId`]
//! - [`CaseBase`] - Provider of case base snapshots, with [`MemoryCaseBase`]
//! - [`NeighborIndex`] - Exact k-nearest-neighbour search over a pluggable [`Metric`]
//! - [`SparseVector`] - Term vectors for text attributes
//!
//! ## Example
//!
//! ```rust
//! use cbrx_core::{NeighborIndex, SearchAlgorithm};
//!
//! let distance = |a: &f64, b: &f64| Some((a - b).abs() / 30.0);
//! let index = NeighborIndex::fit(vec![10.0, 20.0, 30.0, 40.0], &distance, SearchAlgorithm::Brute);
//!
//! let hits = index.find(&distance, &25.0, 2).unwrap();
//! assert_eq!(hits[0].position, 1);
//! assert_eq!(hits[1].position, 2);
//! ```

pub mod case;
pub mod casebase;
pub mod error;
pub mod index;
pub mod value;
pub mod vector;
mod vptree;

pub use case::{record, Case, CaseId, Record};
pub use casebase::{CaseBase, CaseTable, MemoryCaseBase};
pub use error::{Error, ErrorKind, Result};
pub use index::{Metric, Neighbor, NeighborIndex, SearchAlgorithm};
pub use value::{Similarity, Value, ValueKey};
pub use vector::SparseVector;
