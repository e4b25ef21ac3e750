//! Solution aggregation from retrieved cases

use crate::recovery::RankedCase;
use ahash::{AHashMap, AHashSet};
use cbrx_core::{Error, Result, Value, ValueKey};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_true_values() -> Vec<Value> {
    vec![Value::Bool(true)]
}

/// Procedure that proposes a solution from a set of neighbours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Aggregator {
    Majority(MajorityAggregate),
    ColumnRank(ColumnRankAggregate),
}

impl Aggregator {
    pub fn majority(attribute: impl Into<String>, weighted: bool) -> Self {
        Self::Majority(MajorityAggregate {
            attribute: attribute.into(),
            weighted,
        })
    }

    pub fn column_rank(attributes: Vec<String>, true_values: Vec<Value>, weighted: bool) -> Self {
        Self::ColumnRank(ColumnRankAggregate {
            attributes,
            true_values,
            weighted,
        })
    }

    pub fn aggregate(&self, neighbours: &[RankedCase]) -> Result<Solution> {
        match self {
            Self::Majority(m) => m.aggregate(neighbours).map(Solution::Value),
            Self::ColumnRank(c) => c.aggregate(neighbours).map(Solution::Ranking),
        }
    }
}

/// Aggregated solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Solution {
    Value(Value),
    Ranking(Vec<ColumnScore>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScore {
    pub attribute: String,
    pub score: f64,
}

/// Most common value of a target attribute, optionally weighted by similarity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MajorityAggregate {
    pub attribute: String,
    #[serde(default = "default_true")]
    pub weighted: bool,
}

impl MajorityAggregate {
    /// Ties go to the value met first in neighbour rank order. Missing
    /// targets do not vote, and in weighted mode neither do neighbours
    /// without a defined similarity.
    pub fn aggregate(&self, neighbours: &[RankedCase]) -> Result<Value> {
        // (value, accumulated weight) in first-encountered order
        let mut groups: Vec<(&Value, f64)> = Vec::new();
        let mut slots: AHashMap<ValueKey, usize> = AHashMap::new();

        for neighbour in neighbours {
            let value = neighbour.case.get(&self.attribute);
            let Some(key) = value.key() else { continue };
            let weight = if self.weighted {
                match neighbour.similarity.value() {
                    Some(s) => s,
                    None => continue,
                }
            } else {
                1.0
            };
            let next = groups.len();
            let slot = *slots.entry(key).or_insert(next);
            if slot == next {
                groups.push((value, 0.0));
            }
            groups[slot].1 += weight;
        }

        let mut best: Option<(&Value, f64)> = None;
        for &(value, weight) in &groups {
            if best.map_or(true, |(_, w)| weight > w) {
                best = Some((value, weight));
            }
        }
        best.map(|(value, _)| value.clone()).ok_or_else(|| {
            Error::EmptyAggregation(format!("no neighbour has a value for '{}'", self.attribute))
        })
    }
}

/// Ranks columns by the share of neighbours holding a "true" value in them.
///
/// Booleans match the numbers 1 and 0, so `true_values: [true]` also counts
/// a column holding `1` or `1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRankAggregate {
    pub attributes: Vec<String>,
    #[serde(default = "default_true_values")]
    pub true_values: Vec<Value>,
    #[serde(default = "default_true")]
    pub weighted: bool,
}

impl ColumnRankAggregate {
    /// Columns sorted by descending score; equal scores keep column order
    pub fn aggregate(&self, neighbours: &[RankedCase]) -> Result<Vec<ColumnScore>> {
        if neighbours.is_empty() {
            return Err(Error::EmptyAggregation("no neighbours to rank columns over".to_string()));
        }

        let weights: Vec<f64> = if self.weighted {
            neighbours
                .iter()
                .map(|n| n.similarity.value().unwrap_or(0.0))
                .collect()
        } else {
            vec![1.0; neighbours.len()]
        };
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(Error::EmptyAggregation(
                "neighbour similarities sum to zero".to_string(),
            ));
        }

        let truthy: AHashSet<ValueKey> = self.true_values.iter().filter_map(truth_key).collect();
        let mut ranking: Vec<ColumnScore> = self
            .attributes
            .iter()
            .map(|attribute| {
                let hits: f64 = neighbours
                    .iter()
                    .zip(&weights)
                    .filter(|(n, _)| truth_key(n.case.get(attribute)).is_some_and(|k| truthy.contains(&k)))
                    .map(|(_, w)| w)
                    .sum();
                ColumnScore {
                    attribute: attribute.clone(),
                    score: hits / total,
                }
            })
            .collect();
        ranking.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(ranking)
    }
}

fn truth_key(value: &Value) -> Option<ValueKey> {
    match value {
        Value::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }).key(),
        other => other.key(),
    }
}
