//! Case recovery: fit a retrieval model on a case base and find the cases
//! most similar to a query.

use crate::policy::MissingPolicy;
use cbrx_core::{
    Case, CaseTable, Error, NeighborIndex, Record, Result, SearchAlgorithm, Similarity,
};
use cbrx_similarity::{
    validate_attributes, AttributeDef, AttributeKind, EncodedRow, FeatureTransformer,
    VectorizerFactory, WeightedDistance,
};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Construction-time parameters of a [`Recovery`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    pub attributes: Vec<AttributeDef>,
    #[serde(default)]
    pub missing: MissingPolicy,
    /// `vp_tree` is only correct when the configured similarities form a metric
    #[serde(default)]
    pub algorithm: SearchAlgorithm,
}

impl RecoveryConfig {
    pub fn new(attributes: Vec<AttributeDef>) -> Self {
        Self {
            attributes,
            missing: MissingPolicy::default(),
            algorithm: SearchAlgorithm::default(),
        }
    }

    #[must_use]
    pub fn with_missing(mut self, missing: MissingPolicy) -> Self {
        self.missing = missing;
        self
    }

    #[must_use]
    pub fn with_algorithm(mut self, algorithm: SearchAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

/// Similarity of one attribute for a retrieved pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeScore {
    pub attribute: String,
    pub similarity: Similarity,
}

/// One retrieved case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCase {
    pub case: Case,
    /// `1 - distance`, undefined when no attribute was comparable
    pub similarity: Similarity,
    /// Per-attribute breakdown, in attribute order
    pub explain: Vec<AttributeScore>,
}

/// Learned state of a fitted [`Recovery`]
struct FittedModel {
    distance: WeightedDistance,
    index: NeighborIndex<EncodedRow>,
    /// Indexed cases, in fit order
    cases: Vec<Case>,
}

/// Retrieval model with an UNFITTED and a FITTED state
///
/// `fit` builds the new state off to the side and swaps it in, so a refit
/// never exposes half-built state to concurrent `find` calls.
pub struct Recovery {
    config: RecoveryConfig,
    weights: Option<Vec<f64>>,
    vectorizers: HashMap<String, VectorizerFactory>,
    fitted: RwLock<Option<Arc<FittedModel>>>,
}

impl Recovery {
    pub fn new(config: RecoveryConfig) -> Result<Self> {
        let weights = validate_attributes(&config.attributes)?;
        config.missing.validate_for(&config.attributes)?;
        Ok(Self {
            config,
            weights,
            vectorizers: HashMap::new(),
            fitted: RwLock::new(None),
        })
    }

    /// Use a custom vectorizer for a text attribute
    pub fn with_text_vectorizer(mut self, attribute: &str, factory: VectorizerFactory) -> Result<Self> {
        let def = self
            .config
            .attributes
            .iter()
            .find(|a| a.name == attribute)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown attribute '{}'", attribute)))?;
        if !matches!(def.similarity, AttributeKind::Text { .. }) {
            return Err(Error::InvalidConfig(format!(
                "attribute '{}' is {}, only text attributes take a vectorizer",
                attribute,
                def.similarity.type_name()
            )));
        }
        self.vectorizers.insert(attribute.to_string(), factory);
        Ok(self)
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Configuration snapshot; round-trips through [`Recovery::new`]
    pub fn describe(&self) -> RecoveryConfig {
        self.config.clone()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.read().is_some()
    }

    /// Number of indexed cases
    pub fn indexed(&self) -> Result<usize> {
        Ok(self.model()?.cases.len())
    }

    fn attribute_names(&self) -> Vec<&str> {
        self.config.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    fn model(&self) -> Result<Arc<FittedModel>> {
        self.fitted.read().clone().ok_or(Error::NotFitted)
    }

    /// Rebuild all learned state from a case base snapshot.
    ///
    /// On error the previously fitted state, if any, stays in place.
    pub fn fit(&self, table: &CaseTable) -> Result<()> {
        let names = self.attribute_names();
        let cases = self.config.missing.apply_to_table(table, &names);
        if cases.len() < table.len() {
            tracing::warn!(
                dropped = table.len() - cases.len(),
                "cases with missing attribute values left out of the index"
            );
        }

        let indexed = CaseTable::new(cases);
        let mut transformer = FeatureTransformer::new(&self.config.attributes, &self.vectorizers)?;
        let rows = transformer.fit(&indexed)?;
        let distance = WeightedDistance::new(Arc::new(transformer), self.weights.clone());
        let index = NeighborIndex::fit(rows, &distance, self.config.algorithm);

        let model = FittedModel {
            distance,
            index,
            cases: indexed.into_cases(),
        };
        tracing::info!(
            cases = table.len(),
            indexed = model.cases.len(),
            attributes = self.config.attributes.len(),
            policy = self.config.missing.name(),
            "recovery model fitted"
        );
        *self.fitted.write() = Some(Arc::new(model));
        Ok(())
    }

    /// The `k` most similar cases for each query, most similar first. Ties
    /// keep case base order.
    pub fn find(&self, queries: &[Record], k: usize) -> Result<Vec<Vec<RankedCase>>> {
        let model = self.model()?;
        let names = self.attribute_names();
        let transformer = model.distance.transformer();

        let encoded = queries
            .par_iter()
            .map(|q| transformer.transform_row(&self.config.missing.apply_to_query(q, &names)))
            .collect::<Result<Vec<EncodedRow>>>()?;

        let hits = model.index.find_batch(&model.distance, &encoded, k)?;

        Ok(encoded
            .iter()
            .zip(hits)
            .map(|(query, neighbors)| {
                neighbors
                    .into_iter()
                    .map(|n| {
                        let row = &model.index.rows()[n.position];
                        let explain = transformer
                            .names()
                            .zip(model.distance.per_attribute(query, row))
                            .map(|(attribute, similarity)| AttributeScore {
                                attribute: attribute.to_string(),
                                similarity,
                            })
                            .collect();
                        RankedCase {
                            case: model.cases[n.position].clone(),
                            similarity: Similarity::from_distance(n.distance),
                            explain,
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .inspect(|ranked| {
                let incomparable = ranked.iter().filter(|r| r.similarity.is_undefined()).count();
                if incomparable > 0 {
                    tracing::warn!(incomparable, k, "neighbours without any comparable attribute");
                }
            })
            .collect())
    }

    pub fn find_one(&self, query: &Record, k: usize) -> Result<Vec<RankedCase>> {
        let mut results = self.find(std::slice::from_ref(query), k)?;
        Ok(results.pop().unwrap_or_default())
    }
}

impl std::fmt::Debug for Recovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recovery")
            .field("config", &self.config)
            .field("fitted", &self.is_fitted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbrx_core::{record, CaseId, ErrorKind, Value};

    const EPS: f64 = 1e-9;

    fn numbers(values: &[f64]) -> CaseTable {
        CaseTable::from_records(values.iter().map(|&v| record([("x", v)])))
    }

    fn linear(max: f64) -> Recovery {
        let config = RecoveryConfig::new(vec![AttributeDef::new(
            "x",
            AttributeKind::linear(Some(max)).unwrap(),
        )]);
        Recovery::new(config).unwrap()
    }

    #[test]
    fn test_find_ties_keep_case_base_order() {
        let recovery = linear(30.0);
        recovery.fit(&numbers(&[10.0, 20.0, 30.0, 40.0])).unwrap();

        let hits = recovery.find_one(&record([("x", 25.0)]), 2).unwrap();
        let ids: Vec<CaseId> = hits.iter().map(|h| h.case.id.clone()).collect();
        assert_eq!(ids, vec![CaseId::Integer(1), CaseId::Integer(2)]);
        for hit in &hits {
            assert!((hit.similarity.value().unwrap() - 5.0 / 6.0).abs() < EPS);
            assert_eq!(hit.explain.len(), 1);
            assert_eq!(hit.explain[0].attribute, "x");
        }
    }

    #[test]
    fn test_find_before_fit() {
        let recovery = linear(30.0);
        let err = recovery.find_one(&record([("x", 1.0)]), 1).unwrap_err();
        assert!(matches!(err, Error::NotFitted));
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(!recovery.is_fitted());
    }

    #[test]
    fn test_k_bounds() {
        let recovery = linear(30.0);
        recovery.fit(&numbers(&[1.0, 2.0, 3.0])).unwrap();
        let query = [record([("x", 1.0)])];
        assert_eq!(recovery.find(&query, 3).unwrap()[0].len(), 3);
        assert!(matches!(recovery.find(&query, 4), Err(Error::InvalidK { k: 4, available: 3 })));
        assert!(matches!(recovery.find(&query, 0), Err(Error::InvalidK { .. })));
    }

    #[test]
    fn test_several_queries() {
        let recovery = linear(100.0);
        recovery.fit(&numbers(&[0.0, 50.0, 100.0])).unwrap();
        let results = recovery
            .find(&[record([("x", 90.0)]), record([("x", 10.0)])], 1)
            .unwrap();
        assert_eq!(results[0][0].case.id, CaseId::Integer(2));
        assert_eq!(results[1][0].case.id, CaseId::Integer(0));
    }

    #[test]
    fn test_refit_replaces_state() {
        let recovery = linear(30.0);
        recovery.fit(&numbers(&[10.0, 20.0])).unwrap();
        recovery.fit(&numbers(&[10.0, 20.0, 30.0])).unwrap();
        assert_eq!(recovery.indexed().unwrap(), 3);
        assert_eq!(recovery.find_one(&record([("x", 29.0)]), 1).unwrap()[0].case.id, CaseId::Integer(2));
    }

    #[test]
    fn test_concurrent_find_sees_whole_snapshots() {
        let first = numbers(&[0.0, 10.0, 20.0]);
        let second = numbers(&[5.0, 15.0, 25.0, 35.0]);
        let query = [record([("x", 12.0)]), record([("x", 30.0)])];

        let expected: Vec<Vec<Vec<RankedCase>>> = [&first, &second]
            .iter()
            .map(|table| {
                let recovery = linear(40.0);
                recovery.fit(table).unwrap();
                recovery.find(&query, 3).unwrap()
            })
            .collect();
        assert_ne!(expected[0], expected[1]);

        let recovery = linear(40.0);
        recovery.fit(&first).unwrap();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for round in 0..50 {
                    let table = if round % 2 == 0 { &second } else { &first };
                    recovery.fit(table).unwrap();
                }
            });
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        let found = recovery.find(&query, 3).unwrap();
                        assert!(found == expected[0] || found == expected[1]);
                    }
                });
            }
        });
    }

    #[test]
    fn test_failed_fit_keeps_previous_model() {
        let config = RecoveryConfig::new(vec![AttributeDef::new(
            "grade",
            AttributeKind::linear_ordinal(vec!["low".into(), "high".into()]).unwrap(),
        )]);
        let recovery = Recovery::new(config).unwrap();
        recovery
            .fit(&CaseTable::from_records(vec![record([("grade", "low")])]))
            .unwrap();
        let bad = CaseTable::from_records(vec![record([("grade", "medium")])]);
        assert!(matches!(recovery.fit(&bad), Err(Error::UnseenCategory { .. })));
        assert_eq!(recovery.indexed().unwrap(), 1);
    }

    #[test]
    fn test_linear_without_max_value_fails_at_fit() {
        let config = RecoveryConfig::new(vec![AttributeDef::new("x", AttributeKind::linear(None).unwrap())]);
        let recovery = Recovery::new(config).unwrap();
        let err = recovery.fit(&numbers(&[1.0])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_drop_policy_excludes_rows() {
        let recovery = linear(10.0);
        let table = CaseTable::from_records(vec![
            record([("x", Value::Null)]),
            record([("x", Value::from(5.0))]),
        ]);
        recovery.fit(&table).unwrap();
        assert_eq!(recovery.indexed().unwrap(), 1);

        // a query with a missing value is still answered
        let hits = recovery.find_one(&record([("x", Value::Null)]), 1).unwrap();
        assert_eq!(hits[0].case.id, CaseId::Integer(1));
        assert_eq!(hits[0].similarity, Similarity::Undefined);
    }

    #[test]
    fn test_replace_policy_keeps_rows_as_undefined() {
        let config = RecoveryConfig::new(vec![
            AttributeDef::new("x", AttributeKind::linear(Some(10.0)).unwrap()),
            AttributeDef::new("c", AttributeKind::kronecker()),
        ])
        .with_missing(MissingPolicy::replace());
        let recovery = Recovery::new(config).unwrap();
        let table = CaseTable::from_records(vec![
            record([("x", Value::from(0.0)), ("c", Value::from("red"))]),
            record([("x", Value::Null), ("c", Value::from("red"))]),
        ]);
        recovery.fit(&table).unwrap();
        assert_eq!(recovery.indexed().unwrap(), 2);

        let hits = recovery
            .find_one(&record([("x", Value::from(5.0)), ("c", Value::from("red"))]), 2)
            .unwrap();
        // case 1 only compares on c: similarity 1.0
        assert_eq!(hits[0].case.id, CaseId::Integer(1));
        assert_eq!(hits[0].similarity, Similarity::Defined(1.0));
        assert_eq!(hits[0].explain[0].similarity, Similarity::Undefined);
        assert!((hits[1].similarity.value().unwrap() - 0.75).abs() < EPS);
    }

    #[test]
    fn test_replace_fill_must_stay_undefined() {
        let numeric = RecoveryConfig::new(vec![AttributeDef::new(
            "x",
            AttributeKind::linear(Some(10.0)).unwrap(),
        )])
        .with_missing(MissingPolicy::Replace { fill: Value::from(0.0) });
        let err = Recovery::new(numeric).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let custom_sentinels = RecoveryConfig::new(vec![AttributeDef::new(
            "c",
            AttributeKind::kronecker().with_undefined(vec!["?".into()]).unwrap(),
        )])
        .with_missing(MissingPolicy::replace());
        assert!(matches!(Recovery::new(custom_sentinels), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_replaced_values_never_match_each_other() {
        let config = RecoveryConfig::new(vec![
            AttributeDef::new(
                "x",
                AttributeKind::linear(Some(10.0)).unwrap().with_undefined(vec!["?".into()]).unwrap(),
            ),
            AttributeDef::new(
                "c",
                AttributeKind::kronecker().with_undefined(vec!["?".into()]).unwrap(),
            ),
        ])
        .with_missing(MissingPolicy::Replace { fill: Value::from("?") });
        let recovery = Recovery::new(config).unwrap();
        recovery
            .fit(&CaseTable::from_records(vec![
                record([("x", Value::Null), ("c", Value::Null)]),
                record([("x", Value::from(4.0)), ("c", Value::from("red"))]),
            ]))
            .unwrap();

        let hits = recovery
            .find_one(&record([("x", Value::from(0.0)), ("c", Value::Null)]), 2)
            .unwrap();
        let missing = hits.iter().find(|h| h.case.id == CaseId::Integer(0)).unwrap();
        assert_eq!(missing.explain[0].similarity, Similarity::Undefined);
        assert_eq!(missing.explain[1].similarity, Similarity::Undefined);
        assert_eq!(missing.similarity, Similarity::Undefined);
    }

    #[test]
    fn test_unseen_category_at_query_time() {
        let config = RecoveryConfig::new(vec![AttributeDef::new("c", AttributeKind::kronecker())]);
        let recovery = Recovery::new(config).unwrap();
        recovery
            .fit(&CaseTable::from_records(vec![record([("c", "red")])]))
            .unwrap();
        let err = recovery.find_one(&record([("c", "green")]), 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_inconsistent_weights() {
        let config = RecoveryConfig::new(vec![
            AttributeDef::new("a", AttributeKind::kronecker()).weighted(1.0),
            AttributeDef::new("b", AttributeKind::kronecker()),
        ]);
        assert!(matches!(Recovery::new(config), Err(Error::InconsistentWeights)));
    }

    #[test]
    fn test_weights_change_ranking() {
        let defs = |wx: f64, wc: f64| {
            vec![
                AttributeDef::new("x", AttributeKind::linear(Some(10.0)).unwrap()).weighted(wx),
                AttributeDef::new("c", AttributeKind::kronecker()).weighted(wc),
            ]
        };
        let table = CaseTable::from_records(vec![
            record([("x", Value::from(0.0)), ("c", Value::from("blue"))]),
            record([("x", Value::from(8.0)), ("c", Value::from("red"))]),
        ]);
        let query = record([("x", Value::from(0.0)), ("c", Value::from("red"))]);

        let by_x = Recovery::new(RecoveryConfig::new(defs(0.9, 0.1))).unwrap();
        by_x.fit(&table).unwrap();
        assert_eq!(by_x.find_one(&query, 1).unwrap()[0].case.id, CaseId::Integer(0));

        let by_c = Recovery::new(RecoveryConfig::new(defs(0.1, 0.9))).unwrap();
        by_c.fit(&table).unwrap();
        assert_eq!(by_c.find_one(&query, 1).unwrap()[0].case.id, CaseId::Integer(1));
    }

    #[test]
    fn test_vptree_agrees_with_brute_force() {
        let values: Vec<f64> = (0..60).map(|i| ((i * 7) % 31) as f64).collect();
        let table = numbers(&values);
        let make = |algorithm| {
            let config = RecoveryConfig::new(vec![AttributeDef::new(
                "x",
                AttributeKind::linear(Some(40.0)).unwrap(),
            )])
            .with_algorithm(algorithm);
            let recovery = Recovery::new(config).unwrap();
            recovery.fit(&table).unwrap();
            recovery
        };
        let brute = make(SearchAlgorithm::Brute);
        let tree = make(SearchAlgorithm::VpTree);
        let queries: Vec<Record> = [0.0, 7.5, 15.0, 30.0].iter().map(|&v| record([("x", v)])).collect();
        assert_eq!(brute.find(&queries, 5).unwrap(), tree.find(&queries, 5).unwrap());
    }

    #[test]
    fn test_text_vectorizer_only_for_text_attributes() {
        let recovery = linear(1.0);
        let factory: VectorizerFactory = Arc::new(|| {
            Box::new(cbrx_similarity::TfidfVectorizer::new(&Default::default()))
                as Box<dyn cbrx_similarity::TextVectorizer>
        });
        assert!(recovery.with_text_vectorizer("x", factory).is_err());
    }

    #[test]
    fn test_describe_roundtrip() {
        let config = RecoveryConfig::new(vec![
            AttributeDef::new("x", AttributeKind::exponential(0.5).unwrap()).weighted(2.0),
            AttributeDef::new("c", AttributeKind::kronecker()).weighted(1.0),
        ])
        .with_missing(MissingPolicy::replace())
        .with_algorithm(SearchAlgorithm::VpTree);
        let recovery = Recovery::new(config.clone()).unwrap();

        let json = serde_json::to_string(&recovery.describe()).unwrap();
        let parsed: RecoveryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
        assert!(Recovery::new(parsed).is_ok());
    }
}
