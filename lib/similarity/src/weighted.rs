//! Weighted combination of per-attribute similarities into one distance

use crate::transformer::{EncodedRow, FeatureTransformer};
use cbrx_core::{Metric, Similarity};
use std::sync::Arc;

/// Weighted mean of the defined similarities.
///
/// Undefined entries drop out together with their weight. Returns `None`
/// when nothing is defined or the remaining weights sum to zero.
pub fn combine(similarities: &[Similarity], weights: Option<&[f64]>) -> Option<f64> {
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, s) in similarities.iter().enumerate() {
        if let Similarity::Defined(s) = s {
            let w = weights.map_or(1.0, |w| w[i]);
            num += w * s;
            den += w;
        }
    }
    if den > 0.0 {
        Some(num / den)
    } else {
        None
    }
}

/// Distance between encoded rows: `1 - combine(...)`
#[derive(Debug, Clone)]
pub struct WeightedDistance {
    transformer: Arc<FeatureTransformer>,
    weights: Option<Vec<f64>>,
}

impl WeightedDistance {
    pub fn new(transformer: Arc<FeatureTransformer>, weights: Option<Vec<f64>>) -> Self {
        Self { transformer, weights }
    }

    /// Per-attribute similarity of two encoded rows, in attribute order
    pub fn per_attribute(&self, x: &EncodedRow, y: &EncodedRow) -> Vec<Similarity> {
        self.transformer
            .attributes()
            .iter()
            .zip(x.iter().zip(y))
            .map(|(attribute, (a, b))| attribute.similarity(a, b))
            .collect()
    }

    pub fn similarity(&self, x: &EncodedRow, y: &EncodedRow) -> Similarity {
        combine(&self.per_attribute(x, y), self.weights.as_deref()).into()
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    pub fn transformer(&self) -> &FeatureTransformer {
        &self.transformer
    }
}

impl Metric<EncodedRow> for WeightedDistance {
    fn distance(&self, a: &EncodedRow, b: &EncodedRow) -> Option<f64> {
        combine(&self.per_attribute(a, b), self.weights.as_deref()).map(|s| 1.0 - s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeDef, AttributeKind};
    use cbrx_core::{record, CaseTable, Value};
    use std::collections::HashMap;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_unweighted_mean() {
        let sims = [Similarity::Defined(1.0), Similarity::Defined(0.5)];
        assert!((combine(&sims, None).unwrap() - 0.75).abs() < EPS);
    }

    #[test]
    fn test_weighted_mean() {
        let sims = [Similarity::Defined(1.0), Similarity::Defined(0.0)];
        assert!((combine(&sims, Some(&[3.0, 1.0][..])).unwrap() - 0.75).abs() < EPS);
    }

    #[test]
    fn test_undefined_is_excluded_not_zero() {
        let weights = [0.2, 0.5, 0.3];
        let sims = [Similarity::Defined(0.9), Similarity::Undefined, Similarity::Defined(0.4)];
        let reduced = combine(
            &[Similarity::Defined(0.9), Similarity::Defined(0.4)],
            Some(&[0.2, 0.3][..]),
        );
        assert_eq!(combine(&sims, Some(&weights[..])), reduced);
        assert!((combine(&sims, None).unwrap() - 0.65).abs() < EPS);
    }

    #[test]
    fn test_all_undefined() {
        assert_eq!(combine(&[Similarity::Undefined, Similarity::Undefined], None), None);
        assert_eq!(combine(&[], None), None);
        // zero weight on the only defined attribute
        assert_eq!(
            combine(&[Similarity::Defined(1.0), Similarity::Undefined], Some(&[0.0, 1.0][..])),
            None
        );
    }

    #[test]
    fn test_weighted_distance_metric() {
        let defs = vec![
            AttributeDef::new("x", AttributeKind::linear(Some(10.0)).unwrap()),
            AttributeDef::new("c", AttributeKind::kronecker()),
        ];
        let mut transformer = FeatureTransformer::new(&defs, &HashMap::new()).unwrap();
        let rows = transformer
            .fit(&CaseTable::from_records(vec![
                record([("x", Value::from(0.0)), ("c", Value::from("a"))]),
                record([("x", Value::from(5.0)), ("c", Value::from("n.a."))]),
                record([("x", Value::from("n.a.")), ("c", Value::from("n.a."))]),
            ]))
            .unwrap();
        let distance = WeightedDistance::new(Arc::new(transformer), None);

        assert_eq!(distance.distance(&rows[0], &rows[0]), Some(0.0));
        // only x is comparable: 1 - 0.5
        assert_eq!(distance.distance(&rows[0], &rows[1]), Some(0.5));
        assert_eq!(distance.distance(&rows[0], &rows[2]), None);
        assert_eq!(distance.similarity(&rows[0], &rows[2]), Similarity::Undefined);
        assert_eq!(
            distance.per_attribute(&rows[0], &rows[1]),
            vec![Similarity::Defined(0.5), Similarity::Undefined]
        );
    }
}
