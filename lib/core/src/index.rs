use crate::vptree::VpTree;
use crate::{Error, Result};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Pairwise distance between two indexed rows
///
/// `None` means the rows are not comparable at all. Implementations are not
/// required to satisfy the triangle inequality unless the index is built
/// with [`SearchAlgorithm::VpTree`].
pub trait Metric<T>: Send + Sync {
    fn distance(&self, a: &T, b: &T) -> Option<f64>;
}

impl<T, F> Metric<T> for F
where
    F: Fn(&T, &T) -> Option<f64> + Send + Sync,
{
    fn distance(&self, a: &T, b: &T) -> Option<f64> {
        self(a, b)
    }
}

/// Neighbour search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchAlgorithm {
    /// Evaluate every indexed row. Correct for any distance.
    #[default]
    Brute,
    /// Vantage-point tree. Only valid for distances that form a metric.
    VpTree,
}

/// One search hit: position of the row in fit order and its distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    /// `None` when the row is not comparable with the query
    pub distance: Option<f64>,
}

/// Total order used for ranking: distance ascending (undefined last), then
/// fit position, which makes ties resolve to case base order.
pub(crate) type RankKey = (OrderedFloat<f64>, usize);

#[inline]
pub(crate) fn rank_key(distance: Option<f64>, position: usize) -> RankKey {
    let d = match distance {
        Some(d) if !d.is_nan() => d,
        _ => f64::INFINITY,
    };
    (OrderedFloat(d), position)
}

#[inline]
pub(crate) fn to_neighbor((d, position): RankKey) -> Neighbor {
    Neighbor {
        position,
        distance: if d.0.is_finite() { Some(d.0) } else { None },
    }
}

/// k-nearest-neighbour index over rows fitted in bulk
///
/// The index owns its rows; refitting means building a new index.
pub struct NeighborIndex<T> {
    rows: Vec<T>,
    algorithm: SearchAlgorithm,
    tree: Option<VpTree>,
}

impl<T: Send + Sync> NeighborIndex<T> {
    pub fn fit<M: Metric<T>>(rows: Vec<T>, metric: &M, algorithm: SearchAlgorithm) -> Self {
        let tree = match algorithm {
            SearchAlgorithm::Brute => None,
            SearchAlgorithm::VpTree => Some(VpTree::build(rows.len(), |i, j| {
                metric.distance(&rows[i], &rows[j])
            })),
        };
        tracing::debug!(rows = rows.len(), ?algorithm, "neighbour index fitted");
        Self { rows, algorithm, tree }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn algorithm(&self) -> SearchAlgorithm {
        self.algorithm
    }

    #[inline]
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    fn check_k(&self, k: usize) -> Result<()> {
        if k == 0 || k > self.rows.len() {
            return Err(Error::InvalidK { k, available: self.rows.len() });
        }
        Ok(())
    }

    /// The `k` rows closest to `query`, closest first
    pub fn find<M: Metric<T>>(&self, metric: &M, query: &T, k: usize) -> Result<Vec<Neighbor>> {
        self.check_k(k)?;
        let neighbors = match &self.tree {
            Some(tree) => tree.search(k, |i| metric.distance(query, &self.rows[i])),
            None => self.brute_force(metric, query, k),
        };
        Ok(neighbors)
    }

    /// [`find`](Self::find) for several queries, searched in parallel
    pub fn find_batch<M: Metric<T>>(
        &self,
        metric: &M,
        queries: &[T],
        k: usize,
    ) -> Result<Vec<Vec<Neighbor>>> {
        self.check_k(k)?;
        queries
            .par_iter()
            .map(|q| self.find(metric, q, k))
            .collect()
    }

    fn brute_force<M: Metric<T>>(&self, metric: &M, query: &T, k: usize) -> Vec<Neighbor> {
        let mut keys: Vec<RankKey> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| rank_key(metric.distance(query, row), i))
            .collect();

        if k < keys.len() {
            keys.select_nth_unstable(k - 1);
            keys.truncate(k);
        }
        keys.sort_unstable();
        keys.into_iter().map(to_neighbor).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abs_diff(a: &f64, b: &f64) -> Option<f64> {
        Some((a - b).abs())
    }

    #[test]
    fn test_brute_force_orders_by_distance_then_position() {
        let rows = vec![10.0, 20.0, 30.0, 40.0];
        let index = NeighborIndex::fit(rows, &abs_diff, SearchAlgorithm::Brute);
        let hits = index.find(&abs_diff, &25.0, 2).unwrap();
        assert_eq!(hits.iter().map(|n| n.position).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(hits[0].distance, Some(5.0));
    }

    #[test]
    fn test_k_out_of_range() {
        let index = NeighborIndex::fit(vec![1.0, 2.0], &abs_diff, SearchAlgorithm::Brute);
        assert!(matches!(
            index.find(&abs_diff, &1.0, 0),
            Err(Error::InvalidK { k: 0, available: 2 })
        ));
        assert!(matches!(
            index.find(&abs_diff, &1.0, 3),
            Err(Error::InvalidK { k: 3, available: 2 })
        ));
        assert_eq!(index.find(&abs_diff, &1.0, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_undefined_distance_ranks_last() {
        let metric = |a: &Option<f64>, b: &Option<f64>| match (a, b) {
            (Some(a), Some(b)) => Some((a - b).abs()),
            _ => None,
        };
        let rows = vec![None, Some(100.0), Some(1.0)];
        let index = NeighborIndex::fit(rows, &metric, SearchAlgorithm::Brute);
        let hits = index.find(&metric, &Some(0.0), 3).unwrap();
        assert_eq!(hits.iter().map(|n| n.position).collect::<Vec<_>>(), vec![2, 1, 0]);
        assert_eq!(hits[2].distance, None);
    }

    #[test]
    fn test_vptree_matches_brute_force() {
        let rows: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64).collect();
        let brute = NeighborIndex::fit(rows.clone(), &abs_diff, SearchAlgorithm::Brute);
        let tree = NeighborIndex::fit(rows, &abs_diff, SearchAlgorithm::VpTree);
        for q in [0.0, 13.5, 50.0, 99.0, 150.0] {
            for k in [1, 3, 10, 200] {
                assert_eq!(
                    brute.find(&abs_diff, &q, k).unwrap(),
                    tree.find(&abs_diff, &q, k).unwrap(),
                    "query {} k {}",
                    q,
                    k
                );
            }
        }
    }

    #[test]
    fn test_find_batch() {
        let index = NeighborIndex::fit(vec![0.0, 5.0, 10.0], &abs_diff, SearchAlgorithm::Brute);
        let results = index.find_batch(&abs_diff, &[1.0, 9.0], 1).unwrap();
        assert_eq!(results[0][0].position, 0);
        assert_eq!(results[1][0].position, 2);
    }
}
