// Vantage-point tree for exact k-NN under a metric distance.
//
// Each node splits the remaining rows at the median distance to its vantage
// row: `inside` rows lie at distance <= radius, `outside` rows at >= radius.
// Pruning relies on the triangle inequality, so the tree is only correct for
// distances that are true metrics.

use crate::index::{rank_key, to_neighbor, Neighbor, RankKey};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BinaryHeap;

/// Fixed seed so that rebuilding over the same rows yields the same tree
const VANTAGE_SEED: u64 = 0x5eed_cb12;

/// Slack for floating point error in the pruning bounds
const PRUNE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
struct VpNode {
    position: usize,
    radius: f64,
    inside: Option<usize>,
    outside: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct VpTree {
    nodes: Vec<VpNode>,
    root: Option<usize>,
}

#[inline]
fn finite_or_inf(d: Option<f64>) -> f64 {
    match d {
        Some(d) if !d.is_nan() => d,
        _ => f64::INFINITY,
    }
}

impl VpTree {
    /// Build over rows `0..n`; `distance(i, j)` compares two fitted rows
    pub(crate) fn build<D>(n: usize, distance: D) -> Self
    where
        D: Fn(usize, usize) -> Option<f64>,
    {
        let mut items: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(VANTAGE_SEED);
        let mut nodes = Vec::with_capacity(n);
        let root = Self::build_node(&mut items, &distance, &mut rng, &mut nodes);
        Self { nodes, root }
    }

    fn build_node<D>(
        items: &mut [usize],
        distance: &D,
        rng: &mut StdRng,
        nodes: &mut Vec<VpNode>,
    ) -> Option<usize>
    where
        D: Fn(usize, usize) -> Option<f64>,
    {
        if items.is_empty() {
            return None;
        }

        let pick = rng.random_range(0..items.len());
        items.swap(0, pick);
        let vantage = items[0];
        let rest = &mut items[1..];

        let mut keyed: Vec<(OrderedFloat<f64>, usize)> = rest
            .iter()
            .map(|&i| (OrderedFloat(finite_or_inf(distance(vantage, i))), i))
            .collect();
        keyed.sort_unstable();
        for (slot, &(_, i)) in rest.iter_mut().zip(&keyed) {
            *slot = i;
        }

        let mid = rest.len() / 2;
        let radius = keyed.get(mid).map(|(d, _)| d.0).unwrap_or(0.0);

        let idx = nodes.len();
        nodes.push(VpNode {
            position: vantage,
            radius,
            inside: None,
            outside: None,
        });

        let (inside, outside) = rest.split_at_mut(mid);
        let inside = Self::build_node(inside, distance, rng, nodes);
        let outside = Self::build_node(outside, distance, rng, nodes);
        nodes[idx].inside = inside;
        nodes[idx].outside = outside;
        Some(idx)
    }

    /// The `k` closest rows to a query; `distance(i)` compares the query with row `i`
    pub(crate) fn search<D>(&self, k: usize, distance: D) -> Vec<Neighbor>
    where
        D: Fn(usize) -> Option<f64>,
    {
        let mut heap: BinaryHeap<RankKey> = BinaryHeap::with_capacity(k + 1);
        if let Some(root) = self.root {
            self.visit(root, k, &distance, &mut heap);
        }
        let mut keys = heap.into_vec();
        keys.sort_unstable();
        keys.into_iter().map(to_neighbor).collect()
    }

    fn visit<D>(&self, idx: usize, k: usize, distance: &D, heap: &mut BinaryHeap<RankKey>)
    where
        D: Fn(usize) -> Option<f64>,
    {
        let node = &self.nodes[idx];
        let key = rank_key(distance(node.position), node.position);
        let d = key.0 .0;

        if heap.len() < k {
            heap.push(key);
        } else if heap.peek().is_some_and(|worst| key < *worst) {
            heap.pop();
            heap.push(key);
        }

        // Without finite bounds the triangle inequality gives nothing to prune on
        let bounded = d.is_finite() && node.radius.is_finite();
        let visit_inside = |tau: f64| !bounded || !tau.is_finite() || d - tau <= node.radius + PRUNE_EPSILON;
        let visit_outside = |tau: f64| !bounded || !tau.is_finite() || d + tau >= node.radius - PRUNE_EPSILON;

        if d < node.radius {
            if let Some(child) = node.inside {
                if visit_inside(Self::threshold(heap, k)) {
                    self.visit(child, k, distance, heap);
                }
            }
            if let Some(child) = node.outside {
                if visit_outside(Self::threshold(heap, k)) {
                    self.visit(child, k, distance, heap);
                }
            }
        } else {
            if let Some(child) = node.outside {
                if visit_outside(Self::threshold(heap, k)) {
                    self.visit(child, k, distance, heap);
                }
            }
            if let Some(child) = node.inside {
                if visit_inside(Self::threshold(heap, k)) {
                    self.visit(child, k, distance, heap);
                }
            }
        }
    }

    /// Distance of the current k-th candidate, infinite until k are found
    #[inline]
    fn threshold(heap: &BinaryHeap<RankKey>, k: usize) -> f64 {
        if heap.len() < k {
            f64::INFINITY
        } else {
            heap.peek().map(|worst| worst.0 .0).unwrap_or(f64::INFINITY)
        }
    }
}
