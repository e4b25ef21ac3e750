//! Per-attribute similarity formulas
//!
//! Plain functions over already-encoded values. All of them return a score in
//! [0.0, 1.0] where 1.0 means identical; deciding whether two values are
//! comparable at all is left to the attribute types.

use cbrx_core::SparseVector;

/// `max(1 - |x - y| / max_value, 0)`
#[inline]
pub fn linear_similarity(x: f64, y: f64, max_value: f64) -> f64 {
    (1.0 - (x - y).abs() / max_value).max(0.0)
}

/// `base^|x - y|`
#[inline]
pub fn exponential_similarity(x: f64, y: f64, base: f64) -> f64 {
    base.powf((x - y).abs())
}

/// `1 - |qx - qy|` for two quantile ranks in [0, 1]
#[inline]
pub fn quantile_similarity(qx: f64, qy: f64) -> f64 {
    (1.0 - (qx - qy).abs()).clamp(0.0, 1.0)
}

/// Kronecker delta
#[inline]
pub fn exact_similarity<T: PartialEq + ?Sized>(x: &T, y: &T) -> f64 {
    if x == y { 1.0 } else { 0.0 }
}

/// `1 - |rx - ry| / (n - 1)` over `n` ranked categories
#[inline]
pub fn rank_similarity(rx: usize, ry: usize, n: usize) -> f64 {
    if n <= 1 {
        return 1.0;
    }
    1.0 - rx.abs_diff(ry) as f64 / (n - 1) as f64
}

/// Cosine of two term vectors clipped to [0, 1]; `None` if either has no terms
pub fn cosine_similarity(x: &SparseVector, y: &SparseVector) -> Option<f64> {
    x.cosine(y).map(|c| c.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_linear_similarity() {
        for (x, y, s) in [
            (10.0, 10.0, 1.0),
            (20.0, 20.0, 1.0),
            (0.0, 100.0, 0.0),
            (50.0, 0.0, 0.5),
            (20.0, 40.0, 0.8),
            (0.0, 250.0, 0.0),
        ] {
            assert!((linear_similarity(x, y, 100.0) - s).abs() < EPS, "{} {}", x, y);
        }
    }

    #[test]
    fn test_exponential_similarity() {
        assert!((exponential_similarity(0.0, 3.0, 0.5) - 0.125).abs() < EPS);
        assert!((exponential_similarity(3.0, 0.0, 0.5) - 0.125).abs() < EPS);
        assert_eq!(exponential_similarity(7.0, 7.0, 0.5), 1.0);
        assert_eq!(exponential_similarity(7.0, 7.0, 0.0), 1.0);
    }

    #[test]
    fn test_rank_similarity() {
        assert!((rank_similarity(0, 1, 4) - 2.0 / 3.0).abs() < EPS);
        assert!((rank_similarity(0, 2, 4) - 1.0 / 3.0).abs() < EPS);
        assert_eq!(rank_similarity(3, 0, 4), 0.0);
        assert_eq!(rank_similarity(0, 0, 1), 1.0);
    }

    #[test]
    fn test_exact_similarity() {
        assert_eq!(exact_similarity(&3usize, &3usize), 1.0);
        assert_eq!(exact_similarity("a", "b"), 0.0);
    }
}
