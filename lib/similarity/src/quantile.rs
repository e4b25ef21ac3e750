//! Empirical quantile function for quantile-linear attributes

use cbrx_core::{Error, Result};

/// Piecewise-linear map from a fitted sample to its quantile rank in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileMap {
    /// Sample quantiles, non-decreasing
    quantiles: Vec<f64>,
    /// Probability level of each quantile, evenly spaced over [0, 1]
    references: Vec<f64>,
    // Negated and reversed copies for the backward interpolation
    quantiles_rev: Vec<f64>,
    references_rev: Vec<f64>,
}

impl QuantileMap {
    /// Fit on a sample, using at most `n_quantiles` reference points
    pub fn fit(mut sample: Vec<f64>, n_quantiles: usize, attribute: &str) -> Result<Self> {
        if sample.is_empty() {
            return Err(Error::EmptyColumn(attribute.to_string()));
        }
        sample.sort_unstable_by(f64::total_cmp);

        let n = n_quantiles.min(sample.len()).max(1);
        let references: Vec<f64> = if n == 1 {
            vec![0.0]
        } else {
            (0..n).map(|i| i as f64 / (n - 1) as f64).collect()
        };
        let quantiles: Vec<f64> = references.iter().map(|&r| percentile(&sample, r)).collect();

        let quantiles_rev = quantiles.iter().rev().map(|q| -q).collect();
        let references_rev = references.iter().rev().map(|r| -r).collect();

        Ok(Self {
            quantiles,
            references,
            quantiles_rev,
            references_rev,
        })
    }

    /// Quantile rank of a value. Runs of equal quantiles map to the middle of
    /// their rank interval; values outside the fitted range clip to 0 or 1.
    pub fn rank(&self, x: f64) -> f64 {
        let lo = self.quantiles[0];
        let hi = self.quantiles[self.quantiles.len() - 1];
        if x < lo {
            return 0.0;
        }
        if x > hi {
            return 1.0;
        }
        if self.quantiles.len() == 1 {
            return self.references[0];
        }

        let forward = interp(x, &self.quantiles, &self.references);
        let backward = interp(-x, &self.quantiles_rev, &self.references_rev);
        (0.5 * (forward - backward)).clamp(0.0, 1.0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.quantiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.quantiles.is_empty()
    }
}

/// Linear-interpolated percentile of a sorted sample, `p` in [0, 1]
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

/// One-dimensional linear interpolation over non-decreasing `xp`.
/// Among repeated `xp` values the right-most one wins.
fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let j = xp.partition_point(|&v| v <= x);
    if j == 0 {
        return fp[0];
    }
    if j == xp.len() {
        return fp[xp.len() - 1];
    }
    let i = j - 1;
    let span = xp[j] - xp[i];
    if span <= 0.0 {
        return fp[i];
    }
    fp[i] + (fp[j] - fp[i]) * (x - xp[i]) / span
}
