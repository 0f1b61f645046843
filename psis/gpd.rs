//! # Generalized Pareto Tail Fit
//!
//! Empirical Bayes estimate of the two parameters of a generalized Pareto
//! distribution (Zhang & Stephens, 2009), as used by Pareto smoothed importance
//! sampling to model the right tail of the importance weights.
//!
//! The estimate is a posterior mean over a fixed grid of `m = 80 + floor(sqrt(n))`
//! candidate values of the scale-related parameter `b = -k / sigma`. Each grid
//! point is scored with its profile log-likelihood, the scores are normalised
//! pairwise in the log domain and the posterior mean of `b` is plugged back into
//! the profile estimate of `k`.
//!
//! The returned `k` is the negative of Zhang and Stephens's `k`, which is the
//! more common parameterisation: `k > 0.5` means the tail has infinite variance
//! and `k > 1` means it has no finite mean.

use ndarray::{Array, ArrayView, ArrayView1, ArrayViewMut, Dimension, Ix1};
use thiserror::Error;

/// Number of grid points used in addition to `floor(sqrt(n))`.
const BASE_GRID_SIZE: usize = 80;

/// Grid weights below this multiple of machine epsilon are discarded.
const NEGLIGIBLE_WEIGHT_FACTOR: f64 = 10.0;

/// Errors raised while validating the input of a tail fit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GpdError {
    #[error("A GPD fit requires a one-dimensional sample, but the input has {0} dimensions.")]
    NotOneDimensional(usize),

    #[error("A GPD fit requires more than one sample, but {0} were provided.")]
    TooFewSamples(usize),

    #[error("The sort order has {found} indices, but the sample has {expected} elements.")]
    OrderLength { found: usize, expected: usize },

    #[error("The sort order contains index {index}, which is out of bounds for {len} samples.")]
    OrderIndexOutOfBounds { index: usize, len: usize },
}

/// Point estimate of the generalized Pareto shape (`k`) and scale (`sigma`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpdFit {
    pub k: f64,
    pub sigma: f64,
}

/// Tells [`gpdfit`] how to find the ascending order of its sample.
///
/// Only the largest element and the element at the first-quartile rank are
/// ever read through the ordering, so a precomputed permutation lets a caller
/// that already sorted the data skip a second sort.
#[derive(Debug, Clone, Copy)]
pub enum SortHint<'a> {
    /// The ascending permutation is computed internally.
    Unsorted,
    /// The sample is already in ascending order.
    Sorted,
    /// `order[r]` is the index of the `r`-th smallest element.
    Order(&'a [usize]),
}

/// Estimates the generalized Pareto parameters of `x`.
///
/// `x` must be one-dimensional with more than one element. The values are the
/// exceedances over a threshold, so they are expected to be non-negative with a
/// positive maximum; anything else gives meaningless (but non-panicking) output.
pub fn gpdfit<D: Dimension>(x: ArrayView<f64, D>, sort: SortHint<'_>) -> Result<GpdFit, GpdError> {
    let x = as_sample(x)?;
    match sort {
        SortHint::Unsorted => {
            let order = argsort(x);
            Ok(internal::fit(x, |rank| x[order[rank]]))
        }
        SortHint::Sorted => Ok(internal::fit(x, |rank| x[rank])),
        SortHint::Order(order) => {
            if order.len() != x.len() {
                return Err(GpdError::OrderLength {
                    found: order.len(),
                    expected: x.len(),
                });
            }
            if let Some(&index) = order.iter().find(|&&index| index >= x.len()) {
                return Err(GpdError::OrderIndexOutOfBounds {
                    index,
                    len: x.len(),
                });
            }
            Ok(internal::fit(x, |rank| x[order[rank]]))
        }
    }
}

/// Sorts `x` ascending in place, then fits it as an already sorted sample.
///
/// Validation happens before the sort, so a rejected input is left untouched.
pub fn gpdfit_in_place<D: Dimension>(x: ArrayViewMut<f64, D>) -> Result<GpdFit, GpdError> {
    let ndim = x.ndim();
    if ndim != 1 {
        return Err(GpdError::NotOneDimensional(ndim));
    }
    let mut x = x
        .into_dimensionality::<Ix1>()
        .map_err(|_| GpdError::NotOneDimensional(ndim))?;
    if x.len() <= 1 {
        return Err(GpdError::TooFewSamples(x.len()));
    }

    match x.as_slice_mut() {
        Some(values) => values.sort_by(f64::total_cmp),
        None => {
            let mut values = x.to_vec();
            values.sort_by(f64::total_cmp);
            x.iter_mut()
                .zip(values)
                .for_each(|(slot, value)| *slot = value);
        }
    }

    let sorted = x.view();
    Ok(internal::fit(sorted, |rank| sorted[rank]))
}

/// Inverse CDF of the generalized Pareto distribution, elementwise over `p`.
///
/// For `0 < p < 1` this is `sigma / k * ((1 - p)^(-k) - 1)`, or
/// `-sigma * ln(1 - p)` in the exponential limit `|k| < eps`. At `p = 0` it is
/// zero; at `p = 1` it is the upper end of the support: `+inf` for `k >= 0` and
/// `-sigma / k` for a bounded (`k < 0`) tail. Probabilities outside `[0, 1]` and
/// a non-positive `sigma` give `NaN`.
pub fn gpinv<D: Dimension>(p: ArrayView<f64, D>, k: f64, sigma: f64) -> Array<f64, D> {
    p.mapv(|prob| quantile(prob, k, sigma))
}

fn quantile(p: f64, k: f64, sigma: f64) -> f64 {
    if sigma.is_nan() || sigma <= 0.0 || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        0.0
    } else if p == 1.0 {
        if k >= 0.0 { f64::INFINITY } else { -sigma / k }
    } else if k.abs() < f64::EPSILON {
        -(-p).ln_1p() * sigma
    } else {
        (-k * (-p).ln_1p()).exp_m1() / k * sigma
    }
}

/// Indices that sort `x` ascending. NaN sorts last.
pub(crate) fn argsort(x: ArrayView1<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..x.len()).collect();
    order.sort_by(|&a, &b| x[a].total_cmp(&x[b]));
    order
}

fn as_sample<D: Dimension>(x: ArrayView<f64, D>) -> Result<ArrayView1<f64>, GpdError> {
    let ndim = x.ndim();
    if ndim != 1 {
        return Err(GpdError::NotOneDimensional(ndim));
    }
    let x = x
        .into_dimensionality::<Ix1>()
        .map_err(|_| GpdError::NotOneDimensional(ndim))?;
    if x.len() <= 1 {
        return Err(GpdError::TooFewSamples(x.len()));
    }
    Ok(x)
}

mod internal {
    use super::*;

    /// Runs the grid estimate. `sorted_at(r)` returns the `r`-th smallest
    /// element of `x` (0-based); only the maximum and the quartile are used.
    pub(super) fn fit(x: ArrayView1<f64>, sorted_at: impl Fn(usize) -> f64) -> GpdFit {
        let n = x.len();
        let n_f = n as f64;
        let m = BASE_GRID_SIZE + n_f.sqrt().floor() as usize;

        let x_max = sorted_at(n - 1);
        let x_quartile = sorted_at((n_f / 4.0 + 0.5).floor() as usize - 1);

        let grid: Vec<f64> = (1..=m)
            .map(|j| {
                (1.0 - (m as f64 / (j as f64 - 0.5)).sqrt()) / (3.0 * x_quartile) + 1.0 / x_max
            })
            .collect();

        let scores: Vec<f64> = grid
            .iter()
            .map(|&b| {
                let k = profile_k(x, b);
                n_f * ((-(b / k)).ln() - k - 1.0)
            })
            .collect();

        // w_j = 1 / sum_i exp(L_i - L_j), evaluated pairwise.
        let weights: Vec<f64> = scores
            .iter()
            .map(|&score_j| {
                let total: f64 = scores.iter().map(|&score_i| (score_i - score_j).exp()).sum();
                1.0 / total
            })
            .collect();

        let threshold = NEGLIGIBLE_WEIGHT_FACTOR * f64::EPSILON;
        let (kept_grid, kept_weights): (Vec<f64>, Vec<f64>) = grid
            .iter()
            .zip(&weights)
            .filter(|&(_, &w)| w >= threshold)
            .map(|(&b, &w)| (b, w))
            .unzip();
        let weight_sum: f64 = kept_weights.iter().sum();

        let b: f64 = kept_grid
            .iter()
            .zip(&kept_weights)
            .map(|(&b, &w)| b * (w / weight_sum))
            .sum();

        let k = profile_k(x, b);
        GpdFit { k, sigma: -k / b }
    }

    /// Profile estimate of the shape for a fixed `b`: `mean(log1p(-b * x))`.
    fn profile_k(x: ArrayView1<f64>, b: f64) -> f64 {
        x.iter().map(|&value| (-b * value).ln_1p()).sum::<f64>() / x.len() as f64
    }
}
