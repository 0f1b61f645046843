//! # Pareto Smoothed Importance Sampling
//!
//! Smooths sets of log importance weights (Vehtari, Simpson, Gelman, Yao & Gabry).
//! Each set is a column of a draws × columns matrix, or a single vector of draws.
//! For every column:
//!
//! 1. The log weights are shifted so that their maximum is zero.
//! 2. The draws above the `(100 - wcpp)`-th percentile form the right tail.
//! 3. A generalized Pareto distribution is fitted to the tail exceedances and the
//!    tail weights are replaced by the fitted distribution's expected order
//!    statistics, keeping the rank order of the raw weights.
//! 4. Optionally, weights above `n^wtrunc` times their mean are truncated.
//! 5. The column is renormalised so its weights sum to one.
//!
//! A tail with four or fewer draws is not fitted; its Pareto k is reported as
//! `+inf` and only steps 4 and 5 are applied.
//!
//! # Ownership
//!
//! [`psislw`] leaves the caller's array untouched and returns a fresh one.
//! [`psislw_owned`] takes the buffer and smooths it in place, and
//! [`psislw_in_place`] smooths a mutable view. All three give identical values.
//!
//! Columns are independent and are smoothed in parallel; each column is
//! processed sequentially, so the result does not depend on the thread count.

use crate::config::{ConfigError, PsisConfig};
use crate::gpd::{self, GpdError, SortHint};
use crate::logsumexp::sumlogs;
use crate::types::{OK_K_THRESHOLD, TailIndices};
use ndarray::{
    Array, Array1, ArrayBase, ArrayView, ArrayView1, ArrayViewMut, ArrayViewMut1, ArrayViewMut2,
    Axis, Dimension, Ix1, Ix2, RawData,
};
use rayon::prelude::*;
use thiserror::Error;

/// Tails with this many draws or fewer are not fitted.
const MIN_TAIL_DRAWS: usize = 4;

/// Error type for Pareto smoothing and everything built on it.
#[derive(Error, Debug)]
pub enum PsisError {
    #[error("Log weights must be 1 or 2 dimensional, but the input has {0} dimensions.")]
    InvalidDimensionality(usize),

    #[error("More than one log weight is needed, but only {0} draws were provided.")]
    TooFewDraws(usize),

    #[error("Invalid smoothing options: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Generalized Pareto tail fit failed: {0}")]
    TailFit(#[from] GpdError),

    #[error("The log-likelihood matrix has {found} observations, but the results were computed for {expected}.")]
    ObservationMismatch { found: usize, expected: usize },
}

/// Pareto smooths a copy of `lw`.
///
/// `lw` holds `n` log weights (1-D) or `m` sets of `n` log weights as an
/// `n × m` matrix. Returns the smoothed log weights, in the shape of the input,
/// together with the Pareto tail indices.
pub fn psislw<D: Dimension>(
    lw: ArrayView<f64, D>,
    config: &PsisConfig,
) -> Result<(Array<f64, D>, TailIndices), PsisError> {
    validate(lw.ndim(), lw.shape(), config)?;
    psislw_owned(lw.to_owned(), config)
}

/// Pareto smooths `lw`, reusing its buffer for the output.
pub fn psislw_owned<D: Dimension>(
    mut lw: Array<f64, D>,
    config: &PsisConfig,
) -> Result<(Array<f64, D>, TailIndices), PsisError> {
    let kss = psislw_in_place(lw.view_mut(), config)?;
    Ok((lw, kss))
}

/// Pareto smooths the log weights behind `lw` in place.
///
/// Validation errors are returned before anything is written.
pub fn psislw_in_place<D: Dimension>(
    lw: ArrayViewMut<f64, D>,
    config: &PsisConfig,
) -> Result<TailIndices, PsisError> {
    validate(lw.ndim(), lw.shape(), config)?;
    let one_dimensional = lw.ndim() == 1;
    let ks = smooth_columns(as_draw_matrix(lw)?, config)?;

    let kss = if one_dimensional {
        TailIndices::Scalar(ks[0])
    } else {
        TailIndices::Columns(ks)
    };
    warn_if_unreliable(&kss);
    Ok(kss)
}

/// Views 1-D input as an `n × 1` matrix and 2-D input as itself.
pub(crate) fn as_draw_matrix<S, D>(array: ArrayBase<S, D>) -> Result<ArrayBase<S, Ix2>, PsisError>
where
    S: RawData,
    D: Dimension,
{
    let ndim = array.ndim();
    match ndim {
        1 => Ok(array
            .into_dimensionality::<Ix1>()
            .map_err(|_| PsisError::InvalidDimensionality(ndim))?
            .insert_axis(Axis(1))),
        2 => array
            .into_dimensionality::<Ix2>()
            .map_err(|_| PsisError::InvalidDimensionality(ndim)),
        _ => Err(PsisError::InvalidDimensionality(ndim)),
    }
}

fn validate(ndim: usize, shape: &[usize], config: &PsisConfig) -> Result<(), PsisError> {
    if ndim != 1 && ndim != 2 {
        return Err(PsisError::InvalidDimensionality(ndim));
    }
    let n = shape[0];
    if n <= 1 {
        return Err(PsisError::TooFewDraws(n));
    }
    config.validate()?;
    Ok(())
}

fn smooth_columns(mut lw: ArrayViewMut2<f64>, config: &PsisConfig) -> Result<Array1<f64>, PsisError> {
    let log_n = (lw.nrows() as f64).ln();

    let ks = lw
        .axis_iter_mut(Axis(1))
        .into_par_iter()
        .map(|column| smooth_column(column, config, log_n))
        .collect::<Result<Vec<f64>, GpdError>>()?;
    Ok(Array1::from(ks))
}

/// Logs a warning for indices above [`OK_K_THRESHOLD`], and returns how many there were.
fn warn_if_unreliable(kss: &TailIndices) -> usize {
    let unreliable = kss.count_unreliable();
    if unreliable > 0 {
        log::warn!(
            "{unreliable} of {} sets of log weights have Pareto k above {OK_K_THRESHOLD}, undefined, or too few tail draws to fit; their smoothed estimates may be unreliable.",
            kss.len()
        );
    }
    unreliable
}

fn smooth_column(mut x: ArrayViewMut1<f64>, config: &PsisConfig, log_n: f64) -> Result<f64, GpdError> {
    let max = x.fold(f64::NEG_INFINITY, |acc, &value| acc.max(value));
    x.mapv_inplace(|value| value - max);

    // Underflowed weights must never define the tail.
    let cutoff = percentile(x.view(), 100.0 - config.wcpp).max(f64::MIN_POSITIVE.ln());
    let exp_cutoff = cutoff.exp();

    let tail_positions: Vec<usize> = x
        .iter()
        .enumerate()
        .filter(|&(_, &value)| value > cutoff)
        .map(|(position, _)| position)
        .collect();
    let n_tail = tail_positions.len();

    let k = if n_tail <= MIN_TAIL_DRAWS {
        log::debug!("Only {n_tail} draws in the tail; skipping the Pareto fit.");
        f64::INFINITY
    } else {
        let tail: Array1<f64> = tail_positions.iter().map(|&position| x[position]).collect();
        let order = gpd::argsort(tail.view());
        let exceedances = tail.mapv(|value| value.exp() - exp_cutoff);
        let fit = gpd::gpdfit(exceedances.view(), SortHint::Order(&order))?;

        let probabilities: Array1<f64> = (0..n_tail)
            .map(|rank| (rank as f64 + 0.5) / n_tail as f64)
            .collect();
        let quantiles = gpd::gpinv(probabilities.view(), fit.k, fit.sigma);
        for (&tail_index, &quantile) in order.iter().zip(quantiles.iter()) {
            x[tail_positions[tail_index]] = (quantile + exp_cutoff).ln();
        }

        log::debug!(
            "Fitted {n_tail} tail draws: k = {:.4}, sigma = {:.4e}",
            fit.k,
            fit.sigma
        );
        fit.k
    };

    if config.wtrunc > 0.0 {
        let cap = config.wtrunc * log_n - log_n + sumlogs(x.view());
        x.mapv_inplace(|value| if value > cap { cap } else { value });
    }

    let normaliser = sumlogs(x.view());
    x.mapv_inplace(|value| value - normaliser);

    Ok(k)
}

/// `q`-th percentile (0..=100) with linear interpolation between closest ranks.
fn percentile(values: ArrayView1<f64>, q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let fraction = rank - lower as f64;

    let (low, high) = (sorted[lower], sorted[upper]);
    let gap = high - low;
    // Interpolate from the nearer end point.
    if fraction >= 0.5 {
        high - gap * (1.0 - fraction)
    } else {
        low + gap * fraction
    }
}
