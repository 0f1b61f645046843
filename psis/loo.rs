//! # PSIS Leave-One-Out Cross-Validation
//!
//! Leave-one-out log predictive densities from posterior draws of the pointwise
//! log-likelihood, without refitting (Vehtari, Gelman & Gabry, 2017).
//!
//! For observation `i` the raw importance ratios of the leave-one-out posterior
//! are `1 / p(y_i | theta_s)`, so the raw log weights are `-log_lik[.., i]`. After
//! Pareto smoothing the leave-one-out density is
//! `log sum_s exp(lw_s + log_lik[s, i])`.

use crate::config::{ConfigError, PsisConfig};
use crate::logsumexp::sumlogs_axis;
use crate::smooth::{self, PsisError, as_draw_matrix};
use crate::types::{ParetoKCategory, TailIndices};
use ndarray::{Array1, ArrayView, Axis, Dimension};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Leave-one-out log predictive densities and their Pareto diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsisLoo {
    /// Sum of the leave-one-out log predictive densities.
    pub loo: f64,
    /// Leave-one-out log predictive density of each observation.
    pub loos: Array1<f64>,
    /// Pareto tail index of each observation's importance weights.
    pub pareto_k: TailIndices,
}

/// Computes PSIS-LOO from an `n × m` matrix of `n` posterior draws of the
/// log-likelihood of `m` observations.
///
/// One-dimensional input is treated as a single observation. Errors from the
/// smoother are returned unchanged.
pub fn psisloo<D: Dimension>(
    log_lik: ArrayView<f64, D>,
    config: &PsisConfig,
) -> Result<PsisLoo, PsisError> {
    // The negated copy is owned here, so the smoother may overwrite it.
    let (lw, pareto_k) = smooth::psislw_owned(log_lik.mapv(|value| -value), config)?;

    let mut lw = as_draw_matrix(lw)?;
    lw += &as_draw_matrix(log_lik)?;

    let loos = sumlogs_axis(lw.view(), Axis(0));
    let loo = loos.sum();

    let unreliable = pareto_k.count_unreliable();
    log::info!(
        "PSIS-LOO over {} draws and {} observations: elpd_loo = {loo:.4}, {unreliable} observations with Pareto k above the reliability threshold",
        lw.nrows(),
        loos.len()
    );

    Ok(PsisLoo {
        loo,
        loos,
        pareto_k,
    })
}

/// Number of observations in each Pareto k class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParetoKCounts {
    pub good: usize,
    pub ok: usize,
    pub bad: usize,
    pub very_bad: usize,
}

impl ParetoKCounts {
    pub fn from_indices(pareto_k: &TailIndices) -> Self {
        let mut counts = Self::default();
        for category in pareto_k.categories() {
            match category {
                ParetoKCategory::Good => counts.good += 1,
                ParetoKCategory::Ok => counts.ok += 1,
                ParetoKCategory::Bad => counts.bad += 1,
                ParetoKCategory::VeryBad => counts.very_bad += 1,
            }
        }
        counts
    }
}

/// Summary statistics of a PSIS-LOO fit, in the form usually reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LooSummary {
    /// Expected log pointwise predictive density, equal to [`PsisLoo::loo`].
    pub elpd_loo: f64,
    /// Standard error of `elpd_loo`; `NaN` for a single observation.
    pub se_elpd_loo: f64,
    /// Log pointwise predictive density of the full posterior.
    pub lppd: f64,
    /// Effective number of parameters, `lppd - elpd_loo`.
    pub p_loo: f64,
    /// `-2 * elpd_loo`, on the deviance scale.
    pub looic: f64,
    pub n_draws: usize,
    pub n_observations: usize,
    pub pareto_k_counts: ParetoKCounts,
}

impl PsisLoo {
    /// Summarises the fit against the log-likelihood matrix it was computed from.
    pub fn summary<D: Dimension>(&self, log_lik: ArrayView<f64, D>) -> Result<LooSummary, PsisError> {
        let log_lik = as_draw_matrix(log_lik)?;
        let (n_draws, n_observations) = log_lik.dim();
        if n_observations != self.loos.len() {
            return Err(PsisError::ObservationMismatch {
                found: n_observations,
                expected: self.loos.len(),
            });
        }

        let log_n = (n_draws as f64).ln();
        let lppd = sumlogs_axis(log_lik, Axis(0))
            .mapv(|value| value - log_n)
            .sum();

        let m = n_observations as f64;
        let se_elpd_loo = if n_observations > 1 {
            let mean = self.loo / m;
            let variance = self
                .loos
                .iter()
                .map(|&value| (value - mean).powi(2))
                .sum::<f64>()
                / (m - 1.0);
            (m * variance).sqrt()
        } else {
            f64::NAN
        };

        Ok(LooSummary {
            elpd_loo: self.loo,
            se_elpd_loo,
            lppd,
            p_loo: lppd - self.loo,
            looic: -2.0 * self.loo,
            n_draws,
            n_observations,
            pareto_k_counts: ParetoKCounts::from_indices(&self.pareto_k),
        })
    }
}

impl LooSummary {
    /// Saves the summary to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        Ok(())
    }

    /// Loads a summary from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        let summary = toml::from_str(&toml_string)?;
        Ok(summary)
    }
}
