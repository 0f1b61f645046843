#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
//! Pareto smoothed importance sampling (PSIS) and PSIS leave-one-out
//! cross-validation for posterior draws held in `ndarray` arrays.
//!
//! - [`gpd`]: generalized Pareto tail fit and inverse CDF.
//! - [`smooth`]: Pareto smoothing of log importance weights.
//! - [`loo`]: leave-one-out log predictive densities built on the smoother.
//! - [`data`]: pointwise log-likelihood draws read from sampler CSV output.
//!
//! References: Vehtari, Gelman & Gabry (2017), "Practical Bayesian model
//! evaluation using leave-one-out cross-validation and WAIC"; Vehtari, Simpson,
//! Gelman, Yao & Gabry (2024), "Pareto smoothed importance sampling".

pub mod config;
pub mod data;
pub mod gpd;
pub mod logsumexp;
pub mod loo;
pub mod smooth;
pub mod types;

pub use config::{ConfigError, PsisConfig};
pub use data::{DataError, load_log_lik_csv, read_log_lik_csv};
pub use gpd::{GpdError, GpdFit, SortHint, gpdfit, gpdfit_in_place, gpinv};
pub use logsumexp::{sumlogs, sumlogs_axis, sumlogs_axis_into};
pub use loo::{LooSummary, ParetoKCounts, PsisLoo, psisloo};
pub use smooth::{PsisError, psislw, psislw_in_place, psislw_owned};
pub use types::{ParetoKCategory, TailIndices};
