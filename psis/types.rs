// ========================================================================================
//                             Shared Diagnostic Types
// ========================================================================================

// Only types used by more than one module live here.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest Pareto k for which the importance sampling estimate is considered good.
pub const GOOD_K_THRESHOLD: f64 = 0.5;
/// Largest Pareto k for which the smoothed estimate is still considered reliable.
pub const OK_K_THRESHOLD: f64 = 0.7;
/// Above this k the tail has no finite mean.
pub const BAD_K_THRESHOLD: f64 = 1.0;

/// Estimated Pareto tail indices, one per smoothed set of log weights.
///
/// One-dimensional input is a single set of weights and yields a `Scalar`;
/// a draws × columns matrix yields one index per column. `+inf` marks a column
/// whose tail was too small to fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TailIndices {
    Scalar(f64),
    Columns(Array1<f64>),
}

impl TailIndices {
    /// Number of tail indices (1 for a scalar).
    pub fn len(&self) -> usize {
        match self {
            TailIndices::Scalar(_) => 1,
            TailIndices::Columns(ks) => ks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The index of one-dimensional input, `None` for per-column indices.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            TailIndices::Scalar(k) => Some(*k),
            TailIndices::Columns(_) => None,
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            TailIndices::Scalar(k) => vec![*k],
            TailIndices::Columns(ks) => ks.to_vec(),
        }
    }

    pub fn categories(&self) -> Vec<ParetoKCategory> {
        self.to_vec()
            .into_iter()
            .map(ParetoKCategory::from_k)
            .collect()
    }

    /// Number of indices above [`OK_K_THRESHOLD`], skipped fits included.
    pub fn count_unreliable(&self) -> usize {
        self.to_vec()
            .into_iter()
            .filter(|&k| k > OK_K_THRESHOLD || k.is_nan())
            .count()
    }
}

/// Reliability class of a Pareto k estimate, following Vehtari, Gelman & Gabry (2017).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParetoKCategory {
    /// `k <= 0.5`
    Good,
    /// `0.5 < k <= 0.7`
    Ok,
    /// `0.7 < k <= 1`
    Bad,
    /// `k > 1`, including skipped fits (`+inf`) and `NaN`.
    VeryBad,
}

impl ParetoKCategory {
    pub fn from_k(k: f64) -> Self {
        if k <= GOOD_K_THRESHOLD {
            ParetoKCategory::Good
        } else if k <= OK_K_THRESHOLD {
            ParetoKCategory::Ok
        } else if k <= BAD_K_THRESHOLD {
            ParetoKCategory::Bad
        } else {
            ParetoKCategory::VeryBad
        }
    }
}

impl fmt::Display for ParetoKCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ParetoKCategory::Good => "good",
            ParetoKCategory::Ok => "ok",
            ParetoKCategory::Bad => "bad",
            ParetoKCategory::VeryBad => "very bad",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn categories_follow_thresholds() {
        assert_eq!(ParetoKCategory::from_k(-0.2), ParetoKCategory::Good);
        assert_eq!(ParetoKCategory::from_k(0.5), ParetoKCategory::Good);
        assert_eq!(ParetoKCategory::from_k(0.6), ParetoKCategory::Ok);
        assert_eq!(ParetoKCategory::from_k(0.7), ParetoKCategory::Ok);
        assert_eq!(ParetoKCategory::from_k(0.95), ParetoKCategory::Bad);
        assert_eq!(ParetoKCategory::from_k(1.3), ParetoKCategory::VeryBad);
        assert_eq!(ParetoKCategory::from_k(f64::INFINITY), ParetoKCategory::VeryBad);
        assert_eq!(ParetoKCategory::from_k(f64::NAN), ParetoKCategory::VeryBad);
        assert_eq!(ParetoKCategory::VeryBad.to_string(), "very bad");
    }

    #[test]
    fn scalar_and_column_accessors() {
        let scalar = TailIndices::Scalar(0.4);
        assert_eq!(scalar.len(), 1);
        assert_eq!(scalar.as_scalar(), Some(0.4));
        assert_eq!(scalar.to_vec(), vec![0.4]);

        let columns = TailIndices::Columns(array![0.1, 0.8, f64::INFINITY]);
        assert_eq!(columns.len(), 3);
        assert!(!columns.is_empty());
        assert_eq!(columns.as_scalar(), None);
        assert_eq!(columns.count_unreliable(), 2);
        assert_eq!(
            columns.categories(),
            vec![
                ParetoKCategory::Good,
                ParetoKCategory::Bad,
                ParetoKCategory::VeryBad
            ]
        );
    }
}
