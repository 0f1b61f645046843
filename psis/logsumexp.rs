//! Numerically stable log-sum-exp reductions.

use ndarray::{Array, ArrayView, ArrayViewMut, Axis, Dimension, RemoveAxis, Zip};

/// `ln(sum(exp(x)))` over every element of `x`, shifted by the maximum so that
/// the largest term is `exp(0)`.
///
/// An empty input is the log of an empty sum, `-inf`. A non-finite maximum is
/// returned as is, so an all `-inf` input stays `-inf` instead of becoming `NaN`.
pub fn sumlogs<D: Dimension>(x: ArrayView<f64, D>) -> f64 {
    let max = x.fold(f64::NEG_INFINITY, |acc, &value| acc.max(value));
    if !max.is_finite() {
        return max;
    }
    let total = x.fold(0.0, |acc, &value| acc + (value - max).exp());
    max + total.ln()
}

/// Log-sum-exp of every lane of `x` along `axis`.
pub fn sumlogs_axis<D: RemoveAxis>(x: ArrayView<f64, D>, axis: Axis) -> Array<f64, D::Smaller> {
    let mut out = Array::zeros(x.raw_dim().remove_axis(axis));
    sumlogs_axis_into(x, axis, out.view_mut());
    out
}

/// Like [`sumlogs_axis`], but writes into a caller-provided output.
///
/// # Panics
/// If `out` does not have the shape of `x` with `axis` removed.
pub fn sumlogs_axis_into<D: RemoveAxis>(
    x: ArrayView<f64, D>,
    axis: Axis,
    mut out: ArrayViewMut<f64, D::Smaller>,
) {
    assert_eq!(
        out.raw_dim(),
        x.raw_dim().remove_axis(axis),
        "Output shape does not match the reduced input shape in sumlogs_axis_into"
    );
    Zip::from(&mut out)
        .and(x.lanes(axis))
        .for_each(|slot, lane| *slot = sumlogs(lane));
}
