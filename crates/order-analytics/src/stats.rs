//! Correlation helpers for the scatter panels.

use statrs::statistics::Statistics;

/// Pearson correlation coefficient of two equally long series.
///
/// Returns `None` for fewer than two pairs, mismatched lengths, or when
/// either series has no variance.
#[must_use]
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let covariance = xs.iter().covariance(ys.iter());
    let spread = xs.iter().std_dev() * ys.iter().std_dev();
    let r = covariance / spread;

    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}
