//! Sample statistics and annualised moment estimation.
//!
//! All dispersion estimators use the unbiased (n-1) divisor unless the name
//! says `population`. Quantiles interpolate linearly between order
//! statistics (Hyndman-Fan type 7).

use crate::config::TRADING_DAYS_PER_YEAR;
use crate::types::{FolioError, FolioResult, ReturnEstimate, ReturnMatrix};
use nalgebra::{DMatrix, DVector};

/// Arithmetic mean; `0.0` for an empty slice.
#[inline]
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample variance with divisor n-1, `None` below two observations.
pub fn sample_variance(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs);
    let ss: f64 = xs.iter().map(|x| (x - m) * (x - m)).sum();
    Some(ss / (xs.len() - 1) as f64)
}

/// Sample standard deviation with divisor n-1.
#[inline]
pub fn sample_std(xs: &[f64]) -> Option<f64> {
    sample_variance(xs).map(f64::sqrt)
}

/// Population standard deviation with divisor n; `0.0` for an empty slice.
pub fn population_std(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    let ss: f64 = xs.iter().map(|x| (x - m) * (x - m)).sum();
    (ss / xs.len() as f64).sqrt()
}

/// Sample covariance with divisor n-1 over the common prefix of `xs` and `ys`.
pub fn sample_covariance(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let (mx, my) = (mean(xs), mean(ys));
    let s: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    Some(s / (n - 1) as f64)
}

/// Linear-interpolated quantile of an ascending sorted slice.
///
/// `q` is clamped to `[0, 1]`. Returns `NaN` for an empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let h = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }
}

/// Linear-interpolated quantile of an unsorted slice.
pub fn quantile(xs: &[f64], q: f64) -> f64 {
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

/// Estimates annualised moments from daily returns.
///
/// Equivalent to [`estimate_with`] at 252 periods per year.
///
/// # Errors
///
/// Returns `FolioError::InsufficientData` with fewer than two assets or two
/// periods.
pub fn estimate(matrix: &ReturnMatrix) -> FolioResult<ReturnEstimate> {
    estimate_with(matrix, TRADING_DAYS_PER_YEAR)
}

/// Estimates annualised expected returns and covariance.
///
/// μᵢ is the column mean times `periods_per_year`; Σᵢⱼ is the sample
/// covariance times `periods_per_year`. Σ is symmetric by construction.
///
/// # Errors
///
/// Returns `FolioError::InsufficientData` with fewer than two assets or two
/// periods.
pub fn estimate_with(matrix: &ReturnMatrix, periods_per_year: f64) -> FolioResult<ReturnEstimate> {
    let (n, t) = (matrix.n_assets(), matrix.n_periods());
    if n < 2 || t < 2 {
        return Err(FolioError::InsufficientData {
            assets: n,
            periods: t,
        });
    }

    let means: Vec<f64> = matrix.columns().iter().map(|c| mean(c)).collect();
    let mu = DVector::from_iterator(n, means.iter().map(|m| m * periods_per_year));

    let denom = (t - 1) as f64;
    let mut sigma = DMatrix::zeros(n, n);
    for i in 0..n {
        let ci = matrix.column(i);
        for j in i..n {
            let cj = matrix.column(j);
            let s: f64 = ci
                .iter()
                .zip(cj)
                .map(|(a, b)| (a - means[i]) * (b - means[j]))
                .sum();
            let v = s / denom * periods_per_year;
            sigma[(i, j)] = v;
            sigma[(j, i)] = v;
        }
    }

    ReturnEstimate::new(matrix.assets().to_vec(), mu, sigma)
}
