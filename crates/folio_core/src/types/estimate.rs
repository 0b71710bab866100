//! Annualised expected returns and covariance.

use super::error::{FolioError, FolioResult};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Tolerance for the symmetry check on supplied covariance matrices.
const SYMMETRY_TOLERANCE: f64 = 1e-10;

/// Per-asset annualised expected returns and annualised covariance matrix.
///
/// Immutable once built; a changed return matrix produces a new estimate.
/// The covariance may be close to singular, so consumers must not assume it
/// is invertible.
///
/// # Examples
///
/// ```
/// use folio_core::types::ReturnEstimate;
/// use nalgebra::{DMatrix, DVector};
///
/// let est = ReturnEstimate::new(
///     vec!["A".to_string(), "B".to_string()],
///     DVector::from_vec(vec![0.10, 0.06]),
///     DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.04]),
/// )
/// .unwrap();
///
/// assert!((est.portfolio_return(&[0.5, 0.5]) - 0.08).abs() < 1e-12);
/// assert!((est.portfolio_variance(&[0.5, 0.5]) - 0.02).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReturnEstimate {
    assets: Vec<String>,
    expected_returns: DVector<f64>,
    covariance: DMatrix<f64>,
}

impl ReturnEstimate {
    /// Creates an estimate from explicit moments.
    ///
    /// # Errors
    ///
    /// Returns `FolioError::InvalidInput` on shape mismatch, non-finite
    /// entries or an asymmetric covariance matrix, and
    /// `FolioError::InsufficientData` with fewer than two assets.
    pub fn new(
        assets: Vec<String>,
        expected_returns: DVector<f64>,
        covariance: DMatrix<f64>,
    ) -> FolioResult<Self> {
        let n = assets.len();
        if n < 2 {
            return Err(FolioError::InsufficientData {
                assets: n,
                periods: 0,
            });
        }
        if expected_returns.len() != n || covariance.nrows() != n || covariance.ncols() != n {
            return Err(FolioError::invalid_input(format!(
                "estimate shapes disagree: {} assets, {} returns, {}x{} covariance",
                n,
                expected_returns.len(),
                covariance.nrows(),
                covariance.ncols()
            )));
        }
        if expected_returns.iter().chain(covariance.iter()).any(|x| !x.is_finite()) {
            return Err(FolioError::invalid_input("estimate contains non-finite values"));
        }
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (covariance[(i, j)], covariance[(j, i)]);
                if (a - b).abs() > SYMMETRY_TOLERANCE * (1.0 + a.abs().max(b.abs())) {
                    return Err(FolioError::invalid_input(format!(
                        "covariance is not symmetric at ({}, {})",
                        i, j
                    )));
                }
            }
        }

        Ok(Self {
            assets,
            expected_returns,
            covariance,
        })
    }

    /// Asset names in estimate order.
    #[inline]
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Number of assets.
    #[inline]
    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Annualised expected return vector μ.
    #[inline]
    pub fn expected_returns(&self) -> &DVector<f64> {
        &self.expected_returns
    }

    /// Annualised covariance matrix Σ.
    #[inline]
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Position of an asset in the universe.
    pub fn asset_index(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    /// Smallest expected return, min(μ).
    pub fn min_return(&self) -> f64 {
        self.expected_returns.min()
    }

    /// Largest expected return, max(μ).
    pub fn max_return(&self) -> f64 {
        self.expected_returns.max()
    }

    /// Portfolio expected return μᵀw.
    pub fn portfolio_return(&self, weights: &[f64]) -> f64 {
        self.expected_returns
            .iter()
            .zip(weights)
            .map(|(m, w)| m * w)
            .sum()
    }

    /// Portfolio variance wᵀΣw, clamped at zero.
    pub fn portfolio_variance(&self, weights: &[f64]) -> f64 {
        crate::math::linalg::quadratic_form(&self.covariance, weights).max(0.0)
    }

    /// Portfolio volatility √(wᵀΣw).
    pub fn portfolio_volatility(&self, weights: &[f64]) -> f64 {
        self.portfolio_variance(weights).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("A{}", i)).collect()
    }

    #[test]
    fn test_rejects_single_asset() {
        let result = ReturnEstimate::new(
            names(1),
            DVector::from_vec(vec![0.1]),
            DMatrix::from_row_slice(1, 1, &[0.04]),
        );
        assert!(matches!(result, Err(FolioError::InsufficientData { .. })));
    }

    #[test]
    fn test_rejects_asymmetric_covariance() {
        let result = ReturnEstimate::new(
            names(2),
            DVector::from_vec(vec![0.1, 0.2]),
            DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.02, 0.09]),
        );
        assert!(matches!(result, Err(FolioError::InvalidInput(_))));
    }

    #[test]
    fn test_min_max_return() {
        let est = ReturnEstimate::new(
            names(3),
            DVector::from_vec(vec![0.05, 0.12, 0.08]),
            DMatrix::identity(3, 3) * 0.04,
        )
        .unwrap();
        assert_eq!(est.min_return(), 0.05);
        assert_eq!(est.max_return(), 0.12);
        assert_eq!(est.asset_index("A2"), Some(2));
    }
}
