//! Dense linear-algebra helpers over `nalgebra`.

use crate::types::{FolioError, FolioResult};
use nalgebra::DMatrix;

/// Quadratic form xᵀAx.
///
/// Entries of `x` beyond the matrix dimension are ignored.
///
/// # Examples
///
/// ```
/// use folio_core::math::quadratic_form;
/// use nalgebra::DMatrix;
///
/// let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
/// assert_eq!(quadratic_form(&a, &[1.0, 1.0]), 7.0);
/// ```
pub fn quadratic_form(a: &DMatrix<f64>, x: &[f64]) -> f64 {
    let n = a.nrows().min(x.len());
    let mut acc = 0.0;
    for i in 0..n {
        if x[i] == 0.0 {
            continue;
        }
        let mut row = 0.0;
        for j in 0..n {
            row += a[(i, j)] * x[j];
        }
        acc += x[i] * row;
    }
    acc
}

/// Inverse of a symmetric matrix.
///
/// Tries a Cholesky factorisation first and falls back to LU for matrices
/// that are symmetric but not positive definite.
///
/// # Errors
///
/// Returns `FolioError::NumericDegenerate` when the matrix is singular.
pub fn symmetric_inverse(a: &DMatrix<f64>) -> FolioResult<DMatrix<f64>> {
    if let Some(chol) = a.clone().cholesky() {
        return Ok(chol.inverse());
    }
    a.clone()
        .lu()
        .try_inverse()
        .filter(|inv| inv.iter().all(|x| x.is_finite()))
        .ok_or_else(|| {
            FolioError::degenerate(format!("{}x{} matrix is singular", a.nrows(), a.ncols()))
        })
}

/// Factor F of a symmetric positive semi-definite matrix with Σ ≈ F Fᵀ.
///
/// Built from the eigendecomposition with negative eigenvalues (rounding
/// noise on near-singular inputs) clamped to zero, so ‖Fᵀw‖² = wᵀΣw for
/// every w when Σ is PSD.
pub fn psd_factor(sigma: &DMatrix<f64>) -> DMatrix<f64> {
    let eigen = sigma.clone().symmetric_eigen();
    let mut factor = eigen.eigenvectors;
    for (j, lambda) in eigen.eigenvalues.iter().enumerate() {
        let scale = lambda.max(0.0).sqrt();
        factor.column_mut(j).scale_mut(scale);
    }
    factor
}
