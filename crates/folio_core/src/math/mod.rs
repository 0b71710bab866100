//! Numerical building blocks.
//!
//! ## Available Helpers
//!
//! - [`linalg::quadratic_form`]: xᵀAx for a dense matrix
//! - [`linalg::symmetric_inverse`]: inverse of a symmetric matrix, Cholesky first
//! - [`linalg::psd_factor`]: factor F with Σ ≈ F Fᵀ for second-order cones

pub mod linalg;

pub use linalg::{psd_factor, quadratic_form, symmetric_inverse};
