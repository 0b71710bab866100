//! Error types for structured error handling.
//!
//! This module provides [`FolioError`], the taxonomy shared by every layer:
//! - `InsufficientData`: too few assets or periods for a covariance estimate
//! - `InvalidMarketWeights`: malformed Black-Litterman market weights
//! - `SolverInfeasible`: the constrained problem has no feasible point
//! - `NumericDegenerate`: a zero variance or singular matrix blocks a division
//! - `InvalidInput`: structurally invalid input (shapes, NaN cells, ranges)
//!
//! Only `InsufficientData`, `InvalidMarketWeights` and `InvalidInput` ever
//! reach a caller as `Err`. The other two are recovered where they occur and
//! surface as a fallback status or a sentinel value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Categorised engine errors.
///
/// # Examples
/// ```
/// use folio_core::types::FolioError;
///
/// let err = FolioError::InsufficientData { assets: 1, periods: 10 };
/// assert_eq!(
///     format!("{}", err),
///     "Insufficient data: 1 assets x 10 periods (need at least 2 x 2)"
/// );
/// ```
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FolioError {
    /// Too few assets or observed periods to estimate a covariance matrix.
    #[error("Insufficient data: {assets} assets x {periods} periods (need at least 2 x 2)")]
    InsufficientData {
        /// Number of assets supplied
        assets: usize,
        /// Number of periods supplied
        periods: usize,
    },

    /// Market capitalisation weights do not cover the universe or sum to zero.
    #[error("Invalid market weights: {0}")]
    InvalidMarketWeights(String),

    /// The constrained problem has no feasible point or failed to converge.
    #[error("Solver infeasible: {0}")]
    SolverInfeasible(String),

    /// A zero variance or singular matrix prevented a computation.
    #[error("Numeric degenerate: {0}")]
    NumericDegenerate(String),

    /// Structurally invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl FolioError {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an infeasible solver error.
    pub fn infeasible(msg: impl Into<String>) -> Self {
        Self::SolverInfeasible(msg.into())
    }

    /// Create a numeric degeneracy error.
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::NumericDegenerate(msg.into())
    }

    /// Create an invalid market weights error.
    pub fn market_weights(msg: impl Into<String>) -> Self {
        Self::InvalidMarketWeights(msg.into())
    }

    /// Whether this error is recovered locally rather than aborting a request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SolverInfeasible(_) | Self::NumericDegenerate(_)
        )
    }
}

/// Result alias used throughout the engine.
pub type FolioResult<T> = Result<T, FolioError>;
