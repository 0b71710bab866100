//! # folio_optimiser
//!
//! Constrained portfolio construction for folio.
//!
//! ## Architecture Position
//!
//! Layer 2 of the engine. Depends only on `folio_core` (L1) and is consumed
//! by the service layer.
//!
//! ## Modules
//!
//! - `problem`: Convex conic problem builder over the Clarabel interior-point solver
//! - `mean_variance`: Long-only Markowitz optimiser (target-return and max-Sharpe)
//! - `black_litterman`: Equilibrium/view blending and utility maximisation
//! - `frontier`: Parallel efficient frontier sweep
//! - `allocation`: Result assembly and the [`optimize`] request dispatcher
//!
//! ## Failure Policy
//!
//! Solver infeasibility never surfaces as an `Err`. Every allocation carries
//! an [`AllocationStatus`](folio_core::types::AllocationStatus): `Success`,
//! or `Fallback` with the triggering cause and deterministic fallback weights
//! (equal weights for mean-variance, market weights for Black-Litterman).
//!
//! ## Example
//!
//! ```rust
//! use folio_core::config::EngineConfig;
//! use folio_core::types::{AllocationRequest, ReturnEstimate, RiskTolerance};
//! use folio_optimiser::optimize;
//! use nalgebra::{DMatrix, DVector};
//!
//! let estimate = ReturnEstimate::new(
//!     vec!["A".into(), "B".into()],
//!     DVector::from_vec(vec![0.10, 0.06]),
//!     DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.04]),
//! )
//! .unwrap();
//!
//! let request = AllocationRequest::mean_variance(RiskTolerance::Moderate).with_target_return(0.08);
//! let result = optimize(&estimate, &request, &EngineConfig::default()).unwrap();
//! assert!(result.status.is_success());
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod allocation;
pub mod black_litterman;
pub mod frontier;
pub mod mean_variance;
pub mod problem;

pub use allocation::{allocation_map, optimize, PortfolioMetrics};
pub use black_litterman::{
    canonical_market_weights, normalise_market_weights, BlackLittermanBlender, Posterior,
};
pub use frontier::{frontier, EfficientFrontier, FrontierPoint};
pub use mean_variance::MeanVarianceOptimiser;

use folio_core::config::EngineConfig;
use folio_core::types::{AllocationResult, AssetMap, FolioResult, ReturnEstimate, RiskTolerance};

/// Blends market weights and views, then optimises the posterior utility.
///
/// Shorthand for [`BlackLittermanBlender::blend`].
///
/// # Errors
///
/// Returns `FolioError::InvalidMarketWeights` if the weights do not cover
/// the universe or sum to zero.
pub fn blend(
    estimate: &ReturnEstimate,
    market_weights: &AssetMap,
    views: Option<&AssetMap>,
    tier: RiskTolerance,
    config: &EngineConfig,
) -> FolioResult<AllocationResult> {
    BlackLittermanBlender::new(config.clone()).blend(estimate, market_weights, views, tier)
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{blend, frontier, optimize};
    pub use crate::{BlackLittermanBlender, EfficientFrontier, MeanVarianceOptimiser};
}
