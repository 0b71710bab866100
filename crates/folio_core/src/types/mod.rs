//! Data model of the allocation engine.
//!
//! - [`ReturnMatrix`]: dated periodic returns, one column per asset
//! - [`ReturnEstimate`]: annualised expected returns and covariance
//! - [`AllocationRequest`] / [`AllocationResult`]: optimiser input and output
//! - [`PortfolioWeights`]: normalised weights used for risk analysis
//! - [`FolioError`]: error taxonomy

pub mod allocation;
pub mod error;
pub mod estimate;
pub mod matrix;

pub use allocation::{
    Algorithm, AllocationRequest, AllocationResult, AllocationStatus, AssetMap, PortfolioWeights,
    RiskTolerance,
};
pub use error::{FolioError, FolioResult};
pub use estimate::ReturnEstimate;
pub use matrix::ReturnMatrix;
