//! Optimise command implementation
//!
//! Estimates the return file and runs the mean-variance optimiser or the
//! Black-Litterman blender.

use folio_core::config::EngineConfig;
use folio_core::stats::estimate_with;
use folio_core::types::{Algorithm, AllocationRequest, RiskTolerance};
use folio_optimiser::canonical_market_weights;
use std::path::Path;
use tracing::{info, warn};

use super::print_json;
use crate::data::{load_returns, parse_assignments};
use crate::Result;

/// Options of the optimise command
#[derive(Debug, Clone, Default)]
pub struct OptimiseArgs {
    /// Algorithm selector
    pub algorithm: Algorithm,
    /// Risk-tolerance tier
    pub risk_tolerance: RiskTolerance,
    /// Optional target return
    pub target_return: Option<f64>,
    /// `ASSET=RETURN` investor views
    pub views: Vec<String>,
    /// `ASSET=CAP` market weights
    pub market_weights: Vec<String>,
    /// Optional investment amount
    pub investment_amount: Option<f64>,
}

/// Builds the allocation request from command options.
pub fn build_request(args: &OptimiseArgs) -> Result<AllocationRequest> {
    let mut request = match args.algorithm {
        Algorithm::MeanVariance => AllocationRequest::mean_variance(args.risk_tolerance),
        Algorithm::BlackLitterman => {
            let market = if args.market_weights.is_empty() {
                info!("No market weights given, using canonical capitalisation weights");
                canonical_market_weights()
            } else {
                parse_assignments(&args.market_weights)?
            };
            AllocationRequest::black_litterman(args.risk_tolerance, market)
        }
    };
    if let Some(target) = args.target_return {
        request = request.with_target_return(target);
    }
    if !args.views.is_empty() {
        request = request.with_views(parse_assignments(&args.views)?);
    }
    if let Some(amount) = args.investment_amount {
        request = request.with_investment_amount(amount);
    }
    Ok(request)
}

/// Run the optimise command
pub fn run(returns: &Path, args: &OptimiseArgs, engine: &EngineConfig) -> Result<()> {
    let matrix = load_returns(returns)?;
    let estimate = estimate_with(&matrix, engine.periods_per_year)?;
    let request = build_request(args)?;

    let result = folio_optimiser::optimize(&estimate, &request, engine)?;
    match result.status.cause() {
        None => info!(
            algorithm = %result.algorithm,
            expected_return = result.expected_return,
            volatility = result.volatility,
            "Allocation complete"
        ),
        Some(cause) => warn!(%cause, "Allocation fell back"),
    }

    print_json(&result)
}
