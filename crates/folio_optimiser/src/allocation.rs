//! Result assembly and the request dispatcher.

use crate::black_litterman::BlackLittermanBlender;
use crate::mean_variance::MeanVarianceOptimiser;
use folio_core::config::EngineConfig;
use folio_core::types::{
    Algorithm, AllocationRequest, AllocationResult, AllocationStatus, FolioError, FolioResult,
    ReturnEstimate, RiskTolerance,
};
use std::collections::BTreeMap;

/// Expected return, volatility and Sharpe ratio of a weight vector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PortfolioMetrics {
    /// μᵀw.
    pub expected_return: f64,
    /// √(wᵀΣw).
    pub volatility: f64,
    /// (μᵀw − r_f) / √(wᵀΣw), zero when the volatility is zero.
    pub sharpe_ratio: f64,
}

impl PortfolioMetrics {
    /// Evaluates `weights` against an estimate.
    pub fn evaluate(estimate: &ReturnEstimate, weights: &[f64], risk_free_rate: f64) -> Self {
        let expected_return = estimate.portfolio_return(weights);
        let volatility = estimate.portfolio_volatility(weights);
        let sharpe_ratio = if volatility > 0.0 {
            (expected_return - risk_free_rate) / volatility
        } else {
            0.0
        };
        Self {
            expected_return,
            volatility,
            sharpe_ratio,
        }
    }
}

/// Percentage allocation of assets whose weight exceeds `threshold`.
pub fn allocation_map(assets: &[String], weights: &[f64], threshold: f64) -> BTreeMap<String, f64> {
    assets
        .iter()
        .zip(weights)
        .filter(|(_, &w)| w > threshold)
        .map(|(asset, &w)| (asset.clone(), w * 100.0))
        .collect()
}

/// Builds a result with metrics computed from `weights` against `estimate`.
pub(crate) fn assemble_result(
    algorithm: Algorithm,
    tier: RiskTolerance,
    estimate: &ReturnEstimate,
    weights: Vec<f64>,
    status: AllocationStatus,
    config: &EngineConfig,
) -> AllocationResult {
    let metrics = PortfolioMetrics::evaluate(estimate, &weights, config.risk_free_rate);
    let allocation = allocation_map(estimate.assets(), &weights, config.allocation_threshold);
    AllocationResult {
        algorithm,
        risk_tolerance: tier,
        assets: estimate.assets().to_vec(),
        weights,
        allocation,
        expected_return: metrics.expected_return,
        volatility: metrics.volatility,
        sharpe_ratio: metrics.sharpe_ratio,
        status,
        equilibrium_returns: None,
        posterior_returns: None,
        investment_amount: None,
        currency_allocation: None,
    }
}

/// Runs an allocation request.
///
/// Infeasibility never surfaces as an error: the result carries
/// `AllocationStatus::Fallback` with the cause instead.
///
/// # Errors
///
/// Returns `FolioError::InvalidMarketWeights` for a Black-Litterman request
/// whose market weights are missing or malformed, and
/// `FolioError::InvalidInput` for a non-finite or negative investment amount.
///
/// # Examples
///
/// ```
/// use folio_core::config::EngineConfig;
/// use folio_core::types::{AllocationRequest, ReturnEstimate, RiskTolerance};
/// use folio_optimiser::optimize;
/// use nalgebra::{DMatrix, DVector};
///
/// let estimate = ReturnEstimate::new(
///     vec!["A".into(), "B".into(), "C".into()],
///     DVector::from_vec(vec![0.12, 0.09, 0.07]),
///     DMatrix::from_diagonal(&DVector::from_vec(vec![0.04, 0.02, 0.01])),
/// )
/// .unwrap();
///
/// let request = AllocationRequest::mean_variance(RiskTolerance::Moderate)
///     .with_investment_amount(100_000.0);
/// let result = optimize(&estimate, &request, &EngineConfig::default()).unwrap();
///
/// assert!((result.weights.iter().sum::<f64>() - 1.0).abs() < 1e-6);
/// assert!(result.currency_allocation.is_some());
/// ```
pub fn optimize(
    estimate: &ReturnEstimate,
    request: &AllocationRequest,
    config: &EngineConfig,
) -> FolioResult<AllocationResult> {
    if let Some(amount) = request.investment_amount {
        if !amount.is_finite() || amount < 0.0 {
            return Err(FolioError::invalid_input(format!(
                "investment amount must be a non-negative number, got {}",
                amount
            )));
        }
    }

    let result = match request.algorithm {
        Algorithm::MeanVariance => MeanVarianceOptimiser::new(config.clone()).optimise(
            estimate,
            request.risk_tolerance,
            request.target_return,
        ),
        Algorithm::BlackLitterman => {
            let market_weights = request.market_weights.as_ref().ok_or_else(|| {
                FolioError::market_weights("Black-Litterman requires market capitalisation weights")
            })?;
            BlackLittermanBlender::new(config.clone()).blend(
                estimate,
                market_weights,
                request.views.as_ref(),
                request.risk_tolerance,
            )?
        }
    };

    Ok(result.with_investment_amount(request.investment_amount))
}
