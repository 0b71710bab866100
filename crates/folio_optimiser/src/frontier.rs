//! Efficient frontier sweep.

use crate::mean_variance::MeanVarianceOptimiser;
use folio_core::config::EngineConfig;
use folio_core::types::{ReturnEstimate, RiskTolerance};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One efficient portfolio.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    /// Target return requested for this point.
    pub target_return: f64,
    /// Achieved expected return.
    pub expected_return: f64,
    /// Achieved volatility.
    pub volatility: f64,
    /// Sharpe ratio against the frontier's risk-free rate.
    pub sharpe_ratio: f64,
}

/// Successful frontier points in ascending target order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EfficientFrontier {
    /// Points whose solve succeeded.
    pub points: Vec<FrontierPoint>,
    /// Risk-free rate used for the Sharpe ratios.
    pub risk_free_rate: f64,
}

impl EfficientFrontier {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no point succeeded.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point with the highest Sharpe ratio.
    pub fn max_sharpe(&self) -> Option<&FrontierPoint> {
        self.points
            .iter()
            .max_by(|a, b| a.sharpe_ratio.total_cmp(&b.sharpe_ratio))
    }
}

/// `n` evenly spaced values from `lo` to `hi` inclusive.
fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { hi } else { lo + step * i as f64 })
                .collect()
        }
    }
}

/// Traces the efficient frontier.
///
/// Sweeps `n_points` targets evenly across `[min(μ), max(μ)]` through the
/// moderate-tier optimiser. Points are solved in parallel; points that fall
/// back are dropped.
///
/// # Examples
///
/// ```
/// use folio_core::config::EngineConfig;
/// use folio_core::types::ReturnEstimate;
/// use folio_optimiser::frontier;
/// use nalgebra::{DMatrix, DVector};
///
/// let estimate = ReturnEstimate::new(
///     vec!["A".into(), "B".into(), "C".into()],
///     DVector::from_vec(vec![0.12, 0.09, 0.05]),
///     DMatrix::from_diagonal(&DVector::from_vec(vec![0.04, 0.02, 0.01])),
/// )
/// .unwrap();
///
/// let frontier = frontier(&estimate, 0.06, 10, &EngineConfig::default());
/// assert!(!frontier.is_empty());
/// assert!(frontier.points.windows(2).all(|w| w[0].target_return <= w[1].target_return));
/// ```
#[tracing::instrument(skip_all, fields(n_assets = estimate.n_assets(), n_points = n_points))]
pub fn frontier(
    estimate: &ReturnEstimate,
    risk_free_rate: f64,
    n_points: usize,
    config: &EngineConfig,
) -> EfficientFrontier {
    let optimiser = MeanVarianceOptimiser::new(config.clone().with_risk_free_rate(risk_free_rate));
    let targets = linspace(estimate.min_return(), estimate.max_return(), n_points);

    let solved: Vec<Option<FrontierPoint>> = targets
        .par_iter()
        .map(|&target| {
            let result = optimiser.optimise(estimate, RiskTolerance::Moderate, Some(target));
            if !result.status.is_success() {
                debug!(target, "dropping frontier point that fell back");
                return None;
            }
            Some(FrontierPoint {
                target_return: target,
                expected_return: result.expected_return,
                volatility: result.volatility,
                sharpe_ratio: result.sharpe_ratio,
            })
        })
        .collect();

    let points: Vec<FrontierPoint> = solved.into_iter().flatten().collect();
    info!(requested = n_points, solved = points.len(), "efficient frontier traced");
    EfficientFrontier {
        points,
        risk_free_rate,
    }
}
