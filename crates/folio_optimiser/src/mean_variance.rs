//! Long-only mean-variance (Markowitz) optimiser.
//!
//! Two formulations, both convex:
//!
//! - **Target return**: minimise wᵀΣw subject to μᵀw ≥ target.
//! - **Maximum Sharpe**: maximise (μᵀw − r_f)/√(wᵀΣw). Solved through the
//!   homogenised variables `y = κw`, `κ ≥ 0` with the normalisation
//!   `(μ − r_f)ᵀy = 1`, which turns the ratio into minimising yᵀΣy.
//!
//! Both share the fully-invested, long-only and concentration constraints,
//! plus the tier constraint: a volatility ceiling (second-order cone) for
//! conservative, a return floor for aggressive.
//!
//! Any failure falls back to equal weights with `AllocationStatus::Fallback`.

use crate::allocation::assemble_result;
use crate::problem::ConicProblem;
use folio_core::config::EngineConfig;
use folio_core::math::psd_factor;
use folio_core::types::{
    Algorithm, AllocationResult, AllocationStatus, FolioError, FolioResult, ReturnEstimate,
    RiskTolerance,
};
use tracing::{debug, info, warn};

/// Slack on the `[min(μ), max(μ)]` range check for target returns.
const TARGET_RANGE_SLACK: f64 = 1e-12;

/// Homogenising scale below which the Sharpe solution is treated as degenerate.
const MIN_HOMOGENISING_SCALE: f64 = 1e-12;

/// Mean-variance optimiser over a fixed engine configuration.
///
/// # Examples
///
/// ```
/// use folio_core::types::{ReturnEstimate, RiskTolerance};
/// use folio_optimiser::MeanVarianceOptimiser;
/// use nalgebra::{DMatrix, DVector};
///
/// let estimate = ReturnEstimate::new(
///     vec!["A".into(), "B".into()],
///     DVector::from_vec(vec![0.10, 0.06]),
///     DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.04]),
/// )
/// .unwrap();
///
/// let result = MeanVarianceOptimiser::default().optimise(&estimate, RiskTolerance::Moderate, Some(0.08));
/// assert!(result.status.is_success());
/// assert!((result.weights[0] - 0.5).abs() < 1e-4);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MeanVarianceOptimiser {
    config: EngineConfig,
}

impl MeanVarianceOptimiser {
    /// Creates an optimiser with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Engine configuration in use.
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Optimises the allocation; never fails.
    ///
    /// With `target_return` the variance is minimised subject to the
    /// target; otherwise the Sharpe ratio is maximised.
    #[tracing::instrument(skip_all, fields(algorithm = "MPT", n_assets = estimate.n_assets(), tier = %tier))]
    pub fn optimise(
        &self,
        estimate: &ReturnEstimate,
        tier: RiskTolerance,
        target_return: Option<f64>,
    ) -> AllocationResult {
        let solved = match target_return {
            Some(target) => self.min_variance_for_target(estimate, tier, target),
            None => self.max_sharpe(estimate, tier),
        };

        let (weights, status) = match solved {
            Ok(weights) => {
                info!("mean-variance allocation solved");
                (weights, AllocationStatus::Success)
            }
            Err(cause) => {
                warn!(%cause, "mean-variance solve failed, falling back to equal weights");
                let n = estimate.n_assets();
                (vec![1.0 / n as f64; n], AllocationStatus::Fallback { cause })
            }
        };

        assemble_result(
            Algorithm::MeanVariance,
            tier,
            estimate,
            weights,
            status,
            &self.config,
        )
    }

    fn min_variance_for_target(
        &self,
        estimate: &ReturnEstimate,
        tier: RiskTolerance,
        target: f64,
    ) -> FolioResult<Vec<f64>> {
        let (lo, hi) = (estimate.min_return(), estimate.max_return());
        if !target.is_finite() || target < lo - TARGET_RANGE_SLACK || target > hi + TARGET_RANGE_SLACK
        {
            return Err(FolioError::infeasible(format!(
                "target return {:.6} outside achievable range [{:.6}, {:.6}]",
                target, lo, hi
            )));
        }

        let n = estimate.n_assets();
        if self.config.cap_pins_equal_weights(n) {
            return self.pinned_weights(estimate, tier, Some(target));
        }
        let cap = self.config.effective_max_weight(n);
        let mu: Vec<f64> = estimate.expected_returns().iter().copied().collect();
        debug!(target, cap, "minimising variance for target return");

        let mut problem = ConicProblem::new(n).with_quadratic(estimate.covariance() * 2.0);
        problem.equality(vec![1.0; n], 1.0);
        problem.bounds(0..n, 0.0, cap);
        problem.inequality(mu.iter().map(|m| -m).collect(), -target);

        match tier {
            RiskTolerance::Aggressive => {
                problem.inequality(
                    mu.iter().map(|m| -m).collect(),
                    -self.config.aggressive_min_return,
                );
            }
            RiskTolerance::Conservative => {
                let (rows, rhs) = self.volatility_cone(estimate, None);
                problem.second_order_cone(rows, rhs);
            }
            RiskTolerance::Moderate => {}
        }

        let x = problem.solve(&self.config.solver)?;
        Ok(clip_and_normalise(&x, cap))
    }

    fn max_sharpe(&self, estimate: &ReturnEstimate, tier: RiskTolerance) -> FolioResult<Vec<f64>> {
        let n = estimate.n_assets();
        let rf = self.config.risk_free_rate;
        let cap = self.config.effective_max_weight(n);
        let mu: Vec<f64> = estimate.expected_returns().iter().copied().collect();

        if estimate.max_return() - rf <= 0.0 {
            return Err(FolioError::infeasible(format!(
                "no asset returns more than the risk-free rate {:.4}",
                rf
            )));
        }
        if self.config.cap_pins_equal_weights(n) {
            return self.pinned_weights(estimate, tier, None);
        }
        debug!(rf, cap, "maximising Sharpe ratio");

        // Variables: y (n), κ (1)
        let k = n;
        let mut quadratic = nalgebra::DMatrix::zeros(n + 1, n + 1);
        quadratic
            .view_mut((0, 0), (n, n))
            .copy_from(&(estimate.covariance() * 2.0));
        let mut problem = ConicProblem::new(n + 1).with_quadratic(quadratic);

        let mut budget = vec![1.0; n + 1];
        budget[k] = -1.0;
        problem.equality(budget, 0.0);

        let mut excess: Vec<f64> = mu.iter().map(|m| m - rf).collect();
        excess.push(0.0);
        problem.equality(excess, 1.0);

        for i in 0..n {
            let mut lower = vec![0.0; n + 1];
            lower[i] = -1.0;
            problem.inequality(lower, 0.0);

            let mut upper = vec![0.0; n + 1];
            upper[i] = 1.0;
            upper[k] = -cap;
            problem.inequality(upper, 0.0);
        }
        let mut scale = vec![0.0; n + 1];
        scale[k] = -1.0;
        problem.inequality(scale, 0.0);

        match tier {
            RiskTolerance::Aggressive => {
                let mut floor: Vec<f64> = mu.iter().map(|m| -m).collect();
                floor.push(self.config.aggressive_min_return);
                problem.inequality(floor, 0.0);
            }
            RiskTolerance::Conservative => {
                let (rows, rhs) = self.volatility_cone(estimate, Some(k));
                problem.second_order_cone(rows, rhs);
            }
            RiskTolerance::Moderate => {}
        }

        let x = problem.solve(&self.config.solver)?;
        let kappa = x[k];
        if !(kappa > MIN_HOMOGENISING_SCALE) {
            return Err(FolioError::degenerate(format!(
                "homogenising scale collapsed to {:e}",
                kappa
            )));
        }
        let weights: Vec<f64> = x[..n].iter().map(|y| y / kappa).collect();
        Ok(clip_and_normalise(&weights, cap))
    }

    /// The equal-weight portfolio, the only point a cap of exactly `1/n`
    /// admits, checked against the return floor and the tier constraint.
    fn pinned_weights(
        &self,
        estimate: &ReturnEstimate,
        tier: RiskTolerance,
        target: Option<f64>,
    ) -> FolioResult<Vec<f64>> {
        let n = estimate.n_assets();
        let weights = vec![1.0 / n as f64; n];
        let expected = estimate.portfolio_return(&weights);

        let floor = match tier {
            RiskTolerance::Aggressive => Some(
                target.map_or(self.config.aggressive_min_return, |t| {
                    t.max(self.config.aggressive_min_return)
                }),
            ),
            _ => target,
        };
        if let Some(floor) = floor {
            if expected < floor - TARGET_RANGE_SLACK {
                return Err(FolioError::infeasible(format!(
                    "cap admits only equal weights, whose return {:.6} is below {:.6}",
                    expected, floor
                )));
            }
        }
        if tier == RiskTolerance::Conservative {
            let volatility = estimate.portfolio_volatility(&weights);
            if volatility > self.config.conservative_max_volatility + TARGET_RANGE_SLACK {
                return Err(FolioError::infeasible(format!(
                    "cap admits only equal weights, whose volatility {:.6} exceeds {:.6}",
                    volatility, self.config.conservative_max_volatility
                )));
            }
        }
        debug!(n, "concentration cap pins equal weights");
        Ok(weights)
    }

    /// Rows of `‖Fᵀw‖ ≤ σ_max`, or `‖Fᵀy‖ ≤ σ_max κ` when `scale_index`
    /// names the homogenising variable.
    fn volatility_cone(
        &self,
        estimate: &ReturnEstimate,
        scale_index: Option<usize>,
    ) -> (Vec<Vec<f64>>, Vec<f64>) {
        let n = estimate.n_assets();
        let n_vars = n + usize::from(scale_index.is_some());
        let sigma_max = self.config.conservative_max_volatility;
        let factor = psd_factor(estimate.covariance());

        let mut rows = Vec::with_capacity(n + 1);
        let mut rhs = Vec::with_capacity(n + 1);

        let mut head = vec![0.0; n_vars];
        match scale_index {
            Some(k) => {
                head[k] = -sigma_max;
                rhs.push(0.0);
            }
            None => rhs.push(sigma_max),
        }
        rows.push(head);

        for j in 0..factor.ncols() {
            let mut row = vec![0.0; n_vars];
            for i in 0..n {
                row[i] = -factor[(i, j)];
            }
            rows.push(row);
            rhs.push(0.0);
        }
        (rows, rhs)
    }
}

/// Clips solver output into `[0, cap]` and renormalises to sum to one.
pub(crate) fn clip_and_normalise(raw: &[f64], cap: f64) -> Vec<f64> {
    let clipped: Vec<f64> = raw.iter().map(|w| w.clamp(0.0, cap)).collect();
    let total: f64 = clipped.iter().sum();
    if total > 0.0 {
        clipped.iter().map(|w| w / total).collect()
    } else {
        vec![1.0 / raw.len().max(1) as f64; raw.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{DMatrix, DVector};

    fn estimate(mu: &[f64], vols: &[f64]) -> ReturnEstimate {
        let n = mu.len();
        let names = (0..n).map(|i| format!("A{}", i)).collect();
        let mut sigma = DMatrix::zeros(n, n);
        for i in 0..n {
            sigma[(i, i)] = vols[i] * vols[i];
        }
        ReturnEstimate::new(names, DVector::from_row_slice(mu), sigma).unwrap()
    }

    fn assert_valid(weights: &[f64], cap: f64) {
        assert_abs_diff_eq!(weights.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
        for &w in weights {
            assert!(w >= 0.0 && w <= cap + 1e-6, "weight {} outside [0, {}]", w, cap);
        }
    }

    #[test]
    fn test_two_asset_target_splits_evenly() {
        let est = estimate(&[0.10, 0.06], &[0.2, 0.2]);
        let result = MeanVarianceOptimiser::default().optimise(&est, RiskTolerance::Moderate, Some(0.08));
        assert!(result.status.is_success());
        assert_abs_diff_eq!(result.weights[0], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(result.weights[1], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(result.expected_return, 0.08, epsilon = 1e-4);
    }

    #[test]
    fn test_target_above_range_falls_back() {
        let est = estimate(&[0.10, 0.06, 0.08], &[0.2, 0.15, 0.1]);
        let result = MeanVarianceOptimiser::default().optimise(&est, RiskTolerance::Moderate, Some(0.5));
        assert!(!result.status.is_success());
        assert!(matches!(
            result.status.cause(),
            Some(FolioError::SolverInfeasible(_))
        ));
        for &w in &result.weights {
            assert_abs_diff_eq!(w, 1.0 / 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_target_below_range_falls_back() {
        let est = estimate(&[0.10, 0.06, 0.08], &[0.2, 0.15, 0.1]);
        let result = MeanVarianceOptimiser::default().optimise(&est, RiskTolerance::Moderate, Some(-0.5));
        assert!(!result.status.is_success());
    }

    #[test]
    fn test_max_sharpe_respects_cap() {
        let est = estimate(&[0.20, 0.10, 0.08, 0.07], &[0.10, 0.20, 0.20, 0.20]);
        let result = MeanVarianceOptimiser::default().optimise(&est, RiskTolerance::Moderate, None);
        assert!(result.status.is_success());
        assert_valid(&result.weights, 0.4);
        assert_abs_diff_eq!(result.weights[0], 0.4, epsilon = 1e-4);
    }

    #[test]
    fn test_max_sharpe_beats_equal_weights() {
        let est = estimate(&[0.15, 0.12, 0.09, 0.07], &[0.25, 0.18, 0.12, 0.10]);
        let optimiser = MeanVarianceOptimiser::default();
        let result = optimiser.optimise(&est, RiskTolerance::Moderate, None);
        assert!(result.status.is_success());

        let equal = [0.25; 4];
        let rf = optimiser.config().risk_free_rate;
        let equal_sharpe = (est.portfolio_return(&equal) - rf) / est.portfolio_volatility(&equal);
        assert!(result.sharpe_ratio >= equal_sharpe - 1e-6);
    }

    #[test]
    fn test_max_sharpe_without_excess_return_falls_back() {
        let est = estimate(&[0.02, 0.03, 0.01], &[0.1, 0.1, 0.1]);
        let result = MeanVarianceOptimiser::default().optimise(&est, RiskTolerance::Moderate, None);
        assert!(!result.status.is_success());
    }

    #[test]
    fn test_conservative_caps_volatility() {
        let est = estimate(&[0.20, 0.14, 0.08, 0.07], &[0.30, 0.22, 0.08, 0.06]);
        let result = MeanVarianceOptimiser::default().optimise(&est, RiskTolerance::Conservative, None);
        assert!(result.status.is_success());
        assert!(result.volatility <= 0.15 + 1e-5);
        assert_valid(&result.weights, 0.4);
    }

    #[test]
    fn test_conservative_infeasible_falls_back() {
        let est = estimate(&[0.20, 0.18, 0.15], &[0.60, 0.55, 0.50]);
        let result = MeanVarianceOptimiser::default().optimise(&est, RiskTolerance::Conservative, Some(0.18));
        assert!(!result.status.is_success());
    }

    #[test]
    fn test_aggressive_requires_return_floor() {
        let est = estimate(&[0.30, 0.22, 0.10, 0.08], &[0.30, 0.25, 0.10, 0.08]);
        let result = MeanVarianceOptimiser::default().optimise(&est, RiskTolerance::Aggressive, Some(0.10));
        assert!(result.status.is_success());
        assert!(result.expected_return >= 0.18 - 1e-5);
    }

    #[test]
    fn test_cap_of_one_over_n_is_enforced() {
        let est = estimate(&[0.20, 0.10, 0.08, 0.07], &[0.10, 0.20, 0.20, 0.20]);
        let config = EngineConfig {
            max_weight: 0.25,
            ..EngineConfig::default()
        };
        let optimiser = MeanVarianceOptimiser::new(config);

        let sharpe = optimiser.optimise(&est, RiskTolerance::Moderate, None);
        assert!(sharpe.status.is_success());
        assert_valid(&sharpe.weights, 0.25);
        for &w in &sharpe.weights {
            assert_abs_diff_eq!(w, 0.25, epsilon = 1e-12);
        }

        let target = optimiser.optimise(&est, RiskTolerance::Moderate, Some(0.09));
        assert!(target.status.is_success());
        assert_valid(&target.weights, 0.25);
    }

    #[test]
    fn test_pinned_cap_below_target_falls_back() {
        let est = estimate(&[0.20, 0.10, 0.08, 0.07], &[0.10, 0.20, 0.20, 0.20]);
        let config = EngineConfig {
            max_weight: 0.25,
            ..EngineConfig::default()
        };
        let result = MeanVarianceOptimiser::new(config).optimise(&est, RiskTolerance::Moderate, Some(0.15));
        assert!(matches!(
            result.status.cause(),
            Some(FolioError::SolverInfeasible(_))
        ));
    }

    #[test]
    fn test_clip_and_normalise() {
        let w = clip_and_normalise(&[-1e-9, 0.5, 0.5000001], 0.5);
        assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-15);
        assert_eq!(w[0], 0.0);
    }
}
