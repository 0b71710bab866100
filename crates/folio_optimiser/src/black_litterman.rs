//! Black-Litterman blender.
//!
//! Market capitalisation weights imply equilibrium returns `π = λΣw_mkt`.
//! Investor views (one absolute view per asset) are blended with `π` into
//! posterior moments, and the posterior utility
//! `μ_postᵀw − (λ/2) wᵀΣ_post w` is maximised under the fully-invested,
//! long-only and concentration constraints.
//!
//! The posterior is computed in its Woodbury form
//!
//! ```text
//! A      = PτΣPᵀ + Ω
//! μ_post = π + τΣPᵀ A⁻¹ (Q − Pπ)
//! Σ_post = τΣ − τΣPᵀ A⁻¹ PτΣ
//! ```
//!
//! which equals `[(τΣ)⁻¹ + PᵀΩ⁻¹P]⁻¹` but only inverts the k×k view
//! matrix, so a singular Σ is tolerated.

use crate::allocation::assemble_result;
use crate::mean_variance::clip_and_normalise;
use crate::problem::ConicProblem;
use folio_core::config::EngineConfig;
use folio_core::math::symmetric_inverse;
use folio_core::types::{
    Algorithm, AllocationResult, AllocationStatus, AssetMap, FolioError, FolioResult,
    ReturnEstimate, RiskTolerance,
};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, warn};

/// Market capitalisation weights of the canonical six-asset universe.
pub const CANONICAL_MARKET_CAPS: [(&str, f64); 6] = [
    ("TCS", 0.25),
    ("RIL", 0.20),
    ("INFY", 0.15),
    ("HDFCBANK", 0.20),
    ("GOLD", 0.15),
    ("CASH", 0.05),
];

/// Canonical market capitalisation weights as an [`AssetMap`].
pub fn canonical_market_weights() -> AssetMap {
    CANONICAL_MARKET_CAPS
        .iter()
        .map(|(asset, w)| (asset.to_string(), *w))
        .collect()
}

/// Normalises market capitalisations over a universe.
///
/// Keys outside the universe are ignored.
///
/// # Errors
///
/// Returns `FolioError::InvalidMarketWeights` if an asset of the universe
/// is missing, a value is negative or not finite, or the total is zero.
pub fn normalise_market_weights(assets: &[String], caps: &AssetMap) -> FolioResult<Vec<f64>> {
    let mut raw = Vec::with_capacity(assets.len());
    for asset in assets {
        let cap = caps
            .get(asset)
            .copied()
            .ok_or_else(|| FolioError::market_weights(format!("no weight for '{}'", asset)))?;
        if !cap.is_finite() || cap < 0.0 {
            return Err(FolioError::market_weights(format!(
                "weight for '{}' must be a non-negative number, got {}",
                asset, cap
            )));
        }
        raw.push(cap);
    }
    let total: f64 = raw.iter().sum();
    if !(total > 0.0) {
        return Err(FolioError::market_weights("weights sum to zero"));
    }
    Ok(raw.into_iter().map(|w| w / total).collect())
}

/// Posterior moments of the blend.
#[derive(Clone, Debug, PartialEq)]
pub struct Posterior {
    /// Equilibrium returns π.
    pub equilibrium_returns: DVector<f64>,
    /// Posterior expected returns μ_post.
    pub returns: DVector<f64>,
    /// Posterior covariance Σ_post.
    pub covariance: DMatrix<f64>,
    /// Number of views that entered the blend.
    pub n_views: usize,
}

/// Black-Litterman blender over a fixed engine configuration.
#[derive(Clone, Debug, Default)]
pub struct BlackLittermanBlender {
    config: EngineConfig,
}

impl BlackLittermanBlender {
    /// Creates a blender with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Equilibrium returns `π = λΣw_mkt`.
    pub fn equilibrium_returns(
        estimate: &ReturnEstimate,
        market_weights: &[f64],
        risk_aversion: f64,
    ) -> DVector<f64> {
        let w = DVector::from_column_slice(market_weights);
        estimate.covariance() * w * risk_aversion
    }

    /// Blends equilibrium returns with investor views.
    ///
    /// Views on assets outside the universe are dropped. Without any
    /// remaining view the posterior equals the prior (`μ_post = π`,
    /// `Σ_post = Σ`).
    ///
    /// # Errors
    ///
    /// Returns `FolioError::InvalidInput` for a non-finite view and
    /// `FolioError::NumericDegenerate` if the view matrix is singular.
    pub fn posterior(
        &self,
        estimate: &ReturnEstimate,
        market_weights: &[f64],
        views: Option<&AssetMap>,
        risk_aversion: f64,
    ) -> FolioResult<Posterior> {
        let pi = Self::equilibrium_returns(estimate, market_weights, risk_aversion);
        let sigma = estimate.covariance();

        let mut picks = Vec::new();
        let mut targets = Vec::new();
        for (asset, &view) in views.into_iter().flatten() {
            match estimate.asset_index(asset) {
                Some(i) => {
                    if !view.is_finite() {
                        return Err(FolioError::invalid_input(format!(
                            "view on '{}' is not finite",
                            asset
                        )));
                    }
                    picks.push(i);
                    targets.push(view);
                }
                None => debug!(asset = %asset, "ignoring view on asset outside the universe"),
            }
        }

        if picks.is_empty() {
            return Ok(Posterior {
                returns: pi.clone(),
                equilibrium_returns: pi,
                covariance: sigma.clone(),
                n_views: 0,
            });
        }

        let n = estimate.n_assets();
        let k = picks.len();
        let mut p = DMatrix::zeros(k, n);
        for (row, &i) in picks.iter().enumerate() {
            p[(row, i)] = 1.0;
        }
        let q = DVector::from_vec(targets);

        let tau_sigma = sigma * self.config.tau;
        let view_cov = &p * &tau_sigma * p.transpose();
        let omega = DMatrix::from_diagonal(&view_cov.diagonal());
        let a_inv = symmetric_inverse(&(&view_cov + omega))?;

        let gain = &tau_sigma * p.transpose() * a_inv;
        let returns = &pi + &gain * (q - &p * &pi);
        let m = &tau_sigma - &gain * &p * &tau_sigma;
        let covariance = (&m + m.transpose()) * 0.5;

        Ok(Posterior {
            equilibrium_returns: pi,
            returns,
            covariance,
            n_views: k,
        })
    }

    /// Blends and optimises; infeasibility falls back to market weights.
    ///
    /// A successful result reports metrics against the posterior moments; a
    /// fallback reports the market weights against the sample estimate.
    /// Fallback weights are the market weights as given and are not capped.
    ///
    /// # Errors
    ///
    /// Returns `FolioError::InvalidMarketWeights` for malformed market
    /// weights and `FolioError::InvalidInput` for a non-finite view.
    #[tracing::instrument(skip_all, fields(algorithm = "Black-Litterman", n_assets = estimate.n_assets(), tier = %tier))]
    pub fn blend(
        &self,
        estimate: &ReturnEstimate,
        market_caps: &AssetMap,
        views: Option<&AssetMap>,
        tier: RiskTolerance,
    ) -> FolioResult<AllocationResult> {
        let market = normalise_market_weights(estimate.assets(), market_caps)?;
        let lambda = tier.risk_aversion();

        let posterior = match self.posterior(estimate, &market, views, lambda) {
            Ok(posterior) => posterior,
            Err(FolioError::NumericDegenerate(msg)) => {
                let cause = FolioError::NumericDegenerate(msg);
                warn!(%cause, "posterior is degenerate, falling back to market weights");
                let mut result = assemble_result(
                    Algorithm::BlackLitterman,
                    tier,
                    estimate,
                    market.clone(),
                    AllocationStatus::Fallback { cause },
                    &self.config,
                );
                result.equilibrium_returns = Some(
                    Self::equilibrium_returns(estimate, &market, lambda)
                        .iter()
                        .copied()
                        .collect(),
                );
                return Ok(result);
            }
            Err(other) => return Err(other),
        };
        debug!(n_views = posterior.n_views, lambda, "posterior computed");

        let solved = self.solve_utility(estimate, &posterior, lambda).and_then(|weights| {
            let post_estimate = ReturnEstimate::new(
                estimate.assets().to_vec(),
                posterior.returns.clone(),
                posterior.covariance.clone(),
            )?;
            Ok((weights, post_estimate))
        });

        let mut result = match solved {
            Ok((weights, post_estimate)) => {
                info!("Black-Litterman allocation solved");
                let mut result = assemble_result(
                    Algorithm::BlackLitterman,
                    tier,
                    &post_estimate,
                    weights,
                    AllocationStatus::Success,
                    &self.config,
                );
                result.posterior_returns = Some(posterior.returns.iter().copied().collect());
                result
            }
            Err(cause) => {
                warn!(%cause, "Black-Litterman solve failed, falling back to market weights");
                assemble_result(
                    Algorithm::BlackLitterman,
                    tier,
                    estimate,
                    market,
                    AllocationStatus::Fallback { cause },
                    &self.config,
                )
            }
        };
        result.equilibrium_returns = Some(posterior.equilibrium_returns.iter().copied().collect());
        Ok(result)
    }

    fn solve_utility(
        &self,
        estimate: &ReturnEstimate,
        posterior: &Posterior,
        risk_aversion: f64,
    ) -> FolioResult<Vec<f64>> {
        let n = estimate.n_assets();
        if self.config.cap_pins_equal_weights(n) {
            debug!(n, "concentration cap pins equal weights");
            return Ok(vec![1.0 / n as f64; n]);
        }
        let cap = self.config.effective_max_weight(n);

        let mut problem = ConicProblem::new(n)
            .with_quadratic(&posterior.covariance * risk_aversion)
            .with_linear(posterior.returns.iter().map(|m| -m).collect());
        problem.equality(vec![1.0; n], 1.0);
        problem.bounds(0..n, 0.0, cap);

        let x = problem.solve(&self.config.solver)?;
        Ok(clip_and_normalise(&x, cap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn universe() -> ReturnEstimate {
        ReturnEstimate::new(
            vec!["A".into(), "B".into(), "C".into()],
            DVector::from_vec(vec![0.12, 0.08, 0.05]),
            DMatrix::from_row_slice(
                3,
                3,
                &[0.04, 0.006, 0.0, 0.006, 0.0225, 0.0, 0.0, 0.0, 0.01],
            ),
        )
        .unwrap()
    }

    fn caps(values: &[(&str, f64)]) -> AssetMap {
        values.iter().map(|(a, w)| (a.to_string(), *w)).collect()
    }

    #[test]
    fn test_normalise_market_weights() {
        let est = universe();
        let w = normalise_market_weights(
            est.assets(),
            &caps(&[("A", 2.0), ("B", 1.0), ("C", 1.0), ("Z", 5.0)]),
        )
        .unwrap();
        assert_eq!(w, vec![0.5, 0.25, 0.25]);
    }

    #[test]
    fn test_market_weights_must_cover_universe() {
        let est = universe();
        let err = normalise_market_weights(est.assets(), &caps(&[("A", 1.0), ("B", 1.0)]));
        assert!(matches!(err, Err(FolioError::InvalidMarketWeights(_))));
    }

    #[test]
    fn test_market_weights_reject_negative_and_zero_total() {
        let est = universe();
        let negative = caps(&[("A", 1.0), ("B", -0.5), ("C", 1.0)]);
        assert!(normalise_market_weights(est.assets(), &negative).is_err());
        let zero = caps(&[("A", 0.0), ("B", 0.0), ("C", 0.0)]);
        assert!(normalise_market_weights(est.assets(), &zero).is_err());
    }

    #[test]
    fn test_no_views_posterior_equals_prior() {
        let est = universe();
        let blender = BlackLittermanBlender::default();
        let market = [0.4, 0.35, 0.25];
        let post = blender.posterior(&est, &market, None, 3.0).unwrap();
        assert_eq!(post.returns, post.equilibrium_returns);
        assert_eq!(&post.covariance, est.covariance());
        assert_eq!(post.n_views, 0);

        let expected_a = 3.0 * (0.04 * 0.4 + 0.006 * 0.35);
        assert_abs_diff_eq!(post.equilibrium_returns[0], expected_a, epsilon = 1e-15);
    }

    #[test]
    fn test_unknown_view_is_ignored() {
        let est = universe();
        let blender = BlackLittermanBlender::default();
        let market = [0.4, 0.35, 0.25];
        let views = caps(&[("NOT_HELD", 0.5)]);
        let post = blender.posterior(&est, &market, Some(&views), 3.0).unwrap();
        assert_eq!(post.n_views, 0);
        assert_eq!(post.returns, post.equilibrium_returns);
    }

    #[test]
    fn test_single_view_moves_halfway() {
        // With Ω = diag(PτΣPᵀ) the viewed asset's posterior return sits
        // halfway between its prior and the view.
        let est = universe();
        let blender = BlackLittermanBlender::default();
        let market = [0.4, 0.35, 0.25];
        let views = caps(&[("C", 0.20)]);
        let post = blender.posterior(&est, &market, Some(&views), 3.0).unwrap();
        let prior_c = post.equilibrium_returns[2];
        assert_abs_diff_eq!(post.returns[2], 0.5 * (prior_c + 0.20), epsilon = 1e-12);
        // Uncorrelated assets are untouched.
        assert_abs_diff_eq!(post.returns[0], post.equilibrium_returns[0], epsilon = 1e-12);
    }

    #[test]
    fn test_posterior_covariance_with_views() {
        // Σ_post = [(τΣ)⁻¹ + PᵀΩ⁻¹P]⁻¹: the viewed variance halves, the
        // others stay at τΣ.
        let est = universe();
        let blender = BlackLittermanBlender::default();
        let tau = blender.config.tau;
        let market = [0.4, 0.35, 0.25];
        let views = caps(&[("C", 0.20)]);
        let post = blender.posterior(&est, &market, Some(&views), 3.0).unwrap();

        assert_abs_diff_eq!(post.covariance[(2, 2)], 0.5 * tau * 0.01, epsilon = 1e-15);
        assert_abs_diff_eq!(post.covariance[(0, 0)], tau * 0.04, epsilon = 1e-15);
        assert_abs_diff_eq!(post.covariance[(0, 1)], tau * 0.006, epsilon = 1e-15);
        assert_eq!(post.covariance, post.covariance.transpose());

        let full = (est.covariance() * tau).try_inverse().unwrap();
        let mut precision = full.clone();
        precision[(2, 2)] += 1.0 / (tau * 0.01);
        let expected = precision.try_inverse().unwrap();
        for (a, b) in post.covariance.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_solver_failure_falls_back_to_market_weights() {
        let est = universe();
        let mut config = EngineConfig::default();
        config.solver.max_iterations = 1;
        config.solver.tolerance = 1e-12;
        let market_caps = caps(&[("A", 4.0), ("B", 3.5), ("C", 2.5)]);
        let result = BlackLittermanBlender::new(config)
            .blend(&est, &market_caps, Some(&caps(&[("A", 0.15)])), RiskTolerance::Moderate)
            .unwrap();

        assert!(matches!(
            result.status.cause(),
            Some(FolioError::SolverInfeasible(_))
        ));
        let market = normalise_market_weights(est.assets(), &market_caps).unwrap();
        assert_eq!(result.weights, market);
        assert!(result.equilibrium_returns.is_some());
        assert!(result.posterior_returns.is_none());
    }

    #[test]
    fn test_degenerate_view_falls_back_to_market_weights() {
        // A view on a zero-variance asset leaves Ω and PτΣPᵀ both zero.
        let est = ReturnEstimate::new(
            vec!["A".into(), "B".into(), "CASH".into()],
            DVector::from_vec(vec![0.12, 0.08, 0.03]),
            DMatrix::from_row_slice(3, 3, &[0.04, 0.006, 0.0, 0.006, 0.0225, 0.0, 0.0, 0.0, 0.0]),
        )
        .unwrap();
        let market_caps = caps(&[("A", 0.5), ("B", 0.3), ("CASH", 0.2)]);
        let result = BlackLittermanBlender::default()
            .blend(&est, &market_caps, Some(&caps(&[("CASH", 0.05)])), RiskTolerance::Moderate)
            .unwrap();

        assert!(matches!(
            result.status.cause(),
            Some(FolioError::NumericDegenerate(_))
        ));
        for (w, expected) in result.weights.iter().zip([0.5, 0.3, 0.2]) {
            assert_abs_diff_eq!(*w, expected, epsilon = 1e-12);
        }
        assert!(result.equilibrium_returns.is_some());
    }

    #[test]
    fn test_cap_of_one_over_n_pins_equal_weights() {
        let est = universe();
        let config = EngineConfig {
            max_weight: 1.0 / 3.0,
            ..EngineConfig::default()
        };
        let result = BlackLittermanBlender::new(config)
            .blend(
                &est,
                &caps(&[("A", 0.4), ("B", 0.35), ("C", 0.25)]),
                Some(&caps(&[("A", 0.30)])),
                RiskTolerance::Aggressive,
            )
            .unwrap();
        assert!(result.status.is_success());
        for &w in &result.weights {
            assert_abs_diff_eq!(w, 1.0 / 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_blend_succeeds_within_bounds() {
        let est = universe();
        let blender = BlackLittermanBlender::default();
        let result = blender
            .blend(
                &est,
                &caps(&[("A", 0.4), ("B", 0.35), ("C", 0.25)]),
                Some(&caps(&[("A", 0.15)])),
                RiskTolerance::Moderate,
            )
            .unwrap();
        assert!(result.status.is_success());
        assert_abs_diff_eq!(result.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
        assert!(result.weights.iter().all(|&w| (0.0..=0.4 + 1e-6).contains(&w)));
        assert_eq!(result.algorithm, Algorithm::BlackLitterman);
        assert!(result.equilibrium_returns.is_some());
        assert!(result.posterior_returns.is_some());
    }

    #[test]
    fn test_blend_rejects_missing_asset() {
        let est = universe();
        let result = BlackLittermanBlender::default().blend(
            &est,
            &caps(&[("A", 0.5), ("B", 0.5)]),
            None,
            RiskTolerance::Moderate,
        );
        assert!(matches!(result, Err(FolioError::InvalidMarketWeights(_))));
    }

    #[test]
    fn test_canonical_market_weights_sum_to_one() {
        let total: f64 = canonical_market_weights().values().sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
    }
}
