//! Aggregate risk report.
//!
//! [`RiskAnalyzer`] is a per-request value object: it is built from a
//! return matrix and a set of weights, derives the portfolio and benchmark
//! series once, and answers every metric from them. Nothing is cached
//! between requests.

use crate::drawdown::{max_drawdown, DrawdownMetrics};
use crate::monte_carlo::{simulate, MonteCarloResult};
use crate::performance;
use crate::stress::{preset_scenarios, stress_test, StressScenario};
use crate::var::{conditional_value_at_risk, value_at_risk, VarMethod};
use crate::volatility::{volatility_metrics, VolatilityMetrics};
use folio_core::config::EngineConfig;
use folio_core::types::{FolioError, FolioResult, PortfolioWeights, ReturnMatrix};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// VaR and CVaR at one confidence level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TailRisk {
    /// Confidence level in `(0, 1)`.
    pub confidence: f64,
    /// VaR as a periodic return.
    pub var: f64,
    /// CVaR as a periodic return.
    pub cvar: f64,
    /// VaR scaled by the portfolio value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_value: Option<f64>,
    /// CVaR scaled by the portfolio value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvar_value: Option<f64>,
}

/// Full risk report of a weighted portfolio.
///
/// Ratios and drawdowns are fractions. The `*_value` fields are the same
/// quantities in currency units and are present only when a portfolio value
/// was supplied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// Number of observed periods.
    pub n_periods: usize,
    /// Portfolio value used for currency scaling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio_value: Option<f64>,
    /// Weights the report was computed for.
    pub weights: PortfolioWeights,
    /// Annualised volatility de-annualised to one period.
    pub daily_volatility: f64,
    /// Annualised volatility.
    pub annual_volatility: f64,
    /// VaR and CVaR per requested confidence level, in request order.
    pub tail_risk: Vec<TailRisk>,
    /// Beta against the benchmark.
    pub beta: f64,
    /// Jensen's alpha.
    pub alpha: f64,
    /// Sharpe ratio.
    pub sharpe_ratio: f64,
    /// Sortino ratio; `+∞` without downside dispersion, written as `"inf"`.
    #[serde(with = "extended_f64")]
    pub sortino_ratio: f64,
    /// Information ratio against the benchmark.
    pub information_ratio: f64,
    /// Tracking error against the benchmark.
    pub tracking_error: f64,
    /// Deepest drawdown.
    pub max_drawdown: f64,
    /// Deepest drawdown in currency units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_drawdown_value: Option<f64>,
    /// Drawdown at the last observation.
    pub current_drawdown: f64,
    /// Portfolio return per stress scenario.
    pub stress_test_results: BTreeMap<String, f64>,
    /// Portfolio P&L per stress scenario.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress_test_values: Option<BTreeMap<String, f64>>,
    /// Volatility breakdown.
    pub volatility_metrics: VolatilityMetrics,
    /// Drawdown breakdown.
    pub drawdown_metrics: DrawdownMetrics,
}

/// Serde for ratios that may be unbounded: finite values as numbers,
/// non-finite ones as `"inf"`, `"-inf"` or `"nan"`.
mod extended_f64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("nan")
        } else if *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(x) => Ok(x),
            Repr::Text(text) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(de::Error::invalid_value(
                    de::Unexpected::Str(other),
                    &"a number, \"inf\", \"-inf\" or \"nan\"",
                )),
            },
        }
    }
}

impl RiskReport {
    /// Tail risk at a confidence level, if it was requested.
    pub fn tail_at(&self, confidence: f64) -> Option<&TailRisk> {
        self.tail_risk
            .iter()
            .find(|t| (t.confidence - confidence).abs() < 1e-12)
    }
}

/// Risk metrics of one weighted portfolio over one return matrix.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use folio_core::config::EngineConfig;
/// use folio_core::types::{PortfolioWeights, ReturnMatrix};
/// use folio_risk::analyzer::RiskAnalyzer;
///
/// let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
/// let matrix = ReturnMatrix::new(
///     vec![d(1), d(2), d(3)],
///     vec!["A".to_string(), "B".to_string()],
///     vec![vec![0.01, -0.02, 0.03], vec![0.02, -0.01, -0.01]],
/// )
/// .unwrap();
/// let weights = PortfolioWeights::equal(matrix.assets()).unwrap();
/// let config = EngineConfig::default();
///
/// let analyzer = RiskAnalyzer::new(&matrix, weights, &config).unwrap();
/// assert!((analyzer.portfolio_returns()[1] - (-0.015)).abs() < 1e-12);
/// ```
#[derive(Clone, Debug)]
pub struct RiskAnalyzer<'a> {
    matrix: &'a ReturnMatrix,
    weights: PortfolioWeights,
    portfolio: Vec<f64>,
    benchmark: Vec<f64>,
    var_method: VarMethod,
    config: &'a EngineConfig,
}

impl<'a> RiskAnalyzer<'a> {
    /// Creates an analyzer benchmarked against the equal-weighted market
    /// proxy.
    ///
    /// # Errors
    ///
    /// Returns `FolioError::InsufficientData` with fewer than two periods,
    /// or `FolioError::InvalidInput` if a weighted asset is not in the
    /// matrix.
    pub fn new(
        matrix: &'a ReturnMatrix,
        weights: PortfolioWeights,
        config: &'a EngineConfig,
    ) -> FolioResult<Self> {
        if matrix.n_periods() < 2 || matrix.n_assets() == 0 {
            return Err(FolioError::InsufficientData {
                assets: matrix.n_assets(),
                periods: matrix.n_periods(),
            });
        }
        if let Some((asset, _)) = weights.iter().find(|(a, _)| matrix.asset_index(a).is_none()) {
            return Err(FolioError::invalid_input(format!(
                "weighted asset '{}' is not in the return matrix",
                asset
            )));
        }
        let portfolio = matrix.weighted_returns(&weights.aligned(matrix.assets()))?;
        Ok(Self {
            matrix,
            weights,
            portfolio,
            benchmark: matrix.equal_weighted_returns(),
            var_method: VarMethod::default(),
            config,
        })
    }

    /// Replaces the market proxy with an external benchmark series.
    ///
    /// # Errors
    ///
    /// Returns `FolioError::InvalidInput` if the series length differs from
    /// the matrix or a value is not finite.
    pub fn with_benchmark(mut self, benchmark: Vec<f64>) -> FolioResult<Self> {
        if benchmark.len() != self.matrix.n_periods() {
            return Err(FolioError::invalid_input(format!(
                "benchmark has {} periods, expected {}",
                benchmark.len(),
                self.matrix.n_periods()
            )));
        }
        if benchmark.iter().any(|r| !r.is_finite()) {
            return Err(FolioError::invalid_input("benchmark has a non-finite return"));
        }
        self.benchmark = benchmark;
        Ok(self)
    }

    /// Sets the VaR estimation method used in reports.
    pub fn with_var_method(mut self, method: VarMethod) -> Self {
        self.var_method = method;
        self
    }

    /// Periodic portfolio returns.
    pub fn portfolio_returns(&self) -> &[f64] {
        &self.portfolio
    }

    /// Periodic benchmark returns.
    pub fn benchmark_returns(&self) -> &[f64] {
        &self.benchmark
    }

    /// Normalised portfolio weights.
    pub fn weights(&self) -> &PortfolioWeights {
        &self.weights
    }

    /// VaR at `confidence` with the configured method.
    pub fn value_at_risk(&self, confidence: f64) -> FolioResult<f64> {
        value_at_risk(&self.portfolio, confidence, self.var_method, self.config)
    }

    /// CVaR at `confidence`.
    pub fn conditional_value_at_risk(&self, confidence: f64) -> FolioResult<f64> {
        conditional_value_at_risk(&self.portfolio, confidence)
    }

    /// Beta against the benchmark.
    pub fn beta(&self) -> f64 {
        performance::beta(
            &self.portfolio,
            &self.benchmark,
            self.config.risk_free_rate,
            self.config.periods_per_year,
        )
    }

    /// Jensen's alpha against the benchmark.
    pub fn alpha(&self) -> f64 {
        performance::alpha(
            &self.portfolio,
            &self.benchmark,
            self.beta(),
            self.config.risk_free_rate,
            self.config.periods_per_year,
        )
    }

    /// Sharpe ratio.
    pub fn sharpe_ratio(&self) -> f64 {
        performance::sharpe_ratio(
            &self.portfolio,
            self.config.risk_free_rate,
            self.config.periods_per_year,
        )
    }

    /// Sortino ratio.
    pub fn sortino_ratio(&self) -> f64 {
        performance::sortino_ratio(
            &self.portfolio,
            self.config.risk_free_rate,
            self.config.periods_per_year,
        )
    }

    /// Information ratio against the benchmark.
    pub fn information_ratio(&self) -> f64 {
        performance::information_ratio(&self.portfolio, &self.benchmark, self.config.periods_per_year)
    }

    /// Tracking error against the benchmark.
    pub fn tracking_error(&self) -> f64 {
        performance::tracking_error(&self.portfolio, &self.benchmark, self.config.periods_per_year)
    }

    /// Drawdown statistics.
    pub fn drawdown(&self) -> FolioResult<DrawdownMetrics> {
        max_drawdown(&self.portfolio, self.matrix.dates(), self.config.recovery_tolerance)
    }

    /// Volatility breakdown.
    pub fn volatility(&self) -> VolatilityMetrics {
        volatility_metrics(
            &self.portfolio,
            self.config.rolling_window,
            self.config.periods_per_year,
        )
    }

    /// Portfolio return under each scenario.
    pub fn stress_test(&self, scenarios: &[StressScenario]) -> BTreeMap<String, f64> {
        stress_test(&self.weights, scenarios)
    }

    /// Monte Carlo projection of the portfolio.
    pub fn monte_carlo(
        &self,
        time_horizon_days: usize,
        num_simulations: usize,
        initial_value: f64,
    ) -> FolioResult<MonteCarloResult> {
        simulate(
            &self.portfolio,
            time_horizon_days,
            num_simulations,
            initial_value,
            self.config,
        )
    }

    /// Builds the full report against the canonical stress scenarios.
    pub fn report(
        &self,
        confidence_levels: &[f64],
        portfolio_value: Option<f64>,
    ) -> FolioResult<RiskReport> {
        self.report_with_scenarios(confidence_levels, portfolio_value, &preset_scenarios())
    }

    /// Builds the full report against the given stress scenarios.
    ///
    /// # Errors
    ///
    /// Returns `FolioError::InvalidInput` for a confidence level outside
    /// `(0, 1)` or a portfolio value that is not finite and positive.
    #[instrument(skip_all, fields(assets = self.matrix.n_assets(), periods = self.matrix.n_periods()))]
    pub fn report_with_scenarios(
        &self,
        confidence_levels: &[f64],
        portfolio_value: Option<f64>,
        scenarios: &[StressScenario],
    ) -> FolioResult<RiskReport> {
        if let Some(value) = portfolio_value {
            if !(value.is_finite() && value > 0.0) {
                return Err(FolioError::invalid_input(format!(
                    "portfolio value {} must be positive",
                    value
                )));
            }
        }
        let scale = |x: f64| portfolio_value.map(|v| x * v);

        let tail_risk = confidence_levels
            .iter()
            .map(|&confidence| {
                let var = self.value_at_risk(confidence)?;
                let cvar = self.conditional_value_at_risk(confidence)?;
                Ok(TailRisk {
                    confidence,
                    var,
                    cvar,
                    var_value: scale(var),
                    cvar_value: scale(cvar),
                })
            })
            .collect::<FolioResult<Vec<_>>>()?;

        let volatility_metrics = self.volatility();
        let drawdown_metrics = self.drawdown()?;
        let stress_test_results = self.stress_test(scenarios);
        let stress_test_values = portfolio_value.map(|v| {
            stress_test_results
                .iter()
                .map(|(name, r)| (name.clone(), r * v))
                .collect()
        });

        let report = RiskReport {
            n_periods: self.matrix.n_periods(),
            portfolio_value,
            weights: self.weights.clone(),
            daily_volatility: volatility_metrics.volatility / self.config.periods_per_year.sqrt(),
            annual_volatility: volatility_metrics.volatility,
            tail_risk,
            beta: self.beta(),
            alpha: self.alpha(),
            sharpe_ratio: self.sharpe_ratio(),
            sortino_ratio: self.sortino_ratio(),
            information_ratio: self.information_ratio(),
            tracking_error: self.tracking_error(),
            max_drawdown: drawdown_metrics.max_drawdown,
            max_drawdown_value: scale(drawdown_metrics.max_drawdown),
            current_drawdown: drawdown_metrics.current_drawdown,
            stress_test_results,
            stress_test_values,
            volatility_metrics,
            drawdown_metrics,
        };
        info!(
            annual_volatility = report.annual_volatility,
            max_drawdown = report.max_drawdown,
            sharpe = report.sharpe_ratio,
            "risk report complete"
        );
        Ok(report)
    }
}

/// Risk report of a portfolio over a return matrix.
///
/// Missing weights default to equal weights over every asset; missing
/// confidence levels default to the configured ones.
///
/// # Errors
///
/// Returns `FolioError::InsufficientData` with fewer than two periods and
/// `FolioError::InvalidInput` for weights on unknown assets, bad confidence
/// levels or a non-positive portfolio value.
pub fn analyze_risk(
    matrix: &ReturnMatrix,
    weights: Option<&PortfolioWeights>,
    confidence_levels: Option<&[f64]>,
    portfolio_value: Option<f64>,
    config: &EngineConfig,
) -> FolioResult<RiskReport> {
    let weights = match weights {
        Some(w) => w.clone(),
        None => PortfolioWeights::equal(matrix.assets())?,
    };
    let levels = confidence_levels.unwrap_or(config.confidence_levels.as_slice());
    RiskAnalyzer::new(matrix, weights, config)?.report(levels, portfolio_value)
}
