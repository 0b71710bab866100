//! Monte Carlo projection of portfolio value.
//!
//! Daily returns are drawn i.i.d. normal with the mean and sample standard
//! deviation of the observed portfolio series and compounded from the
//! initial value. Paths are simulated in parallel; path `i` draws from its
//! own stream derived from `(seed, i)`, so a fixed seed gives bit-identical
//! results on any thread count.

use crate::rng::{resolve_seed, FolioRng};
use folio_core::config::{EngineConfig, SeedPolicy};
use folio_core::stats::{mean, population_std, quantile_sorted, sample_std};
use folio_core::types::{FolioError, FolioResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Maximum number of simulated paths.
pub const MAX_PATHS: usize = 10_000_000;

/// Maximum projection horizon in periods.
pub const MAX_HORIZON: usize = 10_000;

/// Default starting portfolio value.
pub const DEFAULT_INITIAL_VALUE: f64 = 1_000_000.0;

/// Monte Carlo projection configuration.
///
/// Use [`MonteCarloConfig::builder`] to construct instances.
///
/// # Examples
///
/// ```rust
/// use folio_risk::monte_carlo::MonteCarloConfig;
///
/// let config = MonteCarloConfig::builder()
///     .num_simulations(1_000)
///     .time_horizon_days(21)
///     .initial_value(50_000.0)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.num_simulations(), 1_000);
/// assert!(!config.keep_paths());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct MonteCarloConfig {
    num_simulations: usize,
    time_horizon_days: usize,
    initial_value: f64,
    keep_paths: bool,
    seed: SeedPolicy,
}

impl MonteCarloConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> MonteCarloConfigBuilder {
        MonteCarloConfigBuilder::default()
    }

    /// Number of simulated paths.
    #[inline]
    pub fn num_simulations(&self) -> usize {
        self.num_simulations
    }

    /// Projection horizon in periods.
    #[inline]
    pub fn time_horizon_days(&self) -> usize {
        self.time_horizon_days
    }

    /// Starting value of every path.
    #[inline]
    pub fn initial_value(&self) -> f64 {
        self.initial_value
    }

    /// Whether full paths are returned.
    #[inline]
    pub fn keep_paths(&self) -> bool {
        self.keep_paths
    }

    /// Seed policy for the path streams.
    #[inline]
    pub fn seed(&self) -> SeedPolicy {
        self.seed
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `FolioError::InvalidInput` if:
    /// - `num_simulations` is 0 or greater than 10,000,000
    /// - `time_horizon_days` is 0 or greater than 10,000
    /// - `initial_value` is not finite and strictly positive
    pub fn validate(&self) -> FolioResult<()> {
        if self.num_simulations == 0 || self.num_simulations > MAX_PATHS {
            return Err(FolioError::invalid_input(format!(
                "simulation count {} is not in [1, {}]",
                self.num_simulations, MAX_PATHS
            )));
        }
        if self.time_horizon_days == 0 || self.time_horizon_days > MAX_HORIZON {
            return Err(FolioError::invalid_input(format!(
                "time horizon {} is not in [1, {}]",
                self.time_horizon_days, MAX_HORIZON
            )));
        }
        if !(self.initial_value.is_finite() && self.initial_value > 0.0) {
            return Err(FolioError::invalid_input(format!(
                "initial value {} must be positive",
                self.initial_value
            )));
        }
        Ok(())
    }
}

/// Builder for [`MonteCarloConfig`].
///
/// Unset fields default to 10,000 paths over 252 periods from 1,000,000
/// with the default seed policy.
#[derive(Clone, Debug, Default)]
pub struct MonteCarloConfigBuilder {
    num_simulations: Option<usize>,
    time_horizon_days: Option<usize>,
    initial_value: Option<f64>,
    keep_paths: bool,
    seed: SeedPolicy,
}

impl MonteCarloConfigBuilder {
    /// Sets the number of paths.
    #[inline]
    pub fn num_simulations(mut self, n: usize) -> Self {
        self.num_simulations = Some(n);
        self
    }

    /// Sets the horizon in periods.
    #[inline]
    pub fn time_horizon_days(mut self, days: usize) -> Self {
        self.time_horizon_days = Some(days);
        self
    }

    /// Sets the starting value.
    #[inline]
    pub fn initial_value(mut self, value: f64) -> Self {
        self.initial_value = Some(value);
        self
    }

    /// Returns the full path ensemble alongside the summary.
    #[inline]
    pub fn keep_paths(mut self, keep: bool) -> Self {
        self.keep_paths = keep;
        self
    }

    /// Sets the seed policy.
    #[inline]
    pub fn seed(mut self, seed: SeedPolicy) -> Self {
        self.seed = seed;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `FolioError::InvalidInput` if validation fails.
    pub fn build(self) -> FolioResult<MonteCarloConfig> {
        let config = MonteCarloConfig {
            num_simulations: self.num_simulations.unwrap_or(10_000),
            time_horizon_days: self.time_horizon_days.unwrap_or(252),
            initial_value: self.initial_value.unwrap_or(DEFAULT_INITIAL_VALUE),
            keep_paths: self.keep_paths,
            seed: self.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Terminal-value distribution of a projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    /// Starting value.
    pub initial_value: f64,
    /// Horizon in periods.
    pub time_horizon_days: usize,
    /// Number of paths.
    pub num_simulations: usize,
    /// Seed the path streams were derived from.
    pub seed: u64,
    /// Mean terminal value.
    pub mean_final_value: f64,
    /// Median terminal value.
    pub median_final_value: f64,
    /// Population standard deviation of terminal values.
    pub std_final_value: f64,
    /// 5th percentile.
    pub percentile_5: f64,
    /// 25th percentile.
    pub percentile_25: f64,
    /// 75th percentile.
    pub percentile_75: f64,
    /// 95th percentile.
    pub percentile_95: f64,
    /// Fraction of paths ending below the initial value.
    pub probability_of_loss: f64,
    /// `(mean_final_value − initial_value) / initial_value`.
    pub expected_return: f64,
    /// Values after each period, one row per path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_paths: Option<Vec<Vec<f64>>>,
}

fn simulate_path(mu: f64, sigma: f64, config: &MonteCarloConfig, rng: &mut FolioRng) -> Vec<f64> {
    let mut value = config.initial_value;
    (0..config.time_horizon_days)
        .map(|_| {
            value *= 1.0 + mu + sigma * rng.gen_normal();
            value
        })
        .collect()
}

fn terminal_value(mu: f64, sigma: f64, config: &MonteCarloConfig, rng: &mut FolioRng) -> f64 {
    (0..config.time_horizon_days).fold(config.initial_value, |value, _| {
        value * (1.0 + mu + sigma * rng.gen_normal())
    })
}

/// Runs a projection from an observed periodic return series.
///
/// # Errors
///
/// Returns `FolioError::InvalidInput` if the series has fewer than two
/// observations or the configuration is invalid.
pub fn simulate_with(series: &[f64], config: &MonteCarloConfig) -> FolioResult<MonteCarloResult> {
    config.validate()?;
    let sigma = sample_std(series).ok_or_else(|| {
        FolioError::invalid_input(format!(
            "{} returns observed, at least two are needed",
            series.len()
        ))
    })?;
    let mu = mean(series);
    let seed = resolve_seed(config.seed);
    let n = config.num_simulations;

    let (mut finals, paths) = if config.keep_paths {
        let paths: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| simulate_path(mu, sigma, config, &mut FolioRng::for_stream(seed, i as u64)))
            .collect();
        let finals = paths
            .iter()
            .map(|p| p.last().copied().unwrap_or(config.initial_value))
            .collect::<Vec<f64>>();
        (finals, Some(paths))
    } else {
        let finals: Vec<f64> = (0..n)
            .into_par_iter()
            .map(|i| terminal_value(mu, sigma, config, &mut FolioRng::for_stream(seed, i as u64)))
            .collect();
        (finals, None)
    };

    let mean_final = mean(&finals);
    let std_final = population_std(&finals);
    let losses = finals.iter().filter(|v| **v < config.initial_value).count();
    finals.sort_by(f64::total_cmp);

    let result = MonteCarloResult {
        initial_value: config.initial_value,
        time_horizon_days: config.time_horizon_days,
        num_simulations: n,
        seed,
        mean_final_value: mean_final,
        median_final_value: quantile_sorted(&finals, 0.50),
        std_final_value: std_final,
        percentile_5: quantile_sorted(&finals, 0.05),
        percentile_25: quantile_sorted(&finals, 0.25),
        percentile_75: quantile_sorted(&finals, 0.75),
        percentile_95: quantile_sorted(&finals, 0.95),
        probability_of_loss: losses as f64 / n as f64,
        expected_return: (mean_final - config.initial_value) / config.initial_value,
        simulation_paths: paths,
    };
    info!(
        paths = n,
        horizon = config.time_horizon_days,
        seed,
        probability_of_loss = result.probability_of_loss,
        "monte carlo projection complete"
    );
    Ok(result)
}

/// Projects `initial_value` over `time_horizon_days` periods.
///
/// The seed policy is taken from the engine configuration; full paths are
/// not kept.
///
/// # Errors
///
/// Returns `FolioError::InvalidInput` for a zero or oversized simulation
/// count or horizon, a non-positive initial value, or fewer than two
/// observed returns.
///
/// # Examples
///
/// ```
/// use folio_core::config::EngineConfig;
/// use folio_risk::monte_carlo::simulate;
///
/// let series = [0.001, -0.002, 0.0015, 0.0005, -0.001];
/// let result = simulate(&series, 10, 500, 100.0, &EngineConfig::default()).unwrap();
///
/// assert_eq!(result.num_simulations, 500);
/// assert!(result.percentile_5 <= result.median_final_value);
/// assert!(result.median_final_value <= result.percentile_95);
/// ```
pub fn simulate(
    series: &[f64],
    time_horizon_days: usize,
    num_simulations: usize,
    initial_value: f64,
    config: &EngineConfig,
) -> FolioResult<MonteCarloResult> {
    let mc = MonteCarloConfig::builder()
        .num_simulations(num_simulations)
        .time_horizon_days(time_horizon_days)
        .initial_value(initial_value)
        .seed(config.seed)
        .build()?;
    simulate_with(series, &mc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn series() -> Vec<f64> {
        (0..60).map(|t| ((t as f64) * 0.7).sin() * 0.01 + 0.0003).collect()
    }

    #[test]
    fn test_builder_defaults() {
        let config = MonteCarloConfig::builder().build().unwrap();
        assert_eq!(config.num_simulations(), 10_000);
        assert_eq!(config.time_horizon_days(), 252);
        assert_eq!(config.initial_value(), DEFAULT_INITIAL_VALUE);
        assert_eq!(config.seed(), SeedPolicy::Fixed(42));
    }

    #[test]
    fn test_builder_rejects_invalid() {
        assert!(MonteCarloConfig::builder().num_simulations(0).build().is_err());
        assert!(MonteCarloConfig::builder()
            .num_simulations(MAX_PATHS + 1)
            .build()
            .is_err());
        assert!(MonteCarloConfig::builder().time_horizon_days(0).build().is_err());
        assert!(MonteCarloConfig::builder().initial_value(-1.0).build().is_err());
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let config = EngineConfig::default();
        let a = simulate(&series(), 30, 400, 1000.0, &config).unwrap();
        let b = simulate(&series(), 30, 400, 1000.0, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.seed, 42);
    }

    #[test]
    fn test_summary_is_ordered() {
        let result = simulate(&series(), 30, 1000, 1000.0, &EngineConfig::default()).unwrap();
        assert!(result.percentile_5 <= result.percentile_25);
        assert!(result.percentile_25 <= result.median_final_value);
        assert!(result.median_final_value <= result.percentile_75);
        assert!(result.percentile_75 <= result.percentile_95);
        assert!((0.0..=1.0).contains(&result.probability_of_loss));
        assert_abs_diff_eq!(
            result.expected_return,
            (result.mean_final_value - 1000.0) / 1000.0,
            epsilon = 1e-15
        );
        assert!(result.simulation_paths.is_none());
    }

    #[test]
    fn test_paths_end_at_terminal_values() {
        let config = MonteCarloConfig::builder()
            .num_simulations(50)
            .time_horizon_days(5)
            .initial_value(100.0)
            .keep_paths(true)
            .build()
            .unwrap();
        let with_paths = simulate_with(&series(), &config).unwrap();
        let paths = with_paths.simulation_paths.as_ref().unwrap();
        assert_eq!(paths.len(), 50);
        assert!(paths.iter().all(|p| p.len() == 5));

        let without = simulate_with(
            &series(),
            &MonteCarloConfig::builder()
                .num_simulations(50)
                .time_horizon_days(5)
                .initial_value(100.0)
                .build()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(with_paths.mean_final_value, without.mean_final_value);
        assert_eq!(with_paths.percentile_95, without.percentile_95);
    }

    #[test]
    fn test_zero_volatility_is_deterministic() {
        let flat = [0.5; 5];
        let result = simulate(&flat, 2, 10, 1.0, &EngineConfig::default()).unwrap();
        assert_eq!(result.std_final_value, 0.0);
        assert_eq!(result.mean_final_value, 2.25);
        assert_eq!(result.probability_of_loss, 0.0);
    }

    #[test]
    fn test_too_few_returns() {
        assert!(simulate(&[0.01], 10, 10, 1.0, &EngineConfig::default()).is_err());
    }
}
