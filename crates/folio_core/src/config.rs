//! Engine configuration.
//!
//! Every numeric knob of the optimiser, blender and risk engine lives in
//! [`EngineConfig`]. Values deserialise from TOML with per-field defaults, so
//! a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trading periods per year for daily data.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Default annual risk-free rate.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.06;

/// Default seed for reproducible draws.
pub const DEFAULT_SEED: u64 = 42;

/// Minimum headroom of `n · max_weight` over full investment.
const CAP_SLACK: f64 = 1e-9;

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Invalid parameter value with name and description.
    #[error("Invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        value: String,
    },

    /// Configuration file could not be read.
    #[error("Configuration file error: {0}")]
    Io(String),

    /// Configuration file could not be parsed.
    #[error("Configuration parse error: {0}")]
    Parse(String),
}

impl ConfigError {
    fn invalid(name: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            value: value.into(),
        }
    }
}

/// Source of pseudo-random seeds for simulated VaR and Monte Carlo draws.
///
/// `Fixed` makes every call reproducible; `Entropy` draws a fresh seed per
/// call.
///
/// In TOML: `seed = { fixed = 42 }` or `seed = "entropy"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedPolicy {
    /// Use the same seed on every call.
    Fixed(u64),
    /// Draw a fresh seed from the operating system on every call.
    Entropy,
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_SEED)
    }
}

/// Iteration and tolerance limits of the conic solver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Maximum interior-point iterations before giving up.
    pub max_iterations: u32,
    /// Feasibility and duality-gap tolerance.
    pub tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-8,
        }
    }
}

/// Engine configuration.
///
/// # Examples
///
/// ```rust
/// use folio_core::config::{EngineConfig, SeedPolicy};
///
/// let config = EngineConfig::default();
/// assert_eq!(config.risk_free_rate, 0.06);
/// assert_eq!(config.max_weight, 0.4);
/// assert_eq!(config.seed, SeedPolicy::Fixed(42));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Annual risk-free rate.
    pub risk_free_rate: f64,
    /// Periods per year used for annualisation.
    pub periods_per_year: f64,
    /// Single-name concentration cap.
    pub max_weight: f64,
    /// Volatility ceiling of the conservative tier.
    pub conservative_max_volatility: f64,
    /// Return floor of the aggressive tier.
    pub aggressive_min_return: f64,
    /// Black-Litterman prior-uncertainty scale τ.
    pub tau: f64,
    /// Weights at or below this are omitted from the allocation map.
    pub allocation_threshold: f64,
    /// VaR/CVaR confidence levels of the risk report.
    pub confidence_levels: Vec<f64>,
    /// Window length of the rolling volatility series.
    pub rolling_window: usize,
    /// Drawdown level counted as recovered.
    pub recovery_tolerance: f64,
    /// Draw count of simulated VaR.
    pub var_simulations: usize,
    /// Conic solver limits.
    pub solver: SolverSettings,
    /// Seed source for random draws.
    pub seed: SeedPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            periods_per_year: TRADING_DAYS_PER_YEAR,
            max_weight: 0.4,
            conservative_max_volatility: 0.15,
            aggressive_min_return: 0.18,
            tau: 0.025,
            allocation_threshold: 0.01,
            confidence_levels: vec![0.95, 0.99],
            rolling_window: 30,
            recovery_tolerance: 0.01,
            var_simulations: 10_000,
            solver: SolverSettings::default(),
            seed: SeedPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Returns a copy with a different risk-free rate.
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// Returns a copy with a different seed policy.
    pub fn with_seed(mut self, seed: SeedPolicy) -> Self {
        self.seed = seed;
        self
    }

    /// Daily (per-period) risk-free rate.
    #[inline]
    pub fn periodic_risk_free_rate(&self) -> f64 {
        self.risk_free_rate / self.periods_per_year
    }

    /// Concentration cap actually enforced for `n_assets`.
    ///
    /// When `n · max_weight < 1` full investment cannot meet the cap and it
    /// is lifted (returns `1.0`). At `n · max_weight = 1` the cap is kept;
    /// see [`EngineConfig::cap_pins_equal_weights`].
    #[inline]
    pub fn effective_max_weight(&self, n_assets: usize) -> f64 {
        if self.max_weight * n_assets as f64 >= 1.0 - CAP_SLACK {
            self.max_weight
        } else {
            1.0
        }
    }

    /// True when the cap admits only the equal-weight portfolio
    /// (`n · max_weight = 1`).
    #[inline]
    pub fn cap_pins_equal_weights(&self, n_assets: usize) -> bool {
        n_assets > 0 && (self.max_weight * n_assets as f64 - 1.0).abs() <= CAP_SLACK
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter` for the first knob outside
    /// its valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.risk_free_rate.is_finite() {
            return Err(ConfigError::invalid("risk_free_rate", "must be finite"));
        }
        if !(self.periods_per_year > 0.0) {
            return Err(ConfigError::invalid("periods_per_year", "must be positive"));
        }
        if !(self.max_weight > 0.0 && self.max_weight <= 1.0) {
            return Err(ConfigError::invalid("max_weight", "must be in (0, 1]"));
        }
        if !(self.conservative_max_volatility > 0.0) {
            return Err(ConfigError::invalid(
                "conservative_max_volatility",
                "must be positive",
            ));
        }
        if !self.aggressive_min_return.is_finite() {
            return Err(ConfigError::invalid("aggressive_min_return", "must be finite"));
        }
        if !(self.tau > 0.0) {
            return Err(ConfigError::invalid("tau", "must be positive"));
        }
        if !(0.0..1.0).contains(&self.allocation_threshold) {
            return Err(ConfigError::invalid(
                "allocation_threshold",
                "must be in [0, 1)",
            ));
        }
        if let Some(c) = self
            .confidence_levels
            .iter()
            .find(|c| !(**c > 0.0 && **c < 1.0))
        {
            return Err(ConfigError::invalid(
                "confidence_levels",
                format!("{} is not in (0, 1)", c),
            ));
        }
        if self.rolling_window < 2 {
            return Err(ConfigError::invalid("rolling_window", "must be at least 2"));
        }
        if !(self.recovery_tolerance >= 0.0) {
            return Err(ConfigError::invalid(
                "recovery_tolerance",
                "must be non-negative",
            ));
        }
        if self.var_simulations == 0 {
            return Err(ConfigError::invalid("var_simulations", "must be positive"));
        }
        if self.solver.max_iterations == 0 {
            return Err(ConfigError::invalid("solver.max_iterations", "must be positive"));
        }
        if !(self.solver.tolerance > 0.0) {
            return Err(ConfigError::invalid("solver.tolerance", "must be positive"));
        }
        Ok(())
    }
}
