//! Value at Risk and Conditional Value at Risk.
//!
//! VaR is reported as a return: the `(1 − c)` quantile of the periodic
//! portfolio return distribution, negative for a loss. CVaR is the mean of
//! the observed returns at or below the historical VaR.

use crate::rng::{resolve_seed, FolioRng};
use folio_core::config::EngineConfig;
use folio_core::stats::{mean, quantile, quantile_sorted, sample_std};
use folio_core::types::{FolioError, FolioResult};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// VaR estimation method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarMethod {
    /// Empirical quantile of the observed series.
    #[default]
    Historical,
    /// `mean + z(1 − c)·std` under a normal assumption.
    Parametric,
    /// Empirical quantile of normal draws with the series' mean and std.
    Simulation,
}

impl VarMethod {
    /// All methods.
    pub fn all() -> [Self; 3] {
        [Self::Historical, Self::Parametric, Self::Simulation]
    }

    /// Lower-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Parametric => "parametric",
            Self::Simulation => "simulation",
        }
    }
}

impl fmt::Display for VarMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VarMethod {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "historical" => Ok(Self::Historical),
            "parametric" => Ok(Self::Parametric),
            "simulation" | "monte_carlo" | "monte-carlo" => Ok(Self::Simulation),
            _ => Err(FolioError::invalid_input(format!(
                "unknown VaR method '{}' (expected historical, parametric or simulation)",
                s
            ))),
        }
    }
}

fn check_inputs(series: &[f64], confidence: f64) -> FolioResult<()> {
    if series.is_empty() {
        return Err(FolioError::invalid_input("return series is empty"));
    }
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(FolioError::invalid_input(format!(
            "confidence level {} is not in (0, 1)",
            confidence
        )));
    }
    Ok(())
}

/// Standard normal quantile z(p).
pub(crate) fn standard_normal_quantile(p: f64) -> FolioResult<f64> {
    let normal = Normal::new(0.0, 1.0).map_err(|e| FolioError::degenerate(e.to_string()))?;
    Ok(normal.inverse_cdf(p))
}

/// Value at Risk of a periodic return series.
///
/// # Errors
///
/// Returns `FolioError::InvalidInput` for an empty series or a confidence
/// level outside `(0, 1)`.
///
/// # Examples
///
/// ```
/// use folio_core::config::EngineConfig;
/// use folio_risk::var::{value_at_risk, VarMethod};
///
/// let series = [0.015, -0.015, 0.01];
/// let var = value_at_risk(&series, 0.95, VarMethod::Historical, &EngineConfig::default()).unwrap();
/// assert!((var - (-0.0125)).abs() < 1e-12);
/// ```
pub fn value_at_risk(
    series: &[f64],
    confidence: f64,
    method: VarMethod,
    config: &EngineConfig,
) -> FolioResult<f64> {
    check_inputs(series, confidence)?;
    let tail = 1.0 - confidence;

    let var = match method {
        VarMethod::Historical => quantile(series, tail),
        VarMethod::Parametric => {
            let z = standard_normal_quantile(tail)?;
            mean(series) + z * sample_std(series).unwrap_or(0.0)
        }
        VarMethod::Simulation => {
            let (mu, sigma) = (mean(series), sample_std(series).unwrap_or(0.0));
            let seed = resolve_seed(config.seed);
            let mut rng = FolioRng::from_seed(seed);
            let mut draws = vec![0.0; config.var_simulations];
            rng.fill_normal(&mut draws);
            for x in draws.iter_mut() {
                *x = mu + sigma * *x;
            }
            draws.sort_by(f64::total_cmp);
            debug!(seed, draws = draws.len(), "simulated VaR draws");
            quantile_sorted(&draws, tail)
        }
    };
    Ok(var)
}

/// Conditional Value at Risk (expected shortfall) of a return series.
///
/// Mean of the observations at or below the historical VaR; equals the VaR
/// when no observation falls there.
///
/// # Errors
///
/// Returns `FolioError::InvalidInput` for an empty series or a confidence
/// level outside `(0, 1)`.
pub fn conditional_value_at_risk(series: &[f64], confidence: f64) -> FolioResult<f64> {
    check_inputs(series, confidence)?;
    let var = quantile(series, 1.0 - confidence);
    let tail: Vec<f64> = series.iter().copied().filter(|r| *r <= var).collect();
    if tail.is_empty() {
        return Ok(var);
    }
    Ok(mean(&tail))
}
