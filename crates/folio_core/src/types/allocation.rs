//! Allocation requests, results and portfolio weights.

use super::error::{FolioError, FolioResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Per-asset investor views or market capitalisations, keyed by asset name.
pub type AssetMap = BTreeMap<String, f64>;

/// Allocation algorithm selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Markowitz mean-variance optimisation.
    #[default]
    MeanVariance,
    /// Black-Litterman blend of equilibrium returns and investor views.
    BlackLitterman,
}

impl Algorithm {
    /// Short label used in results and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MeanVariance => "MPT",
            Self::BlackLitterman => "Black-Litterman",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Algorithm {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mpt" | "mean-variance" | "mean_variance" | "markowitz" => Ok(Self::MeanVariance),
            "black-litterman" | "black_litterman" | "bl" => Ok(Self::BlackLitterman),
            _ => Err(FolioError::invalid_input(format!(
                "unknown algorithm '{}' (expected mpt or black-litterman)",
                s
            ))),
        }
    }
}

/// Risk-tolerance tier.
///
/// | Tier         | Mean-variance constraint | Black-Litterman λ |
/// |--------------|--------------------------|-------------------|
/// | Conservative | volatility ≤ 15%         | 5.0               |
/// | Moderate     | none                     | 3.0               |
/// | Aggressive   | expected return ≥ 18%    | 1.5               |
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    /// Caps portfolio volatility.
    Conservative,
    /// No extra constraint.
    #[default]
    Moderate,
    /// Requires a minimum expected return.
    Aggressive,
}

impl RiskTolerance {
    /// Black-Litterman risk-aversion coefficient λ.
    pub fn risk_aversion(&self) -> f64 {
        match self {
            Self::Conservative => 5.0,
            Self::Moderate => 3.0,
            Self::Aggressive => 1.5,
        }
    }

    /// Lower-case tier name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskTolerance {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "moderate" => Ok(Self::Moderate),
            "aggressive" => Ok(Self::Aggressive),
            _ => Err(FolioError::invalid_input(format!(
                "unknown risk tolerance '{}' (expected conservative, moderate or aggressive)",
                s
            ))),
        }
    }
}

/// Parameters of a single allocation request.
///
/// # Examples
///
/// ```
/// use folio_core::types::{AllocationRequest, Algorithm, RiskTolerance};
///
/// let request = AllocationRequest::mean_variance(RiskTolerance::Conservative)
///     .with_target_return(0.09)
///     .with_investment_amount(1_000_000.0);
///
/// assert_eq!(request.algorithm, Algorithm::MeanVariance);
/// assert_eq!(request.target_return, Some(0.09));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationRequest {
    /// Algorithm selector.
    pub algorithm: Algorithm,
    /// Risk-tolerance tier.
    pub risk_tolerance: RiskTolerance,
    /// Optional minimum expected return; switches to variance minimisation.
    pub target_return: Option<f64>,
    /// Optional investor views (asset → expected return).
    pub views: Option<AssetMap>,
    /// Market capitalisation weights, required for Black-Litterman.
    pub market_weights: Option<AssetMap>,
    /// Optional amount to express the allocation in currency units.
    pub investment_amount: Option<f64>,
}

impl AllocationRequest {
    /// Mean-variance request for a tier.
    pub fn mean_variance(risk_tolerance: RiskTolerance) -> Self {
        Self {
            algorithm: Algorithm::MeanVariance,
            risk_tolerance,
            ..Self::default()
        }
    }

    /// Black-Litterman request for a tier with market weights.
    pub fn black_litterman(risk_tolerance: RiskTolerance, market_weights: AssetMap) -> Self {
        Self {
            algorithm: Algorithm::BlackLitterman,
            risk_tolerance,
            market_weights: Some(market_weights),
            ..Self::default()
        }
    }

    /// Sets the target return.
    pub fn with_target_return(mut self, target: f64) -> Self {
        self.target_return = Some(target);
        self
    }

    /// Sets investor views.
    pub fn with_views(mut self, views: AssetMap) -> Self {
        self.views = Some(views);
        self
    }

    /// Sets the investment amount.
    pub fn with_investment_amount(mut self, amount: f64) -> Self {
        self.investment_amount = Some(amount);
        self
    }
}

/// Outcome tag of an allocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AllocationStatus {
    /// The constrained problem was solved.
    Success,
    /// A deterministic fallback allocation was substituted.
    Fallback {
        /// The condition that triggered the fallback.
        cause: FolioError,
    },
}

impl AllocationStatus {
    /// Whether the allocation came from a successful solve.
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The fallback cause, if any.
    pub fn cause(&self) -> Option<&FolioError> {
        match self {
            Self::Success => None,
            Self::Fallback { cause } => Some(cause),
        }
    }
}

/// Result of an allocation request.
///
/// Weights are aligned with `assets`, sum to one and lie in `[0, cap]`.
/// Metrics are always computed from the returned weights, including on the
/// fallback path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    /// Algorithm that produced the weights.
    pub algorithm: Algorithm,
    /// Tier of the request.
    pub risk_tolerance: RiskTolerance,
    /// Asset names aligned with `weights`.
    pub assets: Vec<String>,
    /// Weight per asset.
    pub weights: Vec<f64>,
    /// Percentage allocation of assets above the reporting threshold.
    pub allocation: BTreeMap<String, f64>,
    /// Expected annual return μᵀw.
    pub expected_return: f64,
    /// Expected annual volatility √(wᵀΣw).
    pub volatility: f64,
    /// Sharpe ratio against the configured risk-free rate.
    pub sharpe_ratio: f64,
    /// Success or fallback.
    #[serde(flatten)]
    pub status: AllocationStatus,
    /// Black-Litterman equilibrium returns π.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equilibrium_returns: Option<Vec<f64>>,
    /// Black-Litterman posterior returns μ_post.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posterior_returns: Option<Vec<f64>>,
    /// Investment amount echoed from the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investment_amount: Option<f64>,
    /// Currency amount per asset when an investment amount was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_allocation: Option<BTreeMap<String, f64>>,
}

impl AllocationResult {
    /// Weight of a named asset (zero if absent).
    pub fn weight_of(&self, asset: &str) -> f64 {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|i| self.weights[i])
            .unwrap_or(0.0)
    }

    /// Attaches an investment amount and derives the currency allocation.
    pub fn with_investment_amount(mut self, amount: Option<f64>) -> Self {
        self.currency_allocation = amount.map(|value| {
            self.assets
                .iter()
                .zip(&self.weights)
                .map(|(asset, w)| (asset.clone(), w * value))
                .collect()
        });
        self.investment_amount = amount;
        self
    }
}

/// Normalised portfolio weights keyed by asset name; always sums to one.
///
/// # Examples
///
/// ```
/// use folio_core::types::PortfolioWeights;
///
/// let weights = PortfolioWeights::new([("A".to_string(), 2.0), ("B".to_string(), 2.0)]).unwrap();
/// assert_eq!(weights.get("A"), 0.5);
/// assert_eq!(weights.get("Z"), 0.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioWeights {
    weights: BTreeMap<String, f64>,
}

impl PortfolioWeights {
    /// Normalises raw weights to sum to one.
    ///
    /// # Errors
    ///
    /// Returns `FolioError::InvalidInput` if a weight is negative or not
    /// finite, or the total is not strictly positive.
    pub fn new(raw: impl IntoIterator<Item = (String, f64)>) -> FolioResult<Self> {
        let raw: BTreeMap<String, f64> = raw.into_iter().collect();
        if let Some((asset, _)) = raw.iter().find(|(_, w)| !w.is_finite()) {
            return Err(FolioError::invalid_input(format!(
                "weight for '{}' is not finite",
                asset
            )));
        }
        if let Some((asset, w)) = raw.iter().find(|(_, w)| **w < 0.0) {
            return Err(FolioError::invalid_input(format!(
                "weight for '{}' is negative ({}); portfolios are long-only",
                asset, w
            )));
        }
        let total: f64 = raw.values().sum();
        if total <= 0.0 {
            return Err(FolioError::invalid_input(format!(
                "portfolio weights sum to {}, expected a positive total",
                total
            )));
        }
        Ok(Self {
            weights: raw.into_iter().map(|(k, w)| (k, w / total)).collect(),
        })
    }

    /// Equal weights across the given assets.
    pub fn equal(assets: &[String]) -> FolioResult<Self> {
        Self::new(assets.iter().map(|a| (a.clone(), 1.0)))
    }

    /// Weights taken from an allocation result.
    pub fn from_allocation(result: &AllocationResult) -> FolioResult<Self> {
        Self::new(result.assets.iter().cloned().zip(result.weights.iter().copied()))
    }

    /// Weight of an asset (zero if not held).
    pub fn get(&self, asset: &str) -> f64 {
        self.weights.get(asset).copied().unwrap_or(0.0)
    }

    /// Weights aligned with a universe; missing assets get zero.
    pub fn aligned(&self, assets: &[String]) -> Vec<f64> {
        assets.iter().map(|a| self.get(a)).collect()
    }

    /// Iterates over `(asset, weight)` pairs in asset order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, w)| (k.as_str(), *w))
    }

    /// Number of assets with a weight entry.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether no weights are held.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
