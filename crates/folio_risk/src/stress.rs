//! Scenario stress testing.
//!
//! A scenario maps assets to a one-off shock return. The portfolio impact is
//! `Σ weight_i · shock_i`: shocked assets not held are ignored and held
//! assets missing from the scenario take a zero shock.

use folio_core::types::{AssetMap, PortfolioWeights};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named asset shocks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StressScenario {
    /// Scenario key.
    pub name: String,
    /// Shock return per asset.
    pub shocks: AssetMap,
}

impl StressScenario {
    /// Creates a scenario from `(asset, shock)` pairs.
    pub fn new(
        name: impl Into<String>,
        shocks: impl IntoIterator<Item = (String, f64)>,
    ) -> Self {
        Self {
            name: name.into(),
            shocks: shocks.into_iter().collect(),
        }
    }

    /// Portfolio return under this scenario.
    pub fn impact(&self, weights: &PortfolioWeights) -> f64 {
        weights
            .iter()
            .map(|(asset, w)| w * self.shocks.get(asset).copied().unwrap_or(0.0))
            .sum()
    }
}

/// Canonical stress scenarios on the six-asset universe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetScenarioType {
    /// Broad equity crash with a flight to gold.
    MarketCrash,
    /// Technology names sold off.
    TechSelloff,
    /// Domestic currency crisis.
    CurrencyCrisis,
}

impl PresetScenarioType {
    /// All presets.
    pub fn all() -> [Self; 3] {
        [Self::MarketCrash, Self::TechSelloff, Self::CurrencyCrisis]
    }

    /// Report key.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MarketCrash => "market_crash",
            Self::TechSelloff => "tech_selloff",
            Self::CurrencyCrisis => "currency_crisis",
        }
    }

    /// Get description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::MarketCrash => "Equities -25% to -35%, gold +5%",
            Self::TechSelloff => "IT services -35% to -40%, gold +10%",
            Self::CurrencyCrisis => "Banks -40%, equities -20% to -30%, gold +15%, cash -5%",
        }
    }

    /// Shock table as `(asset, shock)` pairs.
    pub fn shocks(&self) -> [(&'static str, f64); 6] {
        match self {
            Self::MarketCrash => [
                ("TCS", -0.30),
                ("RIL", -0.25),
                ("INFY", -0.28),
                ("HDFCBANK", -0.35),
                ("GOLD", 0.05),
                ("CASH", 0.0),
            ],
            Self::TechSelloff => [
                ("TCS", -0.40),
                ("RIL", -0.10),
                ("INFY", -0.35),
                ("HDFCBANK", -0.15),
                ("GOLD", 0.10),
                ("CASH", 0.0),
            ],
            Self::CurrencyCrisis => [
                ("TCS", -0.20),
                ("RIL", -0.30),
                ("INFY", -0.20),
                ("HDFCBANK", -0.40),
                ("GOLD", 0.15),
                ("CASH", -0.05),
            ],
        }
    }

    /// Builds the scenario.
    pub fn scenario(&self) -> StressScenario {
        StressScenario::new(
            self.name(),
            self.shocks().iter().map(|(a, s)| (a.to_string(), *s)),
        )
    }
}

/// The three canonical scenarios.
pub fn preset_scenarios() -> Vec<StressScenario> {
    PresetScenarioType::all()
        .iter()
        .map(PresetScenarioType::scenario)
        .collect()
}

/// Portfolio return under each scenario, keyed by scenario name.
///
/// # Examples
///
/// ```
/// use folio_core::types::PortfolioWeights;
/// use folio_risk::stress::{stress_test, StressScenario};
///
/// let weights = PortfolioWeights::new([("A".to_string(), 0.6), ("B".to_string(), 0.4)]).unwrap();
/// let scenario = StressScenario::new("a_down", [("A".to_string(), -0.5), ("Z".to_string(), -1.0)]);
/// let results = stress_test(&weights, &[scenario]);
/// assert!((results["a_down"] - (-0.3)).abs() < 1e-12);
/// ```
pub fn stress_test(weights: &PortfolioWeights, scenarios: &[StressScenario]) -> BTreeMap<String, f64> {
    scenarios
        .iter()
        .map(|s| (s.name.clone(), s.impact(weights)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn canonical_equal() -> PortfolioWeights {
        let assets: Vec<String> = ["TCS", "RIL", "INFY", "HDFCBANK", "GOLD", "CASH"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        PortfolioWeights::equal(&assets).unwrap()
    }

    #[test]
    fn test_market_crash_on_equal_weights() {
        let results = stress_test(&canonical_equal(), &preset_scenarios());
        let expected = (-0.30 - 0.25 - 0.28 - 0.35 + 0.05 + 0.0) / 6.0;
        assert_abs_diff_eq!(results["market_crash"], expected, epsilon = 1e-12);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_unheld_assets_ignored() {
        let weights = PortfolioWeights::new([("GOLD".to_string(), 1.0)]).unwrap();
        let results = stress_test(&weights, &preset_scenarios());
        assert_abs_diff_eq!(results["tech_selloff"], 0.10, epsilon = 1e-15);
        assert_abs_diff_eq!(results["currency_crisis"], 0.15, epsilon = 1e-15);
    }

    #[test]
    fn test_missing_shock_is_zero() {
        let weights = PortfolioWeights::new([("OTHER".to_string(), 1.0)]).unwrap();
        for (_, impact) in stress_test(&weights, &preset_scenarios()) {
            assert_eq!(impact, 0.0);
        }
    }

    #[test]
    fn test_preset_names_unique() {
        let names: Vec<&str> = PresetScenarioType::all().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["market_crash", "tech_selloff", "currency_crisis"]);
        assert!(!PresetScenarioType::CurrencyCrisis.description().is_empty());
    }
}
