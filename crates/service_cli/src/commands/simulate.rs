//! Simulate command implementation
//!
//! Projects a weighted portfolio forward with the Monte Carlo engine.

use folio_core::config::EngineConfig;
use folio_risk::monte_carlo::{simulate_with, MonteCarloConfig};
use folio_risk::RiskAnalyzer;
use std::path::Path;
use tracing::info;

use super::print_json;
use super::risk::resolve_weights;
use crate::data::load_returns;
use crate::Result;

/// Options of the simulate command
#[derive(Debug, Clone)]
pub struct SimulateArgs {
    /// `ASSET=WEIGHT` pairs; equal weights when empty
    pub weights: Vec<String>,
    /// Horizon in periods
    pub horizon: usize,
    /// Number of paths
    pub simulations: usize,
    /// Starting value
    pub initial_value: f64,
    /// Include every path in the output
    pub paths: bool,
}

/// Run the simulate command
pub fn run(returns: &Path, args: &SimulateArgs, engine: &EngineConfig) -> Result<()> {
    let matrix = load_returns(returns)?;
    let weights = resolve_weights(&args.weights, &matrix)?;
    let analyzer = RiskAnalyzer::new(&matrix, weights, engine)?;

    let config = MonteCarloConfig::builder()
        .num_simulations(args.simulations)
        .time_horizon_days(args.horizon)
        .initial_value(args.initial_value)
        .keep_paths(args.paths)
        .seed(engine.seed)
        .build()?;
    info!(
        paths = config.num_simulations(),
        horizon = config.time_horizon_days(),
        "Running Monte Carlo projection"
    );

    let result = simulate_with(analyzer.portfolio_returns(), &config)?;
    print_json(&result)
}
