//! Estimate command implementation
//!
//! Prints annualised expected returns and the covariance matrix of a return
//! file.

use folio_core::config::EngineConfig;
use folio_core::stats::estimate_with;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use super::print_json;
use crate::data::load_returns;
use crate::Result;

#[derive(Serialize)]
struct EstimateOutput<'a> {
    assets: &'a [String],
    n_periods: usize,
    expected_returns: Vec<f64>,
    covariance: Vec<Vec<f64>>,
}

/// Run the estimate command
pub fn run(returns: &Path, engine: &EngineConfig) -> Result<()> {
    let matrix = load_returns(returns)?;
    info!(
        assets = matrix.n_assets(),
        periods = matrix.n_periods(),
        "Loaded return matrix"
    );

    let estimate = estimate_with(&matrix, engine.periods_per_year)?;
    let n = estimate.n_assets();
    let cov = estimate.covariance();

    print_json(&EstimateOutput {
        assets: estimate.assets(),
        n_periods: matrix.n_periods(),
        expected_returns: estimate.expected_returns().iter().copied().collect(),
        covariance: (0..n).map(|i| (0..n).map(|j| cov[(i, j)]).collect()).collect(),
    })
}
