//! Frontier command implementation

use folio_core::config::EngineConfig;
use folio_core::stats::estimate_with;
use std::path::Path;
use tracing::{info, warn};

use super::print_json;
use crate::data::load_returns;
use crate::{CliError, Result};

/// Run the frontier command
pub fn run(
    returns: &Path,
    n_points: usize,
    risk_free_rate: Option<f64>,
    engine: &EngineConfig,
) -> Result<()> {
    if n_points < 2 {
        return Err(CliError::InvalidArgument(format!(
            "frontier needs at least 2 points, got {}",
            n_points
        )));
    }
    let matrix = load_returns(returns)?;
    let estimate = estimate_with(&matrix, engine.periods_per_year)?;
    let rf = risk_free_rate.unwrap_or(engine.risk_free_rate);

    let frontier = folio_optimiser::frontier(&estimate, rf, n_points, engine);
    if frontier.len() < n_points {
        warn!(
            requested = n_points,
            solved = frontier.len(),
            "Some frontier points were infeasible and skipped"
        );
    }
    info!(points = frontier.len(), "Frontier complete");

    print_json(&frontier)
}
