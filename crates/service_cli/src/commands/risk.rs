//! Risk command implementation
//!
//! Builds the aggregate risk report of a weighted portfolio.

use folio_core::config::EngineConfig;
use folio_core::types::{PortfolioWeights, ReturnMatrix};
use folio_risk::{RiskAnalyzer, VarMethod};
use std::path::{Path, PathBuf};
use tracing::info;

use super::print_json;
use crate::data::{load_benchmark, load_returns, parse_assignments};
use crate::Result;

/// Options of the risk command
#[derive(Debug, Clone, Default)]
pub struct RiskArgs {
    /// `ASSET=WEIGHT` pairs; equal weights when empty
    pub weights: Vec<String>,
    /// Confidence levels; configured levels when empty
    pub confidence: Vec<f64>,
    /// Portfolio value for currency figures
    pub portfolio_value: Option<f64>,
    /// Single-column benchmark return file
    pub benchmark: Option<PathBuf>,
    /// VaR method
    pub var_method: VarMethod,
}

/// Resolves `ASSET=WEIGHT` pairs, defaulting to equal weights.
pub fn resolve_weights(pairs: &[String], matrix: &ReturnMatrix) -> Result<PortfolioWeights> {
    if pairs.is_empty() {
        return Ok(PortfolioWeights::equal(matrix.assets())?);
    }
    Ok(PortfolioWeights::new(parse_assignments(pairs)?)?)
}

/// Run the risk command
pub fn run(returns: &Path, args: &RiskArgs, engine: &EngineConfig) -> Result<()> {
    let matrix = load_returns(returns)?;
    let weights = resolve_weights(&args.weights, &matrix)?;

    let mut analyzer = RiskAnalyzer::new(&matrix, weights, engine)?.with_var_method(args.var_method);
    if let Some(path) = &args.benchmark {
        analyzer = analyzer.with_benchmark(load_benchmark(path, matrix.dates())?)?;
        info!(benchmark = %path.display(), "Using external benchmark");
    }

    let levels: &[f64] = if args.confidence.is_empty() {
        &engine.confidence_levels
    } else {
        &args.confidence
    };
    let report = analyzer.report(levels, args.portfolio_value)?;

    print_json(&report)
}
