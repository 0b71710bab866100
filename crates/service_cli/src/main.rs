//! Folio CLI - Command Line Operations for Allocation and Risk
//!
//! This is the operational entry point for the folio engine.
//!
//! # Commands
//!
//! - `folio estimate <returns.csv>` - Annualised means and covariance
//! - `folio optimise <returns.csv>` - Mean-variance or Black-Litterman allocation
//! - `folio frontier <returns.csv>` - Efficient frontier sweep
//! - `folio risk <returns.csv>` - Aggregate risk report
//! - `folio simulate <returns.csv>` - Monte Carlo projection
//!
//! # Architecture
//!
//! As the **S**ervice layer, this crate loads inputs and configuration,
//! calls `folio_optimiser` and `folio_risk`, and prints JSON results.

use clap::{Parser, Subcommand};
use folio_core::types::{Algorithm, RiskTolerance};
use folio_risk::VarMethod;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod data;
mod error;

pub use error::{CliError, Result};

use commands::optimise::OptimiseArgs;
use commands::risk::RiskArgs;
use commands::simulate::SimulateArgs;

/// Folio portfolio allocation and risk engine CLI
#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (defaults to ./folio.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate annualised expected returns and covariance
    Estimate {
        /// Return file (CSV: date,ASSET1,ASSET2,...)
        returns: PathBuf,
    },

    /// Compute an allocation
    Optimise {
        /// Return file (CSV: date,ASSET1,ASSET2,...)
        returns: PathBuf,

        /// Algorithm (mpt, black-litterman)
        #[arg(short, long, default_value = "mpt")]
        algorithm: Algorithm,

        /// Risk tolerance (conservative, moderate, aggressive)
        #[arg(short, long, default_value = "moderate")]
        risk_tolerance: RiskTolerance,

        /// Minimum expected annual return
        #[arg(short, long)]
        target_return: Option<f64>,

        /// Investor views as ASSET=RETURN
        #[arg(long, value_delimiter = ',')]
        views: Vec<String>,

        /// Market capitalisation weights as ASSET=CAP
        #[arg(long, value_delimiter = ',')]
        market_weights: Vec<String>,

        /// Amount to allocate in currency units
        #[arg(short, long)]
        investment_amount: Option<f64>,
    },

    /// Sweep the efficient frontier
    Frontier {
        /// Return file (CSV: date,ASSET1,ASSET2,...)
        returns: PathBuf,

        /// Number of target returns
        #[arg(short, long, default_value = "20")]
        n_points: usize,

        /// Risk-free rate for Sharpe ratios (defaults to the configured rate)
        #[arg(long)]
        risk_free_rate: Option<f64>,
    },

    /// Generate a risk report
    Risk {
        /// Return file (CSV: date,ASSET1,ASSET2,...)
        returns: PathBuf,

        /// Portfolio weights as ASSET=WEIGHT (equal weights if omitted)
        #[arg(short, long, value_delimiter = ',')]
        weights: Vec<String>,

        /// VaR confidence levels (defaults to the configured levels)
        #[arg(long, value_delimiter = ',')]
        confidence: Vec<f64>,

        /// Portfolio value for currency figures
        #[arg(short, long)]
        portfolio_value: Option<f64>,

        /// Benchmark return file (CSV: date,BENCHMARK)
        #[arg(short, long)]
        benchmark: Option<PathBuf>,

        /// VaR method (historical, parametric, simulation)
        #[arg(long, default_value = "historical")]
        var_method: VarMethod,
    },

    /// Run a Monte Carlo projection
    Simulate {
        /// Return file (CSV: date,ASSET1,ASSET2,...)
        returns: PathBuf,

        /// Portfolio weights as ASSET=WEIGHT (equal weights if omitted)
        #[arg(short, long, value_delimiter = ',')]
        weights: Vec<String>,

        /// Horizon in periods
        #[arg(long, default_value = "252")]
        horizon: usize,

        /// Number of simulated paths
        #[arg(short = 'n', long, default_value = "10000")]
        simulations: usize,

        /// Starting portfolio value
        #[arg(short, long, default_value = "1000000")]
        initial_value: f64,

        /// Include every simulated path in the output
        #[arg(long)]
        paths: bool,
    },
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::build_config(cli.config.as_deref())?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_filter_str()
    };
    init_tracing(level);

    if cli.verbose {
        info!("Verbose mode enabled");
    }
    let engine = &config.engine;

    match cli.command {
        Commands::Estimate { returns } => commands::estimate::run(&returns, engine)?,
        Commands::Optimise {
            returns,
            algorithm,
            risk_tolerance,
            target_return,
            views,
            market_weights,
            investment_amount,
        } => {
            let args = OptimiseArgs {
                algorithm,
                risk_tolerance,
                target_return,
                views,
                market_weights,
                investment_amount,
            };
            commands::optimise::run(&returns, &args, engine)?
        }
        Commands::Frontier {
            returns,
            n_points,
            risk_free_rate,
        } => commands::frontier::run(&returns, n_points, risk_free_rate, engine)?,
        Commands::Risk {
            returns,
            weights,
            confidence,
            portfolio_value,
            benchmark,
            var_method,
        } => {
            let args = RiskArgs {
                weights,
                confidence,
                portfolio_value,
                benchmark,
                var_method,
            };
            commands::risk::run(&returns, &args, engine)?
        }
        Commands::Simulate {
            returns,
            weights,
            horizon,
            simulations,
            initial_value,
            paths,
        } => {
            let args = SimulateArgs {
                weights,
                horizon,
                simulations,
                initial_value,
                paths,
            };
            commands::simulate::run(&returns, &args, engine)?
        }
    }

    Ok(())
}
