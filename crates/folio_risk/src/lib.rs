//! # folio_risk
//!
//! Risk analytics and Monte Carlo projection for folio portfolios.
//!
//! ## Architecture Position
//!
//! Layer 3 of the engine. Depends only on `folio_core` (L1); it consumes
//! the weights produced by `folio_optimiser` through
//! [`PortfolioWeights`](folio_core::types::PortfolioWeights) and never
//! calls the optimiser itself.
//!
//! ## Modules
//!
//! - `var`: Historical, parametric and simulated VaR; CVaR
//! - `performance`: Beta, alpha, Sharpe, Sortino, information ratio, tracking error
//! - `drawdown`: Drawdown path, trough date and recovery time
//! - `volatility`: Total, downside, upside and rolling volatility
//! - `stress`: Scenario stress tests and the canonical presets
//! - `analyzer`: Per-request [`RiskAnalyzer`] and the aggregate [`RiskReport`]
//! - `monte_carlo`: Parallel terminal-value projection
//! - `rng`: Seeded normal streams
//!
//! ## Conventions
//!
//! VaR, CVaR, drawdowns and stress results are fractional returns, negative
//! for a loss. Degenerate denominators never raise: beta falls back to 1.0,
//! Sortino to `+∞`, the information ratio to 0.
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use folio_core::config::EngineConfig;
//! use folio_core::types::ReturnMatrix;
//! use folio_risk::analyze_risk;
//!
//! let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
//! let matrix = ReturnMatrix::new(
//!     vec![d(1), d(2), d(3)],
//!     vec!["A".to_string(), "B".to_string()],
//!     vec![vec![0.01, -0.02, 0.03], vec![0.02, -0.01, -0.01]],
//! )
//! .unwrap();
//!
//! let report = analyze_risk(&matrix, None, None, Some(1_000_000.0), &EngineConfig::default()).unwrap();
//! assert!(report.tail_at(0.95).unwrap().var < 0.0);
//! assert_eq!(report.stress_test_results.len(), 3);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod analyzer;
pub mod drawdown;
pub mod monte_carlo;
pub mod performance;
pub mod rng;
pub mod stress;
pub mod var;
pub mod volatility;

pub use analyzer::{analyze_risk, RiskAnalyzer, RiskReport, TailRisk};
pub use drawdown::{max_drawdown, DrawdownMetrics};
pub use monte_carlo::{simulate, simulate_with, MonteCarloConfig, MonteCarloResult};
pub use rng::FolioRng;
pub use stress::{preset_scenarios, stress_test, PresetScenarioType, StressScenario};
pub use var::{conditional_value_at_risk, value_at_risk, VarMethod};
pub use volatility::{volatility_metrics, VolatilityMetrics};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{analyze_risk, simulate, stress_test};
    pub use crate::{MonteCarloConfig, RiskAnalyzer, RiskReport, StressScenario, VarMethod};
}
