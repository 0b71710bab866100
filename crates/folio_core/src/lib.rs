//! # folio_core: Foundation for the Allocation Engine
//!
//! ## Layer 1 (Foundation) Role
//!
//! folio_core is the bottom layer of the engine and provides:
//! - The request/result data model (`types`)
//! - The error taxonomy shared by every layer (`types::error`)
//! - Annualised mean/covariance estimation (`stats`)
//! - Dense linear-algebra helpers over `nalgebra` (`math::linalg`)
//! - Engine configuration knobs (`config`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other folio_* crates:
//! - nalgebra: Dense vectors and matrices
//! - chrono: Date index of return matrices
//! - serde: Serialisation of requests and results
//!
//! ## Usage Examples
//!
//! ```rust
//! use chrono::NaiveDate;
//! use folio_core::stats::estimate;
//! use folio_core::types::ReturnMatrix;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let dates: Vec<NaiveDate> = (0..4).map(|d| start + chrono::Days::new(d)).collect();
//! let matrix = ReturnMatrix::new(
//!     dates,
//!     vec!["A".to_string(), "B".to_string()],
//!     vec![vec![0.01, -0.02, 0.03, 0.00], vec![0.02, -0.01, -0.01, 0.01]],
//! )
//! .unwrap();
//!
//! let est = estimate(&matrix).unwrap();
//! assert_eq!(est.n_assets(), 2);
//! assert!(est.covariance()[(0, 0)] > 0.0);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod config;
pub mod math;
pub mod stats;
pub mod types;

pub use config::{ConfigError, EngineConfig, SeedPolicy, SolverSettings};
pub use types::{FolioError, FolioResult};
