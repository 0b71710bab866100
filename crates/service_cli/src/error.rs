//! CLI error types.

use folio_core::{ConfigError, FolioError};
use thiserror::Error;

/// Errors raised by the command-line layer.
#[derive(Debug, Error)]
pub enum CliError {
    /// Input file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Malformed command-line argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed input data.
    #[error("Invalid data in {file}: {message}")]
    InvalidData {
        /// Offending file.
        file: String,
        /// What was wrong.
        message: String,
    },

    /// Configuration could not be loaded or is out of range.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Engine rejected the request.
    #[error(transparent)]
    Engine(#[from] FolioError),

    /// CSV reader error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON output error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
