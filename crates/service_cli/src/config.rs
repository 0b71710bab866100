//! CLI configuration management
//!
//! Loads `folio.toml`, applies `FOLIO_*` environment overrides and validates
//! the engine knobs.
//!
//! ```toml
//! log_level = "info"
//!
//! [engine]
//! risk_free_rate = 0.065
//! confidence_levels = [0.95, 0.99]
//! seed = "entropy"
//! ```

use folio_core::config::{ConfigError, EngineConfig, SeedPolicy};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

/// Default configuration file, read only if present.
pub const DEFAULT_CONFIG_FILE: &str = "folio.toml";

/// Log levels supported by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidParameter {
                name: "log_level",
                value: format!("{} (expected trace, debug, info, warn or error)", s),
            }),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// CLI configuration: log level plus the engine knobs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log level used when `RUST_LOG` is unset
    pub log_level: LogLevel,
    /// Engine configuration
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Apply `FOLIO_*` overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(rate) = lookup("FOLIO_RISK_FREE_RATE") {
            self.engine.risk_free_rate = rate.trim().parse().map_err(|_| {
                ConfigError::InvalidParameter {
                    name: "risk_free_rate",
                    value: format!("'{}' is not a number", rate),
                }
            })?;
        }

        if let Some(seed) = lookup("FOLIO_SEED") {
            self.engine.seed = parse_seed(&seed)?;
        }

        if let Some(level) = lookup("FOLIO_LOG_LEVEL") {
            self.log_level = LogLevel::from_str(&level)?;
        }

        Ok(())
    }
}

/// Parse a seed override: an integer or `entropy`
pub fn parse_seed(s: &str) -> Result<SeedPolicy, ConfigError> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("entropy") {
        return Ok(SeedPolicy::Entropy);
    }
    s.parse()
        .map(SeedPolicy::Fixed)
        .map_err(|_| ConfigError::InvalidParameter {
            name: "seed",
            value: format!("'{}' is neither an integer nor 'entropy'", s),
        })
}

/// Build configuration from all sources
///
/// Priority (highest to lowest):
/// 1. Environment variables
/// 2. Config file (explicit path, else `folio.toml` if present)
/// 3. Default values
pub fn build_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            AppConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => AppConfig::default(),
    };

    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.engine.validate()?;

    Ok(config)
}
