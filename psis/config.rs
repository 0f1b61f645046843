//! Smoothing options shared by [`crate::smooth`] and [`crate::loo`].
//!
//! The options can be built in code or read from a small TOML file:
//!
//! ```toml
//! wcpp = 20.0
//! wtrunc = 0.75
//! ```
//!
//! Missing keys fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Default percentage of draws used for the tail fit.
pub const DEFAULT_WCPP: f64 = 20.0;
/// Default truncation exponent: weights are capped at `n^wtrunc` times their mean.
pub const DEFAULT_WTRUNC: f64 = 0.75;

/// Error type for reading, writing and validating smoothing options and reports.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Tail percentage must lie in (0, 100], but was {0}.")]
    InvalidTailPercentage(f64),
    #[error("Truncation exponent must be finite and non-negative, but was {0}.")]
    InvalidTruncation(f64),
}

/// Options for Pareto smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsisConfig {
    /// Percentage of draws, from the top, used for the generalized Pareto fit.
    pub wcpp: f64,
    /// Positive exponent for truncating very large weights to `n^wtrunc`.
    /// Zero disables truncation.
    pub wtrunc: f64,
}

impl Default for PsisConfig {
    fn default() -> Self {
        Self {
            wcpp: DEFAULT_WCPP,
            wtrunc: DEFAULT_WTRUNC,
        }
    }
}

impl PsisConfig {
    pub fn with_wcpp(mut self, wcpp: f64) -> Self {
        self.wcpp = wcpp;
        self
    }

    pub fn with_wtrunc(mut self, wtrunc: f64) -> Self {
        self.wtrunc = wtrunc;
        self
    }

    pub fn without_truncation(self) -> Self {
        self.with_wtrunc(0.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.wcpp > 0.0 && self.wcpp <= 100.0) {
            return Err(ConfigError::InvalidTailPercentage(self.wcpp));
        }
        if !(self.wtrunc.is_finite() && self.wtrunc >= 0.0) {
            return Err(ConfigError::InvalidTruncation(self.wtrunc));
        }
        Ok(())
    }

    /// Parses and validates options from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Saves the options to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        Ok(())
    }
}
