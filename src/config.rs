//! Configuration using Figment
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. built-in defaults
//! 2. `config/atlas.toml` (or the file given with `--config`)
//! 3. environment variables prefixed `ATLAS_`, `__` separating sections
//!
//! Serial parameters and thermistor constants are fixed by the firmware and the
//! probe, so they are deliberately absent here.
//!
//! # Example
//! ```no_run
//! use atlas_daq::config::AtlasConfig;
//!
//! // ATLAS_INSTRUMENT__PORT=/dev/ttyACM0 overrides the file
//! let config = AtlasConfig::load()?;
//! println!("log level: {}", config.application.log_level);
//! # Ok::<(), atlas_daq::error::AtlasError>(())
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::conversion::DEFAULT_DIGITS;
use crate::error::{AppResult, AtlasError};

/// Config file read when none is given explicitly.
pub const DEFAULT_CONFIG_PATH: &str = "config/atlas.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "ATLAS_";

/// Accepted log levels.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Accepted log output formats.
pub const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Largest rounding precision accepted for readings.
pub const MAX_DIGITS: i32 = 10;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtlasConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Instrument selection and output precision
    #[serde(default)]
    pub instrument: InstrumentConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// Instrument configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Port to open; discovery is used when absent
    #[serde(default)]
    pub port: Option<String>,
    /// Fractional digits kept in temperature readings
    #[serde(default = "default_digits")]
    pub digits: i32,
}

fn default_name() -> String {
    "Atlas".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_digits() -> i32 {
    DEFAULT_DIGITS
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            port: None,
            digits: default_digits(),
        }
    }
}

impl AtlasConfig {
    /// Load from [`DEFAULT_CONFIG_PATH`] (if present) and the environment.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from `path` (skipped if missing) and the environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config: Self = Self::figment(path.as_ref()).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load_from`](Self::load_from), but the file must exist.
    pub fn load_required<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AtlasError::Configuration(format!(
                "config file '{}' not found",
                path.display()
            )));
        }
        Self::load_from(path)
    }

    /// The provider stack, exposed so callers can merge extra layers.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Check values that parse fine but make no sense.
    pub fn validate(&self) -> AppResult<()> {
        let level = self.application.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(AtlasError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        let format = self.application.log_format.to_lowercase();
        if !LOG_FORMATS.contains(&format.as_str()) {
            return Err(AtlasError::Configuration(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                LOG_FORMATS.join(", ")
            )));
        }

        if !(0..=MAX_DIGITS).contains(&self.instrument.digits) {
            return Err(AtlasError::Configuration(format!(
                "Invalid digits {}. Must be 0-{MAX_DIGITS}",
                self.instrument.digits
            )));
        }

        if let Some(port) = &self.instrument.port {
            if port.trim().is_empty() {
                return Err(AtlasError::Configuration(
                    "instrument.port must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}
