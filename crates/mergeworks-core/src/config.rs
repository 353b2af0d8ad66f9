//! Simulation configuration.
//!
//! All tunables live in [`SimConfig`]. Every section implements `Default`
//! and deserializes with `#[serde(default)]`, so a config file only needs
//! the values it overrides:
//!
//! ```
//! use mergeworks_core::config::SimConfig;
//!
//! let config = SimConfig::from_json_str(r#"{ "merge": { "duration": 1.0 } }"#).unwrap();
//! assert_eq!(config.merge.duration, 1.0);
//! assert_eq!(config.merge.cooldown_after_spawn, 0.5);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shop::ShopConfig;

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The config is not valid JSON for [`SimConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Pool sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Slots allocated when the world is created.
    pub prewarm: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { prewarm: 32 }
    }
}

/// Merge tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Seconds after (re)spawn, or after a merge ends, before a ball may merge.
    pub cooldown_after_spawn: f32,
    /// Seconds the merge transition takes.
    pub duration: f32,
    /// Maximum speed of either ball for a merge to start.
    pub max_velocity: f32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            cooldown_after_spawn: 0.5,
            duration: 0.25,
            max_velocity: 0.5,
        }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed for spawner jitter.
    pub seed: u64,
    /// Pool sizing.
    pub pool: PoolConfig,
    /// Merge tunables.
    pub merge: MergeConfig,
    /// Gadget catalog.
    pub shop: ShopConfig,
}

impl SimConfig {
    /// Parses and validates a JSON config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`SimConfig::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("merge.cooldown_after_spawn", self.merge.cooldown_after_spawn)?;
        non_negative("merge.duration", self.merge.duration)?;
        non_negative("merge.max_velocity", self.merge.max_velocity)?;
        self.shop.validate()
    }
}

pub(crate) fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("expected a finite value >= 0, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.merge.cooldown_after_spawn, 0.5);
        assert_eq!(config.pool.prewarm, 32);
    }

    #[test]
    fn empty_object_uses_defaults() {
        let config = SimConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn partial_override() {
        let config =
            SimConfig::from_json_str(r#"{ "seed": 9, "merge": { "max_velocity": 2.0 } }"#)
                .unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.merge.max_velocity, 2.0);
        assert_eq!(config.merge.duration, 0.25);
    }

    #[test]
    fn negative_duration_rejected() {
        let err = SimConfig::from_json_str(r#"{ "merge": { "duration": -1.0 } }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "merge.duration",
                ..
            }
        ));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = SimConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SimConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("not/here.json"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.json");
        std::fs::write(&path, r#"{ "pool": { "prewarm": 4 } }"#).unwrap();

        let config = SimConfig::load(&path).unwrap();
        assert_eq!(config.pool.prewarm, 4);
    }

    #[test]
    fn serialization_roundtrip() {
        let config = SimConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(SimConfig::from_json_str(&json).unwrap(), config);
    }
}
