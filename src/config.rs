//! Curation configuration.
//!
//! Every tunable of the curation run lives in [`CurationConfig`]. Values come
//! from defaults, an optional YAML file, `SCENE_FORGE_*` environment
//! variables, and finally explicit CLI flags, in that order of precedence.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::motion::{VelocityThresholds, DEFAULT_REFERENCE_CHANNEL};
use crate::split::{RedundancyCuts, SplitRatios};

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// The configuration file is not valid YAML for this schema.
    #[error("Invalid configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for analysis, classification and sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationConfig {
    // Motion settings
    /// Velocity (m/s) at or below which a step scores 1.0.
    pub low_velocity_threshold: f64,
    /// Velocity (m/s) at or above which a step scores 0.0.
    pub high_velocity_threshold: f64,
    /// Capture channel whose ego poses define motion.
    pub reference_channel: String,

    // Classification settings
    pub high_redundancy_cut: f64,
    pub low_redundancy_cut: f64,

    // Sampling settings
    pub seed: u64,
    pub train_ratio: f64,
    pub val_ratio: f64,
    pub test_ratio: f64,
}

impl Default for CurationConfig {
    fn default() -> Self {
        let thresholds = VelocityThresholds::default();
        let cuts = RedundancyCuts::default();
        let ratios = SplitRatios::default();
        Self {
            low_velocity_threshold: thresholds.low,
            high_velocity_threshold: thresholds.high,
            reference_channel: DEFAULT_REFERENCE_CHANNEL.to_string(),

            high_redundancy_cut: cuts.high,
            low_redundancy_cut: cuts.low,

            seed: 42,
            train_ratio: ratios.train,
            val_ratio: ratios.val,
            test_ratio: ratios.test,
        }
    }
}

impl CurationConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables over the defaults.
    ///
    /// # Environment Variables
    ///
    /// - `SCENE_FORGE_LOW_VELOCITY`: low velocity threshold (default: 1.0)
    /// - `SCENE_FORGE_HIGH_VELOCITY`: high velocity threshold (default: 5.0)
    /// - `SCENE_FORGE_HIGH_CUT`: high redundancy cut (default: 0.6)
    /// - `SCENE_FORGE_LOW_CUT`: low redundancy cut (default: 0.3)
    /// - `SCENE_FORGE_SEED`: sampling seed (default: 42)
    /// - `SCENE_FORGE_REFERENCE_CHANNEL`: reference channel (default: LIDAR_TOP)
    /// - `SCENE_FORGE_TRAIN_RATIO`, `SCENE_FORGE_VAL_RATIO`,
    ///   `SCENE_FORGE_TEST_RATIO`: split ratios (default: 0.7 / 0.15 / 0.15)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable cannot be parsed or the result
    /// fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::default().overlay_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a YAML file; keys it omits keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies any `SCENE_FORGE_*` variables that are set.
    pub fn overlay_env(mut self) -> Result<Self, ConfigError> {
        if let Some(val) = env_value("SCENE_FORGE_LOW_VELOCITY")? {
            self.low_velocity_threshold = val;
        }
        if let Some(val) = env_value("SCENE_FORGE_HIGH_VELOCITY")? {
            self.high_velocity_threshold = val;
        }
        if let Some(val) = env_value("SCENE_FORGE_HIGH_CUT")? {
            self.high_redundancy_cut = val;
        }
        if let Some(val) = env_value("SCENE_FORGE_LOW_CUT")? {
            self.low_redundancy_cut = val;
        }
        if let Some(val) = env_value("SCENE_FORGE_SEED")? {
            self.seed = val;
        }
        if let Ok(val) = std::env::var("SCENE_FORGE_REFERENCE_CHANNEL") {
            self.reference_channel = val;
        }
        if let Some(val) = env_value("SCENE_FORGE_TRAIN_RATIO")? {
            self.train_ratio = val;
        }
        if let Some(val) = env_value("SCENE_FORGE_VAL_RATIO")? {
            self.val_ratio = val;
        }
        if let Some(val) = env_value("SCENE_FORGE_TEST_RATIO")? {
            self.test_ratio = val;
        }
        Ok(self)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` naming the first rule broken.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds()
            .validate()
            .map_err(|e| ConfigError::ValidationFailed(e.to_string()))?;
        self.cuts()
            .validate()
            .map_err(|e| ConfigError::ValidationFailed(e.to_string()))?;
        self.ratios()
            .validate()
            .map_err(|e| ConfigError::ValidationFailed(e.to_string()))?;

        if self.reference_channel.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "reference_channel cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> VelocityThresholds {
        VelocityThresholds {
            low: self.low_velocity_threshold,
            high: self.high_velocity_threshold,
        }
    }

    pub fn cuts(&self) -> RedundancyCuts {
        RedundancyCuts {
            high: self.high_redundancy_cut,
            low: self.low_redundancy_cut,
        }
    }

    pub fn ratios(&self) -> SplitRatios {
        SplitRatios {
            train: self.train_ratio,
            val: self.val_ratio,
            test: self.test_ratio,
        }
    }

    /// Builder method to set both velocity thresholds.
    pub fn with_velocity_thresholds(mut self, low: f64, high: f64) -> Self {
        self.low_velocity_threshold = low;
        self.high_velocity_threshold = high;
        self
    }

    /// Builder method to set both redundancy cuts.
    pub fn with_redundancy_cuts(mut self, high: f64, low: f64) -> Self {
        self.high_redundancy_cut = high;
        self.low_redundancy_cut = low;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_reference_channel(mut self, channel: impl Into<String>) -> Self {
        self.reference_channel = channel.into();
        self
    }

    /// Builder method to set train/val/test ratios.
    pub fn with_split_ratios(mut self, train: f64, val: f64, test: f64) -> Self {
        self.train_ratio = train;
        self.val_ratio = val;
        self.test_ratio = test;
        self
    }
}

/// Reads and parses an environment variable if it is set.
fn env_value<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(val) => parse_env_value(&val, key).map(Some),
        Err(_) => Ok(None),
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CurationConfig::default();
        assert!((config.low_velocity_threshold - 1.0).abs() < f64::EPSILON);
        assert!((config.high_velocity_threshold - 5.0).abs() < f64::EPSILON);
        assert!((config.high_redundancy_cut - 0.6).abs() < f64::EPSILON);
        assert!((config.low_redundancy_cut - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.seed, 42);
        assert_eq!(config.reference_channel, "LIDAR_TOP");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CurationConfig::new()
            .with_velocity_thresholds(0.5, 8.0)
            .with_redundancy_cuts(0.7, 0.2)
            .with_seed(7)
            .with_reference_channel("CAM_FRONT")
            .with_split_ratios(0.8, 0.1, 0.1);

        assert_eq!(config.thresholds(), VelocityThresholds { low: 0.5, high: 8.0 });
        assert_eq!(config.cuts(), RedundancyCuts { high: 0.7, low: 0.2 });
        assert_eq!(config.seed, 7);
        assert_eq!(config.reference_channel, "CAM_FRONT");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_inverted_thresholds() {
        let config = CurationConfig::default().with_velocity_thresholds(5.0, 1.0);
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn test_validation_inverted_cuts() {
        let config = CurationConfig::default().with_redundancy_cuts(0.2, 0.5);
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("0.2"));
        assert!(message.contains("0.5"));
    }

    #[test]
    fn test_validation_ratio_sum() {
        let config = CurationConfig::default().with_split_ratios(0.5, 0.25, 0.5);
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("1.25"));
    }

    #[test]
    fn test_validation_empty_reference_channel() {
        let config = CurationConfig::default().with_reference_channel(" ");
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("reference_channel"));
    }

    #[test]
    fn test_yaml_missing_keys_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("curation.yaml");
        std::fs::write(&path, "seed: 1234\nhigh_velocity_threshold: 6.5\n").expect("write");

        let config = CurationConfig::from_yaml_file(&path).expect("load");
        assert_eq!(config.seed, 1234);
        assert!((config.high_velocity_threshold - 6.5).abs() < f64::EPSILON);
        assert!((config.low_velocity_threshold - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.reference_channel, "LIDAR_TOP");
    }

    #[test]
    fn test_yaml_invalid_values_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("curation.yaml");
        std::fs::write(&path, "low_redundancy_cut: 1.5\n").expect("write");
        assert!(matches!(
            CurationConfig::from_yaml_file(&path),
            Err(ConfigError::ValidationFailed(_))
        ));

        std::fs::write(&path, "seed: [1, 2]\n").expect("write");
        assert!(matches!(
            CurationConfig::from_yaml_file(&path),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_parse_env_value() {
        let seed: u64 = parse_env_value(" 17 ", "SCENE_FORGE_SEED").unwrap();
        assert_eq!(seed, 17);

        let err = parse_env_value::<f64>("fast", "SCENE_FORGE_HIGH_VELOCITY").unwrap_err();
        assert!(err.to_string().contains("SCENE_FORGE_HIGH_VELOCITY"));
        assert!(err.to_string().contains("fast"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ValidationFailed("test failure".to_string());
        assert!(err.to_string().contains("test failure"));
    }
}
