//! Engine configuration and its validation.

use crate::codec::VECTOR_BITS;
use crate::layer::MAX_FAN_OUT;
use crate::network::{Dimensions, Recurrence};

use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating a `Config`.
///
/// Every dimensional check runs before any layer is allocated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroLength(&'static str),
    #[error("{layer} units would need {fan_out} outgoing weights (maximum {max})")]
    FanOut {
        layer: &'static str,
        fan_out: usize,
        max: usize,
    },
    #[error("{bits} pattern bits do not fit in a {max}-bit raw vector")]
    VectorWidth { bits: usize, max: usize },
    #[error("cycles_per_epoch must be greater than zero")]
    EmptyEpoch,
    #[error("error_threshold must be finite and non-negative, got {0}")]
    Threshold(f64),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// How cycles are grouped into epochs, and when training counts as done.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    /// Number of cycles in one epoch.
    pub cycles_per_epoch: u32,
    /// A run stops once an epoch's accumulated error falls below this.
    pub error_threshold: f64,
    /// Optional cap on the number of epochs in a single run.
    pub max_epochs: Option<u64>,
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule {
            cycles_per_epoch: 84,
            error_threshold: 45.0,
            max_epochs: None,
        }
    }
}

/// The parameters a controller is configured from.
///
/// `input_len` counts the bias unit, so a 24-feature sensor vector is
/// configured with `input_len = 25`. The hidden layer size is always derived
/// from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub input_len: u16,
    pub output_len: u16,
    #[serde(default)]
    pub training_enabled: bool,
    #[serde(default)]
    pub recurrence: Recurrence,
    /// Seed for weight initialisation and perturbation. A random seed is
    /// drawn when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub schedule: Schedule,
}

impl Default for Config {
    /// The reference configuration: 24 feature bits plus bias, 7 outputs,
    /// training enabled.
    fn default() -> Self {
        Config::new(25, 7, true)
    }
}

impl Config {
    pub fn new(input_len: u16, output_len: u16, training_enabled: bool) -> Self {
        Config {
            input_len,
            output_len,
            training_enabled,
            recurrence: Recurrence::default(),
            seed: None,
            schedule: Schedule::default(),
        }
    }

    /// Reads a JSON configuration from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.input_len as usize, self.output_len as usize)
    }

    /// Verifies that the configured sizes fit the engine's fixed bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_len == 0 {
            return Err(ConfigError::ZeroLength("input_len"));
        }
        if self.output_len == 0 {
            return Err(ConfigError::ZeroLength("output_len"));
        }
        let dims = self.dimensions();
        let checks = [
            ("input", dims.hidden_len + 1),
            ("hidden", dims.output_len),
        ];
        for &(layer, fan_out) in &checks {
            if fan_out > MAX_FAN_OUT {
                return Err(ConfigError::FanOut {
                    layer,
                    fan_out,
                    max: MAX_FAN_OUT,
                });
            }
        }
        let bits = dims.feature_bits() + dims.output_len;
        if bits > VECTOR_BITS {
            return Err(ConfigError::VectorWidth {
                bits,
                max: VECTOR_BITS,
            });
        }
        if self.schedule.cycles_per_epoch == 0 {
            return Err(ConfigError::EmptyEpoch);
        }
        let threshold = self.schedule.error_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Threshold(threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dimensions().hidden_len, 37);
        assert_eq!(config.schedule.cycles_per_epoch, 84);
        assert_eq!(config.schedule.error_threshold, 45.0);
    }

    #[test]
    fn zero_lengths_are_rejected() {
        assert!(matches!(
            Config::new(0, 7, true).validate(),
            Err(ConfigError::ZeroLength("input_len"))
        ));
        assert!(matches!(
            Config::new(25, 0, true).validate(),
            Err(ConfigError::ZeroLength("output_len"))
        ));
    }

    #[test]
    fn oversized_hidden_layer_is_rejected() {
        // 34 * 3 / 2 = 51 hidden units, plus bias.
        match Config::new(34, 2, true).validate() {
            Err(ConfigError::FanOut { layer, fan_out, max }) => {
                assert_eq!(layer, "input");
                assert_eq!(fan_out, 52);
                assert_eq!(max, MAX_FAN_OUT);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn fan_out_bound_is_inclusive() {
        // 33 * 3 / 2 = 49 hidden units, plus bias is exactly the bound, so
        // only the raw vector width is exceeded.
        assert!(matches!(
            Config::new(33, 1, true).validate(),
            Err(ConfigError::VectorWidth { bits: 33, .. })
        ));
        assert!(Config::new(32, 1, true).validate().is_ok());
    }

    #[test]
    fn pattern_must_fit_raw_vector() {
        match Config::new(25, 9, true).validate() {
            Err(ConfigError::VectorWidth { bits, max }) => {
                assert_eq!(bits, 33);
                assert_eq!(max, 32);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn schedule_is_checked() {
        let mut config = Config::default();
        config.schedule.cycles_per_epoch = 0;
        assert!(matches!(config.validate(), Err(ConfigError::EmptyEpoch)));

        let mut config = Config::default();
        config.schedule.error_threshold = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::Threshold(_))));
    }

    #[test]
    fn parses_minimal_json() {
        let config: Config =
            serde_json::from_str(r#"{ "input_len": 25, "output_len": 7 }"#).unwrap();
        assert!(!config.training_enabled);
        assert_eq!(config.recurrence, Recurrence::Disabled);
        assert_eq!(config.seed, None);
        assert_eq!(config.schedule, Schedule::default());
    }

    #[test]
    fn parses_full_json() {
        let config: Config = serde_json::from_str(
            r#"{
                "input_len": 9,
                "output_len": 3,
                "training_enabled": true,
                "recurrence": "context",
                "seed": 11,
                "schedule": { "cycles_per_epoch": 4, "error_threshold": 1.5 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.recurrence, Recurrence::Context);
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.schedule.cycles_per_epoch, 4);
        assert_eq!(config.schedule.max_epochs, None);
        assert!(config.validate().is_ok());
    }
}
