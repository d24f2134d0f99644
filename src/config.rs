use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};
use strum::EnumCount;
use thiserror::Error;

use crate::{ast::ObsRange, currency::Currency};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    #[serde(default = "default_currency_count")]
    pub currency_count: usize,

    // Applied to ScaleObs nodes that carry no range of their own.
    #[serde(default = "default_obs_range")]
    pub default_obs_range: ObsRange,

    #[serde(default = "default_true")]
    pub deduplicate_gateways: bool,

    /// Upper bound on refreshes in flight at once. `None` refreshes every
    /// gateway at the same time.
    #[serde(default)]
    pub max_concurrent_refreshes: Option<usize>,

    #[serde(default = "default_refresh_operation")]
    pub refresh_operation: String,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            currency_count: default_currency_count(),
            default_obs_range: default_obs_range(),
            deduplicate_gateways: default_true(),
            max_concurrent_refreshes: None,
            refresh_operation: default_refresh_operation(),
        }
    }
}

impl EvaluatorConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        from_file(path)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.currency_count == 0 {
            return Err(ConfigError::Invalid(
                "currency_count must be at least 1".to_string(),
            ));
        }
        let range = self.default_obs_range;
        if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
            return Err(ConfigError::Invalid(format!(
                "default_obs_range [{}, {}] is not a valid range",
                range.min, range.max
            )));
        }
        if self.max_concurrent_refreshes == Some(0) {
            return Err(ConfigError::Invalid(
                "max_concurrent_refreshes must be at least 1".to_string(),
            ));
        }
        if self.refresh_operation.is_empty() {
            return Err(ConfigError::Invalid(
                "refresh_operation must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> ConfigResult<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> ConfigResult<T> {
    Ok(serde_json::from_str(s)?)
}

fn default_currency_count() -> usize {
    Currency::COUNT
}

fn default_obs_range() -> ObsRange {
    ObsRange::default()
}

fn default_true() -> bool {
    true
}

fn default_refresh_operation() -> String {
    "update".to_string()
}
