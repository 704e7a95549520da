//! Engine configuration

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Limits the prediction service enforces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fewest observations a forecast may be computed from (at least 2)
    pub min_points: usize,
    /// Largest accepted `future_steps`
    pub max_future_steps: usize,
    /// Used when a request does not name a step count
    pub default_future_steps: usize,
    pub max_title_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_points: 2,
            max_future_steps: 20,
            default_future_steps: 3,
            max_title_len: 255,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_points < 2 {
            return Err(ForecastError::InvalidConfig(format!(
                "min_points must be at least 2, got {}",
                self.min_points
            )));
        }
        if self.max_future_steps == 0 {
            return Err(ForecastError::InvalidConfig(
                "max_future_steps must be positive".to_string(),
            ));
        }
        if self.default_future_steps == 0 || self.default_future_steps > self.max_future_steps {
            return Err(ForecastError::InvalidConfig(format!(
                "default_future_steps must be between 1 and {}, got {}",
                self.max_future_steps, self.default_future_steps
            )));
        }
        if self.max_title_len == 0 {
            return Err(ForecastError::InvalidConfig(
                "max_title_len must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
