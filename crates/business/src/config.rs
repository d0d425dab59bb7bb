//! Reconciliation configuration
//!
//! Loaded from a JSON file; every field has a default so partial files work.
//! The values are resolved once into explicit parameters (threshold,
//! [`DayWindowPolicy`]) and passed down, never read from global state.

use crate::error::BusinessError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tally_core::DayWindowPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconConfig {
    /// Max tolerated |diff| before WARN becomes DANGER.
    /// Used when the risk rule store has no value.
    #[serde(default = "default_risk_threshold")]
    pub risk_threshold: Decimal,

    /// IANA timezone that defines the reconciliation day
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_risk_threshold() -> Decimal {
    Decimal::new(10, 0)
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            risk_threshold: default_risk_threshold(),
            timezone: default_timezone(),
        }
    }
}

impl ReconConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> Result<Self, BusinessError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BusinessError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| BusinessError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BusinessError> {
        if self.risk_threshold < Decimal::ZERO {
            return Err(BusinessError::InvalidThreshold(self.risk_threshold));
        }
        self.day_window_policy()?;
        Ok(())
    }

    pub fn day_window_policy(&self) -> Result<DayWindowPolicy, BusinessError> {
        Ok(DayWindowPolicy::from_name(&self.timezone)?)
    }
}
