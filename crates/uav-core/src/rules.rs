//! Safety tolerances for conflict detection.

use crate::error::{DeconflictError, Result};
use serde::{Deserialize, Serialize};

/// Spatial and temporal tolerances that define a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyRules {
    /// Minimum separation in length units (strict: closer than this conflicts)
    pub safety_distance: f64,
    /// Time window in seconds (strict: nearer in time than this conflicts)
    pub time_threshold: f64,
}

impl Default for SafetyRules {
    fn default() -> Self {
        Self {
            safety_distance: 4.0,
            time_threshold: 2.0,
        }
    }
}

impl SafetyRules {
    pub fn new(safety_distance: f64, time_threshold: f64) -> Result<Self> {
        let rules = Self {
            safety_distance,
            time_threshold,
        };
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> Result<()> {
        require_positive("safety_distance", self.safety_distance)?;
        require_positive("time_threshold", self.time_threshold)
    }
}

pub(crate) fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DeconflictError::InvalidConfiguration(format!(
            "{} must be a positive finite number, got {}",
            name, value
        )))
    }
}
