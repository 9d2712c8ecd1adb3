//! Qualitative risk bands.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Coarse risk level for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Low,
    Moderate,
    High,
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskBand::Low => "low",
            RiskBand::Moderate => "moderate",
            RiskBand::High => "high",
        })
    }
}

/// Band boundaries. Both comparisons are strict: `p > high` is High,
/// `moderate < p <= high` is Moderate, anything else Low.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskThresholds {
    pub high: f64,
    pub moderate: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high: 0.7,
            moderate: 0.4,
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0 <= self.moderate && self.moderate < self.high && self.high <= 1.0) {
            return Err(ConfigError::invalid(
                "risk",
                format!(
                    "need 0 <= moderate < high <= 1, got moderate={} high={}",
                    self.moderate, self.high
                ),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn band(&self, probability: f64) -> RiskBand {
        if probability > self.high {
            RiskBand::High
        } else if probability > self.moderate {
            RiskBand::Moderate
        } else {
            RiskBand::Low
        }
    }
}

/// Scoring result for one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    /// Probability of leaving within the horizon, in [0, 1].
    pub probability: f64,
    pub band: RiskBand,
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}% ({} risk)", self.probability * 100.0, self.band)
    }
}
