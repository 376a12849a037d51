use serde::{Deserialize, Serialize};

use crate::error::RiskError;
use crate::models::Covenant;

const HIGH_RISK_ABOVE: f64 = 0.7;
const MEDIUM_RISK_FROM: f64 = 0.4;

/// Display tier for a 30-day breach probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    None,
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// A probability already checked to lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct BreachProbability(f64);

impl BreachProbability {
    pub fn new(value: f64) -> Result<Self, RiskError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RiskError::OutOfRange(value))
        }
    }

    pub fn tier(self) -> RiskTier {
        if self.0 > HIGH_RISK_ABOVE {
            RiskTier::High
        } else if self.0 >= MEDIUM_RISK_FROM {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

/// `> 0.7` high, `[0.4, 0.7]` medium, `< 0.4` low, absent none.
///
/// Values outside `[0, 1]` (including NaN) carry no usable signal and
/// classify as [`RiskTier::None`].
pub fn tier(probability: Option<f64>) -> RiskTier {
    probability
        .and_then(|value| BreachProbability::new(value).ok())
        .map(BreachProbability::tier)
        .unwrap_or(RiskTier::None)
}

pub fn covenant_tier(covenant: &Covenant) -> RiskTier {
    tier(covenant.breach_probability_30d)
}
