//! Commission policy applied per purchased unit.
//!
//! A policy is an explicit value passed into every evaluation. Validation
//! happens once, when the policy is built.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    /// Flat dollar fee per unit.
    FixedPerUnit,
    /// Fraction of the unit price.
    PercentageOfPrice,
}

impl std::str::FromStr for RateKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fixed" | "fixed_per_unit" => Ok(Self::FixedPerUnit),
            "percentage" | "percent" | "percentage_of_price" => Ok(Self::PercentageOfPrice),
            other => Err(EngineError::configuration(format!(
                "unknown commission kind '{other}' (expected fixed_per_unit or percentage_of_price)"
            ))),
        }
    }
}

/// Trading venues with a known per-unit fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Robinhood,
    Kalshi,
    #[serde(alias = "predict_it")]
    PredictIt,
    Polymarket,
    Custom,
}

impl Platform {
    pub const PRESETS: [Platform; 4] = [
        Platform::Robinhood,
        Platform::Kalshi,
        Platform::PredictIt,
        Platform::Polymarket,
    ];

    /// Preset fee per unit, `None` for `Custom`.
    pub fn preset_rate(&self) -> Option<Decimal> {
        match self {
            Self::Robinhood => Some(dec!(0.02)),
            Self::Kalshi => Some(Decimal::ZERO),
            Self::PredictIt => Some(dec!(0.10)),
            Self::Polymarket => Some(Decimal::ZERO),
            Self::Custom => None,
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "robinhood" => Ok(Self::Robinhood),
            "kalshi" => Ok(Self::Kalshi),
            "predictit" | "predict_it" => Ok(Self::PredictIt),
            "polymarket" => Ok(Self::Polymarket),
            "custom" => Ok(Self::Custom),
            other => Err(EngineError::configuration(format!("unknown platform '{other}'"))),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Robinhood => write!(f, "Robinhood"),
            Self::Kalshi => write!(f, "Kalshi"),
            Self::PredictIt => write!(f, "PredictIt"),
            Self::Polymarket => write!(f, "Polymarket"),
            Self::Custom => write!(f, "Custom"),
        }
    }
}

/// Cost model applied per unit purchased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommissionPolicy {
    platform: Platform,
    kind: RateKind,
    rate: Decimal,
}

impl CommissionPolicy {
    /// Build a custom policy, validating the rate for its kind.
    pub fn new(kind: RateKind, rate: Decimal) -> Result<Self> {
        if rate < Decimal::ZERO {
            return Err(EngineError::configuration(format!(
                "commission rate must be non-negative, got {rate}"
            )));
        }
        if kind == RateKind::PercentageOfPrice && rate > Decimal::ONE {
            return Err(EngineError::configuration(format!(
                "percentage commission rate must be in [0, 1], got {rate}"
            )));
        }
        Ok(Self {
            platform: Platform::Custom,
            kind,
            rate,
        })
    }

    /// Policy for a platform preset. `Custom` has no preset and is rejected.
    pub fn for_platform(platform: Platform) -> Result<Self> {
        let rate = platform.preset_rate().ok_or_else(|| {
            EngineError::configuration("custom platform requires an explicit commission rate")
        })?;
        Ok(Self {
            platform,
            kind: RateKind::FixedPerUnit,
            rate,
        })
    }

    /// No commission at all.
    pub fn free() -> Self {
        Self {
            platform: Platform::Custom,
            kind: RateKind::FixedPerUnit,
            rate: Decimal::ZERO,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn kind(&self) -> RateKind {
        self.kind
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Commission charged on one unit bought at `unit_price`.
    pub fn per_unit_commission(&self, unit_price: Decimal) -> Decimal {
        match self.kind {
            RateKind::FixedPerUnit => self.rate,
            RateKind::PercentageOfPrice => unit_price * self.rate,
        }
    }
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self {
            platform: Platform::Robinhood,
            kind: RateKind::FixedPerUnit,
            rate: dec!(0.02),
        }
    }
}

impl std::fmt::Display for CommissionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            RateKind::FixedPerUnit => write!(f, "{}: ${:.2} per unit", self.platform, self.rate),
            RateKind::PercentageOfPrice => {
                write!(f, "{}: {:.2}% of price", self.platform, self.rate * dec!(100))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_robinhood() {
        let p = CommissionPolicy::default();
        assert_eq!(p.platform(), Platform::Robinhood);
        assert_eq!(p.per_unit_commission(dec!(0.45)), dec!(0.02));
    }

    #[test]
    fn test_presets() {
        assert_eq!(
            CommissionPolicy::for_platform(Platform::Kalshi).unwrap().rate(),
            Decimal::ZERO
        );
        assert_eq!(
            CommissionPolicy::for_platform(Platform::PredictIt).unwrap().rate(),
            dec!(0.10)
        );
        assert!(CommissionPolicy::for_platform(Platform::Custom).is_err());
    }

    #[test]
    fn test_percentage_of_price() {
        let p = CommissionPolicy::new(RateKind::PercentageOfPrice, dec!(0.05)).unwrap();
        assert_eq!(p.per_unit_commission(dec!(0.40)), dec!(0.02));
    }

    #[test]
    fn test_negative_rate_rejected() {
        let err = CommissionPolicy::new(RateKind::FixedPerUnit, dec!(-0.01)).unwrap_err();
        assert!(matches!(err, EngineError::Configuration { .. }));
    }

    #[test]
    fn test_percentage_above_one_rejected() {
        assert!(CommissionPolicy::new(RateKind::PercentageOfPrice, dec!(1.5)).is_err());
        assert!(CommissionPolicy::new(RateKind::PercentageOfPrice, Decimal::ONE).is_ok());
        // Fixed fees have no upper bound.
        assert!(CommissionPolicy::new(RateKind::FixedPerUnit, dec!(1.5)).is_ok());
    }

    #[test]
    fn test_parse_platform_and_kind() {
        assert_eq!("PredictIt".parse::<Platform>().unwrap(), Platform::PredictIt);
        assert_eq!("percentage".parse::<RateKind>().unwrap(), RateKind::PercentageOfPrice);
        assert_eq!("fixed-per-unit".parse::<RateKind>().unwrap(), RateKind::FixedPerUnit);
        assert!("betfair".parse::<Platform>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(CommissionPolicy::default().to_string(), "Robinhood: $0.02 per unit");
    }
}
