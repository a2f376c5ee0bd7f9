use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::error::EngineError;
use crate::risk::commission::{CommissionPolicy, Platform, RateKind};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub commission: CommissionConfig,
    #[serde(default)]
    pub io: IoConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Thresholds consumed by the evaluator and the allocation engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Minimum EV, in percentage points, for a BET.
    pub min_ev_threshold_pct: Decimal,
    /// Safety multiplier applied to the full Kelly fraction.
    pub half_kelly_multiplier: Decimal,
    /// Hard cap on the bankroll fraction per opportunity.
    pub max_bet_pct: Decimal,
    /// Remaining-bankroll floor, as a fraction of the original bankroll, for partial fills.
    pub min_bankroll_for_partial_pct: Decimal,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            min_ev_threshold_pct: dec!(10.0),
            half_kelly_multiplier: dec!(0.5),
            max_bet_pct: dec!(0.15),
            min_bankroll_for_partial_pct: dec!(0.01),
        }
    }
}

impl SizingConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min_ev_threshold_pct < Decimal::ZERO {
            return Err(EngineError::configuration(format!(
                "min_ev_threshold_pct must be non-negative, got {}",
                self.min_ev_threshold_pct
            )));
        }
        if self.half_kelly_multiplier <= Decimal::ZERO
            || self.half_kelly_multiplier > Decimal::ONE
        {
            return Err(EngineError::configuration(format!(
                "half_kelly_multiplier must be in (0, 1], got {}",
                self.half_kelly_multiplier
            )));
        }
        if self.max_bet_pct <= Decimal::ZERO || self.max_bet_pct > Decimal::ONE {
            return Err(EngineError::configuration(format!(
                "max_bet_pct must be in (0, 1], got {}",
                self.max_bet_pct
            )));
        }
        if self.min_bankroll_for_partial_pct < Decimal::ZERO
            || self.min_bankroll_for_partial_pct > Decimal::ONE
        {
            return Err(EngineError::configuration(format!(
                "min_bankroll_for_partial_pct must be in [0, 1], got {}",
                self.min_bankroll_for_partial_pct
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommissionConfig {
    pub platform: Platform,
    #[serde(default)]
    pub kind: Option<RateKind>,
    #[serde(default)]
    pub rate: Option<Decimal>,
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self {
            platform: Platform::Robinhood,
            kind: None,
            rate: None,
        }
    }
}

impl CommissionConfig {
    /// Resolve into a validated policy.
    pub fn policy(&self) -> Result<CommissionPolicy, EngineError> {
        match (self.platform, self.kind, self.rate) {
            (Platform::Custom, kind, Some(rate)) => {
                CommissionPolicy::new(kind.unwrap_or(RateKind::FixedPerUnit), rate)
            }
            (Platform::Custom, _, None) => Err(EngineError::configuration(
                "custom platform requires an explicit commission rate",
            )),
            (platform, None, None) => CommissionPolicy::for_platform(platform),
            (platform, _, _) => Err(EngineError::configuration(format!(
                "{platform} uses a preset rate and kind; set platform = \"custom\" to supply them"
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub sample_file: String,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/input"),
            output_dir: PathBuf::from("data/output"),
            sample_file: "sample_games.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, after overlaying `.env` into the environment.
    pub fn load(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to load config file: {}", path.display()))
    }

    /// Parse and validate configuration text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.sizing.validate()?;
        self.commission.policy()?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sizing: SizingConfig::default(),
            commission: CommissionConfig::default(),
            io: IoConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}
