//! Dual-format input normalization.
//!
//! Win probabilities arrive as 0.68 or 68, unit prices as 0.45 or 45 (cents).
//! Both are converted to fractional form and range-checked. Out-of-range values
//! are rejected, never clamped.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{EngineError, Result};
use crate::market::models::Opportunity;

const PERCENT: Decimal = dec!(100);

/// Opportunity fields after normalization and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedInputs {
    pub win_probability: Decimal,
    pub unit_price: Decimal,
}

/// Convert a percentage-form probability (> 1) to a fraction. Idempotent on fractions.
pub fn normalize_probability(value: Decimal) -> Decimal {
    if value > Decimal::ONE {
        value / PERCENT
    } else {
        value
    }
}

/// Convert a cents-form price (> 1) to dollars. Idempotent on dollar prices.
pub fn normalize_price(value: Decimal) -> Decimal {
    if value > Decimal::ONE {
        value / PERCENT
    } else {
        value
    }
}

/// Normalize and validate an opportunity's numeric fields.
pub fn normalize_opportunity(opportunity: &Opportunity) -> Result<NormalizedInputs> {
    if opportunity.identifier.trim().is_empty() {
        return Err(EngineError::invalid_input("identifier", "must not be empty"));
    }

    let win_probability = normalize_probability(opportunity.win_probability);
    if win_probability < Decimal::ZERO || win_probability > Decimal::ONE {
        return Err(EngineError::invalid_input(
            "win_probability",
            format!(
                "{} normalizes to {win_probability}, outside [0, 1]",
                opportunity.win_probability
            ),
        ));
    }

    let unit_price = normalize_price(opportunity.unit_price);
    if unit_price <= Decimal::ZERO || unit_price > Decimal::ONE {
        return Err(EngineError::invalid_input(
            "unit_price",
            format!(
                "{} normalizes to {unit_price}, outside (0, 1]",
                opportunity.unit_price
            ),
        ));
    }

    Ok(NormalizedInputs {
        win_probability,
        unit_price,
    })
}
