//! Kelly Criterion opportunity evaluator.
//!
//! Scores one opportunity against a bankroll: commission-adjusted EV gate,
//! fractional Kelly with a hard cap, then discretization to whole units.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::config::SizingConfig;
use crate::error::{EngineError, Result};
use crate::market::models::{BetSizing, Decision, EvaluationResult, NoBetReason, Opportunity};
use crate::market::normalize::normalize_opportunity;
use crate::risk::commission::CommissionPolicy;

/// Whole units purchasable for a dollar amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitFill {
    pub units: u64,
    pub actual_amount: Decimal,
    pub unused_amount: Decimal,
}

/// Round `amount` down to whole units at `adjusted_unit_price`.
///
/// `unused_amount` is never negative since units are floored.
pub fn whole_units(amount: Decimal, adjusted_unit_price: Decimal) -> UnitFill {
    if amount <= Decimal::ZERO || adjusted_unit_price <= Decimal::ZERO {
        return UnitFill {
            units: 0,
            actual_amount: Decimal::ZERO,
            unused_amount: amount.max(Decimal::ZERO),
        };
    }

    let units = floor_units(
        amount
            .checked_div(adjusted_unit_price)
            .unwrap_or(Decimal::MAX),
    );
    let actual_amount = Decimal::from(units) * adjusted_unit_price;
    UnitFill {
        units,
        actual_amount,
        unused_amount: amount - actual_amount,
    }
}

/// Rejects prices so small that the arithmetic leaves `Decimal` range.
fn checked(value: Option<Decimal>, unit_price: Decimal) -> Result<Decimal> {
    value.ok_or_else(|| {
        EngineError::invalid_input(
            "unit_price",
            format!("{unit_price} is too small to size against this bankroll"),
        )
    })
}

fn floor_units(quotient: Decimal) -> u64 {
    let floored = quotient.floor();
    // Saturate on absurd quotients instead of wrapping.
    floored.to_u64().unwrap_or(u64::MAX)
}

/// Evaluate one opportunity against `bankroll`.
///
/// # Formula
/// ```text
/// adjusted = price + commission(price)
/// ev       = p / adjusted - 1
/// b        = 1 / adjusted - 1
/// kelly    = (b * p - q) / b
/// k_final  = min(kelly * multiplier, max_bet_pct)
/// units    = floor(k_final * bankroll / adjusted)
/// ```
pub fn evaluate(
    opportunity: &Opportunity,
    bankroll: Decimal,
    commission: &CommissionPolicy,
    config: &SizingConfig,
) -> Result<EvaluationResult> {
    if bankroll <= Decimal::ZERO {
        return Err(EngineError::invalid_input(
            "bankroll",
            format!("must be positive, got {bankroll}"),
        ));
    }
    let inputs = normalize_opportunity(opportunity)?;
    let p = inputs.win_probability;
    let price = inputs.unit_price;

    let commission_per_unit = commission.per_unit_commission(price);
    let adjusted_unit_price = price + commission_per_unit;

    let ev_fraction = checked(p.checked_div(adjusted_unit_price), price)? - Decimal::ONE;
    let expected_value_pct = checked(ev_fraction.checked_mul(dec!(100)), price)?;
    let gross_expected_value_pct = checked(
        p.checked_div(price)
            .and_then(|ratio| (ratio - Decimal::ONE).checked_mul(dec!(100))),
        price,
    )?;
    // Whole-unit counts for the full bankroll must fit in u64.
    checked(
        bankroll
            .checked_div(adjusted_unit_price)
            .filter(|units| units.floor().to_u64().is_some()),
        price,
    )?;

    let result = |decision: Decision| EvaluationResult {
        identifier: opportunity.identifier.clone(),
        margin: opportunity.margin,
        win_probability: p,
        unit_price: price,
        commission_per_unit,
        adjusted_unit_price,
        expected_value_pct,
        gross_expected_value_pct,
        decision,
    };

    // Edge threshold gate
    if expected_value_pct < config.min_ev_threshold_pct {
        debug!(
            id = %opportunity.identifier,
            ev_pct = %expected_value_pct.round_dp(2),
            threshold = %config.min_ev_threshold_pct,
            "EV below threshold, no bet"
        );
        return Ok(result(Decision::NoBet {
            reason: NoBetReason::BelowEvThreshold {
                threshold_pct: config.min_ev_threshold_pct,
            },
        }));
    }

    // Net odds: what one dollar of cost returns on a win
    let b = Decimal::ONE / adjusted_unit_price - Decimal::ONE;
    let q = Decimal::ONE - p;
    let kelly = if b > Decimal::ZERO {
        (b * p - q) / b
    } else {
        Decimal::ZERO
    };

    // A zero threshold admits zero-edge prices, where Kelly is zero
    if kelly <= Decimal::ZERO {
        debug!(id = %opportunity.identifier, kelly = %kelly, "Non-positive Kelly, no bet");
        return Ok(result(Decision::NoBet {
            reason: NoBetReason::NonPositiveKelly {
                kelly_fraction: kelly,
            },
        }));
    }

    let fractional = kelly * config.half_kelly_multiplier;
    let capped = fractional > config.max_bet_pct;
    let kelly_fraction_used = fractional.min(config.max_bet_pct);
    let target_amount = kelly_fraction_used * bankroll;

    let fill = whole_units(target_amount, adjusted_unit_price);
    if fill.units < 1 {
        debug!(
            id = %opportunity.identifier,
            target = %target_amount.round_dp(2),
            adjusted_price = %adjusted_unit_price,
            "Target below one whole unit, no bet"
        );
        return Ok(result(Decision::NoBet {
            reason: NoBetReason::CannotAffordOneUnit { target_amount },
        }));
    }

    let expected_profit = fill.actual_amount * ev_fraction;
    let win_profit = Decimal::from(fill.units) - fill.actual_amount;

    debug!(
        id = %opportunity.identifier,
        ev_pct = %expected_value_pct.round_dp(2),
        raw_kelly = %kelly.round_dp(4),
        k_final = %kelly_fraction_used.round_dp(4),
        capped,
        units = fill.units,
        amount = %fill.actual_amount,
        "Bet sized"
    );

    Ok(result(Decision::Bet(BetSizing {
        full_kelly_fraction: kelly,
        kelly_fraction_used,
        capped,
        target_amount,
        units_to_buy: fill.units,
        actual_amount: fill.actual_amount,
        unused_amount: fill.unused_amount,
        expected_profit,
        win_profit,
    })))
}
