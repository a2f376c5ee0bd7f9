//! Cross-opportunity bankroll allocation.
//!
//! Ranks evaluated opportunities by EV and commits capital in that order,
//! downgrading later entries to partial fills or skips as the bankroll runs
//! out. The walk is a single left-to-right fold over the ranked list.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::SizingConfig;
use crate::error::{EngineError, Result};
use crate::market::models::{AllocationOutcome, EvaluationResult, FinalDecision, Opportunity};
use crate::risk::commission::CommissionPolicy;
use crate::risk::kelly::{self, whole_units};

/// Evaluate every opportunity against the full bankroll, then allocate.
///
/// Fails fast: the first invalid opportunity aborts the batch before any
/// allocation state exists.
pub fn allocate(
    opportunities: &[Opportunity],
    bankroll: Decimal,
    commission: &CommissionPolicy,
    config: &SizingConfig,
) -> Result<Vec<AllocationOutcome>> {
    let evaluations = opportunities
        .iter()
        .map(|opportunity| kelly::evaluate(opportunity, bankroll, commission, config))
        .collect::<Result<Vec<_>>>()?;

    allocate_evaluated(evaluations, bankroll, config)
}

/// Allocate results that were already evaluated against `bankroll`.
pub fn allocate_evaluated(
    evaluations: Vec<EvaluationResult>,
    bankroll: Decimal,
    config: &SizingConfig,
) -> Result<Vec<AllocationOutcome>> {
    if bankroll <= Decimal::ZERO {
        return Err(EngineError::invalid_input(
            "bankroll",
            format!("must be positive, got {bankroll}"),
        ));
    }

    let ranked = rank(evaluations);
    let partial_floor = bankroll * config.min_bankroll_for_partial_pct;

    let (ledger, outcomes) = ranked.into_iter().enumerate().fold(
        (Ledger::new(bankroll), Vec::new()),
        |(ledger, mut outcomes), (rank, (input_index, evaluation))| {
            let (ledger, outcome) = ledger.commit(rank, input_index, evaluation, partial_floor);
            outcomes.push(outcome);
            (ledger, outcomes)
        },
    );

    info!(
        opportunities = outcomes.len(),
        bankroll = %bankroll,
        allocated = %ledger.cumulative_allocated,
        remaining = %ledger.remaining_bankroll,
        "Bankroll allocated"
    );

    Ok(outcomes)
}

/// Sort by EV descending, keeping input order for ties.
fn rank(evaluations: Vec<EvaluationResult>) -> Vec<(usize, EvaluationResult)> {
    let mut indexed: Vec<(usize, EvaluationResult)> = evaluations.into_iter().enumerate().collect();
    // `sort_by` is stable
    indexed.sort_by(|(_, a), (_, b)| b.expected_value_pct.cmp(&a.expected_value_pct));
    indexed
}

/// Running totals threaded through the fold.
#[derive(Debug, Clone, Copy)]
struct Ledger {
    remaining_bankroll: Decimal,
    cumulative_allocated: Decimal,
}

impl Ledger {
    fn new(bankroll: Decimal) -> Self {
        Self {
            remaining_bankroll: bankroll,
            cumulative_allocated: Decimal::ZERO,
        }
    }

    fn commit(
        self,
        rank: usize,
        input_index: usize,
        evaluation: EvaluationResult,
        partial_floor: Decimal,
    ) -> (Self, AllocationOutcome) {
        let (final_decision, units, amount) = match evaluation.sizing() {
            None => (FinalDecision::NoBet, 0, Decimal::ZERO),
            Some(sizing) => {
                let affordable = whole_units(
                    sizing.target_amount.min(self.remaining_bankroll),
                    evaluation.adjusted_unit_price,
                );

                if affordable.units >= sizing.units_to_buy {
                    (FinalDecision::Bet, sizing.units_to_buy, sizing.actual_amount)
                } else if affordable.units >= 1
                    && self.remaining_bankroll > Decimal::ZERO
                    && self.remaining_bankroll >= partial_floor
                {
                    (FinalDecision::PartialBet, affordable.units, affordable.actual_amount)
                } else {
                    (FinalDecision::SkipInsufficientBankroll, 0, Decimal::ZERO)
                }
            }
        };

        let next = Self {
            remaining_bankroll: self.remaining_bankroll - amount,
            cumulative_allocated: self.cumulative_allocated + amount,
        };

        if final_decision.is_funded() {
            debug!(
                id = %evaluation.identifier,
                rank,
                decision = %final_decision,
                units,
                amount = %amount,
                remaining = %next.remaining_bankroll,
                "Capital committed"
            );
        }

        let outcome = AllocationOutcome {
            rank,
            input_index,
            evaluation,
            final_decision,
            allocated_units: units,
            allocated_amount: amount,
            remaining_bankroll_after: next.remaining_bankroll,
            cumulative_allocated_after: next.cumulative_allocated,
        };
        (next, outcome)
    }
}

/// Aggregate view of one allocation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationSummary {
    pub total: usize,
    pub bet_opportunities: usize,
    pub no_bets: usize,
    pub funded_full: usize,
    pub funded_partial: usize,
    pub skipped: usize,
    pub bankroll: Decimal,
    pub total_allocated: Decimal,
    pub remaining_bankroll: Decimal,
    pub total_expected_profit: Decimal,
    pub total_units: u64,
    pub total_commission_cost: Decimal,
}

impl AllocationSummary {
    pub fn from_outcomes(outcomes: &[AllocationOutcome], bankroll: Decimal) -> Self {
        let count = |d: FinalDecision| outcomes.iter().filter(|o| o.final_decision == d).count();
        let funded = || outcomes.iter().filter(|o| o.final_decision.is_funded());

        let total_allocated: Decimal = funded().map(|o| o.allocated_amount).sum();

        Self {
            total: outcomes.len(),
            bet_opportunities: outcomes.iter().filter(|o| o.evaluation.is_bet()).count(),
            no_bets: count(FinalDecision::NoBet),
            funded_full: count(FinalDecision::Bet),
            funded_partial: count(FinalDecision::PartialBet),
            skipped: count(FinalDecision::SkipInsufficientBankroll),
            bankroll,
            total_allocated,
            remaining_bankroll: bankroll - total_allocated,
            total_expected_profit: funded().map(|o| o.expected_profit()).sum(),
            total_units: funded().map(|o| o.allocated_units).sum(),
            total_commission_cost: funded().map(|o| o.commission_cost()).sum(),
        }
    }

    /// Commission as a share of allocated capital, in percent.
    pub fn commission_pct_of_allocated(&self) -> Decimal {
        if self.total_allocated > Decimal::ZERO {
            self.total_commission_cost / self.total_allocated * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        }
    }
}
