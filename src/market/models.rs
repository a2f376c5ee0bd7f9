use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// One candidate binary-outcome contract, as supplied by the caller.
///
/// `win_probability` and `unit_price` may be in either fractional or
/// percentage/cents form; the evaluator normalizes them before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub identifier: String,
    pub win_probability: Decimal,
    pub unit_price: Decimal,
    /// Informational only, never consumed by the sizing math.
    #[serde(default)]
    pub margin: Option<Decimal>,
}

impl Opportunity {
    pub fn new(
        identifier: impl Into<String>,
        win_probability: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            win_probability,
            unit_price,
            margin: None,
        }
    }

    pub fn with_margin(mut self, margin: Decimal) -> Self {
        self.margin = Some(margin);
        self
    }
}

/// Why an opportunity was rejected by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoBetReason {
    BelowEvThreshold { threshold_pct: Decimal },
    NonPositiveKelly { kelly_fraction: Decimal },
    CannotAffordOneUnit { target_amount: Decimal },
}

impl NoBetReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BelowEvThreshold { .. } => "BELOW_EV_THRESHOLD",
            Self::NonPositiveKelly { .. } => "NON_POSITIVE_KELLY",
            Self::CannotAffordOneUnit { .. } => "CANNOT_AFFORD_ONE_UNIT",
        }
    }
}

impl std::fmt::Display for NoBetReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BelowEvThreshold { threshold_pct } => {
                write!(f, "EV below {threshold_pct}% threshold")
            }
            Self::NonPositiveKelly { kelly_fraction } => {
                write!(f, "Non-positive Kelly fraction ({:.4})", kelly_fraction)
            }
            Self::CannotAffordOneUnit { target_amount } => write!(
                f,
                "Target amount ${:.2} insufficient for one whole unit",
                target_amount
            ),
        }
    }
}

/// Sizing breakdown for an opportunity the evaluator accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetSizing {
    /// Raw Kelly fraction before the safety multiplier and cap.
    pub full_kelly_fraction: Decimal,
    /// Fraction of bankroll committed before unit rounding (k_final).
    pub kelly_fraction_used: Decimal,
    /// Whether the max-bet cap was binding.
    pub capped: bool,
    pub target_amount: Decimal,
    pub units_to_buy: u64,
    pub actual_amount: Decimal,
    pub unused_amount: Decimal,
    /// `actual_amount * ev_fraction`.
    pub expected_profit: Decimal,
    /// Profit if every unit pays out $1.
    pub win_profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Bet(BetSizing),
    NoBet { reason: NoBetReason },
}

/// Output of evaluating one opportunity against one bankroll. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub identifier: String,
    pub margin: Option<Decimal>,
    /// Normalized to [0, 1].
    pub win_probability: Decimal,
    /// Normalized to dollars.
    pub unit_price: Decimal,
    pub commission_per_unit: Decimal,
    /// `unit_price + commission_per_unit`.
    pub adjusted_unit_price: Decimal,
    /// EV percentage on the commission-adjusted price.
    pub expected_value_pct: Decimal,
    /// EV percentage on the bare unit price.
    pub gross_expected_value_pct: Decimal,
    pub decision: Decision,
}

impl EvaluationResult {
    pub fn is_bet(&self) -> bool {
        matches!(self.decision, Decision::Bet(_))
    }

    pub fn sizing(&self) -> Option<&BetSizing> {
        match &self.decision {
            Decision::Bet(sizing) => Some(sizing),
            Decision::NoBet { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<NoBetReason> {
        match self.decision {
            Decision::Bet(_) => None,
            Decision::NoBet { reason } => Some(reason),
        }
    }

    pub fn kelly_fraction_used(&self) -> Decimal {
        self.sizing().map_or(Decimal::ZERO, |s| s.kelly_fraction_used)
    }

    /// Target amount before rounding. Rejections for an unaffordable unit still report it.
    pub fn target_amount(&self) -> Decimal {
        match &self.decision {
            Decision::Bet(sizing) => sizing.target_amount,
            Decision::NoBet {
                reason: NoBetReason::CannotAffordOneUnit { target_amount },
            } => *target_amount,
            Decision::NoBet { .. } => Decimal::ZERO,
        }
    }

    pub fn units_to_buy(&self) -> u64 {
        self.sizing().map_or(0, |s| s.units_to_buy)
    }

    pub fn actual_amount(&self) -> Decimal {
        self.sizing().map_or(Decimal::ZERO, |s| s.actual_amount)
    }

    pub fn unused_amount(&self) -> Decimal {
        self.sizing().map_or(Decimal::ZERO, |s| s.unused_amount)
    }

    /// EV lost to commission, in percentage points.
    pub fn commission_impact_pct(&self) -> Decimal {
        self.gross_expected_value_pct - self.expected_value_pct
    }

    /// Expected value per dollar staked.
    pub fn ev_fraction(&self) -> Decimal {
        self.expected_value_pct / dec!(100)
    }
}

/// Final status of an opportunity after batch allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalDecision {
    Bet,
    PartialBet,
    SkipInsufficientBankroll,
    NoBet,
}

impl FinalDecision {
    /// Whether capital was committed.
    pub fn is_funded(&self) -> bool {
        matches!(self, Self::Bet | Self::PartialBet)
    }
}

/// One opportunity's terminal allocation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    /// Position in the ranked sequence.
    pub rank: usize,
    /// Position in the caller's input.
    pub input_index: usize,
    pub evaluation: EvaluationResult,
    pub final_decision: FinalDecision,
    pub allocated_units: u64,
    pub allocated_amount: Decimal,
    pub remaining_bankroll_after: Decimal,
    pub cumulative_allocated_after: Decimal,
}

impl AllocationOutcome {
    pub fn identifier(&self) -> &str {
        &self.evaluation.identifier
    }

    pub fn expected_value_pct(&self) -> Decimal {
        self.evaluation.expected_value_pct
    }

    pub fn expected_profit(&self) -> Decimal {
        self.allocated_amount * self.evaluation.ev_fraction()
    }

    /// Profit if every allocated unit pays out $1.
    pub fn win_profit(&self) -> Decimal {
        Decimal::from(self.allocated_units) - self.allocated_amount
    }

    pub fn commission_cost(&self) -> Decimal {
        Decimal::from(self.allocated_units) * self.evaluation.commission_per_unit
    }
}

impl std::fmt::Display for FinalDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bet => write!(f, "BET"),
            Self::PartialBet => write!(f, "PARTIAL BET"),
            Self::SkipInsufficientBankroll => write!(f, "SKIP - Insufficient Bankroll"),
            Self::NoBet => write!(f, "NO BET"),
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bet(_) => write!(f, "BET"),
            Self::NoBet { .. } => write!(f, "NO BET"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_bet(reason: NoBetReason) -> EvaluationResult {
        EvaluationResult {
            identifier: "x".to_string(),
            margin: None,
            win_probability: dec!(0.5),
            unit_price: dec!(0.5),
            commission_per_unit: dec!(0.02),
            adjusted_unit_price: dec!(0.52),
            expected_value_pct: dec!(-3.846),
            gross_expected_value_pct: dec!(0),
            decision: Decision::NoBet { reason },
        }
    }

    #[test]
    fn test_no_bet_accessors_are_zero() {
        let r = no_bet(NoBetReason::BelowEvThreshold { threshold_pct: dec!(10) });
        assert!(!r.is_bet());
        assert_eq!(r.units_to_buy(), 0);
        assert_eq!(r.actual_amount(), Decimal::ZERO);
        assert_eq!(r.unused_amount(), Decimal::ZERO);
        assert_eq!(r.kelly_fraction_used(), Decimal::ZERO);
        assert_eq!(r.target_amount(), Decimal::ZERO);
        assert_eq!(r.reason().map(|r| r.code()), Some("BELOW_EV_THRESHOLD"));
    }

    #[test]
    fn test_unaffordable_unit_keeps_target() {
        let r = no_bet(NoBetReason::CannotAffordOneUnit { target_amount: dec!(0.31) });
        assert_eq!(r.target_amount(), dec!(0.31));
    }

    #[test]
    fn test_commission_impact() {
        let r = no_bet(NoBetReason::BelowEvThreshold { threshold_pct: dec!(10) });
        assert_eq!(r.commission_impact_pct(), dec!(3.846));
    }

    #[test]
    fn test_final_decision_display() {
        assert_eq!(FinalDecision::Bet.to_string(), "BET");
        assert_eq!(FinalDecision::PartialBet.to_string(), "PARTIAL BET");
        assert_eq!(
            FinalDecision::SkipInsufficientBankroll.to_string(),
            "SKIP - Insufficient Bankroll"
        );
        assert!(FinalDecision::PartialBet.is_funded());
        assert!(!FinalDecision::NoBet.is_funded());
    }

    #[test]
    fn test_reason_serializes_with_code() {
        let json = serde_json::to_string(&NoBetReason::BelowEvThreshold { threshold_pct: dec!(10) })
            .unwrap();
        assert!(json.contains("\"code\":\"BELOW_EV_THRESHOLD\""));
    }
}
