//! Rendering of evaluation and allocation results.
//!
//! Produces two tabular projections of an allocation run (a compact quick
//! view and a detailed view carrying every outcome field), a JSON document,
//! and human-readable summaries for the terminal.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::market::models::{AllocationOutcome, EvaluationResult, FinalDecision};
use crate::risk::allocation::AllocationSummary;
use crate::risk::commission::CommissionPolicy;

/// Number of funded entries listed under the summary.
const TOP_BETS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

const QUICK_HEADERS: [&str; 12] = [
    "Game",
    "Win %",
    "Price",
    "Edge %",
    "EV $",
    "Contract Cost",
    "Allocated $",
    "Win Profit $",
    "Contracts",
    "Stake % Bankroll",
    "Final",
    "Reason",
];

const DETAILED_HEADERS: [&str; 23] = [
    "Rank",
    "Input Row",
    "Game",
    "Win %",
    "Contract Price",
    "Margin",
    "EV Percentage",
    "Gross EV Percentage",
    "Expected Value EV",
    "Net Profit",
    "Kelly Fraction",
    "Target Bet Amount",
    "Bet Amount",
    "Unused Amount",
    "Contracts To Buy",
    "Allocated Contracts",
    "Allocated Amount",
    "Cumulative Bet Amount",
    "Remaining Bankroll",
    "Adjusted Price",
    "Decision",
    "Final Recommendation",
    "Reason",
];

fn reason_text(evaluation: &EvaluationResult) -> String {
    evaluation.reason().map(|r| r.to_string()).unwrap_or_default()
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value)
}

fn pct(value: Decimal) -> String {
    format!("{:.2}", value)
}

/// Compact view: one row per outcome, the columns a bettor acts on.
pub fn quick_row(outcome: &AllocationOutcome, bankroll: Decimal) -> Vec<String> {
    let e = &outcome.evaluation;
    vec![
        e.identifier.clone(),
        pct(e.win_probability * dec!(100)),
        e.unit_price.to_string(),
        pct(e.expected_value_pct),
        money(outcome.expected_profit()),
        money(e.adjusted_unit_price),
        money(outcome.allocated_amount),
        money(outcome.win_profit()),
        outcome.allocated_units.to_string(),
        pct(outcome.allocated_amount / bankroll * dec!(100)),
        outcome.final_decision.to_string(),
        reason_text(e),
    ]
}

/// Detailed view: every evaluation and allocation field.
pub fn detailed_row(outcome: &AllocationOutcome) -> Vec<String> {
    let e = &outcome.evaluation;
    let sizing = e.sizing();
    vec![
        (outcome.rank + 1).to_string(),
        (outcome.input_index + 1).to_string(),
        e.identifier.clone(),
        pct(e.win_probability * dec!(100)),
        e.unit_price.to_string(),
        e.margin.map(|m| m.to_string()).unwrap_or_default(),
        pct(e.expected_value_pct),
        pct(e.gross_expected_value_pct),
        money(sizing.map_or(Decimal::ZERO, |s| s.expected_profit)),
        money(sizing.map_or(Decimal::ZERO, |s| s.win_profit)),
        e.kelly_fraction_used().round_dp(6).to_string(),
        money(e.target_amount()),
        money(e.actual_amount()),
        money(e.unused_amount()),
        e.units_to_buy().to_string(),
        outcome.allocated_units.to_string(),
        money(outcome.allocated_amount),
        money(outcome.cumulative_allocated_after),
        money(outcome.remaining_bankroll_after),
        money(e.adjusted_unit_price),
        e.decision.to_string(),
        outcome.final_decision.to_string(),
        reason_text(e),
    ]
}

/// Quote a field when it contains a delimiter, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn quick_csv(outcomes: &[AllocationOutcome], bankroll: Decimal) -> String {
    let headers: Vec<String> = QUICK_HEADERS.iter().map(|h| h.to_string()).collect();
    let mut out = csv_line(&headers);
    out.push('\n');
    for outcome in outcomes {
        out.push_str(&csv_line(&quick_row(outcome, bankroll)));
        out.push('\n');
    }
    out
}

pub fn detailed_csv(outcomes: &[AllocationOutcome]) -> String {
    let headers: Vec<String> = DETAILED_HEADERS.iter().map(|h| h.to_string()).collect();
    let mut out = csv_line(&headers);
    out.push('\n');
    for outcome in outcomes {
        out.push_str(&csv_line(&detailed_row(outcome)));
        out.push('\n');
    }
    out
}

/// JSON document for one batch run.
#[derive(Debug, Serialize)]
pub struct BatchReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub bankroll: Decimal,
    pub commission: &'a CommissionPolicy,
    pub summary: AllocationSummary,
    pub outcomes: &'a [AllocationOutcome],
}

/// Write results next to each other in `output_dir`, named after `input`.
///
/// Returns the written paths.
pub fn write_outputs(
    input: &Path,
    output_dir: &Path,
    format: OutputFormat,
    outcomes: &[AllocationOutcome],
    bankroll: Decimal,
    commission: &CommissionPolicy,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("batch");

    let written = match format {
        OutputFormat::Csv => {
            let quick = output_dir.join(format!("{stem}_RESULTS_quick.csv"));
            let detailed = output_dir.join(format!("{stem}_RESULTS_detailed.csv"));
            write_file(&quick, &quick_csv(outcomes, bankroll))?;
            write_file(&detailed, &detailed_csv(outcomes))?;
            vec![quick, detailed]
        }
        OutputFormat::Json => {
            let report = BatchReport {
                generated_at: Utc::now(),
                source: input.display().to_string(),
                bankroll,
                commission,
                summary: AllocationSummary::from_outcomes(outcomes, bankroll),
                outcomes,
            };
            let path = output_dir.join(format!("{stem}_RESULTS.json"));
            let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            write_file(&path, &json)?;
            vec![path]
        }
    };

    for path in &written {
        tracing::info!(path = %path.display(), "Results written");
    }
    Ok(written)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

impl fmt::Display for AllocationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "=== Betting Analysis Summary ===\n\
             Opportunities: {} ({} BET-eligible, {} NO BET)\n\
             Funded: {} full, {} partial | Skipped: {}\n\
             Bankroll: ${:.2} | Allocated: ${:.2} | Remaining: ${:.2}\n\
             Expected Profit: ${:.2}\n\
             Contracts: {} | Commission: ${:.2} ({:.1}% of allocated)",
            self.total,
            self.bet_opportunities,
            self.no_bets,
            self.funded_full,
            self.funded_partial,
            self.skipped,
            self.bankroll,
            self.total_allocated,
            self.remaining_bankroll,
            self.total_expected_profit,
            self.total_units,
            self.total_commission_cost,
            self.commission_pct_of_allocated(),
        )
    }
}

/// Summary block followed by the top funded entries.
pub fn render_batch(
    outcomes: &[AllocationOutcome],
    bankroll: Decimal,
    commission: &CommissionPolicy,
) -> String {
    let summary = AllocationSummary::from_outcomes(outcomes, bankroll);
    let mut out = format!("{summary}\nCommission: {commission}\n");

    let top: Vec<&AllocationOutcome> = outcomes
        .iter()
        .filter(|o| o.final_decision.is_funded())
        .take(TOP_BETS)
        .collect();
    if !top.is_empty() {
        out.push_str(&format!("\nTop {} funded (by EV%):\n", top.len()));
        for o in top {
            let tag = if o.final_decision == FinalDecision::PartialBet {
                " [partial]"
            } else {
                ""
            };
            out.push_str(&format!(
                "  {}: ${:.2} for {} contracts (EV {:.2}%){tag}\n",
                o.identifier(),
                o.allocated_amount,
                o.allocated_units,
                o.expected_value_pct(),
            ));
        }
    }
    out
}

/// Human-readable breakdown of a single evaluation.
pub fn render_evaluation(
    result: &EvaluationResult,
    bankroll: Decimal,
    commission: &CommissionPolicy,
) -> String {
    let mut out = String::new();
    out.push_str("=== Betting Recommendation ===\n");
    out.push_str(&format!("Commission: {commission}\n"));
    out.push_str(&format!(
        "Contract Price: ${:.2} | Cost per Contract: ${:.2}\n",
        result.unit_price, result.adjusted_unit_price
    ));
    out.push_str(&format!("Decision: {}\n", result.decision));

    match result.sizing() {
        None => {
            out.push_str(&format!("Reason: {}\n", reason_text(result)));
        }
        Some(s) => {
            out.push_str(&format!(
                "Bet Amount: ${:.2} ({:.1}% of bankroll)\n",
                s.actual_amount,
                s.actual_amount / bankroll * dec!(100)
            ));
            out.push_str(&format!("Contracts to Buy: {}\n", s.units_to_buy));
            out.push_str(&format!("Expected Profit: ${:.2}\n", s.expected_profit));
            out.push_str(&format!("Profit if Won: ${:.2}\n", s.win_profit));
            let fees = Decimal::from(s.units_to_buy) * result.commission_per_unit;
            if fees > Decimal::ZERO {
                out.push_str(&format!(
                    "Total Commission: ${:.2} ({:.1}% of bet)\n",
                    fees,
                    fees / s.actual_amount * dec!(100)
                ));
            }
            if s.unused_amount > dec!(0.01) {
                out.push_str(&format!(
                    "Whole-contract adjustment: target ${:.2}, unused ${:.2}\n",
                    s.target_amount, s.unused_amount
                ));
            }
        }
    }

    if result.commission_impact_pct() > Decimal::ZERO {
        out.push_str(&format!(
            "EV before commission: {:.1}% | commission cost {:.1} points\n",
            result.gross_expected_value_pct,
            result.commission_impact_pct()
        ));
    }
    out.push_str(&format!("Expected Value: {:.1}%\n", result.expected_value_pct));
    out
}
