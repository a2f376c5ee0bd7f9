//! Batch runner.
//!
//! Drives one input file through the full pipeline:
//! CSV load → evaluation → ranked allocation → result files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::batch::input;
use crate::batch::report::{self, OutputFormat};
use crate::config::{AppConfig, SizingConfig};
use crate::market::models::AllocationOutcome;
use crate::risk::allocation::{self, AllocationSummary};
use crate::risk::commission::CommissionPolicy;

/// Settings for one batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub bankroll: Decimal,
    pub sizing: SizingConfig,
    pub commission: CommissionPolicy,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
}

impl BatchConfig {
    pub fn from_app_config(
        config: &AppConfig,
        bankroll: Decimal,
        commission: CommissionPolicy,
    ) -> Self {
        Self {
            bankroll,
            sizing: config.sizing.clone(),
            commission,
            output_dir: config.io.output_dir.clone(),
            format: OutputFormat::default(),
        }
    }
}

/// Everything a batch run produced.
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub outcomes: Vec<AllocationOutcome>,
    pub summary: AllocationSummary,
    pub written: Vec<PathBuf>,
}

/// Load `input`, allocate across its rows and write the result files.
pub fn run_batch(input_path: &Path, config: &BatchConfig) -> Result<BatchRun> {
    let opportunities = input::load_from_csv(input_path)?;

    if opportunities.is_empty() {
        warn!(path = %input_path.display(), "No valid rows in input file");
    }

    info!(
        path = %input_path.display(),
        rows = opportunities.len(),
        bankroll = %config.bankroll,
        commission = %config.commission,
        "Starting batch allocation"
    );

    let outcomes = allocation::allocate(
        &opportunities,
        config.bankroll,
        &config.commission,
        &config.sizing,
    )
    .with_context(|| format!("Batch aborted for {}", input_path.display()))?;

    let written = report::write_outputs(
        input_path,
        &config.output_dir,
        config.format,
        &outcomes,
        config.bankroll,
        &config.commission,
    )?;

    let summary = AllocationSummary::from_outcomes(&outcomes, config.bankroll);
    info!(
        funded = summary.funded_full + summary.funded_partial,
        allocated = %summary.total_allocated,
        remaining = %summary.remaining_bankroll,
        "Batch complete"
    );

    Ok(BatchRun {
        outcomes,
        summary,
        written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::models::FinalDecision;
    use rust_decimal_macros::dec;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("stake-engine-runner-{name}-{}", std::process::id()))
    }

    fn config(output_dir: PathBuf) -> BatchConfig {
        BatchConfig {
            bankroll: dec!(100),
            sizing: SizingConfig::default(),
            commission: CommissionPolicy::default(),
            output_dir,
            format: OutputFormat::Csv,
        }
    }

    #[test]
    fn test_sample_file_end_to_end() {
        let dir = scratch("sample");
        let input = input::write_sample(&dir.join("in"), "games.csv").unwrap();

        let run = run_batch(&input, &config(dir.join("out"))).unwrap();

        assert_eq!(run.outcomes.len(), 6);
        assert_eq!(run.written.len(), 2);
        assert!(run.written[0].ends_with("games_RESULTS_quick.csv"));
        assert!(run.written[1].ends_with("games_RESULTS_detailed.csv"));
        for path in &run.written {
            assert!(path.exists());
        }
        // ranked by EV, highest first
        for pair in run.outcomes.windows(2) {
            assert!(pair[0].expected_value_pct() >= pair[1].expected_value_pct());
        }
        assert!(run.summary.total_allocated <= dec!(100));
        assert_eq!(
            run.summary.total_allocated + run.summary.remaining_bankroll,
            dec!(100)
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_row_aborts_batch() {
        let dir = scratch("invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("bad.csv");
        std::fs::write(
            &input,
            "Game,Model Win Percentage,Contract Price\nA,68,45\nB,150,45\n",
        )
        .unwrap();

        let err = run_batch(&input, &config(dir.join("out"))).unwrap_err();
        assert!(format!("{err:#}").contains("win_probability"));
        assert!(!dir.join("out").join("bad_RESULTS_quick.csv").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_json_format() {
        let dir = scratch("json");
        let input = input::write_sample(&dir, "week.csv").unwrap();
        let mut cfg = config(dir.join("out"));
        cfg.format = OutputFormat::Json;

        let run = run_batch(&input, &cfg).unwrap();
        assert_eq!(run.written.len(), 1);
        assert!(run.written[0].ends_with("week_RESULTS.json"));
        assert!(run
            .outcomes
            .iter()
            .any(|o| o.final_decision == FinalDecision::Bet));

        std::fs::remove_dir_all(&dir).ok();
    }
}
