use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use stake_engine::batch::input;
use stake_engine::batch::report::{self, OutputFormat};
use stake_engine::batch::runner::{self, BatchConfig};
use stake_engine::config::{AppConfig, DEFAULT_CONFIG_PATH};
use stake_engine::market::models::Opportunity;
use stake_engine::monitoring::logger;
use stake_engine::risk::commission::{CommissionPolicy, Platform, RateKind};
use stake_engine::risk::kelly;

/// Expected-value screening and fractional-Kelly sizing for binary contracts.
#[derive(Debug, Parser)]
#[command(name = "stake-engine", version, about)]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Commission preset (robinhood, kalshi, predictit, polymarket, custom).
    #[arg(long, global = true)]
    platform: Option<Platform>,

    /// Explicit commission rate. Implies the custom platform.
    #[arg(long, global = true)]
    commission_rate: Option<Decimal>,

    /// Commission kind for a custom rate (fixed_per_unit, percentage_of_price).
    #[arg(long, global = true)]
    commission_kind: Option<RateKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate a single opportunity.
    Evaluate {
        #[arg(long)]
        bankroll: Decimal,
        /// Win probability, as 0.68 or 68.
        #[arg(long)]
        win: Decimal,
        /// Unit price, as 0.45 or 45 (cents).
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        margin: Option<Decimal>,
        #[arg(long, default_value = "opportunity")]
        name: String,
    },
    /// Allocate a bankroll across every row of a CSV file.
    Batch {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        bankroll: Decimal,
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Write a sample input file.
    Sample,
    /// List CSV files in the input directory.
    List,
    /// Show the commission presets.
    Presets,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        dotenvy::dotenv().ok();
        AppConfig::default()
    };
    logger::init_logging(&config.monitoring)?;

    if cli.platform.is_some() || cli.commission_rate.is_some() {
        config.commission.platform = cli.platform.unwrap_or(Platform::Custom);
        config.commission.rate = cli.commission_rate;
    }
    if cli.commission_kind.is_some() {
        config.commission.kind = cli.commission_kind;
    }
    let commission = config
        .commission
        .policy()
        .context("Invalid commission settings")?;

    tracing::debug!(config = %cli.config.display(), %commission, "Configuration loaded");

    match cli.command {
        Command::Evaluate {
            bankroll,
            win,
            price,
            margin,
            name,
        } => {
            let mut opportunity = Opportunity::new(name, win, price);
            opportunity.margin = margin;
            let result = kelly::evaluate(&opportunity, bankroll, &commission, &config.sizing)?;
            println!("{}", report::render_evaluation(&result, bankroll, &commission));
        }
        Command::Batch {
            input,
            bankroll,
            format,
            output_dir,
        } => {
            let mut batch = BatchConfig::from_app_config(&config, bankroll, commission);
            batch.format = format;
            if let Some(dir) = output_dir {
                batch.output_dir = dir;
            }
            let run = runner::run_batch(&input, &batch)?;
            println!("{}", report::render_batch(&run.outcomes, bankroll, &commission));
            for path in &run.written {
                println!("Saved: {}", path.display());
            }
        }
        Command::Sample => {
            let path = input::write_sample(&config.io.input_dir, &config.io.sample_file)?;
            println!("Sample file created: {}", path.display());
        }
        Command::List => {
            let files = input::list_input_files(&config.io.input_dir)?;
            if files.is_empty() {
                println!("No CSV files in {}", config.io.input_dir.display());
            }
            for (i, path) in files.iter().enumerate() {
                println!("{:>3}. {}", i + 1, path.display());
            }
        }
        Command::Presets => {
            for platform in Platform::PRESETS {
                let policy = CommissionPolicy::for_platform(platform)?;
                let marker = if platform == commission.platform() { " *" } else { "" };
                println!("{policy}{marker}");
            }
        }
    }

    Ok(())
}
