//! Opportunity loading from CSV files.
//!
//! Reads one opportunity per row. Headers are matched case-insensitively
//! against a small alias table so both the sample layout ("Game", "Model Win
//! Percentage", "Contract Price") and snake_case names work.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::market::models::Opportunity;

const IDENTIFIER_ALIASES: &[&str] = &["game", "identifier", "id", "name"];
const WIN_PROBABILITY_ALIASES: &[&str] =
    &["model win percentage", "win_probability", "win %", "win_pct"];
const UNIT_PRICE_ALIASES: &[&str] = &["contract price", "unit_price", "price"];
const MARGIN_ALIASES: &[&str] = &["model margin", "margin"];

/// Column positions resolved from a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    identifier: usize,
    win_probability: usize,
    unit_price: usize,
    margin: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &str) -> Result<Self> {
        let names: Vec<String> = split_row(header.trim_start_matches('\u{feff}'))
            .iter()
            .map(|name| name.to_lowercase())
            .collect();
        let find = |aliases| position_of(&names, aliases);

        let identifier = find(IDENTIFIER_ALIASES);
        let win_probability = find(WIN_PROBABILITY_ALIASES);
        let unit_price = find(UNIT_PRICE_ALIASES);

        let mut missing = Vec::new();
        if identifier.is_none() {
            missing.push("Game");
        }
        if win_probability.is_none() {
            missing.push("Model Win Percentage");
        }
        if unit_price.is_none() {
            missing.push("Contract Price");
        }

        match (identifier, win_probability, unit_price) {
            (Some(identifier), Some(win_probability), Some(unit_price)) => Ok(Self {
                identifier,
                win_probability,
                unit_price,
                margin: find(MARGIN_ALIASES),
            }),
            _ => anyhow::bail!("Missing required columns: {}", missing.join(", ")),
        }
    }
}

fn position_of(names: &[String], aliases: &[&str]) -> Option<usize> {
    names
        .iter()
        .position(|n| aliases.iter().any(|alias| *alias == n.as_str()))
}

/// Load opportunities from a CSV file with a header row.
///
/// Rows with unparsable numbers are skipped with a warning. A missing
/// required column fails the whole file.
pub fn load_from_csv(path: &Path) -> Result<Vec<Opportunity>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_csv(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse CSV text into opportunities.
pub fn parse_csv(content: &str) -> Result<Vec<Opportunity>> {
    let mut lines = content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        anyhow::bail!("CSV input is empty");
    };
    let columns = ColumnMap::from_header(header)?;

    let mut opportunities = Vec::new();
    for (i, line) in lines {
        match parse_row(line, &columns) {
            Ok(opportunity) => opportunities.push(opportunity),
            Err(e) => {
                tracing::warn!(line = i + 1, error = %e, "Skipping malformed CSV line");
            }
        }
    }

    Ok(opportunities)
}

fn parse_row(line: &str, columns: &ColumnMap) -> Result<Opportunity> {
    let fields = split_row(line);

    let identifier = field(&fields, columns.identifier, "identifier")?.to_string();
    if identifier.is_empty() {
        anyhow::bail!("Empty identifier");
    }

    let win = field(&fields, columns.win_probability, "win probability")?;
    let win_probability =
        parse_decimal(win).with_context(|| format!("Invalid win probability: {win}"))?;

    let price = field(&fields, columns.unit_price, "unit price")?;
    let unit_price = parse_decimal(price).with_context(|| format!("Invalid unit price: {price}"))?;

    let margin = match columns.margin.and_then(|i| fields.get(i)) {
        Some(raw) if !raw.is_empty() => {
            Some(parse_decimal(raw).with_context(|| format!("Invalid margin: {raw}"))?)
        }
        _ => None,
    };

    Ok(Opportunity {
        identifier,
        win_probability,
        unit_price,
        margin,
    })
}

fn field<'a>(fields: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    fields
        .get(index)
        .map(String::as_str)
        .with_context(|| format!("Missing {name} field"))
}

/// Accepts plain decimals, a trailing `%`, and a leading `$`.
///
/// A `%` value is divided by 100 here, so `1%` reaches normalization as
/// `0.01`. A `$` value is already in dollars and must not exceed $1, since
/// larger bare numbers are read as cents downstream.
fn parse_decimal(raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    if let Some(percent) = trimmed.strip_suffix('%') {
        return Ok(parse_number(percent)? / dec!(100));
    }
    if let Some(dollars) = trimmed.strip_prefix('$') {
        let value = parse_number(dollars)?;
        if value > Decimal::ONE {
            anyhow::bail!("${value} exceeds the $1 unit payout");
        }
        return Ok(value);
    }
    parse_number(trimmed)
}

fn parse_number(raw: &str) -> Result<Decimal> {
    let cleaned = raw.trim();
    Decimal::from_str(cleaned)
        .or_else(|_| Decimal::from_scientific(cleaned))
        .map_err(|e| anyhow::anyhow!(e))
}

/// Split one CSV row, honouring double-quoted fields with embedded commas.
pub(crate) fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Write a small sample input file and return its path.
///
/// Prices deliberately mix cents and dollar forms.
pub fn write_sample(dir: &Path, file_name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let rows: [(&str, Decimal, Decimal, Decimal); 6] = [
        ("Lakers vs Warriors", dec!(68), dec!(3.5), dec!(45)),
        ("Cowboys vs Giants", dec!(72), dec!(7.2), dec!(0.40)),
        ("Yankees vs Red Sox", dec!(55), dec!(1.8), dec!(52)),
        ("Chiefs vs Bills", dec!(75), dec!(10.5), dec!(0.35)),
        ("Celtics vs Heat", dec!(63), dec!(4.1), dec!(48)),
        ("Dodgers vs Padres", dec!(58), dec!(2.3), dec!(0.51)),
    ];

    let mut content = String::from("Game,Model Win Percentage,Model Margin,Contract Price\n");
    for (game, win, margin, price) in rows {
        content.push_str(&format!("{game},{win},{margin},{price}\n"));
    }

    let path = dir.join(file_name);
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "Sample input file created");
    Ok(path)
}

/// CSV files in `dir`, sorted by name, excluding editor lock files (`~...`).
pub fn list_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        let is_lock = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('~'));
        if path.is_file() && is_csv && !is_lock {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
