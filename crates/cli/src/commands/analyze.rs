//! Analyze command: align a daily index with market series, test causality
//! in both directions and flag residual outliers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use fedspeak_core::AppConfig;
use fedspeak_data::CsvStorage;

use super::pipeline::{
    align_window, analyze, causality_table, read_market, require_results, select_market_series,
    write_aligned, write_table, AnalysisOutcome, OutputFormat, RunSummary, CAUSALITY_FILE, FAILURES_FILE,
    OUTLIERS_FILE,
};

/// Arguments for the analyze command.
#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Daily sentiment index CSV (as written by `score`)
    #[arg(long)]
    pub index: PathBuf,

    /// Market CSV, long (date, series_name, value) or wide (date, <series>...)
    #[arg(long)]
    pub market: PathBuf,

    /// Output directory for the analysis tables
    #[arg(long, default_value = "output")]
    pub out: PathBuf,

    /// First date to align (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date to align (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

pub fn run_analyze(args: AnalyzeArgs, config: &AppConfig) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let index = CsvStorage::read_daily_index(&args.index)
        .with_context(|| format!("Failed to read daily index from {}", args.index.display()))?;
    let (market, market_failures) = read_market(&args.market)?;

    let series = select_market_series(&config.analysis, &market)?;
    let window = align_window(&config.analysis, args.start, args.end);
    let mut outcome = analyze(&config.analysis, &index, &market, &series, window);
    outcome.failures.splice(0..0, market_failures);
    write_outputs(&args.out, &outcome)?;

    let mut summary = RunSummary {
        index_rows: index.len(),
        ..RunSummary::default()
    };
    summary.record_analysis(&outcome);
    report(format, &summary, &outcome)?;
    require_results(&outcome)
}

/// Writes aligned, causality, outlier and failure tables.
pub(crate) fn write_outputs(out: &std::path::Path, outcome: &AnalysisOutcome) -> Result<()> {
    write_aligned(out, &outcome.aligned)?;
    write_table(out, CAUSALITY_FILE, &outcome.results)?;
    write_table(out, OUTLIERS_FILE, &outcome.outliers)?;
    write_table(out, FAILURES_FILE, &outcome.failures)
}

pub(crate) fn report(
    format: OutputFormat,
    summary: &RunSummary,
    outcome: &AnalysisOutcome,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{}", summary.to_text());
            println!("{}", causality_table(&outcome.results));
            for failure in outcome
                .failures
                .iter()
                .filter(|f| f.stage == fedspeak_data::Stage::Analyze)
            {
                println!("  not tested {}: {}", failure.record_id, failure.reason);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome.results)?);
        }
    }
    Ok(())
}
