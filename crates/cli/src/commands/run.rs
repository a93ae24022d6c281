//! Run command: every stage from raw documents to diagnostics.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use fedspeak_core::AppConfig;
use fedspeak_data::FailureRecord;

use super::analyze::report;
use super::pipeline::{
    align_window, analyze, ingest_documents, read_market, require_results, score_documents,
    select_market_series, write_aligned, write_table, OutputFormat, RunSummary, CAUSALITY_FILE,
    DAILY_INDEX_FILE, DOCUMENT_SCORES_FILE, FAILURES_FILE, OUTLIERS_FILE, SENTENCE_SCORES_FILE,
};

/// Arguments for the run command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Raw documents CSV (columns: source, timestamp, text)
    #[arg(long)]
    pub documents: PathBuf,

    /// Market CSV, long (date, series_name, value) or wide (date, <series>...)
    #[arg(long)]
    pub market: PathBuf,

    /// Output directory for all tables
    #[arg(long, default_value = "output")]
    pub out: PathBuf,

    /// Also test an "ensemble" series averaging all models per date
    #[arg(long)]
    pub ensemble: bool,

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

pub async fn run_pipeline(args: RunArgs, config: &AppConfig) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let (market, market_failures) = read_market(&args.market)?;
    let series = select_market_series(&config.analysis, &market)?;

    let report_ingest = ingest_documents(config, &args.documents)?;
    let scoring = score_documents(
        config,
        &report_ingest.documents,
        args.ensemble || config.analysis.ensemble,
    )
    .await?;
    let window = align_window(&config.analysis, args.start, args.end);
    let outcome = analyze(&config.analysis, &scoring.index, &market, &series, window);

    write_table(&args.out, SENTENCE_SCORES_FILE, &scoring.run.scores)?;
    write_table(&args.out, DOCUMENT_SCORES_FILE, &scoring.document_sentiment)?;
    write_table(&args.out, DAILY_INDEX_FILE, &scoring.index)?;
    write_aligned(&args.out, &outcome.aligned)?;
    write_table(&args.out, CAUSALITY_FILE, &outcome.results)?;
    write_table(&args.out, OUTLIERS_FILE, &outcome.outliers)?;

    let failures: Vec<FailureRecord> = market_failures
        .iter()
        .chain(&report_ingest.failures)
        .chain(&scoring.run.failures)
        .chain(&outcome.failures)
        .cloned()
        .collect();
    write_table(&args.out, FAILURES_FILE, &failures)?;

    let mut summary = RunSummary::default();
    summary.record_ingest(&report_ingest);
    summary.record_failures(&market_failures);
    summary.record_scoring(&scoring);
    summary.record_analysis(&outcome);
    report(format, &summary, &outcome)?;
    require_results(&outcome)
}
