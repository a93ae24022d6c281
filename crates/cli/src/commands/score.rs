//! Score command: ingest, score with every backend, build the daily index.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use fedspeak_core::AppConfig;
use fedspeak_data::FailureRecord;

use super::pipeline::{
    ingest_documents, score_documents, write_table, RunSummary, DAILY_INDEX_FILE,
    DOCUMENT_SCORES_FILE, FAILURES_FILE, SENTENCE_SCORES_FILE,
};

/// Arguments for the score command.
#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// Raw documents CSV (columns: source, timestamp, text)
    #[arg(long)]
    pub documents: PathBuf,

    /// Output directory for the score tables
    #[arg(long, default_value = "output")]
    pub out: PathBuf,

    /// Also emit an "ensemble" series averaging all models per date
    #[arg(long)]
    pub ensemble: bool,
}

pub async fn run_score(args: ScoreArgs, config: &AppConfig) -> Result<()> {
    let report = ingest_documents(config, &args.documents)?;
    let scoring = score_documents(
        config,
        &report.documents,
        args.ensemble || config.analysis.ensemble,
    )
    .await?;

    write_table(&args.out, SENTENCE_SCORES_FILE, &scoring.run.scores)?;
    write_table(&args.out, DOCUMENT_SCORES_FILE, &scoring.document_sentiment)?;
    write_table(&args.out, DAILY_INDEX_FILE, &scoring.index)?;

    let failures: Vec<FailureRecord> = report
        .failures
        .iter()
        .chain(&scoring.run.failures)
        .cloned()
        .collect();
    write_table(&args.out, FAILURES_FILE, &failures)?;

    let mut summary = RunSummary::default();
    summary.record_ingest(&report);
    summary.record_scoring(&scoring);
    println!("{}", summary.to_text());
    Ok(())
}
