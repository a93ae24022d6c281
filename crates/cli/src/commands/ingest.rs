//! Ingest command: clean and segment raw documents.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use fedspeak_core::AppConfig;

use super::pipeline::{
    ingest_documents, sentence_rows, write_table, RunSummary, FAILURES_FILE, SENTENCES_FILE,
};

/// Arguments for the ingest command.
#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// Raw documents CSV (columns: source, timestamp, text)
    #[arg(long)]
    pub documents: PathBuf,

    /// Directory for sentences.csv and failures.csv (nothing written if omitted)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run_ingest(args: IngestArgs, config: &AppConfig) -> Result<()> {
    let report = ingest_documents(config, &args.documents)?;

    if let Some(out) = &args.out {
        write_table(out, SENTENCES_FILE, &sentence_rows(&report.documents))?;
        write_table(out, FAILURES_FILE, &report.failures)?;
    }

    let mut summary = RunSummary::default();
    summary.record_ingest(&report);
    println!("{}", summary.to_text());
    for failure in &report.failures {
        println!("  skipped {}: {}", failure.record_id, failure.reason);
    }
    Ok(())
}
