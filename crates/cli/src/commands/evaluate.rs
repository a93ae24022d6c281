//! Evaluate command: compare backends against human-labeled sentences.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use fedspeak_core::AppConfig;
use fedspeak_data::CsvStorage;
use fedspeak_sentiment::{evaluate, BackendRegistry, EvaluationReport, EvaluationSummary};

use super::pipeline::OutputFormat;

/// Arguments for the evaluate command.
#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Labeled sentences CSV (columns: date, source, text, label)
    #[arg(long)]
    pub gold: PathBuf,

    /// Comma-separated backend names to evaluate (default: all)
    #[arg(long, default_value = "all")]
    pub models: String,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

pub async fn run_evaluate(args: EvaluateArgs, config: &AppConfig) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let labeled = CsvStorage::read_labeled_sentences(&args.gold)
        .with_context(|| format!("Failed to read gold labels from {}", args.gold.display()))?;
    if labeled.is_empty() {
        bail!("No labeled sentences in {}", args.gold.display());
    }

    let registry = BackendRegistry::from_specs(&config.scoring.backends)?;
    let names: Vec<String> = if args.models.eq_ignore_ascii_case("all") {
        registry.names().into_iter().map(String::from).collect()
    } else {
        args.models.split(',').map(|s| s.trim().to_string()).collect()
    };

    let mut reports = Vec::with_capacity(names.len());
    for name in &names {
        let Some(backend) = registry.get(name) else {
            bail!("Unknown backend '{}'. Configured: {:?}", name, registry.names());
        };
        reports.push(evaluate(&labeled, backend.as_ref()).await);
    }

    match format {
        OutputFormat::Text => {
            for report in &reports {
                println!("{}", report_text(report));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }
    Ok(())
}

fn report_text(report: &EvaluationReport) -> String {
    let mut output = String::new();
    output.push('\n');
    output.push_str("╔══════════════════════════════════════════════════════════════╗\n");
    output.push_str(&format!("║  EVALUATION: {:<47} ║\n", report.model_name));
    output.push_str("╠══════════════════════════════════════════════════════════════╣\n");
    push_summary(&mut output, "overall", &report.overall);
    for (source, summary) in &report.by_source {
        output.push_str("╟──────────────────────────────────────────────────────────────╢\n");
        push_summary(&mut output, source, summary);
    }
    output.push_str("╚══════════════════════════════════════════════════════════════╝\n");
    output
}

fn push_summary(output: &mut String, label: &str, summary: &EvaluationSummary) {
    output.push_str(&format!(
        "║  {:<16} acc {:>6.3}  macro-F1 {:>6.3}  n {:>5}  missing {:>4} ║\n",
        label, summary.accuracy, summary.macro_f1, summary.n_scored, summary.n_missing
    ));
    for class in &summary.classes {
        output.push_str(&format!(
            "║    {:<10} P {:>6.3}  R {:>6.3}  F1 {:>6.3}  support {:>6}   ║\n",
            class.label.to_string(),
            class.precision,
            class.recall,
            class.f1,
            class.support
        ));
    }
}
