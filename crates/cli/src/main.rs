use anyhow::Context;
use clap::{Parser, Subcommand};
use fedspeak_core::ConfigLoader;

mod commands;

use commands::{AnalyzeArgs, EvaluateArgs, IngestArgs, RunArgs, ScoreArgs};

#[derive(Parser)]
#[command(name = "fedspeak")]
#[command(
    about = "Fed communication sentiment and bond-market Granger causality",
    long_about = None
)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, env = "FEDSPEAK_CONFIG", default_value = "config/Config.toml")]
    config: String,

    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest raw documents and report sentences and skipped records
    Ingest(IngestArgs),
    /// Ingest and score documents, then build the daily sentiment index
    Score(ScoreArgs),
    /// Align a daily index with market series and test causality
    Analyze(AnalyzeArgs),
    /// Run every stage from raw documents to diagnostics
    Run(RunArgs),
    /// Evaluate backends against human-labeled sentences
    Evaluate(EvaluateArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {path}"))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    let config = ConfigLoader::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;

    match cli.command {
        Commands::Ingest(args) => commands::run_ingest(args, &config)?,
        Commands::Score(args) => commands::run_score(args, &config).await?,
        Commands::Analyze(args) => commands::run_analyze(args, &config)?,
        Commands::Run(args) => commands::run_pipeline(args, &config).await?,
        Commands::Evaluate(args) => commands::run_evaluate(args, &config).await?,
    }

    Ok(())
}
